//! Sequence-number replay protection.
//!
//! Transports may redeliver a call after a timeout even though the first delivery
//! already took effect. Each caller key keeps the highest sequence number applied
//! so far plus a short history of replies; anything at or below the watermark is
//! answered from that history instead of running again. Numbers need not be
//! contiguous, only increasing.

use std::collections::{HashMap, VecDeque};

/// Whether a request should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<R> {
    /// New sequence number, execute it
    Fresh,

    /// Already applied; the recorded reply
    Duplicate { reply: R, watermark: u64 },
}

#[derive(Debug)]
struct Watermark<R> {
    highest: u64,
    /// Oldest first
    replies: VecDeque<(u64, R)>,
}

/// Per-key watermarks with bounded reply history
#[derive(Debug)]
pub struct RequestDeduplicator<R> {
    history: usize,
    marks: HashMap<String, Watermark<R>>,
}

impl<R: Clone> RequestDeduplicator<R> {
    /// Create a deduplicator remembering `history` replies per key
    pub fn new(history: usize) -> Self {
        Self {
            history: history.max(1),
            marks: HashMap::new(),
        }
    }

    /// Classify a request
    ///
    /// A duplicate returns the reply recorded for that exact sequence number, or
    /// the reply at the watermark when that number was never applied or has
    /// aged out of the history.
    pub fn check(&self, key: &str, seq: u64) -> Admission<R> {
        let Some(mark) = self.marks.get(key) else {
            return Admission::Fresh;
        };
        if seq > mark.highest {
            return Admission::Fresh;
        }

        let recorded = mark
            .replies
            .iter()
            .rev()
            .find(|(s, _)| *s == seq)
            .or_else(|| mark.replies.back());

        match recorded {
            Some((_, reply)) => Admission::Duplicate {
                reply: reply.clone(),
                watermark: mark.highest,
            },
            None => Admission::Fresh,
        }
    }

    /// Record the reply of an executed request and advance the watermark
    pub fn record(&mut self, key: &str, seq: u64, reply: R) {
        let mark = self
            .marks
            .entry(key.to_string())
            .or_insert_with(|| Watermark {
                highest: seq,
                replies: VecDeque::new(),
            });

        mark.highest = mark.highest.max(seq);
        mark.replies.push_back((seq, reply));
        while mark.replies.len() > self.history {
            mark.replies.pop_front();
        }
    }

    /// Highest applied sequence number for a key
    pub fn watermark(&self, key: &str) -> Option<u64> {
        self.marks.get(key).map(|m| m.highest)
    }

    /// Drop a key's history
    pub fn forget(&mut self, key: &str) {
        self.marks.remove(key);
    }

    /// Keep only keys with at least one remembered reply passing `keep`
    pub fn retain_replies(&mut self, mut keep: impl FnMut(&R) -> bool) {
        self.marks
            .retain(|_, mark| mark.replies.iter().any(|(_, reply)| keep(reply)));
    }

    /// Number of keys with history
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_request_is_fresh() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new(4);
        assert_eq!(dedup.check("alice", 0), Admission::Fresh);
    }

    #[test]
    fn test_replay_returns_recorded_reply() {
        let mut dedup = RequestDeduplicator::new(4);
        dedup.record("alice", 3, "first");
        dedup.record("alice", 7, "second");

        assert_eq!(
            dedup.check("alice", 3),
            Admission::Duplicate {
                reply: "first",
                watermark: 7
            }
        );
        assert_eq!(
            dedup.check("alice", 7),
            Admission::Duplicate {
                reply: "second",
                watermark: 7
            }
        );
        assert_eq!(dedup.check("alice", 8), Admission::Fresh);
    }

    #[test]
    fn test_gap_below_watermark_uses_latest_reply() {
        let mut dedup = RequestDeduplicator::new(4);
        dedup.record("alice", 2, 20);
        dedup.record("alice", 5, 50);

        assert_eq!(
            dedup.check("alice", 4),
            Admission::Duplicate {
                reply: 50,
                watermark: 5
            }
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let mut dedup = RequestDeduplicator::new(4);
        dedup.record("alice", 10, ());
        assert_eq!(dedup.check("bob", 1), Admission::Fresh);
        assert_eq!(dedup.watermark("alice"), Some(10));
        assert_eq!(dedup.watermark("bob"), None);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut dedup = RequestDeduplicator::new(2);
        dedup.record("alice", 1, 'a');
        dedup.record("alice", 2, 'b');
        dedup.record("alice", 3, 'c');

        // seq 1 aged out, falls back to the latest reply
        assert_eq!(
            dedup.check("alice", 1),
            Admission::Duplicate {
                reply: 'c',
                watermark: 3
            }
        );
    }

    #[test]
    fn test_forget() {
        let mut dedup = RequestDeduplicator::new(2);
        dedup.record("alice", 1, ());
        dedup.forget("alice");
        assert_eq!(dedup.check("alice", 1), Admission::Fresh);
    }

    #[test]
    fn test_retain_replies_drops_dead_keys() {
        let mut dedup = RequestDeduplicator::new(4);
        dedup.record("alice", 1, 10u32);
        dedup.record("alice", 2, 11);
        dedup.record("bob", 1, 20);

        dedup.retain_replies(|id| *id == 11);
        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.watermark("alice"), Some(2));
        assert_eq!(dedup.check("bob", 1), Admission::Fresh);

        dedup.retain_replies(|_| false);
        assert!(dedup.is_empty());
    }

    proptest! {
        #[test]
        fn prop_watermark_is_max_recorded(seqs in prop::collection::vec(0u64..1000, 1..50)) {
            let mut dedup = RequestDeduplicator::new(8);
            for seq in &seqs {
                if dedup.check("p", *seq) == Admission::Fresh {
                    dedup.record("p", *seq, *seq);
                }
            }

            let max = *seqs.iter().max().unwrap();
            prop_assert_eq!(dedup.watermark("p"), Some(max));
            for seq in &seqs {
                let is_duplicate = matches!(dedup.check("p", *seq), Admission::Duplicate { .. });
                prop_assert!(is_duplicate);
            }
        }
    }
}
