//! Guess evaluation against a puzzle layout.

use super::{
    grid::{BLANK, Grid, HIDDEN},
    layout::PuzzleLayout,
};
use std::collections::BTreeSet;

/// Result of evaluating a single guess
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuessEvaluation {
    /// Guess revealed something
    pub hit: bool,

    /// Words that became fully revealed because of this guess
    pub newly_solved: BTreeSet<String>,

    /// Every target word is revealed
    pub solved: bool,
}

/// Mutable puzzle state: the layout plus what players have revealed so far
#[derive(Debug, Clone)]
pub struct PuzzleState {
    layout: PuzzleLayout,
    revealed: Grid,
    solved: Vec<bool>,
}

impl PuzzleState {
    /// Start a puzzle with every letter hidden
    pub fn new(layout: PuzzleLayout) -> Self {
        let solution = layout.solution();
        let mut revealed = Grid::new(solution.height(), solution.width(), BLANK);
        for placement in layout.placements() {
            for (row, col, _) in placement.cells() {
                revealed.set(row, col, HIDDEN);
            }
        }
        let solved = vec![false; layout.placements().len()];

        Self {
            layout,
            revealed,
            solved,
        }
    }

    /// Board as the players see it
    pub fn grid(&self) -> &Grid {
        &self.revealed
    }

    pub fn layout(&self) -> &PuzzleLayout {
        &self.layout
    }

    /// Target words, stem first
    pub fn target_words(&self) -> Vec<&str> {
        self.layout.words()
    }

    /// Words solved so far
    pub fn solved_words(&self) -> Vec<&str> {
        self.layout
            .placements()
            .iter()
            .zip(&self.solved)
            .filter(|(_, solved)| **solved)
            .map(|(p, _)| p.word())
            .collect()
    }

    pub fn letter_count(&self) -> usize {
        self.layout.letter_count()
    }

    /// All target words are revealed
    pub fn is_solved(&self) -> bool {
        self.solved.iter().all(|s| *s)
    }

    /// Reveal `letter` in every unsolved word
    ///
    /// Only still-hidden cells count, so repeating a letter that is already
    /// fully revealed is a miss.
    pub fn guess_letter(&mut self, letter: char) -> GuessEvaluation {
        let letter = letter.to_lowercase().next().unwrap_or(letter);
        let mut revealed = 0;

        for (index, placement) in self.layout.placements().iter().enumerate() {
            if self.solved[index] {
                continue;
            }
            for (row, col, ch) in placement.cells() {
                if ch == letter && self.revealed.get(row, col) == Some(HIDDEN) {
                    self.revealed.set(row, col, ch);
                    revealed += 1;
                }
            }
        }

        self.finish(revealed > 0)
    }

    /// Reveal `word` if it matches an unsolved target word exactly
    pub fn guess_word(&mut self, word: &str) -> GuessEvaluation {
        let word = word.trim().to_lowercase();

        let target = self
            .layout
            .placements()
            .iter()
            .enumerate()
            .find(|(index, p)| !self.solved[*index] && p.word() == word);

        let hit = match target {
            Some((_, placement)) => {
                for (row, col, ch) in placement.cells() {
                    self.revealed.set(row, col, ch);
                }
                true
            }
            None => false,
        };

        self.finish(hit)
    }

    fn finish(&mut self, hit: bool) -> GuessEvaluation {
        let mut newly_solved = BTreeSet::new();

        for (index, placement) in self.layout.placements().iter().enumerate() {
            if self.solved[index] {
                continue;
            }
            let complete = placement
                .cells()
                .all(|(row, col, _)| self.revealed.get(row, col) != Some(HIDDEN));
            if complete {
                self.solved[index] = true;
                newly_solved.insert(placement.word().to_string());
            }
        }

        GuessEvaluation {
            hit,
            newly_solved,
            solved: self.is_solved(),
        }
    }
}
