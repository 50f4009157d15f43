//! Criss-cross puzzle layout.
//!
//! A layout is one vertical stem word crossed by horizontal words. Each horizontal
//! word crosses the stem at its own stem row, on the first occurrence of that row's
//! stem letter. Rows are handed out even rows first so horizontals stay apart when
//! the stem is long enough.

use super::grid::{BLANK, Grid};
use crate::services::WordRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Minimum length of any word placed in a layout
pub const MIN_WORD_LEN: usize = 2;

/// Minimum stem length requested when generating layouts
pub const MIN_STEM_LEN: usize = 3;

/// Layout errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Stem cannot host the requested number of crossings
    #[error("Stem word needs at least {required} letters, got {actual}")]
    StemTooShort { required: usize, actual: usize },

    /// Word shares no free stem letter
    #[error("Word '{0}' does not cross the stem")]
    NoCrossing(String),

    /// Placement rejected
    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    /// Word repository had nothing suitable
    #[error("Word repository has no suitable words")]
    NotEnoughWords,

    /// Generation gave up
    #[error("Could not build a puzzle after {0} attempts")]
    Exhausted(usize),

    /// Word repository call failed during generation
    #[error("Word repository failure: {0}")]
    Repository(String),
}

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Word orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Across,
    Down,
}

/// A word anchored on the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    word: String,
    row: usize,
    col: usize,
    direction: Direction,
}

impl Placement {
    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Word length in characters
    pub fn len(&self) -> usize {
        self.word.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    /// Cells covered by the word as `(row, col, letter)`
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        self.word
            .chars()
            .enumerate()
            .map(move |(i, ch)| match self.direction {
                Direction::Across => (self.row, self.col + i, ch),
                Direction::Down => (self.row + i, self.col, ch),
            })
    }
}

/// Stem rows in the order crossings are assigned to them
pub fn candidate_rows(stem_len: usize) -> impl Iterator<Item = usize> {
    (0..stem_len).step_by(2).chain((1..stem_len).step_by(2))
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Whether `word` can sit on the grid: lowercase `a`-`z` only
///
/// Anything else could collide with the hidden and blank cell markers.
pub fn is_puzzle_word(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase())
}

fn require_puzzle_word(word: &str) -> LayoutResult<()> {
    if is_puzzle_word(word) {
        Ok(())
    } else {
        Err(LayoutError::InvalidPlacement(format!(
            "'{word}' must contain only letters a-z"
        )))
    }
}

/// Solved puzzle layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleLayout {
    /// Stem first, then horizontals in crossing order
    placements: Vec<Placement>,
    solution: Grid,
}

impl PuzzleLayout {
    /// Build a layout, picking the crossing row of every word greedily
    ///
    /// # Arguments
    ///
    /// * `stem` - Vertical word
    /// * `words` - Horizontal words, each crossing the stem once
    ///
    /// # Returns
    ///
    /// * `LayoutResult<PuzzleLayout>` - Layout or the first word that does not fit
    pub fn criss_cross(stem: &str, words: &[String]) -> LayoutResult<Self> {
        let stem = normalize(stem);
        let stem_chars: Vec<char> = stem.chars().collect();

        if stem_chars.len() < words.len() {
            return Err(LayoutError::StemTooShort {
                required: words.len(),
                actual: stem_chars.len(),
            });
        }

        let mut used = vec![false; stem_chars.len()];
        let mut crossings = Vec::with_capacity(words.len());

        for word in words {
            let word = normalize(word);
            let row = candidate_rows(stem_chars.len())
                .find(|row| !used[*row] && word.contains(stem_chars[*row]))
                .ok_or_else(|| LayoutError::NoCrossing(word.clone()))?;
            used[row] = true;
            crossings.push((row, word));
        }

        Self::with_rows(&stem, crossings)
    }

    /// Build a layout with explicit crossing rows
    ///
    /// # Arguments
    ///
    /// * `stem` - Vertical word
    /// * `crossings` - `(stem row, horizontal word)` pairs
    ///
    /// # Returns
    ///
    /// * `LayoutResult<PuzzleLayout>` - Layout or placement error
    pub fn with_rows(stem: &str, crossings: Vec<(usize, String)>) -> LayoutResult<Self> {
        let stem = normalize(stem);
        require_puzzle_word(&stem)?;
        let stem_chars: Vec<char> = stem.chars().collect();

        let required = crossings.len().max(MIN_WORD_LEN);
        if stem_chars.len() < required {
            return Err(LayoutError::StemTooShort {
                required,
                actual: stem_chars.len(),
            });
        }

        let mut seen_rows = HashSet::new();
        let mut seen_words = HashSet::from([stem.clone()]);
        let mut anchored = Vec::with_capacity(crossings.len());

        for (row, word) in crossings {
            let word = normalize(&word);
            require_puzzle_word(&word)?;
            let Some(letter) = stem_chars.get(row).copied() else {
                return Err(LayoutError::InvalidPlacement(format!(
                    "row {row} is outside stem '{stem}'"
                )));
            };
            if !seen_rows.insert(row) {
                return Err(LayoutError::InvalidPlacement(format!(
                    "row {row} is used twice"
                )));
            }
            if word.chars().count() < MIN_WORD_LEN {
                return Err(LayoutError::InvalidPlacement(format!(
                    "'{word}' is shorter than {MIN_WORD_LEN} letters"
                )));
            }
            if !seen_words.insert(word.clone()) {
                return Err(LayoutError::InvalidPlacement(format!(
                    "'{word}' appears twice"
                )));
            }
            let offset = word
                .chars()
                .position(|c| c == letter)
                .ok_or_else(|| LayoutError::NoCrossing(word.clone()))?;
            anchored.push((row, word, offset));
        }

        let stem_col = anchored.iter().map(|(_, _, offset)| *offset).max().unwrap_or(0);

        let mut placements = Vec::with_capacity(anchored.len() + 1);
        placements.push(Placement {
            word: stem,
            row: 0,
            col: stem_col,
            direction: Direction::Down,
        });
        for (row, word, offset) in anchored {
            placements.push(Placement {
                word,
                row,
                col: stem_col - offset,
                direction: Direction::Across,
            });
        }

        let width = placements
            .iter()
            .map(|p| match p.direction {
                Direction::Across => p.col + p.len(),
                Direction::Down => p.col + 1,
            })
            .max()
            .unwrap_or(0);

        let mut solution = Grid::new(stem_chars.len(), width, BLANK);
        for placement in &placements {
            for (row, col, ch) in placement.cells() {
                solution.set(row, col, ch);
            }
        }

        Ok(Self {
            placements,
            solution,
        })
    }

    /// Generate a random layout of `num_words` words from a word repository
    ///
    /// # Arguments
    ///
    /// * `repo` - Word source
    /// * `num_words` - Total words including the stem
    /// * `attempts` - Stems to try before giving up
    ///
    /// # Returns
    ///
    /// * `LayoutResult<PuzzleLayout>` - Generated layout or error
    pub async fn generate(
        repo: &dyn WordRepository,
        num_words: usize,
        attempts: usize,
    ) -> LayoutResult<Self> {
        if num_words == 0 {
            return Err(LayoutError::InvalidPlacement(
                "a puzzle needs at least one word".to_string(),
            ));
        }

        let crossings_needed = num_words - 1;
        let stem_min = crossings_needed.max(MIN_STEM_LEN);
        let attempts = attempts.max(1);

        for attempt in 1..=attempts {
            let stem = repo
                .random_word(stem_min)
                .await
                .map_err(|e| LayoutError::Repository(e.to_string()))?
                .ok_or(LayoutError::NotEnoughWords)?;
            let stem = normalize(&stem);
            let stem_chars: Vec<char> = stem.chars().collect();
            if stem_chars.len() < crossings_needed {
                continue;
            }

            let mut used = vec![stem.clone()];
            let mut crossings = Vec::with_capacity(crossings_needed);
            for row in candidate_rows(stem_chars.len()).take(crossings_needed) {
                let found = repo
                    .random_word_containing(stem_chars[row], &used)
                    .await
                    .map_err(|e| LayoutError::Repository(e.to_string()))?;
                match found {
                    Some(word) => {
                        let word = normalize(&word);
                        used.push(word.clone());
                        crossings.push((row, word));
                    }
                    None => break,
                }
            }

            if crossings.len() < crossings_needed {
                log::debug!(
                    "Layout attempt {} with stem '{}' found only {} of {} crossings",
                    attempt,
                    stem,
                    crossings.len(),
                    crossings_needed
                );
                continue;
            }

            match Self::with_rows(&stem, crossings) {
                Ok(layout) => return Ok(layout),
                Err(e) => log::debug!("Layout attempt {} rejected: {}", attempt, e),
            }
        }

        Err(LayoutError::Exhausted(attempts))
    }

    /// Placements, stem first
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Fully revealed grid
    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    /// Target words, stem first
    pub fn words(&self) -> Vec<&str> {
        self.placements.iter().map(Placement::word).collect()
    }

    /// Number of cells holding a letter
    pub fn letter_count(&self) -> usize {
        self.solution.height() * self.solution.width() - self.solution.count(BLANK)
    }
}
