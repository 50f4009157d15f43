//! Character grid shared by the puzzle layout and the revealed board.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell that holds no letter
pub const BLANK: char = '.';

/// Cell that holds a letter the players have not revealed yet
pub const HIDDEN: char = '-';

/// Rectangular character matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<char>>,
}

impl Grid {
    /// Create a grid of `height` x `width` cells all set to `fill`
    pub fn new(height: usize, width: usize, fill: char) -> Self {
        Self {
            rows: vec![vec![fill; width]; height],
        }
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Get a cell, `None` when out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<char> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Set a cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: char) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Rows as strings, top to bottom
    pub fn lines(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.iter().collect()).collect()
    }

    /// Count cells equal to `value`
    pub fn count(&self, value: char) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|c| **c == value)
            .count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}
