//! Puzzle module: the criss-cross grid, its layout, and guess evaluation.
//!
//! Evaluation is pure. It knows nothing about players or turns; sessions feed it
//! guesses and decide what a hit or miss means for the game.

pub mod engine;
pub mod grid;
pub mod layout;

pub use engine::{GuessEvaluation, PuzzleState};
pub use grid::{BLANK, Grid, HIDDEN};
pub use layout::{Direction, LayoutError, LayoutResult, Placement, PuzzleLayout};
