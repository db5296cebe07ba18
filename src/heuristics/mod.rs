//! Heuristics module for the TSP.
//!
//! This module exports the tour encoding, the construction and improvement
//! heuristics, and the adaptive genetic local search built on top of them.

pub mod aglsa;
pub mod chromosome;
pub mod construction;
pub mod cost_matrix;
pub mod local_search;
pub mod population;

pub use aglsa::*;
pub use chromosome::*;
pub use construction::*;
pub use cost_matrix::*;
pub use local_search::*;
pub use population::*;
