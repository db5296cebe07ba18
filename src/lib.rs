//! AGLSA TSP Solver Library
//!
//! An adaptive genetic local search solver for the Traveling Salesman Problem
//! over directed, possibly asymmetric and sparse cost graphs.
//!
//! # Features
//!
//! - Instances built from coordinates with Euclidean, Manhattan, Minkowski or
//!   "unfair" (noisy, thresholded) cost functions, or from explicit matrices
//! - Synthetic instance generation (uniform, line and super-ellipse layouts)
//! - Greedy nearest neighbor and random tour construction
//! - Best-improvement 2-opt local search
//! - Adaptive Genetic Local Search Algorithm (AGLSA) with ranking selection,
//!   diversity-gated acceptance and adaptive crossover/mutation rates
//! - Benchmarking and SVG visualization tools
//!
//! # Example
//!
//! ```no_run
//! use aglsa_tsp::instance::Instance;
//! use aglsa_tsp::heuristics::{Aglsa, AglsaConfig, Solver};
//!
//! let instance = Instance::from_file("instance.tsp").unwrap();
//!
//! let solver = Aglsa::new(AglsaConfig { time_limit: 2.0, ..Default::default() });
//! let solution = solver.solve(&instance).unwrap();
//!
//! if solution.feasible {
//!     println!("Tour cost: {:.2}", solution.cost);
//! }
//! ```

pub mod benchmark;
pub mod error;
pub mod generator;
pub mod heuristics;
pub mod instance;
pub mod solution;
pub mod visualization;

pub use error::{SolverError, SolverResult};
pub use instance::Instance;
pub use solution::Solution;
