//! Solution representation and persistence.
//!
//! A solution is a cyclic tour expressed with the instance's own node
//! identifiers. Tours that use a missing arc carry the explicit infeasible
//! marker: `feasible == false` and a negative cost.

use crate::error::{SolverError, SolverResult};
use crate::instance::{Instance, TokenReader};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Cost reported for a tour that uses a missing arc
pub const INFEASIBLE_COST: f64 = -1.0;

/// Represents a solution to a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of node identifiers (implicitly closed)
    pub tour: Vec<usize>,
    /// Total tour cost, or [`INFEASIBLE_COST`]
    pub cost: f64,
    /// Whether every arc of the tour exists
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: INFEASIBLE_COST,
            feasible: false,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from a tour of node identifiers
    pub fn from_tour(instance: &Instance, tour: Vec<usize>, algorithm: &str) -> Self {
        let cost = Self::compute_cost(instance, &tour);
        Solution {
            tour,
            cost,
            feasible: cost >= 0.0,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from internal indices (positions in `instance.nodes()`)
    pub fn from_indices(instance: &Instance, indices: &[usize], algorithm: &str) -> Self {
        let nodes = instance.nodes();
        let tour = indices.iter().map(|&i| nodes[i].id).collect();
        Self::from_tour(instance, tour, algorithm)
    }

    /// Cyclic tour cost, or [`INFEASIBLE_COST`] as soon as an arc is missing
    pub fn compute_cost(instance: &Instance, tour: &[usize]) -> f64 {
        let mut cost = 0.0;
        for (i, &from) in tour.iter().enumerate() {
            let to = tour[(i + 1) % tour.len()];
            let step = instance.cost_between(from, to);
            if step < 0.0 {
                return INFEASIBLE_COST;
            }
            cost += step;
        }
        cost
    }

    /// Recompute cost and feasibility
    pub fn validate(&mut self, instance: &Instance) {
        self.cost = Self::compute_cost(instance, &self.tour);
        self.feasible = self.cost >= 0.0;
    }

    /// Check if all nodes are visited exactly once
    pub fn is_complete(&self, instance: &Instance) -> bool {
        if self.tour.len() != instance.size() {
            return false;
        }
        let unique: HashSet<usize> = self.tour.iter().cloned().collect();
        unique.len() == instance.size() && self.tour.iter().all(|&id| instance.node(id).is_some())
    }

    /// One line per arc with its cost and the running total
    pub fn arc_report(&self, instance: &Instance) -> String {
        let mut report = String::new();
        let mut total = 0.0;
        for (i, &from) in self.tour.iter().enumerate() {
            let to = self.tour[(i + 1) % self.tour.len()];
            let step = instance.cost_between(from, to);
            let (fx, fy) = instance.node(from).map(|n| (n.x, n.y)).unwrap_or((f64::NAN, f64::NAN));
            let (tx, ty) = instance.node(to).map(|n| (n.x, n.y)).unwrap_or((f64::NAN, f64::NAN));
            if step < 0.0 {
                report.push_str(&format!(
                    "({:>7.2}, {:>7.2}) ---> ({:>7.2}, {:>7.2}):  missing arc\n",
                    fx, fy, tx, ty
                ));
                continue;
            }
            total += step;
            report.push_str(&format!(
                "({:>7.2}, {:>7.2}) ---> ({:>7.2}, {:>7.2}): {:>9.4} (total: {:>9.4})\n",
                fx, fy, tx, ty, step, total
            ));
        }
        report
    }

    /// Write the solution in the plain text format: `n cost` followed by one
    /// `id x y` line per node. Infeasible solutions are written as `0 cost`.
    pub fn save<W: Write>(&self, instance: &Instance, writer: &mut W) -> SolverResult<()> {
        if !self.feasible {
            writeln!(writer, "0 {}", self.cost)?;
            return Ok(());
        }
        writeln!(writer, "{} {}", self.tour.len(), self.cost)?;
        for &id in &self.tour {
            let node = instance
                .node(id)
                .ok_or_else(|| SolverError::Validation(format!("node {} is not in the instance", id)))?;
            writeln!(writer, "{} {} {}", node.id, node.x, node.y)?;
        }
        Ok(())
    }

    /// Parse a solution written by [`Solution::save`]
    pub fn load<R: BufRead>(reader: R, algorithm: &str) -> SolverResult<Self> {
        let mut tokens = TokenReader::from_reader(reader)?;
        let size: usize = tokens.next("tour length")?;
        let cost: f64 = tokens.next("tour cost")?;

        let mut tour = Vec::with_capacity(size);
        for _ in 0..size {
            let id: usize = tokens.next("node id")?;
            let _x: f64 = tokens.next("x coordinate")?;
            let _y: f64 = tokens.next("y coordinate")?;
            tour.push(id);
        }

        Ok(Solution {
            tour,
            cost,
            feasible: size > 0 && cost >= 0.0,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let file = File::open(path)?;
        Self::load(BufReader::new(file), "loaded")
    }

    pub fn to_file<P: AsRef<Path>>(&self, instance: &Instance, path: P) -> SolverResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(instance, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        if self.feasible {
            writeln!(f, "  Cost: {:.4}", self.cost)?;
        } else {
            writeln!(f, "  Cost: infeasible ({})", self.cost)?;
        }
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{CostFunction, Node};

    fn square() -> Instance {
        let nodes = vec![
            Node::new(10, 0.0, 0.0),
            Node::new(11, 1.0, 0.0),
            Node::new(12, 1.0, 1.0),
            Node::new(13, 0.0, 1.0),
        ];
        Instance::new("square", nodes, &CostFunction::Euclidean).unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.tour.is_empty());
        assert!(!sol.feasible);
        assert!(sol.cost < 0.0);
    }

    #[test]
    fn test_from_indices_decodes_ids() {
        let instance = square();
        let sol = Solution::from_indices(&instance, &[0, 1, 2, 3], "test");

        assert_eq!(sol.tour, vec![10, 11, 12, 13]);
        assert!(sol.feasible);
        assert!((sol.cost - 4.0).abs() < 1e-10);
        assert!(sol.is_complete(&instance));
    }

    #[test]
    fn test_missing_arc_marks_infeasible() {
        let nodes = vec![Node::new(0, 0.0, 0.0), Node::new(1, 1.0, 0.0), Node::new(2, 2.0, 0.0)];
        let rows = vec![
            vec![0.0, 1.0, -1.0],
            vec![-1.0, 0.0, 1.0],
            vec![1.0, -1.0, 0.0],
        ];
        let instance = Instance::from_matrix("chain", nodes, rows).unwrap();

        let good = Solution::from_tour(&instance, vec![0, 1, 2], "test");
        assert!(good.feasible);
        assert!((good.cost - 3.0).abs() < 1e-12);

        let bad = Solution::from_tour(&instance, vec![0, 2, 1], "test");
        assert!(!bad.feasible);
        assert_eq!(bad.cost, INFEASIBLE_COST);
        assert!(bad.arc_report(&instance).contains("missing arc"));
    }

    #[test]
    fn test_save_and_load() {
        let instance = square();
        let sol = Solution::from_tour(&instance, vec![12, 13, 10, 11], "test");

        let mut buffer = Vec::new();
        sol.save(&instance, &mut buffer).unwrap();
        let loaded = Solution::load(buffer.as_slice(), "test").unwrap();

        assert_eq!(loaded.tour, sol.tour);
        assert!((loaded.cost - 4.0).abs() < 1e-10);
        assert!(loaded.feasible);
    }

    #[test]
    fn test_infeasible_save_writes_marker() {
        let instance = square();
        let mut sol = Solution::new();
        sol.tour = vec![10, 11, 12, 13];

        let mut buffer = Vec::new();
        sol.save(&instance, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "0 -1\n");
    }
}
