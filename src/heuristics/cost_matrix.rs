//! Dense cost matrix over internal node indices.

use crate::error::{try_vec_with_capacity, SolverError, SolverResult};
use crate::instance::{Instance, NO_ARC};

/// Read-only N×N matrix where entry `(i, j)` is the cost from the node at
/// position `i` of [`Instance::nodes`] to the node at position `j`.
/// A negative entry means the arc is missing.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    n: usize,
    costs: Vec<f64>,
}

impl CostMatrix {
    /// Snapshot the costs of an instance in internal index order
    pub fn from_instance(instance: &Instance) -> SolverResult<Self> {
        let nodes = instance.nodes();
        let n = nodes.len();
        let cells = n
            .checked_mul(n)
            .ok_or_else(|| SolverError::Allocation(format!("{}x{} cost matrix", n, n)))?;

        let mut costs = try_vec_with_capacity(cells, "cost matrix")?;
        for a in nodes {
            for b in nodes {
                costs.push(instance.cost_between(a.id, b.id));
            }
        }

        Ok(CostMatrix { n, costs })
    }

    /// Build a matrix from explicit rows
    pub fn from_rows(rows: &[Vec<f64>]) -> SolverResult<Self> {
        let n = rows.len();
        if rows.iter().any(|row| row.len() != n) {
            return Err(SolverError::Validation(format!("cost matrix must be {}x{}", n, n)));
        }
        Ok(CostMatrix {
            n,
            costs: rows.iter().flatten().copied().collect(),
        })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Cost from `i` to `j`; out-of-range indices read as a missing arc
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i >= self.n || j >= self.n {
            return NO_ARC;
        }
        self.costs[i * self.n + j]
    }

    #[inline]
    pub fn has_arc(&self, i: usize, j: usize) -> bool {
        self.get(i, j) >= 0.0
    }
}
