//! Local search improvement of chromosomes.
//!
//! The 2-opt neighbourhood of a tour is every tour obtained by reversing one
//! segment `i..=j` with `1 <= i < j <= n - 1`. Costs may be asymmetric, so a
//! reversal changes the cost of every arc inside the segment and each
//! neighbour is evaluated in full.

use crate::heuristics::chromosome::{tour_fitness, Chromosome};
use crate::heuristics::cost_matrix::CostMatrix;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `chromosome` in place; returns whether it changed
    fn improve(&self, chromosome: &mut Chromosome, costs: &CostMatrix) -> bool;
    fn name(&self) -> &str;
}

/// Best-improvement 2-opt hill climbing
///
/// Each sweep scans the whole neighbourhood and applies the single best
/// strictly improving reversal. Sweeps repeat until a local optimum is
/// reached, optionally capped by `max_sweeps`.
#[derive(Debug, Clone, Default)]
pub struct TwoOptSearch {
    /// Upper bound on sweeps per call, `None` to run to a local optimum
    pub max_sweeps: Option<usize>,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch { max_sweeps: None }
    }

    pub fn with_max_sweeps(max_sweeps: usize) -> Self {
        TwoOptSearch {
            max_sweeps: Some(max_sweeps),
        }
    }

    /// One full sweep; returns the best improving move and its fitness
    fn best_move(&self, chromosome: &mut Chromosome, costs: &CostMatrix) -> Option<(usize, usize, f64)> {
        let n = chromosome.len();
        let mut best_fitness = chromosome.fitness();
        let mut best = None;

        for i in 1..n {
            for j in (i + 1)..n {
                chromosome.reverse_segment(i, j);
                let fitness = tour_fitness(chromosome.genes(), costs);
                chromosome.reverse_segment(i, j);

                if fitness > 0.0 && fitness > best_fitness {
                    best_fitness = fitness;
                    best = Some((i, j, fitness));
                }
            }
        }

        best
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, chromosome: &mut Chromosome, costs: &CostMatrix) -> bool {
        if chromosome.len() < 3 {
            return false;
        }

        let mut improved = false;
        let mut sweeps = 0;

        while self.max_sweeps.map_or(true, |max| sweeps < max) {
            sweeps += 1;
            match self.best_move(chromosome, costs) {
                Some((i, j, fitness)) => {
                    chromosome.reverse_segment(i, j);
                    chromosome.set_fitness(fitness);
                    improved = true;
                }
                None => break,
            }
        }

        improved
    }

    fn name(&self) -> &str {
        "2-opt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> CostMatrix {
        let d = 2f64.sqrt();
        CostMatrix::from_rows(&[
            vec![0.0, 1.0, d, 1.0],
            vec![1.0, 0.0, 1.0, d],
            vec![d, 1.0, 0.0, 1.0],
            vec![1.0, d, 1.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_two_opt_uncrosses_square() {
        let costs = square();
        let mut c = Chromosome::from_genes(vec![0, 2, 1, 3], &costs);
        let before = c.fitness();

        assert!(TwoOptSearch::new().improve(&mut c, &costs));
        assert!(c.fitness() > before);
        assert!((c.cost().unwrap() - 4.0).abs() < 1e-12);
        assert!(c.is_permutation());
        assert_eq!(c.fitness(), tour_fitness(c.genes(), &costs));
    }

    #[test]
    fn test_local_optimum_is_unchanged() {
        let costs = square();
        let mut c = Chromosome::from_genes(vec![0, 1, 2, 3], &costs);
        let before = c.clone();

        assert!(!TwoOptSearch::new().improve(&mut c, &costs));
        assert_eq!(c, before);
    }

    #[test]
    fn test_two_opt_finds_feasible_neighbour() {
        // Only 0 -> 2 -> 1 -> 0 exists
        let costs = CostMatrix::from_rows(&[
            vec![0.0, -1.0, 1.0],
            vec![1.0, 0.0, -1.0],
            vec![-1.0, 1.0, 0.0],
        ])
        .unwrap();
        let mut c = Chromosome::from_genes(vec![0, 1, 2], &costs);
        assert!(!c.is_feasible());

        assert!(TwoOptSearch::new().improve(&mut c, &costs));
        assert_eq!(c.genes(), &[0, 2, 1]);
        assert!((c.cost().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_cap() {
        let costs = square();
        let mut c = Chromosome::from_genes(vec![0, 2, 1, 3], &costs);
        assert!(!TwoOptSearch::with_max_sweeps(0).improve(&mut c, &costs));
        assert_eq!(c.genes(), &[0, 2, 1, 3]);
    }
}
