//! Tour construction heuristics.
//!
//! Both constructors work on internal indices and are used to seed the AGLSA
//! population. They are also exposed as standalone [`Solver`]s.

use crate::error::SolverResult;
use crate::heuristics::cost_matrix::CostMatrix;
use crate::instance::Instance;
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// A complete TSP solver
pub trait Solver {
    fn solve(&self, instance: &Instance) -> SolverResult<Solution>;
    fn name(&self) -> &str;
}

/// Constructor used for one slot of the initial population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStrategy {
    NearestNeighbor,
    Random,
}

impl SeedStrategy {
    /// Fair coin between the two strategies
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen::<f64>() < 0.5 {
            SeedStrategy::NearestNeighbor
        } else {
            SeedStrategy::Random
        }
    }

    pub fn build_tour<R: Rng + ?Sized>(&self, costs: &CostMatrix, rng: &mut R) -> Vec<usize> {
        match self {
            SeedStrategy::NearestNeighbor => nearest_neighbor_tour(costs),
            SeedStrategy::Random => random_tour(costs.len(), rng),
        }
    }
}

/// Greedy tour from index 0: always move to the unvisited node reached by
/// the cheapest positive-cost arc. Ties keep the lowest index. When no
/// remaining node is reachable the first remaining one is taken.
pub fn nearest_neighbor_tour(costs: &CostMatrix) -> Vec<usize> {
    let n = costs.len();
    if n == 0 {
        return Vec::new();
    }

    let mut tour = Vec::with_capacity(n);
    let mut candidates: Vec<usize> = (1..n).collect();
    let mut current = 0;
    tour.push(current);

    while !candidates.is_empty() {
        let mut chosen = 0;
        let mut best_cost = f64::INFINITY;
        for (pos, &candidate) in candidates.iter().enumerate() {
            let cost = costs.get(current, candidate);
            if cost > 0.0 && cost < best_cost {
                best_cost = cost;
                chosen = pos;
            }
        }

        current = candidates.remove(chosen);
        tour.push(current);
    }

    tour
}

/// Uniformly random permutation of `0..n`
pub fn random_tour<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut tour: Vec<usize> = (0..n).collect();
    tour.shuffle(rng);
    tour
}

/// Nearest Neighbor Heuristic (Greedy)
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborHeuristic;

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic
    }
}

impl Solver for NearestNeighborHeuristic {
    fn solve(&self, instance: &Instance) -> SolverResult<Solution> {
        let start = std::time::Instant::now();
        let costs = CostMatrix::from_instance(instance)?;

        let tour = nearest_neighbor_tour(&costs);
        let mut solution = Solution::from_indices(instance, &tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}

/// Random permutation tour
#[derive(Debug, Clone)]
pub struct RandomTourHeuristic {
    pub seed: u64,
}

impl RandomTourHeuristic {
    pub fn new(seed: u64) -> Self {
        RandomTourHeuristic { seed }
    }
}

impl Default for RandomTourHeuristic {
    fn default() -> Self {
        Self::new(42)
    }
}

impl Solver for RandomTourHeuristic {
    fn solve(&self, instance: &Instance) -> SolverResult<Solution> {
        let start = std::time::Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let tour = random_tour(instance.size(), &mut rng);
        let mut solution = Solution::from_indices(instance, &tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{CostFunction, Node};

    fn line_instance() -> Instance {
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 5.0, 0.0),
            Node::new(3, 1.0, 0.0),
            Node::new(4, 3.0, 0.0),
        ];
        Instance::new("line", nodes, &CostFunction::Euclidean).unwrap()
    }

    #[test]
    fn test_nearest_neighbor_tour() {
        let costs = CostMatrix::from_instance(&line_instance()).unwrap();
        assert_eq!(nearest_neighbor_tour(&costs), vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_nearest_neighbor_skips_missing_arcs() {
        let costs = CostMatrix::from_rows(&[
            vec![0.0, -1.0, 4.0],
            vec![2.0, 0.0, -1.0],
            vec![-1.0, 3.0, 0.0],
        ])
        .unwrap();
        assert_eq!(nearest_neighbor_tour(&costs), vec![0, 2, 1]);

        let unreachable = CostMatrix::from_rows(&[vec![0.0, -1.0], vec![-1.0, 0.0]]).unwrap();
        assert_eq!(nearest_neighbor_tour(&unreachable), vec![0, 1]);
    }

    #[test]
    fn test_random_tour_is_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut tour = random_tour(25, &mut rng);
        tour.sort_unstable();
        assert_eq!(tour, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_strategy_uses_both_constructors() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let draws: Vec<SeedStrategy> = (0..200).map(|_| SeedStrategy::sample(&mut rng)).collect();
        assert!(draws.contains(&SeedStrategy::NearestNeighbor));
        assert!(draws.contains(&SeedStrategy::Random));
    }

    #[test]
    fn test_solvers_decode_ids() {
        let instance = line_instance();

        let greedy = NearestNeighborHeuristic::new().solve(&instance).unwrap();
        assert_eq!(greedy.tour, vec![1, 3, 4, 2]);
        assert!((greedy.cost - 10.0).abs() < 1e-10);
        assert!(greedy.feasible);

        let random = RandomTourHeuristic::new(7).solve(&instance).unwrap();
        assert!(random.is_complete(&instance));
        assert_eq!(random.tour, RandomTourHeuristic::new(7).solve(&instance).unwrap().tour);
    }
}
