//! Property-based tests for aglsa-tsp.
//!
//! Uses proptest to verify the chromosome, local search and population
//! invariants across many random cost graphs.

use aglsa_tsp::heuristics::{
    nearest_neighbor_tour, tour_fitness, Chromosome, CostMatrix, LocalSearch, Population, TwoOptSearch,
    INFEASIBLE_FITNESS,
};
use aglsa_tsp::instance::{Instance, Node};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

// ============================================================================
// Strategies
// ============================================================================

/// Arc cost, missing about a fifth of the time
fn arc_cost() -> impl Strategy<Value = f64> {
    prop_oneof![4 => 0.5..50.0f64, 1 => Just(-1.0)]
}

/// Square cost matrix with 3-12 nodes; diagonal entries are 0
fn random_rows() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (3usize..12).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(arc_cost(), n), n).prop_map(|mut rows| {
            for (i, row) in rows.iter_mut().enumerate() {
                row[i] = 0.0;
            }
            rows
        })
    })
}

/// Complete cost matrix (every arc present)
fn complete_rows() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (3usize..10).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0.5..50.0f64, n), n))
}

fn permutation(n: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..n).collect::<Vec<usize>>()).prop_shuffle()
}

/// Cost matrix with two random tours over it
fn rows_and_parents() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<usize>, Vec<usize>)> {
    random_rows().prop_flat_map(|rows| {
        let n = rows.len();
        (Just(rows), permutation(n), permutation(n))
    })
}

fn manual_fitness(rows: &[Vec<f64>], genes: &[usize]) -> f64 {
    let mut total = 0.0;
    for i in 0..genes.len() {
        let c = rows[genes[i]][genes[(i + 1) % genes.len()]];
        if c < 0.0 {
            return INFEASIBLE_FITNESS;
        }
        total += c;
    }
    1.0 / total
}

// ============================================================================
// Chromosome Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_crossover_yields_permutation((rows, a, b) in rows_and_parents(), seed in any::<u64>()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let p1 = Chromosome::from_genes(a, &costs);
        let p2 = Chromosome::from_genes(b, &costs);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut child = Chromosome::allocate(rows.len()).unwrap();
        child.crossover_from(&p1, &p2, &mut rng);

        prop_assert!(child.is_permutation());
        prop_assert_eq!(child.len(), rows.len());
        prop_assert_eq!(child.genes()[0], p1.genes()[0]);
    }

    #[test]
    fn prop_mutation_yields_permutation((rows, a, _b) in rows_and_parents(), seed in any::<u64>()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let mut c = Chromosome::from_genes(a, &costs);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for _ in 0..10 {
            c.mutate(&mut rng);
            prop_assert!(c.is_permutation());
        }
    }

    #[test]
    fn prop_evaluate_matches_definition((rows, a, _b) in rows_and_parents()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let mut c = Chromosome::from_genes(a.clone(), &costs);

        let first = c.evaluate(&costs);
        let second = c.evaluate(&costs);
        prop_assert_eq!(first, second);

        let expected = manual_fitness(&rows, &a);
        if expected == INFEASIBLE_FITNESS {
            prop_assert_eq!(first, INFEASIBLE_FITNESS);
            prop_assert!(!c.is_feasible());
        } else {
            prop_assert!((first - expected).abs() <= 1e-12 * expected.abs().max(1.0));
            prop_assert!(c.is_feasible());
        }
    }

    #[test]
    fn prop_hamming_distance_is_symmetric((rows, a, b) in rows_and_parents()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let x = Chromosome::from_genes(a, &costs);
        let y = Chromosome::from_genes(b, &costs);

        prop_assert_eq!(x.hamming_distance(&y), y.hamming_distance(&x));
        prop_assert_eq!(x.hamming_distance(&x), 0);
        prop_assert!(x.hamming_distance(&y) <= rows.len());
    }
}

// ============================================================================
// Local Search Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_two_opt_never_worsens_feasible_tours(
        (rows, genes) in complete_rows().prop_flat_map(|rows| {
            let n = rows.len();
            (Just(rows), permutation(n))
        })
    ) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let mut c = Chromosome::from_genes(genes, &costs);
        let before = c.fitness();
        prop_assert!(c.is_feasible());

        TwoOptSearch::new().improve(&mut c, &costs);

        prop_assert!(c.fitness() >= before);
        prop_assert!(c.is_permutation());
        prop_assert!((c.fitness() - tour_fitness(c.genes(), &costs)).abs() < 1e-12);
    }

    #[test]
    fn prop_two_opt_keeps_permutation_on_sparse_graphs((rows, a, _b) in rows_and_parents()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let mut c = Chromosome::from_genes(a, &costs);
        let before = c.fitness();

        TwoOptSearch::new().improve(&mut c, &costs);

        prop_assert!(c.fitness() >= before);
        prop_assert!(c.is_permutation());
    }

    #[test]
    fn prop_nearest_neighbor_is_permutation(rows in random_rows()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let tour = nearest_neighbor_tour(&costs);
        let c = Chromosome::from_genes(tour, &costs);
        prop_assert!(c.is_permutation());
        prop_assert_eq!(c.len(), rows.len());
    }
}

// ============================================================================
// Population Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_statistics_match_feasible_members(rows in random_rows(), size in 1usize..15, seed in any::<u64>()) {
        let costs = CostMatrix::from_rows(&rows).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut population = Population::allocate(size, rows.len()).unwrap();
        population.seed(&costs, &mut rng);

        let feasible: Vec<f64> = population.iter().filter_map(|c| c.cost()).collect();
        let stats = population.statistics();

        prop_assert_eq!(stats.feasible, feasible.len());
        if feasible.is_empty() {
            prop_assert!(stats.mean.is_nan());
            prop_assert_eq!(stats.adaption_factor(), 1.0);
        } else {
            let mean = feasible.iter().sum::<f64>() / feasible.len() as f64;
            prop_assert!((stats.mean - mean).abs() <= 1e-9 * mean.max(1.0));
            prop_assert!(stats.variance >= 0.0);
            let worst = feasible.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!((stats.worst_cost - worst).abs() <= 1e-9 * worst.max(1.0));
        }

        let fitness: Vec<f64> = population.iter().map(|c| c.fitness()).collect();
        prop_assert!(fitness.windows(2).all(|w| w[0] >= w[1]));
    }
}

// ============================================================================
// Persistence Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_instance_file_roundtrip(rows in random_rows(), first_id in 0usize..50) {
        let n = rows.len();
        let nodes: Vec<Node> = (0..n)
            .map(|i| Node::new(first_id + i, i as f64 * 1.5, (n - i) as f64 * 0.25))
            .collect();
        let instance = Instance::from_matrix("prop", nodes, rows.clone()).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prop.tsp");
        instance.to_file(&path).unwrap();
        let loaded = Instance::from_file(&path).unwrap();

        prop_assert_eq!(loaded.name.as_str(), "prop");
        prop_assert_eq!(loaded.nodes(), instance.nodes());
        for i in 0..n {
            for j in 0..n {
                prop_assert_eq!(loaded.cost_between(first_id + i, first_id + j), rows[i][j]);
            }
        }
    }
}
