//! Permutation encoding of a tour with cached fitness.
//!
//! Genes are internal node indices in `0..n`. Every operator in this module
//! keeps them a permutation: crossover refills from the second parent,
//! mutation and 2-opt only reverse segments.

use crate::error::{try_vec_with_capacity, SolverResult};
use crate::heuristics::cost_matrix::CostMatrix;
use rand::Rng;

/// Fitness of a tour that uses a missing arc. Every feasible fitness is
/// strictly positive, so this always compares worse.
pub const INFEASIBLE_FITNESS: f64 = -1.0;

/// Fitness of a gene sequence: `1 / cost` of the closed tour, or
/// [`INFEASIBLE_FITNESS`] as soon as an arc is missing
pub fn tour_fitness(genes: &[usize], costs: &CostMatrix) -> f64 {
    let n = genes.len();
    if n == 0 {
        return INFEASIBLE_FITNESS;
    }

    let mut total = 0.0;
    for i in 0..n {
        let step = costs.get(genes[i], genes[(i + 1) % n]);
        if step < 0.0 {
            return INFEASIBLE_FITNESS;
        }
        total += step;
    }
    1.0 / total
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    genes: Vec<usize>,
    fitness: f64,
}

impl Chromosome {
    /// Identity permutation of length `n`, not yet evaluated
    pub fn allocate(n: usize) -> SolverResult<Self> {
        let mut genes = try_vec_with_capacity(n, "chromosome genes")?;
        genes.extend(0..n);
        Ok(Chromosome {
            genes,
            fitness: INFEASIBLE_FITNESS,
        })
    }

    /// Wrap an existing permutation and evaluate it
    pub fn from_genes(genes: Vec<usize>, costs: &CostMatrix) -> Self {
        let fitness = tour_fitness(&genes, costs);
        Chromosome { genes, fitness }
    }

    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn is_feasible(&self) -> bool {
        self.fitness > 0.0
    }

    /// Tour cost, `None` when infeasible
    pub fn cost(&self) -> Option<f64> {
        if self.is_feasible() {
            Some(1.0 / self.fitness)
        } else {
            None
        }
    }

    /// Recompute the cached fitness from the genes
    pub fn evaluate(&mut self, costs: &CostMatrix) -> f64 {
        self.fitness = tour_fitness(&self.genes, costs);
        self.fitness
    }

    /// Whether `self` should replace `other` as the best known tour.
    /// An infeasible chromosome never does.
    pub fn improves_on(&self, other: &Chromosome) -> bool {
        self.is_feasible() && self.fitness > other.fitness
    }

    /// Number of positions holding different genes
    pub fn hamming_distance(&self, other: &Chromosome) -> usize {
        let differing = self
            .genes
            .iter()
            .zip(other.genes.iter())
            .filter(|(a, b)| a != b)
            .count();
        differing + self.genes.len().abs_diff(other.genes.len())
    }

    /// One-cut order crossover: keep the first `p` genes of `parent1`, then
    /// append the remaining genes in the order they appear in `parent2`.
    /// The fitness is left stale until [`Chromosome::evaluate`].
    pub fn crossover_from<R: Rng + ?Sized>(&mut self, parent1: &Chromosome, parent2: &Chromosome, rng: &mut R) {
        let n = parent1.len();
        if n < 2 {
            self.copy_from(parent1);
            return;
        }

        let cut = rng.gen_range(1..n);
        let mut used = vec![false; n];

        self.genes.clear();
        for &gene in &parent1.genes[..cut] {
            used[gene] = true;
            self.genes.push(gene);
        }
        for &gene in &parent2.genes {
            if !used[gene] {
                used[gene] = true;
                self.genes.push(gene);
            }
        }
    }

    /// Segment-reversal mutation between two distinct random positions.
    /// Position 0 is never moved.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let n = self.genes.len();
        if n < 3 {
            return;
        }

        let i = rng.gen_range(1..n);
        let mut j = rng.gen_range(1..n - 1);
        if j >= i {
            j += 1;
        }
        self.reverse_segment(i.min(j), i.max(j));
    }

    /// Reverse genes `i..=j` in place
    #[inline]
    pub fn reverse_segment(&mut self, i: usize, j: usize) {
        self.genes[i..=j].reverse();
    }

    /// Deep copy of genes and fitness, reusing this buffer
    pub fn copy_from(&mut self, other: &Chromosome) {
        self.genes.clear();
        self.genes.extend_from_slice(&other.genes);
        self.fitness = other.fitness;
    }

    /// Overwrite genes and fitness without reallocating
    pub(crate) fn set_genes(&mut self, genes: &[usize], fitness: f64) {
        self.genes.clear();
        self.genes.extend_from_slice(genes);
        self.fitness = fitness;
    }

    pub(crate) fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Every index in `0..len` appears exactly once
    pub fn is_permutation(&self) -> bool {
        let n = self.genes.len();
        let mut seen = vec![false; n];
        for &gene in &self.genes {
            if gene >= n || seen[gene] {
                return false;
            }
            seen[gene] = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

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
    fn test_evaluate_feasible_tour() {
        let costs = square();
        let mut c = Chromosome::allocate(4).unwrap();
        assert!(!c.is_feasible());

        let fitness = c.evaluate(&costs);
        assert!((fitness - 0.25).abs() < 1e-12);
        assert!((c.cost().unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(c.evaluate(&costs), fitness);
    }

    #[test]
    fn test_missing_arc_is_infeasible() {
        let costs = CostMatrix::from_rows(&[
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![-1.0, 1.0, 0.0],
        ])
        .unwrap();

        let c = Chromosome::from_genes(vec![0, 1, 2], &costs);
        assert_eq!(c.fitness(), INFEASIBLE_FITNESS);
        assert_eq!(c.cost(), None);

        let reversed = Chromosome::from_genes(vec![0, 2, 1], &costs);
        assert!(reversed.is_feasible());
        assert!(reversed.improves_on(&c));
        assert!(!c.improves_on(&reversed));
    }

    #[test]
    fn test_infeasible_never_improves() {
        let costs = CostMatrix::from_rows(&[vec![0.0, -1.0], vec![-1.0, 0.0]]).unwrap();
        let a = Chromosome::from_genes(vec![0, 1], &costs);
        let b = Chromosome::from_genes(vec![1, 0], &costs);
        assert!(!a.improves_on(&b));
    }

    #[test]
    fn test_hamming_distance() {
        let costs = square();
        let a = Chromosome::from_genes(vec![0, 1, 2, 3], &costs);
        let b = Chromosome::from_genes(vec![0, 3, 2, 1], &costs);
        assert_eq!(a.hamming_distance(&a), 0);
        assert_eq!(a.hamming_distance(&b), 2);
    }

    #[test]
    fn test_crossover_keeps_prefix_and_parent2_order() {
        let costs = square();
        let p1 = Chromosome::from_genes(vec![0, 1, 2, 3], &costs);
        let p2 = Chromosome::from_genes(vec![3, 2, 1, 0], &costs);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..50 {
            let mut child = Chromosome::allocate(4).unwrap();
            child.crossover_from(&p1, &p2, &mut rng);
            assert!(child.is_permutation());
            assert_eq!(child.genes()[0], 0);

            let cut = child.genes().iter().zip(p1.genes()).take_while(|(a, b)| a == b).count();
            let tail: Vec<usize> = p2.genes().iter().copied().filter(|g| !p1.genes()[..cut].contains(g)).collect();
            assert_eq!(&child.genes()[cut..], tail.as_slice());
        }
    }

    #[test]
    fn test_mutation_reverses_a_segment() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut c = Chromosome::allocate(8).unwrap();

        for _ in 0..100 {
            let before = c.genes().to_vec();
            c.mutate(&mut rng);
            assert!(c.is_permutation());
            assert_eq!(c.genes()[0], before[0]);
            assert_ne!(c.genes(), before.as_slice());
        }
    }

    #[test]
    fn test_short_tours_are_left_alone() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut c = Chromosome::allocate(2).unwrap();
        c.mutate(&mut rng);
        assert_eq!(c.genes(), &[0, 1]);

        let p = Chromosome::allocate(1).unwrap();
        let mut child = Chromosome::allocate(1).unwrap();
        child.crossover_from(&p, &p, &mut rng);
        assert_eq!(child.genes(), &[0]);
    }

    #[test]
    fn test_copy_from() {
        let costs = square();
        let src = Chromosome::from_genes(vec![2, 3, 0, 1], &costs);
        let mut dst = Chromosome::allocate(4).unwrap();
        dst.copy_from(&src);
        assert_eq!(dst, src);
    }
}
