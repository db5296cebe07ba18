//! Fixed-capacity population of chromosomes.
//!
//! After every generation the active chromosomes are sorted by descending
//! fitness and the statistics are recomputed over the feasible members.
//! Selection and the adaptive probabilities read those statistics, so they
//! are never used between a change and the next [`Population::refresh`].

use crate::error::{try_vec_with_capacity, SolverError, SolverResult};
use crate::heuristics::aglsa::AglsaConfig;
use crate::heuristics::chromosome::{tour_fitness, Chromosome};
use crate::heuristics::construction::SeedStrategy;
use crate::heuristics::cost_matrix::CostMatrix;
use crate::heuristics::local_search::LocalSearch;
use ordered_float::OrderedFloat;
use rand::Rng;
use statrs::statistics::Statistics;
use std::mem;

/// Cost statistics over the feasible members of a population
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStatistics {
    /// Mean cost, NaN without feasible members
    pub mean: f64,
    /// Population variance of the cost, NaN without feasible members
    pub variance: f64,
    /// Position of the worst feasible chromosome
    pub worst: Option<usize>,
    /// Cost of the worst feasible chromosome, NaN without feasible members
    pub worst_cost: f64,
    /// Number of feasible members
    pub feasible: usize,
}

impl PopulationStatistics {
    fn empty() -> Self {
        PopulationStatistics {
            mean: f64::NAN,
            variance: f64::NAN,
            worst: None,
            worst_cost: f64::NAN,
            feasible: 0,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// `std_dev / (worst - mean)`, or 1.0 when that is not a finite number
    pub fn adaption_factor(&self) -> f64 {
        let factor = self.std_dev() / (self.worst_cost - self.mean);
        if factor.is_finite() {
            factor
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct Population {
    /// Always `max_size` buffers; the first `size` are active
    chromosomes: Vec<Chromosome>,
    size: usize,
    stats: PopulationStatistics,
}

impl Population {
    /// Reserve `max_size` chromosomes of `n` genes each
    pub fn allocate(max_size: usize, n: usize) -> SolverResult<Self> {
        if max_size == 0 {
            return Err(SolverError::Config("population size must be positive".to_string()));
        }

        let mut chromosomes = try_vec_with_capacity(max_size, "population")?;
        for _ in 0..max_size {
            chromosomes.push(Chromosome::allocate(n)?);
        }

        Ok(Population {
            chromosomes,
            size: 0,
            stats: PopulationStatistics::empty(),
        })
    }

    /// Build a full population from existing chromosomes
    pub fn from_chromosomes(chromosomes: Vec<Chromosome>) -> SolverResult<Self> {
        if chromosomes.is_empty() {
            return Err(SolverError::Config("population size must be positive".to_string()));
        }
        let size = chromosomes.len();
        let mut population = Population {
            chromosomes,
            size,
            stats: PopulationStatistics::empty(),
        };
        population.refresh();
        Ok(population)
    }

    /// Fill every slot with a greedy or random tour, chosen by a fair coin
    pub fn seed<R: Rng + ?Sized>(&mut self, costs: &CostMatrix, rng: &mut R) {
        for slot in self.chromosomes.iter_mut() {
            let tour = SeedStrategy::sample(rng).build_tour(costs, rng);
            let fitness = tour_fitness(&tour, costs);
            slot.set_genes(&tour, fitness);
        }
        self.size = self.chromosomes.len();
        self.refresh();
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn max_size(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn statistics(&self) -> &PopulationStatistics {
        &self.stats
    }

    /// Active chromosomes, best first
    pub fn iter(&self) -> impl Iterator<Item = &Chromosome> {
        self.chromosomes[..self.size].iter()
    }

    /// Best chromosome of the current generation
    pub fn best(&self) -> Option<&Chromosome> {
        self.chromosomes[..self.size].first()
    }

    /// Linear ranking selection. The chromosome at rank `k` (0 = best) has
    /// weight `(n - k) * 2 / (n (n + 1))`; the scan starts from the worst
    /// rank and stops once the cumulative weight reaches the uniform draw.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &Chromosome {
        let n = self.size.max(1);
        let scaling = 2.0 / (n * (n + 1)) as f64;
        let p = rng.gen::<f64>();

        let mut sum = 0.0;
        for k in (0..n).rev() {
            sum += (n - k) as f64 * scaling;
            if sum >= p {
                return &self.chromosomes[k];
            }
        }

        // Rounding left the total just below the draw
        &self.chromosomes[0]
    }

    /// Diversity gate. The first already accepted chromosome closer than
    /// `similarity_threshold * n` decides: the candidate then survives with
    /// `acceptance_probability`. Without such a neighbour it is accepted.
    /// The bound is compared as a real number, never truncated.
    pub fn accept<R: Rng + ?Sized>(
        candidate: &Chromosome,
        accepted: &[Chromosome],
        config: &AglsaConfig,
        rng: &mut R,
    ) -> bool {
        let min_distance = config.similarity_threshold * candidate.len() as f64;

        for other in accepted {
            if (candidate.hamming_distance(other) as f64) < min_distance {
                return rng.gen::<f64>() < config.acceptance_probability;
            }
        }

        true
    }

    /// Build the next generation into `next`, then swap it in as the
    /// current one. `next` is left holding the previous generation's
    /// buffers for reuse.
    pub fn next_generation<L, R>(
        &mut self,
        next: &mut Population,
        config: &AglsaConfig,
        costs: &CostMatrix,
        local_search: &L,
        rng: &mut R,
    ) where
        L: LocalSearch + ?Sized,
        R: Rng + ?Sized,
    {
        let adaption = self.stats.adaption_factor();
        let p_crossover = config.max_crossover_probability * adaption;
        let p_mutation = config.max_mutation_probability * adaption;
        let mean = self.stats.mean;
        let sd = self.stats.std_dev();

        let next_size = self.size.min(next.max_size());
        let mut i = 0;

        while i < next_size {
            let parent1 = self.select(rng);
            let parent2 = self.select(rng);

            let (accepted, rest) = next.chromosomes.split_at_mut(i);
            let offspring = &mut rest[0];

            if rng.gen::<f64>() < p_crossover {
                offspring.crossover_from(parent1, parent2, rng);
            } else {
                offspring.copy_from(parent1);
            }

            if rng.gen::<f64>() < p_mutation {
                offspring.mutate(rng);
            }

            offspring.evaluate(costs);

            if let Some(cost) = offspring.cost() {
                if cost < mean - sd && rng.gen::<f64>() < config.improvement_probability {
                    local_search.improve(offspring, costs);
                }
            }

            if Self::accept(offspring, accepted, config, rng) {
                i += 1;
            }
        }

        next.size = next_size;
        next.refresh();
        mem::swap(self, next);
    }

    /// Sort by descending fitness
    pub fn sort(&mut self) {
        self.chromosomes[..self.size].sort_by_key(|c| OrderedFloat(-c.fitness()));
    }

    /// Recompute mean, variance and worst over the feasible members
    pub fn update_statistics(&mut self) {
        let active = &self.chromosomes[..self.size];
        let feasible_costs: Vec<f64> = active.iter().filter_map(|c| c.cost()).collect();

        if feasible_costs.is_empty() {
            self.stats = PopulationStatistics::empty();
            return;
        }

        let worst = active
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_feasible())
            .min_by_key(|(_, c)| OrderedFloat(c.fitness()))
            .map(|(i, _)| i);

        self.stats = PopulationStatistics {
            mean: feasible_costs.iter().mean(),
            variance: feasible_costs.iter().population_variance(),
            worst,
            worst_cost: worst.and_then(|i| active[i].cost()).unwrap_or(f64::NAN),
            feasible: feasible_costs.len(),
        };
    }

    /// Sort then update statistics
    pub fn refresh(&mut self) {
        self.sort();
        self.update_statistics();
    }

    /// Mean pairwise Hamming distance over the first 20 chromosomes
    pub fn diversity(&self) -> f64 {
        let sample = &self.chromosomes[..self.size.min(20)];
        if sample.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0;
        let mut count = 0;
        for i in 0..sample.len() {
            for j in i + 1..sample.len() {
                total += sample[i].hamming_distance(&sample[j]) as f64;
                count += 1;
            }
        }
        total / count as f64
    }
}
