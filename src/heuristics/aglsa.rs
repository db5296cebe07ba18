//! Adaptive Genetic Local Search Algorithm (AGLSA).
//!
//! A generational genetic algorithm whose crossover and mutation rates are
//! scaled by the cost dispersion of the current population, with a
//! Hamming-distance acceptance gate for diversity and 2-opt refinement of
//! promising offspring. The search stops on a time limit, an iteration
//! limit or after too many generations without a new global best.

use crate::error::{SolverError, SolverResult};
use crate::heuristics::chromosome::Chromosome;
use crate::heuristics::construction::Solver;
use crate::heuristics::cost_matrix::CostMatrix;
use crate::heuristics::local_search::TwoOptSearch;
use crate::heuristics::population::Population;
use crate::instance::Instance;
use crate::solution::Solution;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// AGLSA configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AglsaConfig {
    /// Crossover probability when the adaption factor is 1
    pub max_crossover_probability: f64,
    /// Mutation probability when the adaption factor is 1
    pub max_mutation_probability: f64,
    /// Offspring closer than this fraction of the tour length to an accepted
    /// chromosome are considered similar
    pub similarity_threshold: f64,
    /// Probability of keeping a similar offspring
    pub acceptance_probability: f64,
    /// Probability of running 2-opt on a promising offspring
    pub improvement_probability: f64,
    /// Number of chromosomes per generation
    pub population_size: usize,
    /// Time limit in seconds
    pub time_limit: f64,
    /// Maximum number of generations
    pub max_iterations: usize,
    /// Maximum generations without a new global best
    pub max_stagnation: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for AglsaConfig {
    fn default() -> Self {
        AglsaConfig {
            max_crossover_probability: 0.8,
            max_mutation_probability: 0.3,
            similarity_threshold: 0.1,
            acceptance_probability: 0.5,
            improvement_probability: 0.2,
            population_size: 30,
            time_limit: 5.0,
            max_iterations: 10000,
            max_stagnation: 1000,
            seed: 42,
        }
    }
}

impl AglsaConfig {
    /// Load a (possibly partial) configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AglsaConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SolverResult<()> {
        let probabilities = [
            ("max crossover probability", self.max_crossover_probability),
            ("max mutation probability", self.max_mutation_probability),
            ("improvement probability", self.improvement_probability),
        ];
        for (name, value) in probabilities {
            if value.is_nan() || value < 0.0 {
                return Err(SolverError::Config(format!("{} must be non-negative, got {}", name, value)));
            }
        }

        let unit = [
            ("acceptance probability", self.acceptance_probability),
            ("similarity threshold", self.similarity_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(SolverError::Config(format!("{} must lie in [0, 1], got {}", name, value)));
            }
        }

        if self.acceptance_probability == 0.0 && self.similarity_threshold > 0.0 {
            return Err(SolverError::Config(
                "acceptance probability 0 with a positive similarity threshold can reject every offspring"
                    .to_string(),
            ));
        }
        if self.population_size == 0 {
            return Err(SolverError::Config("population size must be positive".to_string()));
        }
        if self.time_limit.is_nan() || self.time_limit <= 0.0 {
            return Err(SolverError::Config(format!("time limit must be positive, got {}", self.time_limit)));
        }
        Ok(())
    }
}

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    TimeLimit,
    MaxIterations,
    Stagnation,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TerminationReason::TimeLimit => "time limit",
            TerminationReason::MaxIterations => "iteration limit",
            TerminationReason::Stagnation => "stagnation",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Running,
    Terminated(TerminationReason),
}

/// One AGLSA run over a cost matrix, advanced a generation at a time
pub struct AglsaSearch<'a> {
    config: &'a AglsaConfig,
    costs: &'a CostMatrix,
    local_search: TwoOptSearch,
    current: Population,
    next: Population,
    best: Chromosome,
    rng: ChaCha8Rng,
    iteration: usize,
    stagnation: usize,
    start: Instant,
    elapsed: f64,
    state: SearchState,
}

impl<'a> AglsaSearch<'a> {
    /// Allocate both generations, seed the first one and record its best
    /// chromosome as the global best
    pub fn new(config: &'a AglsaConfig, costs: &'a CostMatrix) -> SolverResult<Self> {
        config.validate()?;
        if costs.is_empty() {
            return Err(SolverError::Validation("cannot search tours over zero nodes".to_string()));
        }

        let start = Instant::now();
        let n = costs.len();
        let mut current = Population::allocate(config.population_size, n)?;
        let next = Population::allocate(config.population_size, n)?;
        let mut best = Chromosome::allocate(n)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        current.seed(costs, &mut rng);
        if let Some(seed_best) = current.best() {
            best.copy_from(seed_best);
        }

        let mut search = AglsaSearch {
            config,
            costs,
            local_search: TwoOptSearch::new(),
            current,
            next,
            best,
            rng,
            iteration: 0,
            stagnation: 0,
            start,
            elapsed: start.elapsed().as_secs_f64(),
            state: SearchState::Running,
        };
        search.check_termination();
        Ok(search)
    }

    /// Produce one generation, unless the search has already terminated
    pub fn step(&mut self) -> SearchState {
        if self.state != SearchState::Running {
            return self.state;
        }

        let adaption = self.current.statistics().adaption_factor();
        self.current.next_generation(
            &mut self.next,
            self.config,
            self.costs,
            &self.local_search,
            &mut self.rng,
        );

        match self.current.best() {
            Some(generation_best) if generation_best.improves_on(&self.best) => {
                self.best.copy_from(generation_best);
                self.stagnation = 0;
            }
            _ => self.stagnation += 1,
        }

        self.iteration += 1;
        self.elapsed = self.start.elapsed().as_secs_f64();

        if log::log_enabled!(log::Level::Debug) {
            let stats = self.current.statistics();
            debug!(
                "[AGLSA] Gen {}  Best {:?}  Global {:?}  Adaption {:.3}  Feasible {}/{}  Diversity {:.2}  Elapsed {:.2}s",
                self.iteration,
                self.current.best().and_then(|c| c.cost()),
                self.best.cost(),
                adaption,
                stats.feasible,
                self.current.len(),
                self.current.diversity(),
                self.elapsed
            );
        }

        self.check_termination();
        self.state
    }

    /// Step until a stopping condition holds
    pub fn run(&mut self) -> TerminationReason {
        loop {
            if let SearchState::Terminated(reason) = self.step() {
                return reason;
            }
        }
    }

    fn check_termination(&mut self) {
        let reason = if self.elapsed >= self.config.time_limit {
            Some(TerminationReason::TimeLimit)
        } else if self.iteration >= self.config.max_iterations {
            Some(TerminationReason::MaxIterations)
        } else if self.stagnation >= self.config.max_stagnation {
            Some(TerminationReason::Stagnation)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.state = SearchState::Terminated(reason);
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Best chromosome found so far
    pub fn best(&self) -> &Chromosome {
        &self.best
    }

    pub fn population(&self) -> &Population {
        &self.current
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn stagnation(&self) -> usize {
        self.stagnation
    }

    /// Seconds since the search was created
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

/// AGLSA as a [`Solver`]
#[derive(Debug, Clone, Default)]
pub struct Aglsa {
    pub config: AglsaConfig,
}

impl Aglsa {
    pub fn new(config: AglsaConfig) -> Self {
        Aglsa { config }
    }
}

impl Solver for Aglsa {
    fn solve(&self, instance: &Instance) -> SolverResult<Solution> {
        info!(
            "[AGLSA] {} ({} nodes): population {}, pc {}, pm {}, threshold {}, P {}, pi {}, seed {}",
            instance.name,
            instance.size(),
            self.config.population_size,
            self.config.max_crossover_probability,
            self.config.max_mutation_probability,
            self.config.similarity_threshold,
            self.config.acceptance_probability,
            self.config.improvement_probability,
            self.config.seed
        );

        let costs = CostMatrix::from_instance(instance)?;
        let mut search = AglsaSearch::new(&self.config, &costs)?;
        let reason = search.run();

        let mut solution = Solution::from_indices(instance, search.best().genes(), self.name());
        solution.computation_time = search.elapsed();
        solution.iterations = Some(search.iteration());

        if solution.feasible {
            info!(
                "[AGLSA] stopped on {} after {} generations ({:.2}s), best cost {:.4}",
                reason, solution.iterations.unwrap_or(0), solution.computation_time, solution.cost
            );
        } else {
            warn!(
                "[AGLSA] stopped on {} after {} generations without a feasible tour",
                reason,
                search.iteration()
            );
        }

        Ok(solution)
    }

    fn name(&self) -> &str {
        "AGLSA"
    }
}
