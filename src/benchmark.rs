//! Benchmarking and experimentation module.
//!
//! Runs the greedy, random and AGLSA solvers over a set of instances,
//! collects one row per run and aggregates them per algorithm.

use crate::error::SolverResult;
use crate::heuristics::aglsa::{Aglsa, AglsaConfig};
use crate::heuristics::construction::{NearestNeighborHeuristic, RandomTourHeuristic, Solver};
use crate::instance::Instance;
use crate::solution::Solution;

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Run index (0 for deterministic algorithms)
    pub run: usize,
    /// Solution cost, negative when infeasible
    pub cost: f64,
    /// Whether solution is feasible
    pub feasible: bool,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Gap to the best known or best found cost, in percent
    pub gap_to_best: Option<f64>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    /// Number of runs
    pub num_runs: usize,
    /// Number of feasible solutions
    pub num_feasible: usize,
    pub avg_cost: f64,
    pub best_cost: f64,
    pub worst_cost: f64,
    /// Standard deviation of cost
    pub std_cost: f64,
    pub avg_time: f64,
    pub total_time: f64,
    /// Average gap to best
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of runs per stochastic algorithm
    pub num_runs: usize,
    /// Base seed; run `r` uses `seed + r`
    pub seed: u64,
    /// AGLSA settings shared by every run
    pub aglsa: AglsaConfig,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            seed: 42,
            aglsa: AglsaConfig::default(),
            show_progress: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    best_known: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Set best known solution for an instance
    pub fn set_best_known(&mut self, instance_name: &str, cost: f64) {
        self.best_known.insert(instance_name.to_string(), cost);
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("##-"));
        bar
    }

    /// Greedy once, then Random and AGLSA `num_runs` times each
    pub fn run_on_instance(&mut self, instance: &Instance) -> SolverResult<()> {
        let first = self.results.len();
        let bar = self.progress_bar(1 + 2 * self.config.num_runs as u64);
        bar.set_message(instance.name.clone());

        let greedy = NearestNeighborHeuristic::new().solve(instance)?;
        self.record_result(instance, 0, &greedy);
        bar.inc(1);

        for run in 0..self.config.num_runs {
            let seed = self.config.seed.wrapping_add(run as u64);

            let random = RandomTourHeuristic::new(seed).solve(instance)?;
            self.record_result(instance, run, &random);
            bar.inc(1);

            let aglsa = Aglsa::new(AglsaConfig {
                seed,
                ..self.config.aglsa.clone()
            });
            let solution = aglsa.solve(instance)?;
            self.record_result(instance, run, &solution);
            bar.inc(1);
        }

        bar.finish_and_clear();
        self.fill_gaps(&instance.name, first);
        Ok(())
    }

    pub fn run_on_instances(&mut self, instances: &[Instance]) -> SolverResult<()> {
        for instance in instances {
            self.run_on_instance(instance)?;
        }
        Ok(())
    }

    /// Record a result
    fn record_result(&mut self, instance: &Instance, run: usize, solution: &Solution) {
        self.results.push(AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            dimension: instance.size(),
            run,
            cost: solution.cost,
            feasible: solution.feasible,
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_best: None,
        });
    }

    /// Gaps of the rows recorded since `first`, against the best known cost
    /// or else the best feasible cost found among them
    fn fill_gaps(&mut self, instance_name: &str, first: usize) {
        let found = self.results[first..]
            .iter()
            .filter(|r| r.feasible)
            .map(|r| r.cost)
            .fold(f64::INFINITY, f64::min);
        let best = self.best_known.get(instance_name).copied().unwrap_or(found);

        if !best.is_finite() || best <= 0.0 {
            return;
        }
        for result in self.results[first..].iter_mut().filter(|r| r.feasible) {
            result.gap_to_best = Some((result.cost - best) / best * 100.0);
        }
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<String, Vec<&AlgorithmResult>> = HashMap::new();

        for result in &self.results {
            stats_map.entry(result.algorithm.clone()).or_default().push(result);
        }

        let mut statistics = Vec::new();

        for (algo, results) in stats_map {
            let feasible_results: Vec<_> = results.iter().filter(|r| r.feasible).collect();

            if feasible_results.is_empty() {
                continue;
            }

            let costs: Vec<f64> = feasible_results.iter().map(|r| r.cost).collect();
            let times: Vec<f64> = feasible_results.iter().map(|r| r.time).collect();
            let gaps: Vec<f64> = feasible_results.iter().filter_map(|r| r.gap_to_best).collect();

            statistics.push(AlgorithmStatistics {
                algorithm: algo,
                num_runs: results.len(),
                num_feasible: feasible_results.len(),
                avg_cost: costs.iter().mean(),
                best_cost: costs.iter().cloned().fold(f64::INFINITY, f64::min),
                worst_cost: costs.iter().cloned().fold(0.0, f64::max),
                std_cost: costs.iter().population_std_dev(),
                avg_time: times.iter().mean(),
                total_time: times.iter().sum::<f64>(),
                avg_gap: if gaps.is_empty() { None } else { Some(gaps.iter().mean()) },
            });
        }

        statistics.sort_by(|a, b| a.avg_cost.total_cmp(&b.avg_cost));

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> SolverResult<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> SolverResult<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        AGLSA TSP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<12} {:>10} {:>12} {:>12} {:>10} {:>10} {:>10}\n",
            "Algorithm", "Feasible", "Avg Cost", "Best Cost", "Std", "Avg Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in &stats {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<12} {:>10} {:>12.2} {:>12.2} {:>10.2} {:>10} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_feasible, stat.num_runs),
                stat.avg_cost,
                stat.best_cost,
                stat.std_cost,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");

        let mut instance_best: HashMap<&str, &AlgorithmResult> = HashMap::new();
        for result in self.results.iter().filter(|r| r.feasible) {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.cost < entry.cost {
                *entry = result;
            }
        }

        let mut names: Vec<&str> = instance_best.keys().copied().collect();
        names.sort_unstable();
        for name in names {
            let best = instance_best[name];
            report.push_str(&format!("  {}: {:.2} ({})\n", name, best.cost, best.algorithm));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Get best known values
    pub fn best_known(&self) -> &HashMap<String, f64> {
        &self.best_known
    }
}

/// Helper function to load `.tsp` instances from a directory, smallest first
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> SolverResult<Vec<Instance>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "tsp").unwrap_or(false) {
            match Instance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by_key(|i| i.size());

    Ok(instances)
}
