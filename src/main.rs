//! AGLSA TSP Solver - Command Line Interface
//!
//! Generates instances, solves them with the greedy, random or AGLSA solvers,
//! benchmarks the solvers and renders tours.

use clap::{Parser, Subcommand, ValueEnum};
use aglsa_tsp::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use aglsa_tsp::error::SolverResult;
use aglsa_tsp::generator::{Generator, Layout, Panel, Perturbation};
use aglsa_tsp::heuristics::{Aglsa, AglsaConfig, NearestNeighborHeuristic, RandomTourHeuristic, Solver};
use aglsa_tsp::instance::{CostFunction, Instance};
use aglsa_tsp::solution::Solution;
use aglsa_tsp::visualization::Visualizer;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "aglsa-tsp")]
#[command(version = "1.0")]
#[command(about = "Adaptive genetic local search for the asymmetric TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random instance
    Generate {
        /// Number of nodes
        #[arg(short, long, default_value = "20")]
        nodes: usize,

        /// Node layout
        #[arg(long, value_enum, default_value = "uniform")]
        layout: LayoutKind,

        /// Super-ellipse exponents
        #[arg(long, default_value = "2.0")]
        ellipse_m: f64,
        #[arg(long, default_value = "2.0")]
        ellipse_n: f64,

        /// Perturbation applied to node positions
        #[arg(long, value_enum, default_value = "normal")]
        perturbation: PerturbationKind,

        /// Half-width of the uniform perturbation
        #[arg(long, default_value = "1.0")]
        magnitude: f64,

        /// Mean and standard deviation of the normal perturbation
        #[arg(long, default_value = "0.0")]
        mean: f64,
        #[arg(long, default_value = "1.0")]
        sigma: f64,

        /// Panel size
        #[arg(long, default_value = "200.0")]
        width: f64,
        #[arg(long, default_value = "100.0")]
        height: f64,

        /// Cost function
        #[arg(long, value_enum, default_value = "euclidean")]
        cost_function: CostKind,

        /// Minkowski exponent (minkowski and unfair)
        #[arg(long, default_value = "2.0")]
        exponent: f64,

        /// Noise of the unfair cost function
        #[arg(long, default_value = "0.0")]
        noise_mean: f64,
        #[arg(long, default_value = "10.0")]
        noise_sigma: f64,

        /// Arcs of the unfair cost function above this cost are removed
        #[arg(long, default_value = "100.0")]
        threshold: f64,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Instance name
        #[arg(long, default_value = "generated")]
        name: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Solve an instance
    Solve {
        /// Instance file (stdin when omitted)
        #[arg(long)]
        instance: Option<PathBuf>,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "aglsa")]
        algorithm: Algorithm,

        /// JSON file with AGLSA settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Maximum crossover probability
        #[arg(short = 'c', long)]
        crossover: Option<f64>,

        /// Maximum mutation probability
        #[arg(short = 'm', long)]
        mutation: Option<f64>,

        /// Similarity threshold (fraction of the tour length)
        #[arg(short = 't', long)]
        threshold: Option<f64>,

        /// Probability of accepting a similar offspring
        #[arg(short = 'p', long)]
        acceptance: Option<f64>,

        /// Probability of improving a promising offspring with 2-opt
        #[arg(short = 'i', long)]
        improvement: Option<f64>,

        /// Time limit in seconds
        #[arg(short = 'T', long)]
        time_limit: Option<f64>,

        /// Maximum number of generations
        #[arg(short = 'M', long)]
        max_iterations: Option<usize>,

        /// Maximum generations without improvement
        #[arg(short = 'K', long)]
        max_stagnation: Option<usize>,

        /// Population size
        #[arg(short = 'S', long)]
        population: Option<usize>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the solution in text format
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the solution as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write an SVG drawing of the tour
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing .tsp instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per stochastic algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// AGLSA time limit per run
        #[arg(short, long, default_value = "5.0")]
        time_limit: f64,

        /// AGLSA population size
        #[arg(long, default_value = "30")]
        population: usize,

        /// Base random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Render a solution of an instance as SVG (and PNG)
    Render {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Path to the solution file
        #[arg(short, long)]
        solution: PathBuf,

        /// Output SVG file
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a PNG next to the SVG
        #[arg(long)]
        png: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Nearest neighbor construction
    Greedy,
    /// Random permutation
    Random,
    /// Adaptive genetic local search
    Aglsa,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum LayoutKind {
    Uniform,
    Line,
    SuperEllipse,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum PerturbationKind {
    None,
    Uniform,
    Normal,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum CostKind {
    Euclidean,
    Manhattan,
    Minkowski,
    /// Minkowski distance plus seeded noise, thresholded
    Unfair,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            nodes,
            layout,
            ellipse_m,
            ellipse_n,
            perturbation,
            magnitude,
            mean,
            sigma,
            width,
            height,
            cost_function,
            exponent,
            noise_mean,
            noise_sigma,
            threshold,
            seed,
            name,
            output,
        } => {
            let layout = match layout {
                LayoutKind::Uniform => Layout::Uniform,
                LayoutKind::Line => Layout::Line,
                LayoutKind::SuperEllipse => Layout::SuperEllipse { m: ellipse_m, n: ellipse_n },
            };
            let perturbation = match perturbation {
                PerturbationKind::None => Perturbation::None,
                PerturbationKind::Uniform => Perturbation::Uniform { magnitude },
                PerturbationKind::Normal => Perturbation::Normal { mean, sigma },
            };
            let cost_function = match cost_function {
                CostKind::Euclidean => CostFunction::Euclidean,
                CostKind::Manhattan => CostFunction::Manhattan,
                CostKind::Minkowski => CostFunction::Minkowski { p: exponent },
                CostKind::Unfair => CostFunction::Unfair {
                    p: exponent,
                    mean: noise_mean,
                    sigma: noise_sigma,
                    threshold,
                },
            };
            generate_instance(
                &name,
                nodes,
                Generator::new(layout, perturbation),
                Panel::new(width, height),
                &cost_function,
                seed,
                output,
            )
        }

        Commands::Solve {
            instance,
            algorithm,
            config,
            crossover,
            mutation,
            threshold,
            acceptance,
            improvement,
            time_limit,
            max_iterations,
            max_stagnation,
            population,
            seed,
            output,
            json,
            svg,
            verbose,
        } => build_config(config).and_then(|mut aglsa| {
            if let Some(v) = crossover {
                aglsa.max_crossover_probability = v;
            }
            if let Some(v) = mutation {
                aglsa.max_mutation_probability = v;
            }
            if let Some(v) = threshold {
                aglsa.similarity_threshold = v;
            }
            if let Some(v) = acceptance {
                aglsa.acceptance_probability = v;
            }
            if let Some(v) = improvement {
                aglsa.improvement_probability = v;
            }
            if let Some(v) = time_limit {
                aglsa.time_limit = v;
            }
            if let Some(v) = max_iterations {
                aglsa.max_iterations = v;
            }
            if let Some(v) = max_stagnation {
                aglsa.max_stagnation = v;
            }
            if let Some(v) = population {
                aglsa.population_size = v;
            }
            if let Some(v) = seed {
                aglsa.seed = v;
            }
            aglsa.validate()?;
            solve_instance(instance, algorithm, aglsa, output, json, svg, verbose)
        }),

        Commands::Benchmark {
            dir,
            output,
            runs,
            time_limit,
            population,
            seed,
            max_size,
        } => run_benchmark(&dir, &output, runs, time_limit, population, seed, max_size),

        Commands::Analyze { instance } => analyze_instance(&instance),

        Commands::Render {
            instance,
            solution,
            output,
            png,
        } => render_solution(&instance, &solution, &output, png),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build_config(path: Option<PathBuf>) -> SolverResult<AglsaConfig> {
    match path {
        Some(path) => AglsaConfig::from_json_file(path),
        None => Ok(AglsaConfig::default()),
    }
}

fn generate_instance(
    name: &str,
    nodes: usize,
    generator: Generator,
    panel: Panel,
    cost_function: &CostFunction,
    seed: u64,
    output: Option<PathBuf>,
) -> SolverResult<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let nodes = generator.generate(&panel, nodes, &mut rng);
    let instance = Instance::new(name, nodes, cost_function)?;

    match output {
        Some(path) => {
            instance.to_file(&path)?;
            eprintln!("Instance with {} nodes saved to {:?}", instance.size(), path);
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            instance.save(&mut handle)?;
            handle.flush()?;
        }
    }
    Ok(())
}

fn load_instance(path: Option<PathBuf>) -> SolverResult<Instance> {
    match path {
        Some(path) => {
            println!("Loading instance from {:?}...", path);
            Instance::from_file(path)
        }
        None => Instance::load(io::stdin().lock(), "stdin"),
    }
}

fn solve_instance(
    path: Option<PathBuf>,
    algorithm: Algorithm,
    config: AglsaConfig,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
    svg: Option<PathBuf>,
    verbose: bool,
) -> SolverResult<()> {
    let instance = load_instance(path)?;

    if verbose {
        println!("{}", instance.statistics());
        if algorithm == Algorithm::Aglsa {
            println!("Configuration: {:?}", config);
        }
    }

    let seed = config.seed;
    let solver: Box<dyn Solver> = match algorithm {
        Algorithm::Greedy => Box::new(NearestNeighborHeuristic::new()),
        Algorithm::Random => Box::new(RandomTourHeuristic::new(seed)),
        Algorithm::Aglsa => Box::new(Aglsa::new(config)),
    };

    println!("Solving with {}...", solver.name());
    let start = Instant::now();
    let solution = solver.solve(&instance)?;
    let elapsed = start.elapsed();

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    if solution.feasible {
        println!("Cost: {:.4}", solution.cost);
    } else {
        println!("Cost: {} (no feasible tour found)", solution.cost);
    }
    println!("Feasible: {}", solution.feasible);
    println!("Time: {:.4}s", elapsed.as_secs_f64());
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\nTour: {:?}", solution.tour);
        print!("{}", solution.arc_report(&instance));
    }

    if let Some(out_path) = output {
        solution.to_file(&instance, &out_path)?;
        println!("\nSolution saved to {:?}", out_path);
    }

    if let Some(json_path) = json {
        std::fs::write(&json_path, serde_json::to_string_pretty(&solution)?)?;
        println!("Solution JSON saved to {:?}", json_path);
    }

    if let Some(svg_path) = svg {
        let viz = Visualizer::new();
        viz.save_svg(&viz.generate_svg(&instance, &solution), &svg_path)?;
        println!("Visualization saved to {:?}", svg_path);
    }

    Ok(())
}

fn run_benchmark(
    dir: &PathBuf,
    output: &PathBuf,
    runs: usize,
    time_limit: f64,
    population: usize,
    seed: u64,
    max_size: Option<usize>,
) -> SolverResult<()> {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir)?;

    if let Some(max) = max_size {
        instances.retain(|i| i.size() <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return Ok(());
    }

    std::fs::create_dir_all(output)?;

    let aglsa = AglsaConfig {
        time_limit,
        population_size: population,
        ..Default::default()
    };
    aglsa.validate()?;

    let config = BenchmarkConfig {
        num_runs: runs,
        seed,
        aglsa,
        ..Default::default()
    };

    let mut benchmark = Benchmark::new(config);

    for (i, instance) in instances.iter().enumerate() {
        println!("\n[{}/{}] Processing {} (n={})...", i + 1, instances.len(), instance.name, instance.size());
        benchmark.run_on_instance(instance)?;
    }

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(path: &PathBuf) -> SolverResult<()> {
    let instance = Instance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let greedy = NearestNeighborHeuristic::new().solve(&instance)?;
    let random = RandomTourHeuristic::default().solve(&instance)?;

    println!("Quick Solution Estimates:");
    for solution in [&greedy, &random] {
        if solution.feasible {
            println!("  {}: {:.2}", solution.algorithm, solution.cost);
        } else {
            println!("  {}: infeasible", solution.algorithm);
        }
    }

    Ok(())
}

fn render_solution(instance_path: &PathBuf, solution_path: &PathBuf, output: &PathBuf, png: bool) -> SolverResult<()> {
    let instance = Instance::from_file(instance_path)?;
    let mut solution = Solution::from_file(solution_path)?;
    solution.validate(&instance);

    let viz = Visualizer::new();
    let svg = viz.generate_svg(&instance, &solution);
    viz.save_svg(&svg, output)?;
    println!("SVG saved to {:?}", output);

    if png {
        let png_path = output.with_extension("png");
        viz.save_png(&svg, &png_path)?;
        println!("PNG saved to {:?}", png_path);
    }

    Ok(())
}
