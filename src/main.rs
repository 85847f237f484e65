//! Rescue Swarm CLI - Evolve a robot search team for a 3D map.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use rescue_swarm::{
    compute::{
        EvaluatorPool, RunReport, SearchContext, Team, analyze_team, compare_with_planner,
        evolution::{EvolutionEngine, PathRng},
    },
    schema::{Grid, Path, RescueConfig},
};

const DEFAULT_CONFIG: &str = "config.txt";

/// Parsed command line.
#[derive(Debug, Default)]
struct CliArgs {
    map_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    export_file: Option<PathBuf>,
    seed: Option<u64>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("rescue-swarm");

    if args.iter().skip(1).any(|a| a == "--example") {
        print_example_config();
        return;
    }
    if args.iter().skip(1).any(|a| a == "--help" || a == "-h") {
        print_usage(program);
        return;
    }

    let cli = parse_args(&args[1..]).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage(program);
        process::exit(1);
    });

    // Load configuration
    let config_path = cli
        .config_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = RescueConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        process::exit(1);
    });
    if let Some(map) = cli.map_file {
        config.grid_file = map;
    }
    if let Some(seed) = cli.seed {
        config.random_seed = Some(seed);
    }
    let seed = config.random_seed.unwrap_or_else(rand::random);
    log::info!("random seed {}", seed);

    // Load map
    let grid = Grid::load(&config.grid_file).unwrap_or_else(|e| {
        eprintln!("Error loading map '{}': {}", config.grid_file.display(), e);
        process::exit(1);
    });
    let (sx, sy, sz) = grid.dims();

    println!("Rescue Swarm");
    println!("============");
    println!("Map: {} ({}x{}x{})", config.grid_file.display(), sx, sy, sz);
    println!("Survivors on map: {}", grid.survivor_count());
    println!("Robots: {}", config.num_robots);
    println!(
        "Population: {}, generations: {}",
        config.evolution.population_size, config.evolution.generations
    );
    println!("Seed: {}", seed);
    println!();

    let ctx = Arc::new(SearchContext::new(grid, config.weights));
    let mut pool = EvaluatorPool::new(Arc::clone(&ctx), config.num_robots).unwrap_or_else(|e| {
        eprintln!("Error starting evaluator pool: {}", e);
        process::exit(1);
    });

    // Evolve
    println!("Running genetic algorithm...");
    let start = Instant::now();
    let total = config.evolution.generations;
    let result = {
        let mut engine =
            EvolutionEngine::new(config.evolution.clone(), &ctx, &pool, PathRng::new(seed))
                .unwrap_or_else(|e| {
                    eprintln!("Error setting up search: {}", e);
                    process::exit(1);
                });

        engine.run_with_callback(|progress| {
            // Print progress every 10%
            if progress.generation > 0 && progress.generation % (total / 10).max(1) == 0 {
                println!(
                    "  Generation {}/{}: best={:.2}, avg={:.2}, {:.1} gen/s",
                    progress.generation,
                    progress.total_generations,
                    progress.best_fitness,
                    progress.avg_fitness,
                    progress.generation as f64 / start.elapsed().as_secs_f64()
                );
            }
        })
    };
    println!();
    println!(
        "Genetic algorithm completed {} generations ({} evaluations, {} rejected) in {:.2}s.",
        result.stats.generations,
        result.stats.total_evaluations,
        result.stats.rejected_evaluations,
        result.stats.elapsed_seconds
    );
    println!();

    // Team report
    let team = Team::assemble(&result.best_per_slot);
    println!("Final Rescue Team Report");
    println!("------------------------");
    for (i, path) in team.paths().iter().enumerate() {
        println!(
            "Robot {} | Fitness: {:.2} | Length: {} | Start: {}",
            i,
            path.fitness,
            path.len(),
            path.start
        );
        println!("  Path: {}", format_route(path));
    }

    let grid = ctx.grid();
    let analysis = analyze_team(grid, &team, ctx.weights());
    let collisions = analysis.collisions;
    println!();
    println!("Collision Report");
    println!("----------------");
    println!(
        "Temporal collisions (same time, same cell): {}",
        collisions.total_temporal_collisions
    );
    println!(
        "Spatial conflicts (shared cells): {} (in {} distinct cells)",
        collisions.total_spatial_collisions, collisions.conflicted_cells_count
    );
    println!();
    println!(
        "Team fitness (with collision penalty): {:.2}",
        analysis.fitness
    );
    if collisions.is_clear() {
        println!("No collisions detected. Safe multi-robot deployment.");
    } else {
        println!("Collisions detected. Consider re-running with different parameters.");
    }
    log::info!(
        "team fitness {:.2}, {} temporal and {} spatial collisions",
        analysis.fitness,
        collisions.total_temporal_collisions,
        collisions.total_spatial_collisions
    );

    // Baseline comparison
    let comparisons = compare_with_planner(grid, &team, ctx.weights());
    println!();
    println!("A* vs Genetic Algorithm (per robot)");
    println!("-----------------------------------");
    for cmp in &comparisons {
        println!("Robot {} [Start: {}]", cmp.slot, cmp.start);
        println!(
            "  Genetic : Length = {:3} | Fitness = {:.2}",
            cmp.ga_length, cmp.ga_fitness
        );
        println!(
            "  A*      : Length = {:3} | Fitness = {:.2}",
            cmp.astar_length, cmp.astar_fitness
        );
        match cmp.ratio {
            Some(ratio) => println!("  -> GA achieved {:.1}% of A* fitness", ratio),
            None => println!("  -> A* failed to find a valid path"),
        }
    }

    println!();
    println!(
        "Explored cells: {}/{}",
        ctx.explored().known_count(),
        grid.volume()
    );

    if let Some(export) = &cli.export_file {
        let report = RunReport::new(grid, &team, &analysis, comparisons, result.stats.clone());
        match report.write_json(export) {
            Ok(()) => println!("Report written to {}", export.display()),
            Err(e) => {
                eprintln!("Error writing report '{}': {}", export.display(), e);
                pool.shutdown();
                process::exit(1);
            }
        }
    }

    pool.shutdown();
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--config" => cli.config_file = Some(PathBuf::from(value("--config")?)),
            "--export" => cli.export_file = Some(PathBuf::from(value("--export")?)),
            "--seed" => {
                let raw = value("--seed")?;
                let seed = raw
                    .parse()
                    .map_err(|_| format!("invalid seed '{}'", raw))?;
                cli.seed = Some(seed);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            map if cli.map_file.is_none() => cli.map_file = Some(PathBuf::from(map)),
            extra => return Err(format!("unexpected argument '{}'", extra)),
        }
    }

    Ok(cli)
}

fn format_route(path: &Path) -> String {
    path.positions()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} [map-file] [--config <file>] [--export <file>] [--seed <n>]",
        program
    );
    eprintln!();
    eprintln!("Evolve a multi-robot rescue team for a 3D map.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  map-file         Map to search (default: grid_file from the config, map3d.txt)");
    eprintln!(
        "  --config <file>  KEY=VALUE or .json configuration (default: {})",
        DEFAULT_CONFIG
    );
    eprintln!("  --export <file>  Write the run report as JSON");
    eprintln!("  --seed <n>       Random seed for a reproducible run");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn print_example_config() {
    let config = RescueConfig::default();
    let json = serde_json::to_string_pretty(&config).unwrap_or_else(|e| {
        eprintln!("Error serializing config: {}", e);
        process::exit(1);
    });

    println!("Example configuration (config.json):");
    println!("{}", json);
}
