//! Rankflow CLI: rank the nodes of a link graph from the command line
//!
//! Links come from a JSON file or from the random generator.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use rankflow::{
    build_transition_matrix, links_to_json, load_links, ConfigOverrides, DistanceMetric,
    EngineState, LinkGenerator, Links, PageRankEngine, PageRankOutcome, RankSnapshot, RankVector,
    RankflowConfig,
};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "rankflow", version, about = "Random-surfer PageRank for directed link graphs")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args)]
struct LinkSource {
    /// JSON file of links: {"1": [2, 3], ...}
    #[arg(long, conflicts_with = "generate")]
    links: Option<PathBuf>,

    /// Generate a random graph with this many nodes instead of reading a file
    #[arg(long)]
    generate: Option<usize>,

    /// Seed for --generate
    #[arg(long, requires = "generate")]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute ranks
    Rank {
        #[command(flatten)]
        source: LinkSource,

        /// YAML configuration file
        #[arg(long, env = "RANKFLOW_CONFIG")]
        config: Option<PathBuf>,

        /// Damping factor in [0, 1]
        #[arg(long)]
        damping: Option<f64>,

        /// Iteration bound
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Convergence threshold between successive rank vectors
        #[arg(long, conflicts_with = "fixed")]
        tolerance: Option<f64>,

        /// Run every iteration without a convergence check
        #[arg(long)]
        fixed: bool,

        /// Distance used for the convergence check (l1 or l2)
        #[arg(long)]
        distance: Option<DistanceMetric>,

        /// Number of parallel shards per iteration
        #[arg(long)]
        shards: Option<usize>,

        /// Only print the highest-ranked K nodes
        #[arg(long)]
        top: Option<usize>,

        /// Print the rank vector after every iteration
        #[arg(long)]
        trace: bool,
    },
    /// Print a random link graph
    Generate {
        /// Number of nodes
        nodes: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Exclusive upper bound on out-degree (default: nodes / 10)
        #[arg(long)]
        max_out_degree: Option<usize>,
    },
    /// Print the damped transition matrix
    Matrix {
        #[command(flatten)]
        source: LinkSource,

        /// Damping factor in [0, 1]
        #[arg(long, default_value_t = 0.85)]
        damping: f64,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Rank {
            source,
            config,
            damping,
            max_iterations,
            tolerance,
            fixed,
            distance,
            shards,
            top,
            trace,
        } => {
            let overrides = ConfigOverrides {
                damping_factor: damping,
                max_iterations,
                tolerance,
                fixed,
                distance,
                shards,
            };
            run_rank(&source, config, overrides, top, trace, &cli.format)
        }
        Commands::Generate {
            nodes,
            seed,
            max_out_degree,
        } => run_generate(nodes, seed, max_out_degree, &cli.format),
        Commands::Matrix { source, damping } => run_matrix(&source, damping, &cli.format),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults < config file < environment < flags
fn resolve_config(path: Option<PathBuf>, overrides: &ConfigOverrides) -> anyhow::Result<RankflowConfig> {
    let config = RankflowConfig::resolve(path.as_deref(), overrides);
    match path {
        Some(path) => config.with_context(|| format!("reading config {}", path.display())),
        None => Ok(config?),
    }
}

fn read_links(source: &LinkSource) -> anyhow::Result<Links> {
    match (&source.links, source.generate) {
        (Some(path), _) => {
            load_links(path).with_context(|| format!("reading links {}", path.display()))
        }
        (None, Some(nodes)) => {
            let mut generator = LinkGenerator::new(nodes);
            if let Some(seed) = source.seed {
                generator = generator.with_seed(seed);
            }
            Ok(generator.generate())
        }
        (None, None) => bail!("either --links FILE or --generate N is required"),
    }
}

fn run_rank(
    source: &LinkSource,
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    top: Option<usize>,
    trace: bool,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let links = read_links(source)?;
    let config = resolve_config(config_path, &overrides)?.to_page_rank_config()?;
    let engine = PageRankEngine::new(&links, config)?;

    let outcome = if trace {
        print_links(&links, format)?;
        run_traced(&engine, format)?
    } else {
        engine.run()?
    };

    print_outcome(&outcome, top, format)
}

/// Walk the iterations one by one, printing every snapshot
fn run_traced(engine: &PageRankEngine, format: &OutputFormat) -> anyhow::Result<PageRankOutcome> {
    let mut steps = engine.iterations();
    let mut last: Option<RankSnapshot> = None;

    for snapshot in steps.by_ref() {
        let snapshot = snapshot?;
        print_snapshot(&snapshot, format)?;
        last = Some(snapshot);
    }

    let state = steps.state();
    Ok(match last {
        Some(snapshot) => PageRankOutcome {
            ranks: snapshot.ranks,
            iterations: snapshot.iteration,
            delta: snapshot.delta,
            state,
        },
        None => PageRankOutcome {
            ranks: engine.initial_ranks().clone(),
            iterations: 0,
            delta: 0.0,
            state,
        },
    })
}

fn print_links(links: &Links, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(links)?),
        OutputFormat::Csv => {
            println!("source,target");
            for (source, targets) in links.iter() {
                for target in targets {
                    println!("{},{}", source, target);
                }
            }
        }
        OutputFormat::Table => print!("{}", links),
    }
    Ok(())
}

fn print_snapshot(snapshot: &RankSnapshot, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "iteration": snapshot.iteration,
                "delta": snapshot.delta,
                "ranks": snapshot.ranks,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
        OutputFormat::Csv => {
            for (id, rank) in snapshot.ranks.iter() {
                println!("{},{},{}", snapshot.iteration, id, rank);
            }
        }
        OutputFormat::Table => {
            println!("\n===== step {} (delta {:.3e}) =====", snapshot.iteration, snapshot.delta);
            let rows: Vec<(u64, f64)> = snapshot.ranks.iter().collect();
            println!("{}", rank_table(&rows));
        }
    }
    Ok(())
}

fn print_outcome(outcome: &PageRankOutcome, top: Option<usize>, format: &OutputFormat) -> anyhow::Result<()> {
    let rows = outcome.top_n(top.unwrap_or(outcome.ranks.len()));
    let state = match outcome.state {
        EngineState::Converged => "converged",
        EngineState::Stopped => "stopped",
        EngineState::Iterating => "iterating",
    };

    match format {
        OutputFormat::Json => {
            let ranks: RankVector = rows.iter().copied().collect();
            let value = serde_json::json!({
                "state": state,
                "iterations": outcome.iterations,
                "delta": outcome.delta,
                "ranks": ranks,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            println!("node,rank");
            for (id, rank) in &rows {
                println!("{},{}", id, rank);
            }
        }
        OutputFormat::Table => {
            println!("{}", rank_table(&rows));
            println!(
                "{} node(s), {} after {} iteration(s), delta {:.3e}",
                outcome.ranks.len(),
                state,
                outcome.iterations,
                outcome.delta
            );
        }
    }
    Ok(())
}

fn rank_table(rows: &[(u64, f64)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["node", "rank"]);
    for (id, rank) in rows {
        table.add_row(vec![id.to_string(), format!("{:.6}", rank)]);
    }
    table
}

fn run_generate(
    nodes: usize,
    seed: Option<u64>,
    max_out_degree: Option<usize>,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let mut generator = LinkGenerator::new(nodes);
    if let Some(max_out_degree) = max_out_degree {
        generator = generator.with_max_out_degree(max_out_degree);
    }
    if let Some(seed) = seed {
        generator = generator.with_seed(seed);
    }
    let links = generator.generate();

    match format {
        OutputFormat::Json => println!("{}", links_to_json(&links)?),
        OutputFormat::Csv => {
            println!("source,target");
            for (source, targets) in links.iter() {
                for target in targets {
                    println!("{},{}", source, target);
                }
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["node", "links"]);
            for (source, targets) in links.iter() {
                table.add_row(vec![source.to_string(), format!("{:?}", targets)]);
            }
            println!("{}", table);
            println!("{} node(s), {} link(s)", links.len(), links.edge_count());
        }
    }
    Ok(())
}

fn run_matrix(source: &LinkSource, damping: f64, format: &OutputFormat) -> anyhow::Result<()> {
    let links = read_links(source)?;
    let matrix = build_transition_matrix(&links, damping)?;
    let ids = matrix.index().node_ids();
    let rows = matrix.as_array().outer_iter();

    match format {
        OutputFormat::Json => {
            let rows: Vec<Vec<f64>> = rows.map(|row| row.to_vec()).collect();
            let value = serde_json::json!({ "nodes": ids, "rows": rows });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            let header: Vec<String> = ids.iter().map(u64::to_string).collect();
            println!("source,{}", header.join(","));
            for (id, row) in ids.iter().zip(rows) {
                let cells: Vec<String> = row.iter().map(f64::to_string).collect();
                println!("{},{}", id, cells.join(","));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            let mut header = vec![String::new()];
            header.extend(ids.iter().map(u64::to_string));
            table.set_header(header);
            for (id, row) in ids.iter().zip(rows) {
                let mut cells = vec![id.to_string()];
                cells.extend(row.iter().map(|p| format!("{:.4}", p)));
                table.add_row(cells);
            }
            println!("{}", table);
        }
    }
    Ok(())
}
