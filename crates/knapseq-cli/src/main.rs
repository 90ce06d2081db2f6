use clap::{Parser, Subcommand};
use knapseq_io::ExplicitStyle;
use knapseq_solver::{AmbiguityPolicy, Direction, ItemSequence, Sequence, SequenceStatus, Solver};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "knapseq")]
#[command(about = "Exact terms of infinite 0/1 knapsack sequences", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute sequence terms from a cost-sorted item list
    Solve {
        /// Item list with `name,weight,cost,value` rows
        items: PathBuf,
        /// Where to write the shorthand rows
        #[arg(short, long)]
        output: PathBuf,
        /// Minimize value instead of maximizing it (items sorted by ascending cost)
        #[arg(long)]
        minimize: bool,
        /// Keep every subtract-table entry
        #[arg(long)]
        no_prune: bool,
        /// Adopt the exact search's subset instead of halting on an ambiguity
        #[arg(long)]
        resolve_ambiguity: bool,
        /// Items between progress reports and output checkpoints, 0 for none
        #[arg(long, default_value_t = 1000)]
        progress: usize,
        /// Summary format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Expand shorthand rows into explicit integer terms
    Explicit {
        /// Shorthand rows written by `solve`
        shorthand: PathBuf,
        /// Where to write the terms
        #[arg(short, long)]
        output: PathBuf,
        /// Last capacity to expand
        #[arg(short, long)]
        limit: Option<usize>,
        /// Write `n value` lines for an OEIS b-file
        #[arg(long)]
        b_file: bool,
    },
    /// Validate an item list
    Check {
        /// Item list with `name,weight,cost,value` rows
        items: PathBuf,
        /// The list is sorted for minimization
        #[arg(long)]
        minimize: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("KNAPSEQ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

fn direction(minimize: bool) -> Direction {
    if minimize {
        Direction::Minimize
    } else {
        Direction::Maximize
    }
}

fn load_items(path: &Path, direction: Direction) -> ItemSequence {
    match knapseq_io::read_items(path, direction) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("Error reading items: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(items: &ItemSequence, sequence: &Sequence) {
    println!("Items: {}", items.len());
    println!("Terms: {}", sequence.len());
    if let Some(capacity) = sequence.max_capacity() {
        println!("Last capacity: {}", capacity);
    }
    match &sequence.status {
        SequenceStatus::Exhausted => println!("Status: EXHAUSTED"),
        SequenceStatus::Overflow(report) => {
            println!("Status: OVERFLOW");
            println!(
                "  capacity {} needs more items of weight {}",
                report.capacity, report.weight
            );
        }
        SequenceStatus::Ambiguous(report) => {
            println!("Status: AMBIGUOUS");
            println!(
                "  item {} at step {}: weight {} reaches {} instead of {}",
                report.suspect,
                report.position,
                report.weight,
                report.search_value,
                report.recurrence_value
            );
            println!("  rerun with --resolve-ambiguity to continue past it");
        }
        SequenceStatus::MarkersExhausted(report) => {
            println!("Status: MARKERS EXHAUSTED");
            println!(
                "  no heavier item after item {}; pruned terms end at capacity {}",
                report.position, report.capacity
            );
            println!("  rerun with --no-prune or a longer item list to continue");
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            items,
            output,
            minimize,
            no_prune,
            resolve_ambiguity,
            progress,
            format,
        } => {
            let items = load_items(&items, direction(minimize));

            let policy = if resolve_ambiguity {
                AmbiguityPolicy::Resolve
            } else {
                AmbiguityPolicy::Halt
            };
            let solver = Solver::new()
                .with_pruning(!no_prune)
                .with_ambiguity_policy(policy)
                .with_progress_interval(progress);

            // checkpoints rewrite the whole output file
            let sequence = solver.solve_with(&items, |rows| {
                if let Err(e) = knapseq_io::save_shorthand(&output, rows, &items) {
                    tracing::warn!("checkpoint failed: {}", e);
                }
            });

            if let Err(e) = knapseq_io::save_shorthand(&output, &sequence.rows, &items) {
                eprintln!("Error writing output: {}", e);
                std::process::exit(1);
            }

            if format == "json" {
                let summary = serde_json::json!({
                    "items": items.len(),
                    "terms": sequence.len(),
                    "last_capacity": sequence.max_capacity(),
                    "status": sequence.status,
                    "output": output.display().to_string(),
                });
                match serde_json::to_string_pretty(&summary) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error encoding summary: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                print_summary(&items, &sequence);
                println!("Output: {}", output.display());
            }
        }
        Commands::Explicit {
            shorthand,
            output,
            limit,
            b_file,
        } => {
            let rows = match knapseq_io::load_shorthand(&shorthand) {
                Ok(rows) => rows,
                Err(e) => {
                    eprintln!("Error reading shorthand: {}", e);
                    std::process::exit(1);
                }
            };

            let values = match knapseq_io::to_explicit(&rows, limit) {
                Ok(values) => values,
                Err(e) => {
                    eprintln!("Reconstruction error: {}", e);
                    std::process::exit(1);
                }
            };

            let style = if b_file {
                ExplicitStyle::BFile
            } else {
                ExplicitStyle::Csv
            };
            if let Err(e) = knapseq_io::save_explicit(&output, &values, style) {
                eprintln!("Error writing output: {}", e);
                std::process::exit(1);
            }
            println!("Wrote {} terms to {}", values.len(), output.display());
        }
        Commands::Check { items, minimize } => {
            let items = load_items(&items, direction(minimize));

            let total_weight = items.weight_before(items.len());
            let max_weight = items.iter().map(|item| item.weight).max().unwrap_or(0);
            println!("OK: {} items, {:?}", items.len(), items.direction());
            println!("Total weight: {}", total_weight);
            println!("Largest weight: {}", max_weight);
            if let (Some(first), Some(last)) = (items.get(0), items.get(items.len() - 1)) {
                println!("Cost range: {} .. {}", first.cost, last.cost);
            }
        }
    }
}
