use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use optbridge::config::time_limit_from_secs;
use optbridge::telemetry::init_tracing;
use optbridge::{read_mps_file, SolveController, SolveOptions, SolverBackend};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Solve an MPS model with an optbridge backend"
)]
struct Cli {
    /// Path to the MPS file
    file: PathBuf,

    /// Backend: auto, bnb, highs or cbc
    #[arg(long, default_value = "auto")]
    backend: SolverBackend,

    /// Time budget in seconds (unlimited when omitted)
    #[arg(long)]
    time_limit: Option<f64>,

    /// Stop the search after this many nodes
    #[arg(long)]
    node_limit: Option<u64>,

    /// Feasibility and integrality tolerance
    #[arg(long, default_value_t = optbridge::domain::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Print the model before solving
    #[arg(long)]
    print_model: bool,

    /// Print the branch-and-bound decision tree
    #[arg(long)]
    print_tree: bool,

    /// Ask the backend for its own log output
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    init_tracing("warn");
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let model = read_mps_file(&cli.file)?;
    if cli.print_model {
        println!("{model}");
    }

    let mut options = SolveOptions::new()
        .with_backend(cli.backend)
        .with_tolerance(cli.tolerance)
        .verbose(cli.verbose);
    if let Some(secs) = cli.time_limit {
        options = options.with_time_limit(time_limit_from_secs(secs, "--time-limit")?);
    }
    if let Some(nodes) = cli.node_limit {
        options = options.with_node_limit(nodes);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(component = "cli", "interrupted, stopping the solver");
            on_interrupt.cancel();
        }
    });

    let budget = options.budget();
    let mut controller = SolveController::from_options(options)?;
    let result = controller.run(&model, budget, Some(cancel)).await?;

    if cli.print_tree {
        match result.search_tree() {
            Some(tree) => println!("Decision tree\n{}", tree.report(&model)),
            None => println!("Decision tree: not recorded by {}", result.backend()),
        }
    }
    println!("{result}");
    if !result.has_assignment() {
        println!("No solution found");
    }
    Ok(())
}
