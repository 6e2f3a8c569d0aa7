use clap::Parser;
use dotenv::dotenv;

use execution_core::cli::{Cli, Commands};
use execution_core::commands::{run_core, run_reconcile_once};
use execution_core::config::CoreConfig;
use execution_core::logging::init_tracing;

// All daemons share one thread; store mutations never straddle an await.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the .env file
    dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = match &cli.config {
        Some(path) => CoreConfig::from_file(path)?,
        None => CoreConfig::default(),
    };

    match cli.command {
        Commands::Run {
            seed_prices,
            walk_step,
        } => run_core(config, &seed_prices, walk_step).await?,
        Commands::ReconcileOnce => run_reconcile_once(config).await?,
    }

    Ok(())
}
