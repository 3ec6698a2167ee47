use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mealplanner::candidates::format_pipeline_status;
use mealplanner::workspace::{
    config_file_path, ensure_workspace_structure, load_or_default, save,
};
use mealplanner::{Pipeline, PlannerContext};

/// Prepares a meal planner workspace and records generation defaults in config.toml.
#[derive(Debug, Parser)]
#[command(name = "mealplanner-setup", version)]
struct Args {
    /// Days of history the history generator scans.
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Combinations emitted per exhaustive generation batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Print the pipeline status line after setup.
    #[arg(long)]
    status: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    ensure_workspace_structure()?;
    let config_path = config_file_path()?;
    let mut config = load_or_default()?;
    let mut changed = !config_path.exists();

    if let Some(days) = args.lookback_days {
        if config.generation.lookback_days != days {
            config.generation.lookback_days = days;
            changed = true;
        }
    }
    if let Some(size) = args.batch_size {
        if size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        if config.generation.exhaustive_batch_size != size {
            config.generation.exhaustive_batch_size = size;
            changed = true;
        }
    }

    if changed {
        save(&config)?;
        println!("Planner settings recorded at {}", config_path.display());
    } else {
        println!("Planner settings already configured.");
    }

    if args.status {
        let ctx = PlannerContext::open()?;
        let status = Pipeline::new(&ctx).status()?;
        println!("{}", format_pipeline_status(&status));
    }
    Ok(())
}
