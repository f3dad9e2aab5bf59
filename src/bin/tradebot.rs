use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tradefsm::checkpoint::{FileStore, MemoryStore};
use tradefsm::config::BotConfig;
use tradefsm::trading::{
    build_trade_bot, ExitPlan, PositionState, SimulatedDesk, TradeContext, TradeStore,
};

/// Run a single simulated trade bot until its position is closed.
#[derive(Parser, Debug)]
#[command(name = "tradebot", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "tradebot.toml")]
    config: PathBuf,

    /// Override the configured agent id
    #[arg(long)]
    agent_id: Option<String>,

    /// Override the simulated work delay, in milliseconds
    #[arg(long)]
    work_delay_ms: Option<u64>,

    /// Resume from the latest checkpoint in the checkpoint directory
    #[arg(long)]
    resume: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = BotConfig::load_from(&cli.config)?;
    if let Some(agent_id) = cli.agent_id {
        config.agent_id = agent_id;
    }
    if let Some(delay) = cli.work_delay_ms {
        config.simulation.work_delay_ms = delay;
    }
    config.validate()?;

    let exits = if config.simulation.exits.is_empty() {
        ExitPlan::Random
    } else {
        ExitPlan::scripted(config.simulation.exits.iter().copied())
    };
    let desk = Arc::new(SimulatedDesk::new(
        Duration::from_millis(config.simulation.work_delay_ms),
        exits,
    ));

    let store: TradeStore = match &config.checkpoint_dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    };

    let mut bot = build_trade_bot(&config, desk, Arc::clone(&store))?;

    if cli.resume {
        let latest: Option<tradefsm::checkpoint::Checkpoint<PositionState, TradeContext>> =
            store.load_latest(&config.agent_id)?;
        match latest {
            Some(checkpoint) => bot
                .resume(checkpoint)
                .context("resuming from checkpoint")?,
            None => tracing::warn!(agent_id = %config.agent_id, "no checkpoint to resume from"),
        }
    }

    let report = bot.run().context("trade bot run failed")?;
    tracing::info!(
        agent_id = %config.agent_id,
        state = ?report.final_state,
        iterations = report.iterations,
        commits = report.commits,
        rollbacks = report.rollbacks,
        "trade bot finished"
    );
    Ok(())
}
