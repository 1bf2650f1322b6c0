#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ml_block_dodge::ai::{
    Agent, LearningAgent, MonteCarloAgent, QLearningAgent, TemporalDifferenceAgent,
};
use ml_block_dodge::checkpoint::CheckpointManager;
use ml_block_dodge::config::AppConfig;
use ml_block_dodge::training::{evaluate, Trainer};

/// Train a block-dodging agent.
#[derive(Parser)]
#[command(name = "train", about = "Train a block-dodging RL agent")]
struct Cli {
    /// Agent to train: q, td or mc
    #[arg(long, default_value = "q")]
    agent: String,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Seed for the engine and the agent
    #[arg(long)]
    seed: Option<u64>,

    /// Greedy evaluation episodes to play after training
    #[arg(long, default_value_t = 20)]
    eval_episodes: usize,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    match cli.agent.as_str() {
        "q" | "td" | "mc" => {}
        other => bail!("unknown agent '{}' (expected 'q', 'td', or 'mc')", other),
    }

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        app_config.learner.learning_rate = lr;
    }
    if let Some(seed) = cli.seed {
        app_config.engine.seed = Some(seed);
        app_config.learner.seed = Some(seed);
        app_config.training.seed = Some(seed);
    }
    app_config.validate().context("validating configuration")?;

    // Keep each agent's checkpoints apart.
    app_config.training.checkpoint_dir = app_config.training.checkpoint_dir.join(&cli.agent);

    let mut agent = build_agent(&cli.agent, &app_config);
    if cli.resume {
        resume_agent(agent.as_mut(), &app_config)?;
    }

    let trainer = Trainer::new(
        app_config.training.clone(),
        app_config.engine.clone(),
        app_config.checkpoint.clone(),
    )
    .context("creating trainer")?;
    let report = trainer.train(agent.as_mut()).context("training")?;

    if cli.eval_episodes > 0 {
        let mean = evaluate(
            agent.as_mut(),
            &app_config.engine,
            cli.eval_episodes,
            app_config.training.max_ticks_per_episode,
        );
        tracing::info!(
            agent = agent.name(),
            episodes = cli.eval_episodes,
            mean_score = mean,
            "greedy evaluation"
        );
    }

    if let Some(path) = report.last_checkpoint {
        tracing::info!(path = %path.display(), "last checkpoint");
    }
    Ok(())
}

fn build_agent(kind: &str, config: &AppConfig) -> Box<dyn LearningAgent> {
    let learner = config.learner.clone();
    let (rows, cols) = (config.engine.rows, config.engine.cols);
    match kind {
        "td" => Box::new(TemporalDifferenceAgent::new(
            learner,
            config.temporal_difference.clone(),
            rows,
            cols,
        )),
        "mc" => Box::new(MonteCarloAgent::new(
            learner,
            config.monte_carlo.clone(),
            rows,
            cols,
        )),
        _ => Box::new(QLearningAgent::new(learner, config.q_learning.clone())),
    }
}

/// Resume an agent from the latest checkpoint, starting fresh when none exists.
fn resume_agent(agent: &mut dyn LearningAgent, config: &AppConfig) -> Result<()> {
    let manager = CheckpointManager::new(
        config.training.checkpoint_dir.clone(),
        config.checkpoint.clone(),
    )
    .context("opening checkpoint directory")?;
    match manager.load_agent_latest() {
        Ok(data) => {
            data.restore(agent).context("restoring checkpoint")?;
            tracing::info!(episode = data.metadata.episode, "resumed training");
        }
        Err(e) => {
            tracing::warn!(error = %e, "no checkpoint found, starting fresh");
        }
    }
    Ok(())
}
