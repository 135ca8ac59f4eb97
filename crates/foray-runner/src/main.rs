//! Command-line entry point: run every episode of one experiment.
//!
//! The experiment file is read from `FORAY_CONFIG` and the LLM provider
//! from `LLM_BACKEND`, `LLM_API_URL`, `LLM_API_KEY` and `LLM_MODEL`; see
//! [`RunnerConfig::from_env`].

use anyhow::Context;
use foray_agent::ExperimentConfig;
use foray_runner::{Experiment, RunnerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Initializes logging, loads the environment and experiment configuration,
/// then plays each episode in turn. A failed episode is logged and the next
/// one still runs.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("foray-runner starting");

    let runner = RunnerConfig::from_env().context("failed to read environment configuration")?;
    let config = ExperimentConfig::from_file(&runner.experiment_path).with_context(|| {
        format!("failed to load experiment from {}", runner.experiment_path.display())
    })?;
    info!(
        experiment = %config.experiment.name,
        episodes = config.experiment.episode_num,
        players = config.env.game.player_num,
        horizon = config.env.game.horizon,
        backend = ?runner.backend.backend_type,
        templates_dir = %runner.templates_dir,
        "configuration loaded"
    );

    let episodes = config.experiment.episode_num;
    let experiment = Experiment::new(config, runner).context("failed to set up the experiment")?;
    experiment
        .save_config()
        .context("failed to write the resolved configuration")?;

    for episode in 0..episodes {
        match experiment.run_episode(episode).await {
            Ok(report) => info!(
                episode,
                ticks = report.ticks,
                status = ?report.status,
                survivors = report.alive.len(),
                total_tokens = report.usage.total_tokens,
                "episode complete"
            ),
            Err(e) => error!(episode, error = %e, "episode aborted"),
        }
    }

    info!(model = experiment.model(), "foray-runner finished");
    Ok(())
}
