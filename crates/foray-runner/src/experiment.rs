//! Experiment setup: the pieces shared by every episode and the wiring of
//! one episode's players, logs and world.

use std::path::Path;
use std::sync::Arc;

use foray_agent::ExperimentConfig;
use foray_types::EntityId;
use foray_world::{Sandbox, Simulation};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::RunnerConfig;
use crate::episode::{EpisodeReport, EpisodeRunner};
use crate::error::RunnerError;
use crate::llm::{LlmClient, SamplingParams, create_backend, http_client};
use crate::logs::{
    ActionCsv, PromptLog, RunDir, StatusLog, file_safe, write_file, write_task_progress,
};
use crate::player::{Player, PlayerContext, PlayerLogs, assign_roles};
use crate::prompt::{PlayerRole, PromptEngine};
use crate::rules::GameRules;

/// One configured experiment.
pub struct Experiment {
    config: ExperimentConfig,
    runner: RunnerConfig,
    model: String,
    prompts: Arc<PromptEngine>,
    rules: GameRules,
    http: reqwest::Client,
}

impl Experiment {
    /// Load the templates and render the rules for `config`.
    pub fn new(config: ExperimentConfig, runner: RunnerConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        let model = runner
            .backend
            .model
            .clone()
            .unwrap_or_else(|| config.agent.model_name.clone());
        let prompts = PromptEngine::new(&runner.templates_dir)?;
        let rules = prompts.rules(&config.env.game)?;
        let http = http_client(config.llm.request_timeout_ms)?;
        Ok(Self {
            config,
            runner,
            model,
            prompts: Arc::new(prompts),
            rules,
            http,
        })
    }

    /// The resolved configuration.
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Model identifier used for every player.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Write the resolved configuration to `{output_dir}/{name}/config.yaml`.
    pub fn save_config(&self) -> Result<(), RunnerError> {
        let experiment = &self.config.experiment;
        let path = experiment.output_dir.join(&experiment.name).join("config.yaml");
        let mut resolved = self.config.clone();
        resolved.agent.model_name.clone_from(&self.model);
        write_file(&path, &resolved.to_yaml()?)
    }

    /// Play episode `episode` on a fresh sandbox world.
    pub async fn run_episode(&self, episode: u32) -> Result<EpisodeReport, RunnerError> {
        let seed = self.config.experiment.seed.wrapping_add(u64::from(episode));
        let mut world = Sandbox::new(self.config.env.game.clone(), seed);
        self.run_in(&mut world, episode).await
    }

    /// Play episode `episode` in `world`.
    pub async fn run_in<S: Simulation>(
        &self,
        world: &mut S,
        episode: u32,
    ) -> Result<EpisodeReport, RunnerError> {
        let experiment = &self.config.experiment;
        let run = RunDir::new(&experiment.output_dir, &experiment.name, episode);
        let seed = experiment.seed.wrapping_add(u64::from(episode));
        let players = self.players(&world.players(), &run, seed)?;
        info!(
            episode,
            model = %self.model,
            backend = ?self.runner.backend.backend_type,
            run_dir = %run.root().display(),
            "starting episode"
        );

        let mut runner = EpisodeRunner::new(
            self.config.env.game.horizon,
            self.config.llm.max_concurrent_agents,
        )
        .with_status(StatusLog::new(&run, &self.model));
        let report = runner.run(world, players).await?;

        let progress = report.progress(self.config.env.game.horizon);
        write_task_progress(&run, &self.model, &progress)?;
        Ok(report)
    }

    fn players(
        &self,
        ids: &[EntityId],
        run: &RunDir,
        seed: u64,
    ) -> Result<Vec<Player>, RunnerError> {
        let agent = &self.config.agent;
        let mut rng = StdRng::seed_from_u64(seed);
        let roles = assign_roles(&self.config.env, agent.goal.as_deref(), &mut rng);
        let ctx = PlayerContext {
            prompts: Arc::clone(&self.prompts),
            settings: self.config.env.game.clone(),
            agent: agent.clone(),
        };

        let mut players = Vec::with_capacity(ids.len());
        for (id, role) in ids.iter().copied().zip(roles) {
            let player_seed = seed
                .wrapping_mul(1_000_003)
                .wrapping_add(u64::from(id.0.unsigned_abs()));
            let params = SamplingParams {
                model: self.model.clone(),
                temperature: self.config.llm.temperature,
                max_tokens: self.config.llm.max_tokens,
                enable_thinking: agent.enable_llm_thinking,
            };
            let backend = create_backend(&self.runner.backend, &self.http, player_seed);
            let llm = LlmClient::new(backend, params, self.config.llm.max_try_time);

            let dir = run.player_dir(id);
            let logs = player_logs(&dir, &self.model)?;
            let goal = (role == PlayerRole::Task)
                .then_some(agent.goal.as_deref())
                .flatten();
            let rules = self.rules.for_goal(goal, agent.rule_detail);
            players.push(Player::new(
                id,
                role,
                rules,
                llm,
                ctx.clone(),
                StdRng::seed_from_u64(player_seed),
                logs,
            ));
        }
        Ok(players)
    }
}

fn player_logs(dir: &Path, model: &str) -> Result<PlayerLogs, RunnerError> {
    Ok(PlayerLogs {
        prompts: PromptLog::to_file(dir.join(format!("prompt_{}.txt", file_safe(model)))),
        actions: Some(ActionCsv::create(dir.join("ml_action.csv"))?),
    })
}
