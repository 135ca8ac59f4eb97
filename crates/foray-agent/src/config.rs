//! Experiment configuration loaded from YAML.
//!
//! The file has four sections: `experiment` (naming, episode count, output
//! directory, seed), `env` (the game rules plus the role mix of the
//! players), `agent` (decision-loop behaviour) and `llm` (request
//! parameters). Credentials and endpoints are not part of this file; the
//! runner reads them from the environment.

use std::path::{Path, PathBuf};

use foray_types::GameSettings;
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or emit YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// The values parsed but contradict each other.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level experiment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Run naming and repetition.
    #[serde(default)]
    pub experiment: ExperimentSection,

    /// Game rules and player roles.
    #[serde(default)]
    pub env: EnvConfig,

    /// Decision-loop behaviour.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Model request parameters.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl ExperimentConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to YAML, for the copy stored with each run.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let game = &self.env.game;
        if self.agent.goal.is_none() {
            let roles = self
                .env
                .individual_num
                .saturating_add(self.env.competitive_num)
                .saturating_add(self.env.cooperative_num);
            if roles != game.player_num {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "role counts add up to {roles} but player_num is {}",
                        game.player_num
                    ),
                });
            }
        }
        if game.map_size < 3 {
            return Err(ConfigError::Invalid {
                reason: format!("map_size {} is too small to partition", game.map_size),
            });
        }
        if self.llm.max_concurrent_agents == 0 {
            return Err(ConfigError::Invalid {
                reason: "max_concurrent_agents must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Run naming and repetition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSection {
    /// Experiment name, used as the run directory name.
    #[serde(default = "default_experiment_name")]
    pub name: String,

    /// Number of episodes to play.
    #[serde(default = "default_episode_num")]
    pub episode_num: u32,

    /// Root directory for run output.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base seed; episode `n` uses `seed + n`.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ExperimentSection {
    fn default() -> Self {
        Self {
            name: default_experiment_name(),
            episode_num: default_episode_num(),
            output_dir: default_output_dir(),
            seed: default_seed(),
        }
    }
}

/// Game rules plus the role mix of the players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Map, population, hazard and system parameters.
    #[serde(flatten)]
    pub game: GameSettings,

    /// Players that pursue only their own survival.
    #[serde(default = "default_individual_num")]
    pub individual_num: u32,

    /// Players that try to outlast everyone else.
    #[serde(default)]
    pub competitive_num: u32,

    /// Players that try to keep the group alive.
    #[serde(default)]
    pub cooperative_num: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            game: GameSettings::default(),
            individual_num: default_individual_num(),
            competitive_num: 0,
            cooperative_num: 0,
        }
    }
}

/// Decision-loop behaviour.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier sent with each request.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Ask reasoning models to think before answering.
    #[serde(default)]
    pub enable_llm_thinking: bool,

    /// Append recent interaction memory to the state description.
    #[serde(default)]
    pub use_interaction_memory: bool,

    /// Let players decide give actions.
    #[serde(default)]
    pub allow_give_action: bool,

    /// Show the last decisions in each prompt.
    #[serde(default)]
    pub add_action_history: bool,

    /// Verification rounds per decision.
    #[serde(default = "default_max_verify_time")]
    pub max_verify_time: u32,

    /// Ticks a move/attack plan may run before a fresh decision is forced.
    #[serde(default = "default_max_execute_step")]
    pub max_execute_step: u32,

    /// Ring depth searched around an area midpoint when it is blocked.
    #[serde(default = "default_path_find_depth")]
    pub path_find_depth: u32,

    /// Memory entries shown in the prompt.
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Long-term goal; every player gets the `task` role when set.
    #[serde(default)]
    pub goal: Option<String>,

    /// How much rule text goes into each prompt.
    #[serde(default)]
    pub rule_detail: RuleDetail,
}

/// Amount of game-rule text in the prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDetail {
    /// Section overviews only.
    #[default]
    Overview,
    /// Overviews followed by every detail sentence.
    Complete,
    /// Overviews followed by the detail sentences that mention something
    /// named in the goal.
    Goal,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            enable_llm_thinking: false,
            use_interaction_memory: false,
            allow_give_action: false,
            add_action_history: false,
            max_verify_time: default_max_verify_time(),
            max_execute_step: default_max_execute_step(),
            path_find_depth: default_path_find_depth(),
            memory_window: default_memory_window(),
            goal: None,
            rule_detail: RuleDetail::Overview,
        }
    }
}

/// Model request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Retries after the first attempt when the output is malformed.
    #[serde(default = "default_max_try_time")]
    pub max_try_time: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Players deciding at the same time.
    #[serde(default = "default_max_concurrent_agents")]
    pub max_concurrent_agents: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_try_time: default_max_try_time(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrent_agents: default_max_concurrent_agents(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_experiment_name() -> String {
    "survive".to_owned()
}

const fn default_episode_num() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("runs")
}

const fn default_seed() -> u64 {
    42
}

const fn default_individual_num() -> u32 {
    8
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_max_verify_time() -> u32 {
    5
}

const fn default_max_execute_step() -> u32 {
    10
}

const fn default_path_find_depth() -> u32 {
    2
}

const fn default_memory_window() -> usize {
    10
}

const fn default_max_try_time() -> u32 {
    3
}

const fn default_temperature() -> f64 {
    0.1
}

const fn default_max_tokens() -> u32 {
    1024
}

const fn default_request_timeout_ms() -> u64 {
    60_000
}

const fn default_max_concurrent_agents() -> usize {
    8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_verify_time, 5);
        assert_eq!(config.agent.max_execute_step, 10);
        assert_eq!(config.llm.max_try_time, 3);
        assert_eq!(config.env.game.inventory_capacity, 12);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
experiment:
  name: fog-test
  episode_num: 3
  output_dir: /tmp/foray
  seed: 7

env:
  map_size: 32
  map_border: 8
  player_num: 4
  individual_num: 2
  competitive_num: 1
  cooperative_num: 1
  fog_onset: 50
  fog_speed: 0.25
  item_enabled: false

agent:
  model_name: qwen3-8b
  enable_llm_thinking: true
  allow_give_action: true
  max_verify_time: 2
  path_find_depth: 3
  rule_detail: goal

llm:
  max_try_time: 1
  temperature: 0.5
  max_concurrent_agents: 2
";
        let config = ExperimentConfig::parse(yaml).unwrap();
        assert_eq!(config.experiment.name, "fog-test");
        assert_eq!(config.experiment.episode_num, 3);
        assert_eq!(config.experiment.output_dir, PathBuf::from("/tmp/foray"));
        assert_eq!(config.env.game.map_size, 32);
        assert_eq!(config.env.game.fog_onset, Some(50));
        assert!(!config.env.game.item_enabled);
        assert!(config.env.game.combat_enabled);
        assert_eq!(config.env.competitive_num, 1);
        assert_eq!(config.agent.model_name, "qwen3-8b");
        assert!(config.agent.allow_give_action);
        assert_eq!(config.agent.rule_detail, RuleDetail::Goal);
        assert_eq!(config.agent.max_execute_step, 10);
        assert_eq!(config.llm.max_concurrent_agents, 2);
    }

    #[test]
    fn role_counts_must_match_players() {
        let yaml = "env:\n  player_num: 4\n  individual_num: 3\n";
        let result = ExperimentConfig::parse(yaml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let with_goal =
            "env:\n  player_num: 4\n  individual_num: 3\nagent:\n  goal: Reach level 3\n";
        assert!(ExperimentConfig::parse(with_goal).is_ok());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = ExperimentConfig::parse("experiment: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn yaml_round_trip_preserves_values() {
        let mut config = ExperimentConfig::default();
        config.agent.goal = Some("Harvest 5 Ore".to_owned());
        config.env.game.fog_onset = Some(100);
        let yaml = config.to_yaml().unwrap();
        let back = ExperimentConfig::parse(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ExperimentConfig::from_file(Path::new("/nonexistent/foray.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
