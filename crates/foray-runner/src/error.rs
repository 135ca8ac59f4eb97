//! Error types for the episode runner.
//!
//! Uses `thiserror` for typed errors that surface through the runner
//! pipeline: configuration, template rendering, LLM transport, run logs and
//! the agent contract violations propagated from `foray-agent`.

use foray_agent::{AgentError, ConfigError};

/// Errors that can occur while running episodes.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// A response could not be parsed.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Environment configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The experiment file could not be loaded.
    #[error(transparent)]
    Experiment(#[from] ConfigError),

    /// An action space offered nothing to choose from.
    #[error("the {0} action space is empty")]
    EmptySpace(&'static str),

    /// A contract violation in extraction or translation.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A player task failed to run to completion.
    #[error("player task failed: {0}")]
    Task(String),

    /// Writing a run log failed.
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
