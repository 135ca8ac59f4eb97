//! Environment configuration for the runner.
//!
//! The experiment itself (game rules, roles, decision-loop knobs) lives in
//! the YAML file read by [`foray_agent::ExperimentConfig`]. Everything that
//! differs between machines rather than between experiments is read from
//! environment variables here: which provider to call, where, with which
//! key, and where the templates and experiment file are.

use std::path::PathBuf;

use crate::error::RunnerError;

/// Runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Provider settings.
    pub backend: LlmBackendConfig,
    /// Path to the templates directory.
    pub templates_dir: String,
    /// Path to the experiment YAML file.
    pub experiment_path: PathBuf,
}

/// Configuration for the LLM provider.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The provider tag.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`). Empty when offline.
    pub api_url: String,
    /// API key for authentication. Empty when offline.
    pub api_key: String,
    /// Model override; the experiment's `agent.model_name` is used otherwise.
    pub model: Option<String>,
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenAI`, vLLM, Ollama, ...).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// No model: every decision is a uniform random pick that the verifier
    /// accepts.
    Offline,
}

impl BackendType {
    /// Parse a provider tag, case-insensitively.
    pub fn parse(tag: &str) -> Result<Self, RunnerError> {
        match tag.to_lowercase().as_str() {
            "openai" | "vllm" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "offline" | "random" => Ok(Self::Offline),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// - `LLM_BACKEND` -- provider tag (default `offline`)
    /// - `LLM_API_URL`, `LLM_API_KEY` -- required unless offline
    /// - `LLM_MODEL` -- optional model override
    /// - `TEMPLATES_DIR` -- prompt templates (default `templates`)
    /// - `FORAY_CONFIG` -- experiment file (default `configs/survive.yaml`)
    pub fn from_env() -> Result<Self, RunnerError> {
        let backend_type = BackendType::parse(
            &std::env::var("LLM_BACKEND").unwrap_or_else(|_| "offline".to_owned()),
        )?;

        let (api_url, api_key) = if backend_type == BackendType::Offline {
            (String::new(), String::new())
        } else {
            let url = env_var("LLM_API_URL")?;
            (url.trim_end_matches('/').to_owned(), env_var("LLM_API_KEY")?)
        };

        let model = std::env::var("LLM_MODEL").ok().filter(|m| !m.is_empty());

        let templates_dir =
            std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_owned());

        let experiment_path = PathBuf::from(
            std::env::var("FORAY_CONFIG").unwrap_or_else(|_| "configs/survive.yaml".to_owned()),
        );

        Ok(Self {
            backend: LlmBackendConfig {
                backend_type,
                api_url,
                api_key,
                model,
            },
            templates_dir,
            experiment_path,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}
