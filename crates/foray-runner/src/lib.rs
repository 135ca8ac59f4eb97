//! Episode runner for Foray survival experiments.
//!
//! Drives LLM-backed players through one or more episodes of a survival
//! game. Each tick every living player is handed its observation, decides
//! through a propose-then-verify loop against a language model and returns
//! a native action; the world then steps once for everyone.
//!
//! # Architecture
//!
//! ```text
//! Observation --> Snapshot --> Prompt Engine --> LLM Backend --> Verifier
//!                                                    |               |
//!                      Native action <-- Translator <-- committed label
//! ```
//!
//! A model that fails or keeps producing malformed output never stalls a
//! tick: the decision falls back to a random label from the action space.
//!
//! # Modules
//!
//! - [`config`] -- Provider and path settings from environment variables
//! - [`error`] -- Error types for the runner
//! - [`parse`] -- JSON recovery from raw model output
//! - [`llm`] -- LLM backends and the validating client
//! - [`rules`] -- Game rules text rendered from templates
//! - [`prompt`] -- Prompt templates and response formats
//! - [`decision`] -- The propose-then-verify loop
//! - [`logs`] -- Prompt transcripts, action CSVs and run status files
//! - [`player`] -- Per-player decision state
//! - [`episode`] -- The parallel tick loop
//! - [`experiment`] -- Experiment setup and episode wiring

pub mod config;
pub mod decision;
pub mod episode;
pub mod error;
pub mod experiment;
pub mod llm;
pub mod logs;
pub mod parse;
pub mod player;
pub mod prompt;
pub mod rules;

pub use config::{BackendType, LlmBackendConfig, RunnerConfig};
pub use episode::{EpisodeReport, EpisodeRunner};
pub use error::RunnerError;
pub use experiment::Experiment;
pub use llm::{LlmBackend, LlmClient, TokenUsage};
pub use player::Player;
pub use prompt::{PlayerRole, PromptEngine};
