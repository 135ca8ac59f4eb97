//! The agent side of Foray: everything between an observation and an action.
//!
//! Each tick a player's [`Observation`](foray_world::Observation) is reduced
//! to a [`Snapshot`], which feeds three consumers: the enumerated action
//! spaces the planner chooses from, the [`DecisionGate`] that decides whether
//! to plan at all, and the natural-language description the planner reads.
//! A chosen [`Plan`] is then translated back into the simulation's native
//! action.
//!
//! # Modules
//!
//! - [`config`] -- Experiment configuration loaded from YAML
//! - [`error`] -- Error types for extraction and translation
//! - [`snapshot`] -- The normalised per-tick view of one player
//! - [`extract`] -- Snapshot extraction from raw observations
//! - [`eligibility`] -- Item level requirements
//! - [`action_space`] -- Action directives, labels and candidate spaces
//! - [`trigger`] -- When to plan a new action
//! - [`translate`] -- Directives to native actions, labels back to directives
//! - [`describe`] -- Natural-language game state
//! - [`memory`] -- Episodic interaction memory

pub mod action_space;
pub mod config;
pub mod describe;
pub mod eligibility;
pub mod error;
pub mod extract;
pub mod memory;
pub mod snapshot;
pub mod translate;
pub mod trigger;

#[cfg(test)]
mod testkit;

pub use action_space::{ActionSpace, MlDirective, MoveDirective, Plan};
pub use config::{ConfigError, ExperimentConfig, RuleDetail};
pub use describe::describe;
pub use error::AgentError;
pub use extract::StateExtractor;
pub use memory::EpisodicMemory;
pub use snapshot::Snapshot;
pub use translate::{LabelParser, Translator};
pub use trigger::{DecisionGate, Trigger};
