//! Shared vocabulary for the Foray agent harness.
//!
//! Every crate in the workspace speaks in these types: the simulation emits
//! them in observations and event logs, the agent crate reasons over them,
//! and the runner serializes them into logs.
//!
//! # Modules
//!
//! - [`geometry`] -- Grid positions, distances, and rectangular bounds
//! - [`enums`] -- Materials, items, skills, combat styles, and the nine areas
//! - [`entity`] -- Signed entity identifiers and their display names
//! - [`action`] -- Native action encoding and the merged per-tick action
//! - [`events`] -- Tagged game events consumed by episodic memory
//! - [`settings`] -- Game rule parameters shared by world and agent

pub mod action;
pub mod entity;
pub mod enums;
pub mod events;
pub mod geometry;
pub mod settings;

pub use action::{
    ActionCategory, AttackOrder, Direction, EncodedAction, GiveOrder, MergedAction, NativeAction,
};
pub use entity::EntityId;
pub use enums::{Area, CombatStyle, ItemCategory, ItemKind, Material, NpcKind, Skill, UnknownName};
pub use events::GameEvent;
pub use geometry::{Bounds, Position};
pub use settings::GameSettings;
