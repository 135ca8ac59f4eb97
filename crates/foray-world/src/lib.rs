//! The world side of Foray: map geometry, search, and a runnable sandbox.
//!
//! The harness treats the simulation as a black box behind the
//! [`Simulation`] trait. This crate supplies the pieces the agent needs to
//! reason about what it observes (partitioning and bounded routing over the
//! tile grid) along with [`Sandbox`], a seeded world implementing the
//! survival rules so episodes can run without an external engine.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid and partition operations
//! - [`grid`] -- Square tile grid of materials
//! - [`partition`] -- Three-band axis splits and the nine named areas
//! - [`route`] -- A* shortest path confined to a bounding box
//! - [`observation`] -- Per-player observation rows
//! - [`simulation`] -- The simulation trait and step outcome
//! - [`fog`] -- The closing fog field
//! - [`mapgen`] -- Procedural map generation
//! - [`sandbox`] -- Reference simulation implementation

pub mod error;
pub mod fog;
pub mod grid;
pub mod mapgen;
pub mod observation;
pub mod partition;
pub mod route;
pub mod sandbox;
pub mod simulation;

pub use error::WorldError;
pub use grid::TileGrid;
pub use observation::{AgentRow, EntityRow, InventoryRow, Observation, TileView};
pub use route::{Route, distance, route};
pub use sandbox::Sandbox;
pub use simulation::{Simulation, StepOutcome};
