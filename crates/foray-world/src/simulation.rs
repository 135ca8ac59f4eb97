//! The simulation seam the harness drives.

use std::collections::BTreeMap;

use foray_types::{EntityId, GameEvent, NativeAction};

use crate::observation::Observation;

/// Result of advancing the world one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Events produced during the step.
    pub events: Vec<GameEvent>,
    /// Players removed from the game (dead).
    pub terminated: BTreeMap<EntityId, bool>,
    /// Players whose game ended by reaching the horizon.
    pub truncated: BTreeMap<EntityId, bool>,
}

/// A multi-agent world that accepts one [`NativeAction`] per player per tick.
pub trait Simulation: Send {
    /// Ticks elapsed since reset.
    fn tick(&self) -> u32;

    /// Every player id in the game, dead or alive.
    fn players(&self) -> Vec<EntityId>;

    /// Current observation of a living player.
    fn observe(&self, player: EntityId) -> Option<Observation>;

    /// Apply the actions of the listed players and advance one tick. Players
    /// without an entry stay idle.
    fn step(&mut self, actions: &BTreeMap<EntityId, NativeAction>) -> StepOutcome;
}
