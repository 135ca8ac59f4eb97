//! Per-player observations exposed by a [`Simulation`](crate::Simulation).
//!
//! This is the raw interface the state extractor consumes: the player's own
//! row, the tiles of its observation window, every visible entity (the
//! player included), and its inventory. The entity and inventory orderings
//! define the indices a [`NativeAction`](foray_types::NativeAction) refers
//! to, so both are only valid for the tick they were observed on.

use std::sync::Arc;

use foray_types::{Bounds, EntityId, ItemKind, Material, NpcKind, Position, Skill};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::grid::TileGrid;

/// The observing player's own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRow {
    /// Player id.
    pub id: EntityId,
    /// Current tile.
    pub position: Position,
    /// Health, 0..=100.
    pub health: u32,
    /// Food, 0..=100.
    pub food: u32,
    /// Water, 0..=100.
    pub water: u32,
    /// Damage taken on the last tick.
    pub damage: u32,
    /// Who attacked this player most recently, or [`EntityId::NONE`].
    pub attacker: EntityId,
    /// Skill levels in [`Skill::ALL`] order.
    pub skills: [u32; 8],
    /// Whether the simulation considers the player engaged in combat.
    pub in_combat: bool,
}

impl AgentRow {
    /// Level of one skill.
    pub fn skill(&self, skill: Skill) -> u32 {
        self.skills.get(skill.index()).copied().unwrap_or(0)
    }

    /// The highest of all eight skill levels.
    pub fn highest_skill(&self) -> u32 {
        self.skills.iter().copied().max().unwrap_or(0)
    }
}

/// One visible entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    /// Signed id.
    pub id: EntityId,
    /// Player or NPC behaviour class.
    pub kind: NpcKind,
    /// Current tile.
    pub position: Position,
    /// Damage taken on the last tick.
    pub damage: u32,
    /// Who attacked this entity most recently, or [`EntityId::NONE`].
    pub attacker: EntityId,
    /// Health.
    pub health: u32,
    /// Melee skill level.
    pub melee_level: u32,
    /// Range skill level.
    pub range_level: u32,
    /// Mage skill level.
    pub mage_level: u32,
}

/// One window tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    /// Absolute position.
    pub position: Position,
    /// Material on the tile.
    pub material: Material,
    /// Fog field value: positive inside the fog (damage per tick), near zero
    /// on its edge, negative in safe ground.
    pub fog: f64,
}

/// One inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    /// Item instance id, unique for the game.
    pub id: u32,
    /// Item type.
    pub kind: ItemKind,
    /// Item level.
    pub level: u32,
    /// Stack size.
    pub quantity: u32,
    /// Attack bonus per style in melee/range/mage order.
    pub attack: [u32; 3],
    /// Defense bonus per style in melee/range/mage order.
    pub defense: [u32; 3],
    /// Whether the item occupies an equipment slot.
    pub equipped: bool,
}

/// Everything one player sees on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Tick the observation was taken on.
    pub tick: u32,
    /// The observing player.
    pub agent: AgentRow,
    /// Window tiles in row-major order.
    pub tiles: Vec<TileView>,
    /// Visible entities, the observer included.
    pub entities: Vec<EntityRow>,
    /// Inventory rows in slot order.
    pub inventory: Vec<InventoryRow>,
    /// The full map, for pathfinding.
    #[serde(skip)]
    pub map: Arc<TileGrid>,
}

impl Observation {
    /// Tight bounds of the window tiles.
    pub fn window_bounds(&self) -> Result<Bounds, WorldError> {
        Bounds::covering(self.tiles.iter().map(|t| t.position)).ok_or(WorldError::EmptyWindow)
    }

    /// Index of an entity in [`Observation::entities`].
    pub fn entity_index(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }

    /// Index of an item in [`Observation::inventory`].
    pub fn item_index(&self, item_id: u32) -> Option<usize> {
        self.inventory.iter().position(|i| i.id == item_id)
    }

    /// Look up a visible entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&EntityRow> {
        self.entities.iter().find(|e| e.id == id)
    }
}
