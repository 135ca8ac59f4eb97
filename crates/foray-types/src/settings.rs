//! Game rule parameters shared by the world and the agent harness.
//!
//! [`GameSettings`] is the `env` section of the experiment YAML. The sandbox
//! world reads it to build a map, and the agent crate reads the same values
//! to partition regions, gate triggers and render rule text.

use serde::{Deserialize, Serialize};

use crate::enums::CombatStyle;
use crate::geometry::{Bounds, Position};

/// Map, population, hazard, combat and system parameters of one game.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Side length of the playable square.
    #[serde(default = "default_map_size")]
    pub map_size: u32,

    /// Width of the void border around the playable square.
    #[serde(default = "default_map_border")]
    pub map_border: u32,

    /// Chebyshev radius of each player's observation window.
    #[serde(default = "default_vision_radius")]
    pub vision_radius: u32,

    /// Number of players.
    #[serde(default = "default_player_num")]
    pub player_num: u32,

    /// Number of NPCs spawned at reset.
    #[serde(default = "default_npc_num")]
    pub npc_num: u32,

    /// Last tick of the game.
    #[serde(default = "default_horizon")]
    pub horizon: u32,

    /// Tick at which the fog appears; `None` disables fog.
    #[serde(default)]
    pub fog_onset: Option<u32>,

    /// Tiles per tick the fog advances.
    #[serde(default = "default_fog_speed")]
    pub fog_speed: f64,

    /// Side length of the permanent safe square around the map centre.
    #[serde(default = "default_fog_final_size")]
    pub fog_final_size: u32,

    /// Generate no stone tiles.
    #[serde(default)]
    pub disable_stone: bool,

    /// Melee attack reach.
    #[serde(default = "default_melee_reach")]
    pub melee_reach: u32,

    /// Range attack reach.
    #[serde(default = "default_range_reach")]
    pub range_reach: u32,

    /// Mage attack reach.
    #[serde(default = "default_mage_reach")]
    pub mage_reach: u32,

    /// Combat system toggle.
    #[serde(default = "default_enabled")]
    pub combat_enabled: bool,

    /// Item system toggle.
    #[serde(default = "default_enabled")]
    pub item_enabled: bool,

    /// Equipment system toggle.
    #[serde(default = "default_enabled")]
    pub equipment_enabled: bool,

    /// Progression (skills) system toggle.
    #[serde(default = "default_enabled")]
    pub progression_enabled: bool,

    /// NPC system toggle.
    #[serde(default = "default_enabled")]
    pub npc_enabled: bool,

    /// Inventory slot count.
    #[serde(default = "default_inventory_capacity")]
    pub inventory_capacity: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            map_size: default_map_size(),
            map_border: default_map_border(),
            vision_radius: default_vision_radius(),
            player_num: default_player_num(),
            npc_num: default_npc_num(),
            horizon: default_horizon(),
            fog_onset: None,
            fog_speed: default_fog_speed(),
            fog_final_size: default_fog_final_size(),
            disable_stone: false,
            melee_reach: default_melee_reach(),
            range_reach: default_range_reach(),
            mage_reach: default_mage_reach(),
            combat_enabled: default_enabled(),
            item_enabled: default_enabled(),
            equipment_enabled: default_enabled(),
            progression_enabled: default_enabled(),
            npc_enabled: default_enabled(),
            inventory_capacity: default_inventory_capacity(),
        }
    }
}

impl GameSettings {
    /// Full grid side, playable square plus border on both sides.
    pub const fn total_size(&self) -> u32 {
        self.map_size
            .saturating_add(self.map_border.saturating_mul(2))
    }

    /// Observation window side length.
    pub const fn view_size(&self) -> u32 {
        self.vision_radius.saturating_mul(2).saturating_add(1)
    }

    /// Bounds used for the absolute region partition.
    ///
    /// The upper edge is `map_border + map_size` on both axes, one past the
    /// last playable tile, which keeps the bands of the nine regions aligned
    /// with the simulation's own notion of map regions.
    pub fn region_bounds(&self) -> Bounds {
        let lo = clamp_i32(self.map_border);
        let hi = clamp_i32(self.map_border.saturating_add(self.map_size));
        Bounds::new(lo, hi, lo, hi)
    }

    /// The map centre tile.
    pub fn center(&self) -> Position {
        let c = clamp_i32(self.total_size() / 2);
        Position::new(c, c)
    }

    /// Attack reach for `style`.
    pub const fn reach(&self, style: CombatStyle) -> u32 {
        match style {
            CombatStyle::Melee => self.melee_reach,
            CombatStyle::Range => self.range_reach,
            CombatStyle::Mage => self.mage_reach,
        }
    }

    /// Whether fog is configured at all.
    pub const fn fog_configured(&self) -> bool {
        self.fog_onset.is_some()
    }

    /// Whether fog is active at `tick`.
    pub fn fog_active(&self, tick: u32) -> bool {
        self.fog_onset.is_some_and(|onset| tick >= onset)
    }
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_map_size() -> u32 {
    64
}

const fn default_map_border() -> u32 {
    16
}

const fn default_vision_radius() -> u32 {
    7
}

const fn default_player_num() -> u32 {
    8
}

const fn default_npc_num() -> u32 {
    32
}

const fn default_horizon() -> u32 {
    1024
}

const fn default_fog_speed() -> f64 {
    0.0625
}

const fn default_fog_final_size() -> u32 {
    8
}

const fn default_melee_reach() -> u32 {
    3
}

const fn default_range_reach() -> u32 {
    3
}

const fn default_mage_reach() -> u32 {
    3
}

const fn default_enabled() -> bool {
    true
}

const fn default_inventory_capacity() -> u32 {
    12
}
