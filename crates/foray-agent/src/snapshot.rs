//! The per-tick observation snapshot.
//!
//! A [`Snapshot`] is the normalised view of one player's observation that
//! everything downstream reasons over: the action-space generator, the
//! decision gate and the perception text. Per-area fields are keyed by the
//! window-relative partition, re-centred on the player every tick, while
//! [`AgentInfo::region`] uses the absolute map partition.

use std::collections::BTreeMap;

use foray_types::{
    Area, CombatStyle, EntityId, ItemCategory, ItemKind, Material, NpcKind, Position, Skill,
};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Area map
// ---------------------------------------------------------------------------

/// One value for each of the nine areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaMap<T> {
    slots: [T; 9],
}

impl<T> AreaMap<T> {
    /// Build every slot with `init`.
    pub fn from_fn(mut init: impl FnMut(Area) -> T) -> Self {
        Self {
            slots: Area::ALL.map(&mut init),
        }
    }

    /// The value for `area`.
    pub const fn get(&self, area: Area) -> &T {
        let [center, north, northeast, east, southeast, south, southwest, west, northwest] =
            &self.slots;
        match area {
            Area::Center => center,
            Area::North => north,
            Area::Northeast => northeast,
            Area::East => east,
            Area::Southeast => southeast,
            Area::South => south,
            Area::Southwest => southwest,
            Area::West => west,
            Area::Northwest => northwest,
        }
    }

    /// Mutable access to the value for `area`.
    pub const fn get_mut(&mut self, area: Area) -> &mut T {
        let [center, north, northeast, east, southeast, south, southwest, west, northwest] =
            &mut self.slots;
        match area {
            Area::Center => center,
            Area::North => north,
            Area::Northeast => northeast,
            Area::East => east,
            Area::Southeast => southeast,
            Area::South => south,
            Area::Southwest => southwest,
            Area::West => west,
            Area::Northwest => northwest,
        }
    }

    /// `(area, value)` pairs in [`Area::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Area, &T)> {
        Area::ALL.into_iter().zip(self.slots.iter())
    }

    /// Values in [`Area::ALL`] order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

impl<T: Default> Default for AreaMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// The observing player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
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
    /// Skill levels in [`Skill::ALL`] order.
    pub skills: [u32; 8],
    /// Absolute map region.
    pub region: Area,
    /// Manhattan distance to the map centre.
    pub dist_to_center: u32,
    /// Distance left to the permanent safe square; zero without fog.
    pub dist_to_safety_zone: u32,
    /// Tick of the observation.
    pub tick: u32,
    /// Whether the simulation reports the player in combat.
    pub in_combat: bool,
    /// Who is attacking the player, filled only in combat.
    pub attacker: Option<EntityId>,
    /// Damage taken from the attacker.
    pub damage_taken: Option<u32>,
    /// Whom the player is attacking, filled only in combat.
    pub target_of_attack: Option<EntityId>,
    /// Damage the target took.
    pub damage_dealt: Option<u32>,
    /// Material under the player.
    pub tile: Material,
    /// A Water tile is orthogonally adjacent.
    pub water_around: bool,
    /// A Fish tile is orthogonally adjacent.
    pub fish_around: bool,
}

impl AgentInfo {
    /// Level of one skill.
    pub fn skill(&self, skill: Skill) -> u32 {
        self.skills.get(skill.index()).copied().unwrap_or(0)
    }

    /// The highest of all eight skill levels.
    pub fn highest_skill(&self) -> u32 {
        self.skills.iter().copied().max().unwrap_or(0)
    }

    /// Whether any vital is below `threshold`.
    pub const fn vital_below(&self, threshold: u32) -> bool {
        self.food < threshold || self.water < threshold || self.health < threshold
    }
}

// ---------------------------------------------------------------------------
// Per-area fields
// ---------------------------------------------------------------------------

/// Counts for one material in one area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceCount {
    /// Tiles of the material in the area.
    pub visible: u32,
    /// Tiles with at least one approach cell the player can reach.
    pub reachable: u32,
    /// The material is a harvestable resource.
    pub is_resource: bool,
    /// Agents may stand on the material.
    pub is_passable: bool,
    /// For harvested remains, the resource they regrow into.
    pub origin: Option<Material>,
}

/// Fog classification of an area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FogStatus {
    /// No tile of the area is classified.
    #[default]
    OutOfFog,
    /// Some tile is inside the fog.
    InFog,
    /// Some tile sits on the fog edge.
    OnTheEdge,
    /// Tiles the fog has not reached.
    InSafety,
}

/// Fog status and damage of one area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FogInfo {
    /// Classification.
    pub status: FogStatus,
    /// Health lost per tick inside the fog.
    pub damage: f64,
}

/// Tile counts behind the per-area reachability verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Passability {
    /// Window tiles in the area.
    pub visited: u32,
    /// Tiles an agent may stand on.
    pub passable: u32,
    /// Passable tiles with a path from the player.
    pub reachable: u32,
}

impl Passability {
    /// An area is reachable unless at least 80% of its tiles are not.
    pub fn is_reachable(&self) -> bool {
        let unreachable = u64::from(self.visited.saturating_sub(self.reachable));
        // unreachable / visited < 0.8, without floats.
        unreachable.saturating_mul(5) < u64::from(self.visited).saturating_mul(4)
    }
}

/// One visible entity other than the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityInfo {
    /// Signed id.
    pub id: EntityId,
    /// Behaviour class.
    pub kind: NpcKind,
    /// Strictly highest combat skill, melee on ties.
    pub style: CombatStyle,
    /// Damage taken on the last tick.
    pub damage: u32,
    /// Current tile.
    pub position: Position,
    /// Health.
    pub health: u32,
    /// Highest combat skill level.
    pub level: u32,
    /// Within reach of the entity's own style.
    pub player_attackable: bool,
    /// Within reach of any style.
    pub entity_attackable: bool,
    /// Attacking or being attacked.
    pub in_combat: bool,
    /// Who attacks the entity.
    pub attacker: Option<EntityId>,
    /// Whom the entity attacks.
    pub target_of_attack: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemInfo {
    /// Item instance id.
    pub id: u32,
    /// Item type.
    pub kind: ItemKind,
    /// Item level.
    pub level: u32,
    /// Occupies an equipment slot.
    pub equipped: bool,
    /// Stack size.
    pub quantity: u32,
    /// Attack bonus per style.
    pub attack: [u32; 3],
    /// Defense bonus per style.
    pub defense: [u32; 3],
}

impl ItemInfo {
    /// Category of the item.
    pub const fn category(&self) -> ItemCategory {
        self.kind.category()
    }

    /// Food and water (Ration) or health (Potion) restored when consumed.
    pub const fn restore(&self) -> Option<u32> {
        match self.kind {
            ItemKind::Ration | ItemKind::Potion => {
                Some(self.level.saturating_mul(5).saturating_add(50))
            }
            _ => None,
        }
    }

    /// An equippable item that is not currently equipped.
    pub const fn is_unequipped_gear(&self) -> bool {
        self.category().is_equippable() && !self.equipped
    }
}

/// Items sorted into the five categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    /// Hat, Top, Bottom.
    pub armor: Vec<ItemInfo>,
    /// Spear, Bow, Wand.
    pub weapon: Vec<ItemInfo>,
    /// Rod, Gloves, Pickaxe, Axe, Chisel.
    pub tool: Vec<ItemInfo>,
    /// Whetstone, Arrow, Runes.
    pub ammunition: Vec<ItemInfo>,
    /// Ration, Potion.
    pub consumable: Vec<ItemInfo>,
}

impl Inventory {
    /// File an item under its category.
    pub fn push(&mut self, item: ItemInfo) {
        match item.category() {
            ItemCategory::Armor => self.armor.push(item),
            ItemCategory::Weapon => self.weapon.push(item),
            ItemCategory::Tool => self.tool.push(item),
            ItemCategory::Ammunition => self.ammunition.push(item),
            ItemCategory::Consumable => self.consumable.push(item),
        }
    }

    /// Every item, armor first and consumables last.
    pub fn all(&self) -> impl Iterator<Item = &ItemInfo> {
        self.armor
            .iter()
            .chain(&self.weapon)
            .chain(&self.tool)
            .chain(&self.ammunition)
            .chain(&self.consumable)
    }

    /// Equippable items in armor/weapon/tool/ammunition order.
    pub fn gear(&self) -> impl Iterator<Item = &ItemInfo> {
        self.armor
            .iter()
            .chain(&self.weapon)
            .chain(&self.tool)
            .chain(&self.ammunition)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the harness knows about one player on one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// The player itself.
    pub agent: AgentInfo,
    /// Per-area fog, present only once the fog is active.
    pub fog: Option<AreaMap<FogInfo>>,
    /// Per-area material counts.
    pub resources: AreaMap<BTreeMap<Material, ResourceCount>>,
    /// Per-area passability counts.
    pub passability: AreaMap<Passability>,
    /// Per-area visible entities.
    pub entities: AreaMap<Vec<EntityInfo>>,
    /// Categorised inventory.
    pub inventory: Inventory,
    /// Occupied inventory slots.
    pub capacity: u32,
}

impl Snapshot {
    /// Ids of the entities in the centre area.
    pub fn center_entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.get(Area::Center).iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Every visible entity, in area order.
    pub fn all_entities(&self) -> impl Iterator<Item = &EntityInfo> {
        self.entities.values().flatten()
    }

    /// Whether another player is visible anywhere in the window.
    pub fn other_player_visible(&self) -> bool {
        self.all_entities()
            .any(|e| e.id.is_player() && e.id != self.agent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_map_get_matches_iteration_order() {
        let map = AreaMap::from_fn(Area::name);
        for (area, name) in map.iter() {
            assert_eq!(*map.get(area), *name);
            assert_eq!(area.name(), *name);
        }
        assert_eq!(*map.get(Area::Northwest), "northwest");
    }

    #[test]
    fn passability_threshold_is_eighty_percent() {
        let open = Passability {
            visited: 10,
            passable: 10,
            reachable: 3,
        };
        assert!(open.is_reachable());
        let blocked = Passability {
            visited: 10,
            passable: 10,
            reachable: 2,
        };
        assert!(!blocked.is_reachable());
        assert!(!Passability::default().is_reachable());
    }

    #[test]
    fn consumables_restore_fifty_plus_five_per_level() {
        let ration = ItemInfo {
            id: 1,
            kind: ItemKind::Ration,
            level: 3,
            equipped: false,
            quantity: 1,
            attack: [0; 3],
            defense: [0; 3],
        };
        assert_eq!(ration.restore(), Some(65));
        let hat = ItemInfo {
            kind: ItemKind::Hat,
            ..ration
        };
        assert_eq!(hat.restore(), None);
        assert!(hat.is_unequipped_gear());
    }
}
