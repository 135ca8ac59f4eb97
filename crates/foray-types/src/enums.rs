//! Enumeration types for the Foray harness.
//!
//! The numeric ids match the simulation's wire encoding; the display names
//! match the text that appears in prompts and action labels, so a label like
//! `"Move to the nearest Fish tile"` round-trips through [`Material::from_name`].

use serde::{Deserialize, Serialize};

/// A name that does not belong to the expected vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} name: {name}")]
pub struct UnknownName {
    /// Which vocabulary was searched (e.g. `material`).
    pub kind: &'static str,
    /// The offending input.
    pub name: String,
}

impl UnknownName {
    fn new(kind: &'static str, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

/// The material occupying a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Material {
    /// Outside the playable map.
    Void,
    /// Drinkable water (impassable).
    Water,
    /// Plain walkable ground.
    Grass,
    /// Harvested foliage.
    Scrub,
    /// Edible foliage.
    Foliage,
    /// Impassable rock.
    Stone,
    /// Harvested ore.
    Slag,
    /// Mineable ore.
    Ore,
    /// Harvested tree.
    Stump,
    /// Choppable tree.
    Tree,
    /// Harvested crystal.
    Fragment,
    /// Mineable crystal.
    Crystal,
    /// Harvested herb.
    Weeds,
    /// Gatherable herb.
    Herb,
    /// Deep water (impassable).
    Ocean,
    /// Fishing spot (impassable).
    Fish,
}

impl Material {
    /// Every material in id order.
    pub const ALL: [Self; 16] = [
        Self::Void,
        Self::Water,
        Self::Grass,
        Self::Scrub,
        Self::Foliage,
        Self::Stone,
        Self::Slag,
        Self::Ore,
        Self::Stump,
        Self::Tree,
        Self::Fragment,
        Self::Crystal,
        Self::Weeds,
        Self::Herb,
        Self::Ocean,
        Self::Fish,
    ];

    /// Wire id of the material.
    pub const fn id(self) -> u8 {
        match self {
            Self::Void => 0,
            Self::Water => 1,
            Self::Grass => 2,
            Self::Scrub => 3,
            Self::Foliage => 4,
            Self::Stone => 5,
            Self::Slag => 6,
            Self::Ore => 7,
            Self::Stump => 8,
            Self::Tree => 9,
            Self::Fragment => 10,
            Self::Crystal => 11,
            Self::Weeds => 12,
            Self::Herb => 13,
            Self::Ocean => 14,
            Self::Fish => 15,
        }
    }

    /// Look up a material by wire id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    /// Display name used in prompts and labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Void => "Void",
            Self::Water => "Water",
            Self::Grass => "Grass",
            Self::Scrub => "Scrub",
            Self::Foliage => "Foliage",
            Self::Stone => "Stone",
            Self::Slag => "Slag",
            Self::Ore => "Ore",
            Self::Stump => "Stump",
            Self::Tree => "Tree",
            Self::Fragment => "Fragment",
            Self::Crystal => "Crystal",
            Self::Weeds => "Weeds",
            Self::Herb => "Herb",
            Self::Ocean => "Ocean",
            Self::Fish => "Fish",
        }
    }

    /// Look up a material by display name.
    pub fn from_name(name: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| UnknownName::new("material", name))
    }

    /// Tiles no agent can stand on.
    pub const fn is_impassable(self) -> bool {
        matches!(
            self,
            Self::Water | Self::Stone | Self::Ocean | Self::Fish | Self::Void
        )
    }

    /// Tiles that yield something when harvested.
    pub const fn is_resource(self) -> bool {
        matches!(
            self,
            Self::Foliage
                | Self::Ore
                | Self::Tree
                | Self::Crystal
                | Self::Herb
                | Self::Water
                | Self::Fish
        )
    }

    /// For harvested remains, the resource they regrow into.
    pub const fn harvested_origin(self) -> Option<Self> {
        match self {
            Self::Scrub => Some(Self::Foliage),
            Self::Slag => Some(Self::Ore),
            Self::Stump => Some(Self::Tree),
            Self::Fragment => Some(Self::Crystal),
            Self::Weeds => Some(Self::Herb),
            _ => None,
        }
    }

    /// The remains a resource leaves behind once harvested, if it depletes.
    pub const fn depleted(self) -> Option<Self> {
        match self {
            Self::Foliage => Some(Self::Scrub),
            Self::Ore => Some(Self::Slag),
            Self::Tree => Some(Self::Stump),
            Self::Crystal => Some(Self::Fragment),
            Self::Herb => Some(Self::Weeds),
            _ => None,
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// The five disjoint item categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    /// Hat, Top, Bottom.
    Armor,
    /// Spear, Bow, Wand.
    Weapon,
    /// Rod, Gloves, Pickaxe, Axe, Chisel.
    Tool,
    /// Whetstone, Arrow, Runes.
    Ammunition,
    /// Ration, Potion.
    Consumable,
}

impl ItemCategory {
    /// Categories that occupy an equipment slot.
    pub const fn is_equippable(self) -> bool {
        !matches!(self, Self::Consumable)
    }
}

/// A concrete item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Head armor.
    Hat,
    /// Body armor.
    Top,
    /// Leg armor.
    Bottom,
    /// Melee weapon.
    Spear,
    /// Range weapon.
    Bow,
    /// Mage weapon.
    Wand,
    /// Fishing tool.
    Rod,
    /// Herbalism tool.
    Gloves,
    /// Prospecting tool.
    Pickaxe,
    /// Carving tool.
    Axe,
    /// Alchemy tool.
    Chisel,
    /// Melee ammunition.
    Whetstone,
    /// Range ammunition.
    Arrow,
    /// Mage ammunition.
    Runes,
    /// Restores food and water.
    Ration,
    /// Restores health.
    Potion,
}

impl ItemKind {
    /// Every item kind in type-id order.
    pub const ALL: [Self; 16] = [
        Self::Hat,
        Self::Top,
        Self::Bottom,
        Self::Spear,
        Self::Bow,
        Self::Wand,
        Self::Rod,
        Self::Gloves,
        Self::Pickaxe,
        Self::Axe,
        Self::Chisel,
        Self::Whetstone,
        Self::Arrow,
        Self::Runes,
        Self::Ration,
        Self::Potion,
    ];

    /// Wire type id (2..=17).
    pub const fn type_id(self) -> u8 {
        match self {
            Self::Hat => 2,
            Self::Top => 3,
            Self::Bottom => 4,
            Self::Spear => 5,
            Self::Bow => 6,
            Self::Wand => 7,
            Self::Rod => 8,
            Self::Gloves => 9,
            Self::Pickaxe => 10,
            Self::Axe => 11,
            Self::Chisel => 12,
            Self::Whetstone => 13,
            Self::Arrow => 14,
            Self::Runes => 15,
            Self::Ration => 16,
            Self::Potion => 17,
        }
    }

    /// Look up an item kind by wire type id.
    pub fn from_type_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_id() == id)
    }

    /// Display name used in prompts and labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hat => "Hat",
            Self::Top => "Top",
            Self::Bottom => "Bottom",
            Self::Spear => "Spear",
            Self::Bow => "Bow",
            Self::Wand => "Wand",
            Self::Rod => "Rod",
            Self::Gloves => "Gloves",
            Self::Pickaxe => "Pickaxe",
            Self::Axe => "Axe",
            Self::Chisel => "Chisel",
            Self::Whetstone => "Whetstone",
            Self::Arrow => "Arrow",
            Self::Runes => "Runes",
            Self::Ration => "Ration",
            Self::Potion => "Potion",
        }
    }

    /// Look up an item kind by display name.
    pub fn from_name(name: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| UnknownName::new("item", name))
    }

    /// Category membership, derived purely from the kind.
    pub const fn category(self) -> ItemCategory {
        match self {
            Self::Hat | Self::Top | Self::Bottom => ItemCategory::Armor,
            Self::Spear | Self::Bow | Self::Wand => ItemCategory::Weapon,
            Self::Rod | Self::Gloves | Self::Pickaxe | Self::Axe | Self::Chisel => {
                ItemCategory::Tool
            }
            Self::Whetstone | Self::Arrow | Self::Runes => ItemCategory::Ammunition,
            Self::Ration | Self::Potion => ItemCategory::Consumable,
        }
    }

    /// The resource tile that yields this item when harvested, if any.
    pub const fn harvest_source(self) -> Option<Material> {
        match self {
            Self::Whetstone | Self::Wand => Some(Material::Ore),
            Self::Arrow | Self::Spear => Some(Material::Tree),
            Self::Runes | Self::Bow => Some(Material::Crystal),
            Self::Ration => Some(Material::Fish),
            Self::Potion => Some(Material::Herb),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Skills and combat
// ---------------------------------------------------------------------------

/// The eight trainable skills, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Melee combat.
    Melee,
    /// Range combat.
    Range,
    /// Mage combat.
    Mage,
    /// Harvesting fish.
    Fishing,
    /// Harvesting herbs.
    Herbalism,
    /// Harvesting ore.
    Prospecting,
    /// Harvesting trees.
    Carving,
    /// Harvesting crystal.
    Alchemy,
}

impl Skill {
    /// Canonical skill order.
    pub const ALL: [Self; 8] = [
        Self::Melee,
        Self::Range,
        Self::Mage,
        Self::Fishing,
        Self::Herbalism,
        Self::Prospecting,
        Self::Carving,
        Self::Alchemy,
    ];

    /// Position of the skill in [`Skill::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Melee => 0,
            Self::Range => 1,
            Self::Mage => 2,
            Self::Fishing => 3,
            Self::Herbalism => 4,
            Self::Prospecting => 5,
            Self::Carving => 6,
            Self::Alchemy => 7,
        }
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Melee => "Melee",
            Self::Range => "Range",
            Self::Mage => "Mage",
            Self::Fishing => "Fishing",
            Self::Herbalism => "Herbalism",
            Self::Prospecting => "Prospecting",
            Self::Carving => "Carving",
            Self::Alchemy => "Alchemy",
        }
    }

    /// The harvesting skill trained by a resource tile.
    pub const fn for_resource(material: Material) -> Option<Self> {
        match material {
            Material::Fish => Some(Self::Fishing),
            Material::Herb => Some(Self::Herbalism),
            Material::Ore => Some(Self::Prospecting),
            Material::Tree => Some(Self::Carving),
            Material::Crystal => Some(Self::Alchemy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the three attack styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CombatStyle {
    /// Close combat.
    Melee,
    /// Ranged combat.
    Range,
    /// Magic combat.
    Mage,
}

impl CombatStyle {
    /// Styles in native index order.
    pub const ALL: [Self; 3] = [Self::Melee, Self::Range, Self::Mage];

    /// Native style index.
    pub const fn index(self) -> u8 {
        match self {
            Self::Melee => 0,
            Self::Range => 1,
            Self::Mage => 2,
        }
    }

    /// Lowercase label used in action strings (`"melee"`).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Range => "range",
            Self::Mage => "mage",
        }
    }

    /// Capitalized name used in event descriptions (`"Melee"`).
    pub const fn title(self) -> &'static str {
        match self {
            Self::Melee => "Melee",
            Self::Range => "Range",
            Self::Mage => "Mage",
        }
    }

    /// Parse the lowercase label.
    pub fn from_label(label: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|s| s.label() == label)
            .ok_or_else(|| UnknownName::new("combat style", label))
    }

    /// The combat skill that powers this style.
    pub const fn skill(self) -> Skill {
        match self {
            Self::Melee => Skill::Melee,
            Self::Range => Skill::Range,
            Self::Mage => Skill::Mage,
        }
    }

    /// The style this one counters (melee beats range, range beats mage,
    /// mage beats melee).
    pub const fn counters(self) -> Self {
        match self {
            Self::Melee => Self::Range,
            Self::Range => Self::Mage,
            Self::Mage => Self::Melee,
        }
    }
}

/// How an entity behaves toward players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NpcKind {
    /// Another player.
    Player,
    /// Never attacks.
    Passive,
    /// Retaliates when attacked.
    Neutral,
    /// Hunts players in range.
    Aggressive,
}

impl NpcKind {
    /// Wire id (0..=3).
    pub const fn id(self) -> u8 {
        match self {
            Self::Player => 0,
            Self::Passive => 1,
            Self::Neutral => 2,
            Self::Aggressive => 3,
        }
    }

    /// Look up by wire id.
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Player),
            1 => Some(Self::Passive),
            2 => Some(Self::Neutral),
            3 => Some(Self::Aggressive),
            _ => None,
        }
    }

    /// Lowercase name used in prompts.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Passive => "passive",
            Self::Neutral => "neutral",
            Self::Aggressive => "aggressive",
        }
    }
}

// ---------------------------------------------------------------------------
// Areas
// ---------------------------------------------------------------------------

/// One of the nine named zones of a 3x3 partition.
///
/// The same names serve both partitions: the absolute map partition (a
/// player's "region") and the observation-window partition (an "area",
/// re-centred on the player every tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    /// Middle band on both axes.
    Center,
    /// Top row, middle column.
    North,
    /// Top row, right column.
    Northeast,
    /// Middle row, right column.
    East,
    /// Bottom row, right column.
    Southeast,
    /// Bottom row, middle column.
    South,
    /// Bottom row, left column.
    Southwest,
    /// Middle row, left column.
    West,
    /// Top row, left column.
    Northwest,
}

impl Area {
    /// All areas in presentation order, centre first then clockwise from north.
    pub const ALL: [Self; 9] = [
        Self::Center,
        Self::North,
        Self::Northeast,
        Self::East,
        Self::Southeast,
        Self::South,
        Self::Southwest,
        Self::West,
        Self::Northwest,
    ];

    /// Map a (row band, column band) pair, each in `0..3`, to its area.
    pub const fn from_bands(row_band: u8, col_band: u8) -> Option<Self> {
        match (row_band, col_band) {
            (0, 0) => Some(Self::Northwest),
            (0, 1) => Some(Self::North),
            (0, 2) => Some(Self::Northeast),
            (1, 0) => Some(Self::West),
            (1, 1) => Some(Self::Center),
            (1, 2) => Some(Self::East),
            (2, 0) => Some(Self::Southwest),
            (2, 1) => Some(Self::South),
            (2, 2) => Some(Self::Southeast),
            _ => None,
        }
    }

    /// The (row band, column band) pair of this area.
    pub const fn bands(self) -> (u8, u8) {
        match self {
            Self::Northwest => (0, 0),
            Self::North => (0, 1),
            Self::Northeast => (0, 2),
            Self::West => (1, 0),
            Self::Center => (1, 1),
            Self::East => (1, 2),
            Self::Southwest => (2, 0),
            Self::South => (2, 1),
            Self::Southeast => (2, 2),
        }
    }

    /// Lowercase name used in prompts and labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::North => "north",
            Self::Northeast => "northeast",
            Self::East => "east",
            Self::Southeast => "southeast",
            Self::South => "south",
            Self::Southwest => "southwest",
            Self::West => "west",
            Self::Northwest => "northwest",
        }
    }

    /// Look up an area by lowercase name.
    pub fn from_name(name: &str) -> Result<Self, UnknownName> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| UnknownName::new("area", name))
    }

    /// Window areas that lead toward the map centre when a player stands in
    /// this map region.
    pub const fn toward_center(self) -> &'static [Self] {
        match self {
            Self::Center => &[],
            Self::North => &[Self::South],
            Self::Northeast => &[Self::Southwest, Self::West, Self::South],
            Self::East => &[Self::West],
            Self::Southeast => &[Self::Northwest, Self::West, Self::North],
            Self::South => &[Self::North],
            Self::Southwest => &[Self::Northeast, Self::North, Self::East],
            Self::West => &[Self::East],
            Self::Northwest => &[Self::Southeast, Self::East, Self::South],
        }
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_ids_round_trip() {
        for material in Material::ALL {
            assert_eq!(Material::from_id(material.id()), Some(material));
            assert_eq!(Material::from_name(material.name()), Ok(material));
        }
        assert!(Material::from_id(16).is_none());
    }

    #[test]
    fn harvested_remains_point_back() {
        for material in Material::ALL {
            if let Some(remains) = material.depleted() {
                assert_eq!(remains.harvested_origin(), Some(material));
            }
        }
        assert!(Material::Water.depleted().is_none());
    }

    #[test]
    fn impassable_set() {
        let impassable: Vec<Material> = Material::ALL
            .into_iter()
            .filter(|m| m.is_impassable())
            .collect();
        assert_eq!(
            impassable,
            vec![
                Material::Void,
                Material::Water,
                Material::Stone,
                Material::Ocean,
                Material::Fish
            ]
        );
    }

    #[test]
    fn item_categories() {
        assert_eq!(ItemKind::Hat.category(), ItemCategory::Armor);
        assert_eq!(ItemKind::Pickaxe.category(), ItemCategory::Tool);
        assert_eq!(ItemKind::Runes.category(), ItemCategory::Ammunition);
        assert_eq!(ItemKind::Potion.category(), ItemCategory::Consumable);
        assert_eq!(ItemKind::from_type_id(16), Some(ItemKind::Ration));
        assert!(ItemKind::from_type_id(1).is_none());
        assert!(ItemKind::from_name("Shield").is_err());
    }

    #[test]
    fn area_bands_round_trip() {
        for area in Area::ALL {
            let (r, c) = area.bands();
            assert_eq!(Area::from_bands(r, c), Some(area));
        }
        assert!(Area::from_bands(3, 0).is_none());
    }

    #[test]
    fn style_counters_form_a_cycle() {
        for style in CombatStyle::ALL {
            assert_ne!(style.counters(), style);
            assert_eq!(style.counters().counters().counters(), style);
        }
    }
}
