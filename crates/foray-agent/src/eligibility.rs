//! Skill-level gating for equipping and using items.
//!
//! Weapons, ammunition and tools are gated on one specific skill. Armor and
//! consumables are skill-agnostic and are gated on the player's highest
//! level across all eight skills.

use foray_types::{ItemKind, Skill};

use crate::error::AgentError;
use crate::snapshot::AgentInfo;

/// Which skill level an item is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The highest of all eight skills.
    Highest,
    /// One named skill.
    Skill(Skill),
}

/// The requirement rule for `kind`.
pub const fn requirement(kind: ItemKind) -> Requirement {
    match kind {
        ItemKind::Hat | ItemKind::Top | ItemKind::Bottom | ItemKind::Ration | ItemKind::Potion => {
            Requirement::Highest
        }
        ItemKind::Spear | ItemKind::Whetstone => Requirement::Skill(Skill::Melee),
        ItemKind::Bow | ItemKind::Arrow => Requirement::Skill(Skill::Range),
        ItemKind::Wand | ItemKind::Runes => Requirement::Skill(Skill::Mage),
        ItemKind::Rod => Requirement::Skill(Skill::Fishing),
        ItemKind::Gloves => Requirement::Skill(Skill::Herbalism),
        ItemKind::Axe => Requirement::Skill(Skill::Carving),
        ItemKind::Chisel => Requirement::Skill(Skill::Alchemy),
        ItemKind::Pickaxe => Requirement::Skill(Skill::Prospecting),
    }
}

/// Whether `agent` may equip or use a level `level` item of `kind`.
pub fn check_level(agent: &AgentInfo, kind: ItemKind, level: u32) -> bool {
    let have = match requirement(kind) {
        Requirement::Highest => agent.highest_skill(),
        Requirement::Skill(skill) => agent.skill(skill),
    };
    have >= level
}

/// [`check_level`] for an item given by display name.
///
/// A name outside the item table is a data-contract violation.
pub fn check_level_named(agent: &AgentInfo, name: &str, level: u32) -> Result<bool, AgentError> {
    let kind = ItemKind::from_name(name).map_err(|e| AgentError::UnknownItem(e.name))?;
    Ok(check_level(agent, kind, level))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use foray_types::{Area, EntityId, Material, Position};

    fn agent(skills: [u32; 8]) -> AgentInfo {
        AgentInfo {
            id: EntityId(1),
            position: Position::new(10, 10),
            health: 100,
            food: 100,
            water: 100,
            skills,
            region: Area::Center,
            dist_to_center: 0,
            dist_to_safety_zone: 0,
            tick: 1,
            in_combat: false,
            attacker: None,
            damage_taken: None,
            target_of_attack: None,
            damage_dealt: None,
            tile: Material::Grass,
            water_around: false,
            fish_around: false,
        }
    }

    #[test]
    fn armor_and_consumables_use_highest_skill() {
        // Only carving is high; armor still passes on it.
        let a = agent([1, 1, 1, 1, 1, 1, 4, 1]);
        assert!(check_level(&a, ItemKind::Top, 4));
        assert!(check_level(&a, ItemKind::Potion, 4));
        assert!(!check_level(&a, ItemKind::Hat, 5));
    }

    #[test]
    fn weapons_and_ammunition_use_their_style() {
        let a = agent([3, 1, 2, 1, 1, 1, 1, 1]);
        assert!(check_level(&a, ItemKind::Spear, 3));
        assert!(check_level(&a, ItemKind::Whetstone, 3));
        assert!(!check_level(&a, ItemKind::Bow, 2));
        assert!(!check_level(&a, ItemKind::Arrow, 2));
        assert!(check_level(&a, ItemKind::Wand, 2));
        assert!(!check_level(&a, ItemKind::Runes, 3));
    }

    #[test]
    fn tools_use_their_gathering_skill() {
        let a = agent([1, 1, 1, 2, 3, 4, 5, 6]);
        assert!(check_level(&a, ItemKind::Rod, 2));
        assert!(!check_level(&a, ItemKind::Rod, 3));
        assert!(check_level(&a, ItemKind::Gloves, 3));
        assert!(check_level(&a, ItemKind::Pickaxe, 4));
        assert!(check_level(&a, ItemKind::Axe, 5));
        assert!(check_level(&a, ItemKind::Chisel, 6));
        assert!(!check_level(&a, ItemKind::Axe, 6));
    }

    #[test]
    fn unknown_item_name_is_an_error() {
        let a = agent([1; 8]);
        assert!(check_level_named(&a, "Bow", 1).unwrap());
        assert!(matches!(
            check_level_named(&a, "Trident", 1),
            Err(AgentError::UnknownItem(_))
        ));
    }
}
