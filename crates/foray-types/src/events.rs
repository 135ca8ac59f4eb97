//! Game events emitted by the simulation after each step.
//!
//! One variant per event kind, each carrying only its own fields. Episodic
//! memory filters the tick's event list by the agent's id and matches on the
//! active variant.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::enums::{CombatStyle, ItemKind, Material, Skill};

/// A single event from one simulation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// A successful hit.
    Attack {
        /// Who hit.
        attacker: EntityId,
        /// Who was hit.
        target: EntityId,
        /// Style of the hit.
        style: CombatStyle,
        /// Damage dealt.
        damage: u32,
    },
    /// A kill.
    Kill {
        /// The entity that landed the killing blow.
        killer: EntityId,
        /// The entity that died.
        target: EntityId,
        /// Level of the killer at the time.
        killer_level: u32,
        /// Level of the victim at the time.
        target_level: u32,
    },
    /// An item picked up from a kill.
    Loot {
        /// The looting player.
        player: EntityId,
        /// Item looted.
        item: ItemKind,
        /// Item level.
        level: u32,
        /// Stack size.
        quantity: u32,
    },
    /// A consumable used.
    Consume {
        /// The consuming player.
        player: EntityId,
        /// Ration or Potion.
        item: ItemKind,
        /// Item level.
        level: u32,
        /// Number consumed.
        quantity: u32,
    },
    /// An item transfer between players.
    Give {
        /// Sender.
        giver: EntityId,
        /// Recipient.
        receiver: EntityId,
        /// Item given.
        item: ItemKind,
        /// Item level.
        level: u32,
        /// Stack size.
        quantity: u32,
    },
    /// A skill level increase.
    LevelUp {
        /// The player.
        player: EntityId,
        /// The skill that improved.
        skill: Skill,
        /// New level.
        level: u32,
    },
    /// A player removed from the game.
    Death {
        /// The player.
        player: EntityId,
    },
    /// An item gathered from a resource tile.
    Harvest {
        /// The player.
        player: EntityId,
        /// Item produced.
        item: ItemKind,
        /// Item level.
        level: u32,
        /// Stack size.
        quantity: u32,
        /// The resource tile it came from.
        origin: Material,
    },
}

impl GameEvent {
    /// Whether `id` takes part in this event on either side.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Attack {
                attacker, target, ..
            } => *attacker == id || *target == id,
            Self::Kill { killer, target, .. } => *killer == id || *target == id,
            Self::Give {
                giver, receiver, ..
            } => *giver == id || *receiver == id,
            Self::Loot { player, .. }
            | Self::Consume { player, .. }
            | Self::LevelUp { player, .. }
            | Self::Death { player }
            | Self::Harvest { player, .. } => *player == id,
        }
    }

    /// Whether the event is an interaction with another entity (as opposed to
    /// a purely individual event like harvesting or levelling up).
    pub const fn is_interaction(&self) -> bool {
        matches!(
            self,
            Self::Attack { .. }
                | Self::Kill { .. }
                | Self::Loot { .. }
                | Self::Give { .. }
                | Self::Death { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn involvement_checks_both_sides() {
        let hit = GameEvent::Attack {
            attacker: EntityId(1),
            target: EntityId(-2),
            style: CombatStyle::Melee,
            damage: 7,
        };
        assert!(hit.involves(EntityId(1)));
        assert!(hit.involves(EntityId(-2)));
        assert!(!hit.involves(EntityId(3)));
        assert!(hit.is_interaction());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let event = GameEvent::Death {
            player: EntityId(4),
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json.get("kind").and_then(|v| v.as_str()), Some("death"));
        assert!(event.is_interaction());
    }
}
