//! Native per-tick actions and the merged high-level action they come from.
//!
//! A [`MergedAction`] holds the five natural-language labels chosen for one
//! tick (one per sub-field). The translator resolves it into a
//! [`NativeAction`], which in turn encodes to the numeric sub-fields of
//! [`EncodedAction`] that the simulation accepts.

use serde::{Deserialize, Serialize};

use crate::enums::CombatStyle;

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

/// Attack target index meaning "attack nothing".
pub const NO_ATTACK_TARGET: u32 = 100;
/// Attack style index paired with [`NO_ATTACK_TARGET`].
pub const NO_ATTACK_STYLE: u32 = 0;
/// Inventory index meaning "no item" for use, destroy and give.
pub const NO_ITEM: u32 = 12;
/// Give target index meaning "nobody".
pub const NO_GIVE_TARGET: u32 = 100;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// A single movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Row - 1.
    North,
    /// Row + 1.
    South,
    /// Col + 1.
    East,
    /// Col - 1.
    West,
    /// No movement.
    Stay,
}

impl Direction {
    /// The four moving directions.
    pub const MOVES: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    /// Native direction index.
    pub const fn index(self) -> u32 {
        match self {
            Self::North => 0,
            Self::South => 1,
            Self::East => 2,
            Self::West => 3,
            Self::Stay => 4,
        }
    }

    /// Row/column delta of one step.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (-1, 0),
            Self::South => (1, 0),
            Self::East => (0, 1),
            Self::West => (0, -1),
            Self::Stay => (0, 0),
        }
    }

    /// The direction whose delta is exactly `(d_row, d_col)`; anything that is
    /// not a unit orthogonal step maps to [`Direction::Stay`].
    pub const fn from_delta(d_row: i32, d_col: i32) -> Self {
        match (d_row, d_col) {
            (-1, 0) => Self::North,
            (1, 0) => Self::South,
            (0, 1) => Self::East,
            (0, -1) => Self::West,
            _ => Self::Stay,
        }
    }

    /// Look up by native index.
    pub const fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::North),
            1 => Some(Self::South),
            2 => Some(Self::East),
            3 => Some(Self::West),
            4 => Some(Self::Stay),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Native action
// ---------------------------------------------------------------------------

/// Attack sub-order: an entity index in the current observation plus a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOrder {
    /// Index into the observation's entity list.
    pub target: usize,
    /// Attack style.
    pub style: CombatStyle,
}

/// Give sub-order: an inventory index and an entity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveOrder {
    /// Index into the giver's inventory.
    pub item: usize,
    /// Index into the observation's entity list.
    pub target: usize,
}

/// One agent's resolved action for a tick. `None` sub-orders are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAction {
    /// Movement step.
    pub direction: Direction,
    /// Attack, if any.
    pub attack: Option<AttackOrder>,
    /// Inventory index to use or toggle equip on.
    pub use_item: Option<usize>,
    /// Inventory index to destroy.
    pub destroy_item: Option<usize>,
    /// Item transfer, if any.
    pub give: Option<GiveOrder>,
}

impl Default for NativeAction {
    fn default() -> Self {
        Self::idle()
    }
}

impl NativeAction {
    /// Stay in place and do nothing else.
    pub const fn idle() -> Self {
        Self {
            direction: Direction::Stay,
            attack: None,
            use_item: None,
            destroy_item: None,
            give: None,
        }
    }

    /// Encode to the simulation's numeric sub-fields, substituting sentinels
    /// for absent orders. Indices too large for the wire format fall back to
    /// the sentinel as well.
    pub fn encode(&self) -> EncodedAction {
        let index = |i: usize, sentinel: u32| u32::try_from(i).unwrap_or(sentinel);
        let (attack_target, attack_style) = self.attack.map_or(
            (NO_ATTACK_TARGET, NO_ATTACK_STYLE),
            |a| (index(a.target, NO_ATTACK_TARGET), u32::from(a.style.index())),
        );
        let (give_item, give_target) = self.give.map_or((NO_ITEM, NO_GIVE_TARGET), |g| {
            (index(g.item, NO_ITEM), index(g.target, NO_GIVE_TARGET))
        });
        EncodedAction {
            direction: self.direction.index(),
            attack_target,
            attack_style,
            use_item: self.use_item.map_or(NO_ITEM, |i| index(i, NO_ITEM)),
            destroy_item: self.destroy_item.map_or(NO_ITEM, |i| index(i, NO_ITEM)),
            give_item,
            give_target,
        }
    }
}

/// The simulation's numeric action schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAction {
    /// Direction index (0..=4).
    pub direction: u32,
    /// Attack target index or [`NO_ATTACK_TARGET`].
    pub attack_target: u32,
    /// Attack style index.
    pub attack_style: u32,
    /// Use item index or [`NO_ITEM`].
    pub use_item: u32,
    /// Destroy item index or [`NO_ITEM`].
    pub destroy_item: u32,
    /// Give item index or [`NO_ITEM`].
    pub give_item: u32,
    /// Give target index or [`NO_GIVE_TARGET`].
    pub give_target: u32,
}

// ---------------------------------------------------------------------------
// High-level labels
// ---------------------------------------------------------------------------

/// The four independently decided action categories, in decision order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    /// Combined move and attack decision.
    MlAction,
    /// Use, equip or unequip an item.
    Use,
    /// Destroy an item.
    Destroy,
    /// Give an item to another player.
    Give,
}

impl ActionCategory {
    /// Categories in the fixed per-tick decision order.
    pub const ORDER: [Self; 4] = [Self::MlAction, Self::Use, Self::Destroy, Self::Give];

    /// Snake-case key used in prompts and logs.
    pub const fn key(self) -> &'static str {
        match self {
            Self::MlAction => "ml_action",
            Self::Use => "use",
            Self::Destroy => "destroy",
            Self::Give => "give",
        }
    }
}

/// Default label for each sub-field of a [`MergedAction`].
pub mod defaults {
    /// No movement.
    pub const MOVE: &str = "Stay";
    /// No attack.
    pub const ATTACK: &str = "Attack nothing";
    /// No item use.
    pub const USE: &str = "Use nothing";
    /// No destroy.
    pub const DESTROY: &str = "Destroy nothing";
    /// No give.
    pub const GIVE: &str = "Give nothing to anyone";
}

/// The five natural-language labels that make up one agent's tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MergedAction {
    /// Movement label (`Stay`, `Move to ...`, `Chase ...`).
    pub r#move: String,
    /// Attack label.
    pub attack: String,
    /// Use/equip/unequip label.
    pub r#use: String,
    /// Destroy label.
    pub destroy: String,
    /// Give label.
    pub give: String,
}

impl Default for MergedAction {
    fn default() -> Self {
        Self {
            r#move: defaults::MOVE.to_owned(),
            attack: defaults::ATTACK.to_owned(),
            r#use: defaults::USE.to_owned(),
            destroy: defaults::DESTROY.to_owned(),
            give: defaults::GIVE.to_owned(),
        }
    }
}

impl MergedAction {
    /// CSV header matching [`MergedAction::csv_fields`].
    pub const CSV_HEADER: [&'static str; 6] = ["tick", "Move", "Attack", "Use", "Destroy", "Give"];

    /// The five labels in CSV column order.
    pub fn csv_fields(&self) -> [&str; 5] {
        [
            self.r#move.as_str(),
            self.attack.as_str(),
            self.r#use.as_str(),
            self.destroy.as_str(),
            self.give.as_str(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_encodes_to_sentinels() {
        let encoded = NativeAction::idle().encode();
        assert_eq!(
            encoded,
            EncodedAction {
                direction: 4,
                attack_target: 100,
                attack_style: 0,
                use_item: 12,
                destroy_item: 12,
                give_item: 12,
                give_target: 100,
            }
        );
    }

    #[test]
    fn orders_encode_indices() {
        let action = NativeAction {
            direction: Direction::West,
            attack: Some(AttackOrder {
                target: 3,
                style: CombatStyle::Mage,
            }),
            use_item: Some(1),
            destroy_item: None,
            give: Some(GiveOrder { item: 5, target: 2 }),
        };
        let encoded = action.encode();
        assert_eq!(encoded.direction, 3);
        assert_eq!((encoded.attack_target, encoded.attack_style), (3, 2));
        assert_eq!(encoded.use_item, 1);
        assert_eq!(encoded.destroy_item, NO_ITEM);
        assert_eq!((encoded.give_item, encoded.give_target), (5, 2));
    }

    #[test]
    fn direction_deltas_round_trip() {
        for direction in Direction::MOVES {
            let (r, c) = direction.delta();
            assert_eq!(Direction::from_delta(r, c), direction);
            assert_eq!(Direction::from_index(direction.index()), Some(direction));
        }
        assert_eq!(Direction::from_delta(1, 1), Direction::Stay);
    }

    #[test]
    fn merged_defaults() {
        let merged = MergedAction::default();
        assert_eq!(
            merged.csv_fields(),
            [
                "Stay",
                "Attack nothing",
                "Use nothing",
                "Destroy nothing",
                "Give nothing to anyone"
            ]
        );
    }
}
