//! Signed entity identifiers.
//!
//! The simulation numbers players from 1 upward and NPCs from -1 downward.
//! The display name is the handle every prompt and action label uses.

use serde::{Deserialize, Serialize};

/// A player (positive) or NPC (negative) identifier. Zero means "nobody".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i32);

impl EntityId {
    /// The "nobody" id used for absent attacker/target links.
    pub const NONE: Self = Self(0);

    /// Return the raw signed value.
    pub const fn into_inner(self) -> i32 {
        self.0
    }

    /// Whether the id denotes a player.
    pub const fn is_player(self) -> bool {
        self.0 > 0
    }

    /// Whether the id denotes an NPC.
    pub const fn is_npc(self) -> bool {
        self.0 < 0
    }

    /// Whether the id is the "nobody" sentinel.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Display name: `Player {id}` or `NPC {-id}`.
    pub fn name(self) -> String {
        self.to_string()
    }

    /// Parse a display name back into an id.
    pub fn parse_name(name: &str) -> Option<Self> {
        if let Some(rest) = name.strip_prefix("Player ") {
            rest.parse::<i32>().ok().filter(|v| *v > 0).map(Self)
        } else if let Some(rest) = name.strip_prefix("NPC ") {
            rest.parse::<i32>()
                .ok()
                .filter(|v| *v > 0)
                .and_then(i32::checked_neg)
                .map(Self)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 > 0 {
            write!(f, "Player {}", self.0)
        } else {
            write!(f, "NPC {}", self.0.unsigned_abs())
        }
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(EntityId(7).name(), "Player 7");
        assert_eq!(EntityId(-3).name(), "NPC 3");
        assert!(EntityId(-3).is_npc());
        assert!(EntityId::NONE.is_none());
    }

    #[test]
    fn parse_names() {
        assert_eq!(EntityId::parse_name("Player 12"), Some(EntityId(12)));
        assert_eq!(EntityId::parse_name("NPC 4"), Some(EntityId(-4)));
        assert_eq!(EntityId::parse_name("NPC -4"), None);
        assert_eq!(EntityId::parse_name("Monster 1"), None);
    }
}
