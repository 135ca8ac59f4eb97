//! Episodic memory of interaction events.
//!
//! After each step the player's events are filtered to the ones involving it
//! and rendered to first-person text. Ticks with an interaction (combat,
//! kills, loot, gifts, death) are stored; purely individual events
//! (harvests, level-ups, consumption) only get a rendering via
//! [`individual_description`]. The log is append-only and never trimmed;
//! readers bound what they look at.

use foray_types::{EntityId, GameEvent, ItemKind, MergedAction};
use serde::Serialize;

/// One remembered tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryEntry {
    /// Tick the action was decided on.
    pub tick: u32,
    /// What the player did.
    pub action: MergedAction,
    /// The events of that step involving the player.
    pub events: Vec<GameEvent>,
    /// First-person rendering of the interaction events.
    pub description: String,
}

/// Append-only interaction log of one player.
#[derive(Debug, Clone)]
pub struct EpisodicMemory {
    owner: EntityId,
    entries: Vec<MemoryEntry>,
}

impl EpisodicMemory {
    /// An empty memory for `owner`.
    pub const fn new(owner: EntityId) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Record the outcome of the action decided on `tick`. Returns the
    /// stored entry, or `None` when the step held no interaction for the
    /// owner.
    pub fn record(
        &mut self,
        tick: u32,
        action: &MergedAction,
        events: &[GameEvent],
    ) -> Option<&MemoryEntry> {
        let mine: Vec<GameEvent> = events
            .iter()
            .filter(|e| e.involves(self.owner))
            .cloned()
            .collect();
        let description = interaction_description(self.owner, &mine);
        if description.is_empty() {
            return None;
        }
        self.entries.push(MemoryEntry {
            tick,
            action: action.clone(),
            events: mine,
            description,
        });
        self.entries.last()
    }

    /// All stored entries, oldest first.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// The events stored for the tick before `tick`; empty when nothing was
    /// stored.
    pub fn last_tick_record(&self, tick: u32) -> &[GameEvent] {
        let previous = tick.saturating_sub(1);
        self.entries
            .iter()
            .rev()
            .find(|e| e.tick == previous)
            .map(|e| e.events.as_slice())
            .unwrap_or_default()
    }

    /// The last `limit` entries rendered for a prompt; `None` when empty.
    pub fn recent_description(&self, limit: usize) -> Option<String> {
        let skip = self.entries.len().saturating_sub(limit);
        let recent = self.entries.get(skip..).unwrap_or_default();
        if recent.is_empty() {
            return None;
        }
        let mut out = String::new();
        for entry in recent {
            out.push_str(&format!(
                "Interaction event at tick {}: \n{}",
                entry.tick, entry.description
            ));
        }
        out.push('\n');
        Some(out)
    }
}

/// First-person text for the interaction events of `owner`; empty when
/// there are none.
pub fn interaction_description(owner: EntityId, events: &[GameEvent]) -> String {
    let mut out = String::new();

    for event in events {
        if let GameEvent::Attack {
            attacker,
            target,
            style,
            damage,
        } = event
            && *attacker == owner
        {
            out.push_str(&format!(
                "I attacked {target} with {} style, dealing {damage} damage. \n",
                style.title()
            ));
        }
    }
    for event in events {
        if let GameEvent::Attack {
            attacker,
            target,
            style,
            damage,
        } = event
            && *target == owner
        {
            out.push_str(&format!(
                "I was attacked by {attacker} with {} style, dealing {damage} damage. \n",
                style.title()
            ));
        }
    }

    let loot: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Loot {
                player,
                item,
                level,
                quantity,
            } if *player == owner => Some(format!("{quantity} level {level} {item}")),
            _ => None,
        })
        .collect();
    let mut loot_told = false;
    for event in events {
        if let GameEvent::Kill {
            killer,
            target,
            target_level,
            ..
        } = event
            && *killer == owner
        {
            out.push_str(&format!("I killed {target} with level {target_level}. "));
            if loot_told {
                out.push('\n');
                continue;
            }
            loot_told = true;
            if loot.is_empty() {
                out.push_str("But I didn't loot any items because your inventory is full. \n");
            } else {
                out.push_str(&format!(
                    "Therefore, I looted the following items: {}. \n",
                    natural_join(&loot)
                ));
            }
        }
    }

    let mut killed = false;
    for event in events {
        if let GameEvent::Kill {
            killer,
            target,
            killer_level,
            ..
        } = event
            && *target == owner
        {
            killed = true;
            out.push_str(&format!("I was killed by {killer}, who is level {killer_level}. \n"));
        }
    }
    if !killed
        && events
            .iter()
            .any(|e| matches!(e, GameEvent::Death { player } if *player == owner))
    {
        out.push_str("I died because my health reached zero. \n");
    }

    for event in events {
        match event {
            GameEvent::Give {
                giver,
                receiver,
                item,
                level,
                quantity,
            } if *giver == owner => {
                out.push_str(&format!("I gave {quantity} level {level} {item} to {receiver}. \n"));
            }
            GameEvent::Give {
                giver,
                receiver,
                item,
                level,
                quantity,
            } if *receiver == owner => {
                out.push_str(&format!(
                    "I was given {quantity} level {level} {item} by {giver}. \n"
                ));
            }
            _ => {}
        }
    }
    out
}

/// First-person text for the harvest, level-up and consume events of
/// `owner`.
pub fn individual_description(owner: EntityId, events: &[GameEvent]) -> String {
    let mut out = String::new();
    for event in events.iter().filter(|e| e.involves(owner)) {
        match event {
            GameEvent::Harvest {
                item,
                level,
                quantity,
                origin,
                ..
            } => {
                out.push_str(&format!(
                    "I harvest {quantity} level {level} {item} from {origin} tile. \n"
                ));
            }
            GameEvent::LevelUp { skill, level, .. } => {
                out.push_str(&format!(
                    "Your {} level has increased to level {level}. \n",
                    skill.name()
                ));
            }
            GameEvent::Consume {
                item,
                level,
                quantity,
                ..
            } => {
                let restore = level.saturating_mul(5).saturating_add(50);
                let effect = if *item == ItemKind::Ration {
                    "Food and Water"
                } else {
                    "Health"
                };
                out.push_str(&format!(
                    "I consume {quantity} level {level} {item}, restoring {restore} {effect}. \n"
                ));
            }
            _ => {}
        }
    }
    out
}

/// `a`, `a and b`, `a, b, and c`.
fn natural_join(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [a, b] => format!("{a} and {b}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use foray_types::{CombatStyle, Material, Skill};

    const ME: EntityId = EntityId(1);

    fn hit(attacker: i32, target: i32, damage: u32) -> GameEvent {
        GameEvent::Attack {
            attacker: EntityId(attacker),
            target: EntityId(target),
            style: CombatStyle::Range,
            damage,
        }
    }

    fn loot(item: ItemKind, level: u32) -> GameEvent {
        GameEvent::Loot {
            player: ME,
            item,
            level,
            quantity: 1,
        }
    }

    #[test]
    fn combat_is_told_from_both_sides() {
        let text = interaction_description(ME, &[hit(1, -3, 5), hit(-3, 1, 2), hit(2, -3, 9)]);
        assert_eq!(
            text,
            "I attacked NPC 3 with Range style, dealing 5 damage. \n\
             I was attacked by NPC 3 with Range style, dealing 2 damage. \n"
        );
    }

    #[test]
    fn kills_list_their_loot() {
        let kill = GameEvent::Kill {
            killer: ME,
            target: EntityId(-4),
            killer_level: 3,
            target_level: 2,
        };
        let text = interaction_description(
            ME,
            &[
                kill.clone(),
                loot(ItemKind::Hat, 2),
                loot(ItemKind::Arrow, 1),
                loot(ItemKind::Ration, 1),
            ],
        );
        assert_eq!(
            text,
            "I killed NPC 4 with level 2. Therefore, I looted the following items: \
             1 level 2 Hat, 1 level 1 Arrow, and 1 level 1 Ration. \n"
        );

        let full = interaction_description(ME, std::slice::from_ref(&kill));
        assert!(full.ends_with("because your inventory is full. \n"));
    }

    #[test]
    fn deaths_name_the_killer_or_the_cause() {
        let slain = interaction_description(
            ME,
            &[
                GameEvent::Kill {
                    killer: EntityId(-2),
                    target: ME,
                    killer_level: 5,
                    target_level: 1,
                },
                GameEvent::Death { player: ME },
            ],
        );
        assert_eq!(slain, "I was killed by NPC 2, who is level 5. \n");

        let starved = interaction_description(ME, &[GameEvent::Death { player: ME }]);
        assert_eq!(starved, "I died because my health reached zero. \n");
    }

    #[test]
    fn gifts_in_both_directions() {
        let give = |giver: i32, receiver: i32| GameEvent::Give {
            giver: EntityId(giver),
            receiver: EntityId(receiver),
            item: ItemKind::Potion,
            level: 1,
            quantity: 2,
        };
        let text = interaction_description(ME, &[give(1, 2), give(3, 1)]);
        assert_eq!(
            text,
            "I gave 2 level 1 Potion to Player 2. \nI was given 2 level 1 Potion by Player 3. \n"
        );
    }

    #[test]
    fn individual_events_render_separately() {
        let events = [
            GameEvent::Harvest {
                player: ME,
                item: ItemKind::Ration,
                level: 1,
                quantity: 1,
                origin: Material::Fish,
            },
            GameEvent::LevelUp {
                player: ME,
                skill: Skill::Fishing,
                level: 2,
            },
            GameEvent::Consume {
                player: ME,
                item: ItemKind::Potion,
                level: 2,
                quantity: 1,
            },
        ];
        assert_eq!(interaction_description(ME, &events), "");
        assert_eq!(
            individual_description(ME, &events),
            "I harvest 1 level 1 Ration from Fish tile. \n\
             Your Fishing level has increased to level 2. \n\
             I consume 1 level 2 Potion, restoring 60 Health. \n"
        );
    }

    #[test]
    fn only_interactions_are_stored() {
        let mut memory = EpisodicMemory::new(ME);
        let action = MergedAction::default();
        assert!(memory.record(1, &action, &[GameEvent::Death { player: EntityId(2) }]).is_none());
        assert!(memory.record(2, &action, &[hit(1, -3, 4), hit(2, -5, 1)]).is_some());
        assert!(memory.record(3, &action, &[]).is_none());
        assert_eq!(memory.entries().len(), 1);
        assert_eq!(memory.entries().first().unwrap().events.len(), 1);

        assert_eq!(memory.last_tick_record(3).len(), 1);
        assert!(memory.last_tick_record(4).is_empty());
    }

    #[test]
    fn recent_description_keeps_the_last_entries() {
        let mut memory = EpisodicMemory::new(ME);
        assert_eq!(memory.recent_description(5), None);
        let action = MergedAction::default();
        for tick in 1..=4 {
            memory.record(tick, &action, &[hit(1, -3, tick)]);
        }
        let text = memory.recent_description(2).unwrap();
        assert_eq!(
            text,
            concat!(
                "Interaction event at tick 3: \n",
                "I attacked NPC 3 with Range style, dealing 3 damage. \n",
                "Interaction event at tick 4: \n",
                "I attacked NPC 3 with Range style, dealing 4 damage. \n\n",
            )
        );
    }
}
