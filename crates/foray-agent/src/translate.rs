//! Directive → native action translation.
//!
//! All entity and item indices are looked up in the observation passed to
//! [`Translator::translate`]; nothing is cached across ticks. Movement goes
//! through the bounded router confined to the observation window.
//!
//! [`LabelParser`] is the inverse of the directive labels: it reads a merged
//! action's text back into directives, for replaying logged actions and for
//! checking that every generated label stays parseable.

use std::str::FromStr;

use foray_types::{
    Area, AttackOrder, Bounds, CombatStyle, Direction, EntityId, GiveOrder, ItemKind, Material,
    MergedAction, NativeAction,
};
use foray_world::partition::area_midpoint;
use foray_world::{Observation, route};
use regex::{Captures, Regex};
use tracing::debug;

use crate::action_space::{
    AttackDirective, DestroyDirective, GiveDirective, ItemRef, MlDirective, MoveDirective, Plan,
    UseDirective,
};
use crate::error::AgentError;
use crate::extract::approach_cells;

/// Resolves plans against the current observation.
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    path_find_depth: u32,
}

impl Translator {
    /// `path_find_depth` is how many rings around a blocked area midpoint
    /// are searched for a reachable cell.
    pub const fn new(path_find_depth: u32) -> Self {
        Self { path_find_depth }
    }

    /// Translate all four decisions of `plan`.
    pub fn translate(&self, plan: &Plan, obs: &Observation) -> Result<NativeAction, AgentError> {
        Ok(NativeAction {
            direction: self.direction(plan.ml.movement, obs)?,
            attack: attack_order(plan.ml.attack, obs),
            use_item: plan
                .item_use
                .item()
                .map(|item| item_index(obs, item.id))
                .transpose()?,
            destroy_item: match plan.destroy {
                DestroyDirective::Nothing => None,
                DestroyDirective::Destroy(item) => Some(item_index(obs, item.id)?),
            },
            give: match plan.give {
                GiveDirective::Nothing => None,
                GiveDirective::Give { item, target } => Some(GiveOrder {
                    item: item_index(obs, item.id)?,
                    target: obs
                        .entity_index(target)
                        .ok_or(AgentError::MissingEntity(target))?,
                }),
            },
        })
    }

    /// First step for a movement directive.
    pub fn direction(
        &self,
        movement: MoveDirective,
        obs: &Observation,
    ) -> Result<Direction, AgentError> {
        let window = obs.window_bounds()?;
        let start = obs.agent.position;
        let direction = match movement {
            MoveDirective::Stay => Direction::Stay,
            MoveDirective::ToArea(area) => self.toward_area(obs, window, area)?,
            MoveDirective::ToNearest(material) => toward_nearest(obs, window, material),
            MoveDirective::Chase(id) => match obs.entity(id) {
                Some(target) => route(&obs.map, start, target.position, Some(window)).direction,
                None => {
                    debug!(agent_id = %obs.agent.id, target = %id, "chase target vanished");
                    Direction::Stay
                }
            },
            MoveDirective::Evade(id) => evade(obs, window, id),
        };
        Ok(direction)
    }

    /// Route toward the midpoint of `area`, or toward the first reachable
    /// cell on the rings around it.
    fn toward_area(
        &self,
        obs: &Observation,
        window: Bounds,
        area: Area,
    ) -> Result<Direction, AgentError> {
        let mid = area_midpoint(window, area)?;
        let depth = i32::try_from(self.path_find_depth).unwrap_or(i32::MAX);
        let rings = (1..=depth).flat_map(move |d| {
            mid.adjacent().into_iter().map(move |p| {
                let (d_row, d_col) = mid.delta_to(p);
                mid.offset(d_row.saturating_mul(d), d_col.saturating_mul(d))
            })
        });
        for goal in std::iter::once(mid).chain(rings) {
            if !obs.map.is_habitable(goal) {
                continue;
            }
            let found = route(&obs.map, obs.agent.position, goal, Some(window));
            if found.is_reachable() {
                return Ok(found.direction);
            }
        }
        debug!(agent_id = %obs.agent.id, area = %area, "no reachable cell near area midpoint");
        Ok(Direction::Stay)
    }
}

fn toward_nearest(obs: &Observation, window: Bounds, material: Material) -> Direction {
    let mut best: Option<(u32, Direction)> = None;
    for tile in obs.tiles.iter().filter(|t| t.material == material) {
        for cell in approach_cells(&obs.map, tile.position, material) {
            let found = route(&obs.map, obs.agent.position, cell, Some(window));
            if let Some(length) = found.length
                && best.is_none_or(|(shortest, _)| length < shortest)
            {
                best = Some((length, found.direction));
            }
        }
    }
    best.map_or(Direction::Stay, |(_, direction)| direction)
}

/// Step to the open neighbour farthest from the entity; stay when no step
/// increases the distance.
fn evade(obs: &Observation, window: Bounds, id: EntityId) -> Direction {
    let Some(threat) = obs.entity(id) else {
        return Direction::Stay;
    };
    let start = obs.agent.position;
    let mut best = (start.l1(threat.position), Direction::Stay);
    for direction in Direction::MOVES {
        let next = start.step(direction);
        if !window.contains(next) || !obs.map.is_habitable(next) {
            continue;
        }
        let dist = next.l1(threat.position);
        if dist > best.0 {
            best = (dist, direction);
        }
    }
    best.1
}

fn attack_order(attack: AttackDirective, obs: &Observation) -> Option<AttackOrder> {
    let AttackDirective::Target { target, style } = attack else {
        return None;
    };
    let Some(index) = obs.entity_index(target) else {
        debug!(agent_id = %obs.agent.id, target = %target, "attack target vanished");
        return None;
    };
    Some(AttackOrder {
        target: index,
        style,
    })
}

fn item_index(obs: &Observation, id: u32) -> Result<usize, AgentError> {
    obs.item_index(id).ok_or(AgentError::MissingItem(id))
}

// ---------------------------------------------------------------------------
// Label parsing
// ---------------------------------------------------------------------------

const ENTITY: &str = r"(Player \d+|NPC \d+)";
const ITEM: &str = r"level (\d+) (\w+) with id (\d+)";

/// Regex parser for directive labels.
#[derive(Debug, Clone)]
pub struct LabelParser {
    nearest: Regex,
    area: Regex,
    chase: Regex,
    evade: Regex,
    attack: Regex,
    item_use: Regex,
    destroy: Regex,
    give: Regex,
}

impl LabelParser {
    /// Compile the label patterns.
    pub fn new() -> Result<Self, AgentError> {
        Ok(Self {
            nearest: Regex::new(r"^Move to the nearest (\w+) tile$")?,
            area: Regex::new(r"^Move to the (\w+) area$")?,
            chase: Regex::new(&format!("^Chase {ENTITY}$"))?,
            evade: Regex::new(&format!("^Evade {ENTITY}$"))?,
            attack: Regex::new(&format!(r"^Attack {ENTITY} with (\w+)$"))?,
            item_use: Regex::new(&format!("^(Equip|Unequip|Use) {ITEM}$"))?,
            destroy: Regex::new(&format!("^Destroy {ITEM}$"))?,
            give: Regex::new(&format!("^Give {ITEM} to (Player \\d+)$"))?,
        })
    }

    /// Parse all five labels of a merged action.
    pub fn parse_plan(&self, merged: &MergedAction) -> Result<Plan, AgentError> {
        Ok(Plan {
            ml: MlDirective {
                movement: self.parse_move(&merged.r#move)?,
                attack: self.parse_attack(&merged.attack)?,
            },
            item_use: self.parse_use(&merged.r#use)?,
            destroy: self.parse_destroy(&merged.destroy)?,
            give: self.parse_give(&merged.give)?,
        })
    }

    /// Parse a movement label.
    pub fn parse_move(&self, label: &str) -> Result<MoveDirective, AgentError> {
        const CATEGORY: &str = "move";
        if label == MoveDirective::Stay.label() {
            return Ok(MoveDirective::Stay);
        }
        if let Some(caps) = self.nearest.captures(label) {
            let material = Material::from_name(group(&caps, 1))
                .ok()
                .ok_or_else(|| unparseable(CATEGORY, label))?;
            return Ok(MoveDirective::ToNearest(material));
        }
        if let Some(caps) = self.area.captures(label) {
            let area = Area::from_name(group(&caps, 1))
                .ok()
                .ok_or_else(|| unparseable(CATEGORY, label))?;
            return Ok(MoveDirective::ToArea(area));
        }
        if let Some(caps) = self.chase.captures(label) {
            return Ok(MoveDirective::Chase(entity(&caps, 1, CATEGORY, label)?));
        }
        if let Some(caps) = self.evade.captures(label) {
            return Ok(MoveDirective::Evade(entity(&caps, 1, CATEGORY, label)?));
        }
        Err(unparseable(CATEGORY, label))
    }

    /// Parse an attack label.
    pub fn parse_attack(&self, label: &str) -> Result<AttackDirective, AgentError> {
        const CATEGORY: &str = "attack";
        if label == AttackDirective::Nothing.label() {
            return Ok(AttackDirective::Nothing);
        }
        let caps = self
            .attack
            .captures(label)
            .ok_or_else(|| unparseable(CATEGORY, label))?;
        let style = CombatStyle::from_label(group(&caps, 2))
            .ok()
            .ok_or_else(|| unparseable(CATEGORY, label))?;
        Ok(AttackDirective::Target {
            target: entity(&caps, 1, CATEGORY, label)?,
            style,
        })
    }

    /// Parse a use, equip or unequip label.
    pub fn parse_use(&self, label: &str) -> Result<UseDirective, AgentError> {
        const CATEGORY: &str = "use";
        if label == UseDirective::Nothing.label() {
            return Ok(UseDirective::Nothing);
        }
        let caps = self
            .item_use
            .captures(label)
            .ok_or_else(|| unparseable(CATEGORY, label))?;
        let item = item_ref(&caps, 2, CATEGORY, label)?;
        match group(&caps, 1) {
            "Equip" => Ok(UseDirective::Equip(item)),
            "Unequip" => Ok(UseDirective::Unequip(item)),
            _ => Ok(UseDirective::Consume(item)),
        }
    }

    /// Parse a destroy label.
    pub fn parse_destroy(&self, label: &str) -> Result<DestroyDirective, AgentError> {
        const CATEGORY: &str = "destroy";
        if label == DestroyDirective::Nothing.label() {
            return Ok(DestroyDirective::Nothing);
        }
        let caps = self
            .destroy
            .captures(label)
            .ok_or_else(|| unparseable(CATEGORY, label))?;
        Ok(DestroyDirective::Destroy(item_ref(&caps, 1, CATEGORY, label)?))
    }

    /// Parse a give label.
    pub fn parse_give(&self, label: &str) -> Result<GiveDirective, AgentError> {
        const CATEGORY: &str = "give";
        if label == GiveDirective::Nothing.label() {
            return Ok(GiveDirective::Nothing);
        }
        let caps = self
            .give
            .captures(label)
            .ok_or_else(|| unparseable(CATEGORY, label))?;
        Ok(GiveDirective::Give {
            item: item_ref(&caps, 1, CATEGORY, label)?,
            target: entity(&caps, 4, CATEGORY, label)?,
        })
    }
}

fn unparseable(category: &'static str, label: &str) -> AgentError {
    AgentError::UnparseableLabel {
        category,
        label: label.to_owned(),
    }
}

fn group<'h>(caps: &Captures<'h>, index: usize) -> &'h str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn number<T: FromStr>(
    caps: &Captures<'_>,
    index: usize,
    category: &'static str,
    label: &str,
) -> Result<T, AgentError> {
    group(caps, index)
        .parse()
        .ok()
        .ok_or_else(|| unparseable(category, label))
}

fn entity(
    caps: &Captures<'_>,
    index: usize,
    category: &'static str,
    label: &str,
) -> Result<EntityId, AgentError> {
    EntityId::parse_name(group(caps, index)).ok_or_else(|| unparseable(category, label))
}

/// The `level / name / id` triple starting at capture group `first`.
fn item_ref(
    caps: &Captures<'_>,
    first: usize,
    category: &'static str,
    label: &str,
) -> Result<ItemRef, AgentError> {
    let level = number(caps, first, category, label)?;
    let name = group(caps, first.saturating_add(1));
    let kind = ItemKind::from_name(name).map_err(|e| AgentError::UnknownItem(e.name))?;
    let id = number(caps, first.saturating_add(2), category, label)?;
    Ok(ItemRef { id, kind, level })
}
