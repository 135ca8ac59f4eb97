//! Snapshot extraction from a raw observation.
//!
//! Tiles, resources and entities are assigned to areas with the
//! window-relative partition; only [`AgentInfo::region`] uses the absolute
//! map partition. Reachability is always computed with the bounded router
//! confined to the observation window.

use std::collections::BTreeMap;

use foray_types::{Area, Bounds, CombatStyle, GameSettings, Material, Position};
use foray_world::partition::area_of;
use foray_world::{EntityRow, Observation, TileGrid, TileView, WorldError, distance};
use tracing::debug;

use crate::error::AgentError;
use crate::snapshot::{
    AgentInfo, AreaMap, EntityInfo, FogInfo, FogStatus, Inventory, ItemInfo, Passability,
    ResourceCount, Snapshot,
};

/// Fog values above this are inside the fog.
const FOG_INSIDE: f64 = 0.5;

/// Fog values this close to zero lie on the fog edge.
const FOG_EDGE: f64 = 1e-10;

/// Builds a [`Snapshot`] from each observation.
#[derive(Debug, Clone)]
pub struct StateExtractor {
    settings: GameSettings,
}

impl StateExtractor {
    /// Create an extractor for a game played under `settings`.
    pub const fn new(settings: GameSettings) -> Self {
        Self { settings }
    }

    /// The game settings in use.
    pub const fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Extract the snapshot of `obs`. Deterministic for a given observation.
    pub fn extract(&self, obs: &Observation) -> Result<Snapshot, AgentError> {
        let window = obs.window_bounds()?;
        let tiles = obs
            .tiles
            .iter()
            .map(|t| Ok((area_of(window, t.position)?, t)))
            .collect::<Result<Vec<_>, WorldError>>()?;
        let mut reach = Reach::new(&obs.map, obs.agent.position, window);

        let fog = self
            .settings
            .fog_active(obs.tick)
            .then(|| self.fog_info(&tiles));

        Ok(Snapshot {
            agent: self.agent_info(obs)?,
            fog,
            resources: resource_info(&obs.map, &tiles, &mut reach),
            passability: passability(&tiles, &mut reach),
            entities: self.entity_info(obs, window),
            inventory: inventory(obs),
            capacity: u32::try_from(obs.inventory.len()).unwrap_or(u32::MAX),
        })
    }

    fn agent_info(&self, obs: &Observation) -> Result<AgentInfo, AgentError> {
        let row = &obs.agent;
        let region = area_of(self.settings.region_bounds(), row.position)?;
        let dist_to_center = row.position.l1(self.settings.center());
        let dist_to_safety_zone = if self.settings.fog_configured() {
            dist_to_center.saturating_sub(self.settings.fog_final_size / 2)
        } else {
            0
        };

        let around = row.position.adjacent().map(|p| obs.map.get(p));
        let water_around = around.contains(&Some(Material::Water));
        let fish_around = around.contains(&Some(Material::Fish));

        let mut attacker = None;
        let mut damage_taken = None;
        let mut target_of_attack = None;
        let mut damage_dealt = None;
        if row.in_combat {
            if !row.attacker.is_none() {
                attacker = Some(row.attacker);
                damage_taken = Some(row.damage);
            }
            if let Some(target) = obs
                .entities
                .iter()
                .rev()
                .find(|e| e.id != row.id && e.attacker == row.id)
            {
                target_of_attack = Some(target.id);
                damage_dealt = Some(target.damage);
            }
        }

        Ok(AgentInfo {
            id: row.id,
            position: row.position,
            health: row.health,
            food: row.food,
            water: row.water,
            skills: row.skills,
            region,
            dist_to_center,
            dist_to_safety_zone,
            tick: obs.tick,
            in_combat: row.in_combat,
            attacker,
            damage_taken,
            target_of_attack,
            damage_dealt,
            tile: obs.map.get(row.position).unwrap_or(Material::Void),
            water_around,
            fish_around,
        })
    }

    /// Classify each area by its tiles. An in-fog tile does not override a
    /// safe one and an edge tile does not override an in-fog one; safe tiles
    /// override anything. The permanent safe square stays unclassified.
    fn fog_info(&self, tiles: &[(Area, &TileView)]) -> AreaMap<FogInfo> {
        let permanent = -f64::from(self.settings.total_size());
        let mut fog = AreaMap::<FogInfo>::default();
        for (area, tile) in tiles {
            let slot = fog.get_mut(*area);
            let v = tile.fog;
            let next = if v > FOG_INSIDE {
                (slot.status != FogStatus::InSafety).then_some(FogInfo {
                    status: FogStatus::InFog,
                    damage: v.abs(),
                })
            } else if v.abs() < FOG_EDGE {
                (slot.status != FogStatus::InFog).then_some(FogInfo {
                    status: FogStatus::OnTheEdge,
                    damage: 0.0,
                })
            } else if v < 0.0 && v > permanent {
                Some(FogInfo {
                    status: FogStatus::InSafety,
                    damage: 0.0,
                })
            } else {
                None
            };
            if let Some(info) = next {
                *slot = info;
            }
        }
        fog
    }

    fn entity_info(&self, obs: &Observation, window: Bounds) -> AreaMap<Vec<EntityInfo>> {
        let origin = obs.agent.position;
        let mut out = AreaMap::<Vec<EntityInfo>>::default();
        for e in obs.entities.iter().filter(|e| e.id != obs.agent.id) {
            let Ok(area) = area_of(window, e.position) else {
                debug!(entity = %e.id, position = %e.position, "entity outside window, skipped");
                continue;
            };
            let style = dominant_style(e);
            let target_of_attack = obs
                .entities
                .iter()
                .rev()
                .find(|o| o.id != e.id && o.attacker == e.id)
                .map(|o| o.id);
            let attacker = (!e.attacker.is_none()).then_some(e.attacker);
            let dist = origin.linf(e.position);
            out.get_mut(area).push(EntityInfo {
                id: e.id,
                kind: e.kind,
                style,
                damage: e.damage,
                position: e.position,
                health: e.health,
                level: e.melee_level.max(e.range_level).max(e.mage_level),
                player_attackable: dist <= self.settings.reach(style),
                entity_attackable: CombatStyle::ALL
                    .iter()
                    .any(|s| dist <= self.settings.reach(*s)),
                in_combat: attacker.is_some() || target_of_attack.is_some(),
                attacker,
                target_of_attack,
            });
        }
        out
    }
}

/// Combat style with the strictly highest level; melee on ties.
pub fn dominant_style(e: &EntityRow) -> CombatStyle {
    let (melee, range, mage) = (e.melee_level, e.range_level, e.mage_level);
    if range > melee && range > mage {
        CombatStyle::Range
    } else if mage > melee && mage > range {
        CombatStyle::Mage
    } else {
        CombatStyle::Melee
    }
}

/// Cells from which a tile of `material` at `pos` is worked: the tile itself
/// when passable, otherwise its habitable orthogonal neighbours.
pub fn approach_cells(grid: &TileGrid, pos: Position, material: Material) -> Vec<Position> {
    if material.is_impassable() {
        pos.adjacent()
            .into_iter()
            .filter(|p| grid.is_habitable(*p))
            .collect()
    } else {
        vec![pos]
    }
}

/// Memoised "is there a path" queries from one start within one window.
struct Reach<'a> {
    grid: &'a TileGrid,
    start: Position,
    bounds: Bounds,
    memo: BTreeMap<Position, bool>,
}

impl<'a> Reach<'a> {
    const fn new(grid: &'a TileGrid, start: Position, bounds: Bounds) -> Self {
        Self {
            grid,
            start,
            bounds,
            memo: BTreeMap::new(),
        }
    }

    fn reachable(&mut self, goal: Position) -> bool {
        let (grid, start, bounds) = (self.grid, self.start, self.bounds);
        *self
            .memo
            .entry(goal)
            .or_insert_with(|| distance(grid, start, goal, Some(bounds)).is_some())
    }
}

/// Visible and reachable counts of resources, harvested remains and Void.
fn resource_info(
    grid: &TileGrid,
    tiles: &[(Area, &TileView)],
    reach: &mut Reach<'_>,
) -> AreaMap<BTreeMap<Material, ResourceCount>> {
    let mut out = AreaMap::<BTreeMap<Material, ResourceCount>>::default();
    for (area, tile) in tiles {
        let material = tile.material;
        let origin = material.harvested_origin();
        if !(material.is_resource() || origin.is_some() || material == Material::Void) {
            continue;
        }
        let count = out
            .get_mut(*area)
            .entry(material)
            .or_insert_with(|| ResourceCount {
                visible: 0,
                reachable: 0,
                is_resource: material.is_resource(),
                is_passable: !material.is_impassable(),
                origin,
            });
        count.visible = count.visible.saturating_add(1);
        if material.is_resource()
            && approach_cells(grid, tile.position, material)
                .into_iter()
                .any(|p| reach.reachable(p))
        {
            count.reachable = count.reachable.saturating_add(1);
        }
    }
    out
}

fn passability(tiles: &[(Area, &TileView)], reach: &mut Reach<'_>) -> AreaMap<Passability> {
    let mut out = AreaMap::<Passability>::default();
    for (area, tile) in tiles {
        let slot = out.get_mut(*area);
        slot.visited = slot.visited.saturating_add(1);
        if tile.material.is_impassable() {
            continue;
        }
        slot.passable = slot.passable.saturating_add(1);
        if reach.reachable(tile.position) {
            slot.reachable = slot.reachable.saturating_add(1);
        }
    }
    out
}

fn inventory(obs: &Observation) -> Inventory {
    let mut inv = Inventory::default();
    for row in &obs.inventory {
        inv.push(ItemInfo {
            id: row.id,
            kind: row.kind,
            level: row.level,
            equipped: row.equipped,
            quantity: row.quantity,
            attack: row.attack,
            defense: row.defense,
        });
    }
    inv
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::Scene;
    use foray_types::{EntityId, ItemKind, NpcKind};

    #[test]
    fn window_partition_drives_areas() {
        // Window rows/cols 7..=13 split 2/3/2.
        let obs = Scene::new()
            .entity(-1, NpcKind::Passive, Position::new(7, 7))
            .entity(-2, NpcKind::Aggressive, Position::new(10, 11))
            .entity(2, NpcKind::Player, Position::new(13, 10))
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        assert_eq!(snap.agent.region, Area::Center);
        assert_eq!(snap.entities.get(Area::Northwest).len(), 1);
        assert_eq!(snap.entities.get(Area::Center).len(), 1);
        assert_eq!(snap.entities.get(Area::South).len(), 1);
        assert_eq!(snap.passability.get(Area::Center).visited, 9);
        assert_eq!(snap.passability.get(Area::North).visited, 6);
        assert_eq!(snap.passability.get(Area::Northwest).visited, 4);
        let total: u32 = snap.passability.values().map(|p| p.visited).sum();
        assert_eq!(total, 49);
        assert_eq!(
            snap.center_entity_ids(),
            vec![EntityId(-2)],
            "self is never listed"
        );
    }

    #[test]
    fn walled_resources_are_visible_but_not_reachable() {
        use Material::{Stone, Tree, Water};
        // A tree sealed by stone in the north-east corner, and a pond next
        // to the player.
        let obs = Scene::new()
            .tile(Position::new(7, 13), Tree)
            .tile(Position::new(7, 12), Stone)
            .tile(Position::new(8, 13), Stone)
            .tile(Position::new(8, 12), Stone)
            .tile(Position::new(9, 11), Water)
            .tile(Position::new(11, 9), Tree)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let ne = snap.resources.get(Area::Northeast);
        let tree = ne.get(&Tree).unwrap();
        assert_eq!((tree.visible, tree.reachable), (1, 0));
        assert!(tree.is_resource && tree.is_passable);
        let center = snap.resources.get(Area::Center);
        assert_eq!(center.get(&Water).unwrap().reachable, 1);
        assert!(!center.get(&Water).unwrap().is_passable);
        assert_eq!(center.get(&Tree).unwrap().reachable, 1);
    }

    #[test]
    fn harvested_remains_carry_their_origin() {
        let obs = Scene::new()
            .tile(Position::new(10, 11), Material::Stump)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let stump = snap
            .resources
            .get(Area::Center)
            .get(&Material::Stump)
            .copied()
            .unwrap();
        assert!(!stump.is_resource);
        assert_eq!(stump.origin, Some(Material::Tree));
        assert_eq!(stump.reachable, 0);
    }

    #[test]
    fn blocked_area_is_unreachable() {
        let mut scene = Scene::new();
        for col in 7..=13 {
            scene = scene.tile(Position::new(9, col), Material::Stone);
        }
        let snap = Scene::extractor().extract(&scene.observe()).unwrap();
        assert!(!snap.passability.get(Area::North).is_reachable());
        assert!(!snap.passability.get(Area::Northwest).is_reachable());
        assert!(snap.passability.get(Area::South).is_reachable());
    }

    #[test]
    fn fog_is_absent_before_onset() {
        let mut settings = Scene::settings();
        settings.fog_onset = Some(5);
        let extractor = StateExtractor::new(settings);
        let early = Scene::new().tick(4).observe();
        assert!(extractor.extract(&early).unwrap().fog.is_none());

        let late = Scene::new()
            .tick(5)
            .fog(Position::new(7, 10), 3.0)
            .fog(Position::new(12, 10), -2.0)
            .fog(Position::new(10, 7), 0.0)
            .observe();
        let fog = extractor.extract(&late).unwrap().fog.unwrap();
        assert_eq!(fog.get(Area::North).status, FogStatus::InFog);
        assert!((fog.get(Area::North).damage - 3.0).abs() < 1e-9);
        assert_eq!(fog.get(Area::South).status, FogStatus::InSafety);
        assert_eq!(fog.get(Area::West).status, FogStatus::OnTheEdge);
        assert_eq!(fog.get(Area::East).status, FogStatus::OutOfFog);
    }

    #[test]
    fn entity_style_combat_and_reach() {
        let mut archer = Scene::entity_row(-3, NpcKind::Neutral, Position::new(10, 13));
        archer.range_level = 4;
        archer.melee_level = 2;
        let mut tied = Scene::entity_row(-4, NpcKind::Passive, Position::new(11, 10));
        tied.range_level = 3;
        tied.mage_level = 3;
        tied.attacker = EntityId(1);
        let obs = Scene::new().row(archer).row(tied).observe();
        let snap = Scene::extractor().extract(&obs).unwrap();

        let east = snap.entities.get(Area::East).first().unwrap();
        assert_eq!(east.style, CombatStyle::Range);
        assert_eq!(east.level, 4);
        assert!(east.player_attackable, "range reach 3 covers distance 3");
        assert!(east.entity_attackable);
        assert!(!east.in_combat);

        let near = snap.entities.get(Area::Center).first().unwrap();
        assert_eq!(near.style, CombatStyle::Melee);
        assert!(near.in_combat);
        assert_eq!(near.attacker, Some(EntityId(1)));
    }

    #[test]
    fn ego_combat_fields_only_in_combat() {
        let mut target = Scene::entity_row(-5, NpcKind::Neutral, Position::new(10, 11));
        target.attacker = EntityId(1);
        target.damage = 7;
        let calm = Scene::new().row(target.clone()).observe();
        let snap = Scene::extractor().extract(&calm).unwrap();
        assert_eq!(snap.agent.target_of_attack, None);

        let obs = Scene::new()
            .row(target)
            .in_combat(EntityId(-5), 4)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        assert_eq!(snap.agent.attacker, Some(EntityId(-5)));
        assert_eq!(snap.agent.damage_taken, Some(4));
        assert_eq!(snap.agent.target_of_attack, Some(EntityId(-5)));
        assert_eq!(snap.agent.damage_dealt, Some(7));
    }

    #[test]
    fn inventory_is_categorised() {
        let obs = Scene::new()
            .item(1, ItemKind::Hat, 1, true)
            .item(2, ItemKind::Spear, 2, false)
            .item(3, ItemKind::Rod, 1, false)
            .item(4, ItemKind::Arrow, 1, false)
            .item(5, ItemKind::Ration, 1, false)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        assert_eq!(snap.capacity, 5);
        assert_eq!(snap.inventory.armor.len(), 1);
        assert_eq!(snap.inventory.weapon.len(), 1);
        assert_eq!(snap.inventory.tool.len(), 1);
        assert_eq!(snap.inventory.ammunition.len(), 1);
        assert_eq!(snap.inventory.consumable.len(), 1);
        let ids: Vec<u32> = snap.inventory.all().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn position_context_and_adjacency() {
        let mut settings = Scene::settings();
        settings.fog_onset = Some(100);
        settings.fog_final_size = 4;
        let obs = Scene::new()
            .at(Position::new(13, 13))
            .tile(Position::new(13, 14), Material::Water)
            .tile(Position::new(12, 13), Material::Fish)
            .observe();
        let snap = StateExtractor::new(settings).extract(&obs).unwrap();
        assert_eq!(snap.agent.dist_to_center, 6);
        assert_eq!(snap.agent.dist_to_safety_zone, 4);
        assert!(snap.agent.water_around);
        assert!(snap.agent.fish_around);
        assert_eq!(snap.agent.region, Area::Southeast);
    }

    #[test]
    fn extraction_is_deterministic() {
        let obs = Scene::new()
            .tile(Position::new(8, 8), Material::Ore)
            .tile(Position::new(12, 9), Material::Water)
            .entity(-1, NpcKind::Passive, Position::new(9, 9))
            .item(3, ItemKind::Potion, 1, false)
            .observe();
        let extractor = Scene::extractor();
        assert_eq!(extractor.extract(&obs).unwrap(), extractor.extract(&obs).unwrap());
    }
}
