//! Hand-built observations for unit tests.
//!
//! A [`Scene`] is a 21x21 grass map (13x13 playable square, border 4) with
//! player 1 at the centre and a vision radius of 3, so the default window
//! spans rows and columns 7..=13.

use std::collections::BTreeMap;
use std::sync::Arc;

use foray_types::{EntityId, GameSettings, ItemKind, Material, NpcKind, Position};
use foray_world::{AgentRow, EntityRow, InventoryRow, Observation, TileGrid, TileView};

use crate::extract::StateExtractor;

const SIZE: u32 = 21;
const RADIUS: i32 = 3;

#[derive(Clone)]
pub struct Scene {
    grid: TileGrid,
    agent: AgentRow,
    entities: Vec<EntityRow>,
    inventory: Vec<InventoryRow>,
    tick: u32,
    fog: BTreeMap<Position, f64>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            grid: TileGrid::filled(SIZE, Material::Grass),
            agent: AgentRow {
                id: EntityId(1),
                position: Position::new(10, 10),
                health: 100,
                food: 100,
                water: 100,
                damage: 0,
                attacker: EntityId::NONE,
                skills: [1; 8],
                in_combat: false,
            },
            entities: Vec::new(),
            inventory: Vec::new(),
            tick: 1,
            fog: BTreeMap::new(),
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings() -> GameSettings {
        GameSettings {
            map_size: 13,
            map_border: 4,
            vision_radius: 3,
            player_num: 2,
            npc_num: 4,
            horizon: 100,
            ..GameSettings::default()
        }
    }

    pub fn extractor() -> StateExtractor {
        StateExtractor::new(Self::settings())
    }

    pub fn entity_row(id: i32, kind: NpcKind, position: Position) -> EntityRow {
        EntityRow {
            id: EntityId(id),
            kind,
            position,
            damage: 0,
            attacker: EntityId::NONE,
            health: 100,
            melee_level: 1,
            range_level: 1,
            mage_level: 1,
        }
    }

    pub const fn at(mut self, position: Position) -> Self {
        self.agent.position = position;
        self
    }

    pub const fn tick(mut self, tick: u32) -> Self {
        self.tick = tick;
        self
    }

    pub const fn vitals(mut self, health: u32, food: u32, water: u32) -> Self {
        self.agent.health = health;
        self.agent.food = food;
        self.agent.water = water;
        self
    }

    pub const fn skills(mut self, skills: [u32; 8]) -> Self {
        self.agent.skills = skills;
        self
    }

    pub const fn in_combat(mut self, attacker: EntityId, damage: u32) -> Self {
        self.agent.in_combat = true;
        self.agent.attacker = attacker;
        self.agent.damage = damage;
        self
    }

    #[allow(clippy::unwrap_used)]
    pub fn tile(mut self, position: Position, material: Material) -> Self {
        self.grid.set(position, material).unwrap();
        self
    }

    pub fn fog(mut self, position: Position, value: f64) -> Self {
        self.fog.insert(position, value);
        self
    }

    pub fn entity(self, id: i32, kind: NpcKind, position: Position) -> Self {
        self.row(Self::entity_row(id, kind, position))
    }

    pub fn row(mut self, row: EntityRow) -> Self {
        self.entities.push(row);
        self
    }

    pub fn item(mut self, id: u32, kind: ItemKind, level: u32, equipped: bool) -> Self {
        self.inventory.push(InventoryRow {
            id,
            kind,
            level,
            quantity: 1,
            attack: [0; 3],
            defense: [0; 3],
            equipped,
        });
        self
    }

    pub fn map(&self) -> Arc<TileGrid> {
        Arc::new(self.grid.clone())
    }

    pub fn observe(&self) -> Observation {
        let centre = self.agent.position;
        let floor = -f64::from(SIZE);
        let mut tiles = Vec::new();
        for row in centre.row.saturating_sub(RADIUS)..=centre.row.saturating_add(RADIUS) {
            for col in centre.col.saturating_sub(RADIUS)..=centre.col.saturating_add(RADIUS) {
                let position = Position::new(row, col);
                if let Some(material) = self.grid.get(position) {
                    tiles.push(TileView {
                        position,
                        material,
                        fog: self.fog.get(&position).copied().unwrap_or(floor),
                    });
                }
            }
        }

        let [melee, range, mage, ..] = self.agent.skills;
        let mut entities = vec![EntityRow {
            id: self.agent.id,
            kind: NpcKind::Player,
            position: centre,
            damage: self.agent.damage,
            attacker: self.agent.attacker,
            health: self.agent.health,
            melee_level: melee,
            range_level: range,
            mage_level: mage,
        }];
        entities.extend(
            self.entities
                .iter()
                .filter(|e| centre.linf(e.position) <= RADIUS.unsigned_abs())
                .cloned(),
        );

        Observation {
            tick: self.tick,
            agent: self.agent.clone(),
            tiles,
            entities,
            inventory: self.inventory.clone(),
            map: self.map(),
        }
    }
}
