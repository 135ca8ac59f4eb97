//! A seeded reference [`Simulation`] implementing the survival rules.
//!
//! # Step order
//!
//! 1. Item actions (use/equip, give, destroy) resolved against the inventory
//!    and entity lists each player observed before the step.
//! 2. Player movement, then NPC behaviour (wander, retaliate, hunt).
//! 3. Simultaneous attack resolution, kills and loot.
//! 4. Harvesting on and next to each player's tile.
//! 5. Survival upkeep (food/water decay, starvation, regeneration) and fog.
//! 6. Deaths, NPC respawns, regrowth of harvested tiles.

use std::collections::BTreeMap;
use std::sync::Arc;

use foray_types::{
    Bounds, CombatStyle, Direction, EntityId, GameEvent, GameSettings, ItemCategory, ItemKind,
    Material, NativeAction, NpcKind, Position, Skill,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::fog;
use crate::grid::TileGrid;
use crate::mapgen;
use crate::observation::{AgentRow, EntityRow, InventoryRow, Observation, TileView};
use crate::route;
use crate::simulation::{Simulation, StepOutcome};

/// Food and water lost per tick.
pub const DEPLETION: u32 = 5;
/// Health lost per tick for each empty vital.
pub const STARVATION: u32 = 10;
/// Health regained per tick when food and water are both above half.
pub const REGENERATION: u32 = 10;
/// Ticks after the last hit during which an entity counts as in combat.
const COMBAT_WINDOW: u32 = 3;
/// Ticks before a harvested tile regrows.
const REGROW_TICKS: u32 = 20;
/// Ticks before a dead NPC respawns.
const RESPAWN_TICKS: u32 = 30;
/// Chance an idle NPC takes a random step.
const WANDER: f64 = 0.3;
/// Chance a Tree, Ore or Crystal harvest drops a weapon instead of ammo.
pub const WEAPON_DROP: f64 = 0.025;
/// Aggressive NPCs notice players within this Chebyshev distance.
const HUNT_RADIUS: u32 = 5;
/// Highest NPC level, reached at the map centre.
const MAX_NPC_LEVEL: u32 = 10;
/// Full vital value.
const FULL: u32 = 100;

#[derive(Debug, Clone)]
struct Body {
    id: EntityId,
    kind: NpcKind,
    position: Position,
    health: u32,
    food: u32,
    water: u32,
    levels: [u32; 8],
    exp: [u32; 8],
    damage: u32,
    attacker: EntityId,
    last_hit_by: EntityId,
    last_combat_tick: Option<u32>,
    inventory: Vec<InventoryRow>,
    alive: bool,
    respawn_at: Option<u32>,
}

impl Body {
    fn new(id: EntityId, kind: NpcKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            health: FULL,
            food: FULL,
            water: FULL,
            levels: [1; 8],
            exp: [0; 8],
            damage: 0,
            attacker: EntityId::NONE,
            last_hit_by: EntityId::NONE,
            last_combat_tick: None,
            inventory: Vec::new(),
            alive: true,
            respawn_at: None,
        }
    }

    fn level(&self, skill: Skill) -> u32 {
        self.levels.get(skill.index()).copied().unwrap_or(1)
    }

    fn combat_level(&self) -> u32 {
        self.level(Skill::Melee)
            .max(self.level(Skill::Range))
            .max(self.level(Skill::Mage))
    }

    /// Strictly highest combat skill, melee on ties.
    fn style(&self) -> CombatStyle {
        let (m, r, g) = (
            self.level(Skill::Melee),
            self.level(Skill::Range),
            self.level(Skill::Mage),
        );
        if r > m && r > g {
            CombatStyle::Range
        } else if g > m && g > r {
            CombatStyle::Mage
        } else {
            CombatStyle::Melee
        }
    }

    fn in_combat(&self, tick: u32) -> bool {
        self.last_combat_tick
            .is_some_and(|t| tick.saturating_sub(t) < COMBAT_WINDOW)
    }

    fn equipped(&self, pred: impl Fn(ItemKind) -> bool) -> Option<&InventoryRow> {
        self.inventory.iter().find(|i| i.equipped && pred(i.kind))
    }

    fn attack_power(&self, style: CombatStyle) -> u32 {
        let idx = usize::from(style.index());
        let bonus: u32 = self
            .inventory
            .iter()
            .filter(|i| i.equipped)
            .map(|i| i.attack.get(idx).copied().unwrap_or(0))
            .fold(0, u32::saturating_add);
        self.level(style.skill())
            .saturating_mul(2)
            .saturating_add(5)
            .saturating_add(bonus)
    }

    fn defense(&self, style: CombatStyle) -> u32 {
        let idx = usize::from(style.index());
        self.inventory
            .iter()
            .filter(|i| i.equipped)
            .map(|i| i.defense.get(idx).copied().unwrap_or(0))
            .fold(0, u32::saturating_add)
    }

    fn gain_exp(&mut self, skill: Skill) -> Option<u32> {
        let idx = skill.index();
        let level = self.levels.get_mut(idx)?;
        let exp = self.exp.get_mut(idx)?;
        *exp = exp.saturating_add(1);
        if *exp >= level.saturating_mul(5) {
            *exp = 0;
            *level = level.saturating_add(1);
            return Some(*level);
        }
        None
    }

    fn to_entity_row(&self) -> EntityRow {
        EntityRow {
            id: self.id,
            kind: self.kind,
            position: self.position,
            damage: self.damage,
            attacker: self.attacker,
            health: self.health,
            melee_level: self.level(Skill::Melee),
            range_level: self.level(Skill::Range),
            mage_level: self.level(Skill::Mage),
        }
    }
}

/// Equipment slot an item occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Hat,
    Top,
    Bottom,
    Held,
    Ammunition,
}

const fn slot(kind: ItemKind) -> Option<Slot> {
    match kind {
        ItemKind::Hat => Some(Slot::Hat),
        ItemKind::Top => Some(Slot::Top),
        ItemKind::Bottom => Some(Slot::Bottom),
        ItemKind::Ration | ItemKind::Potion => None,
        k => match k.category() {
            ItemCategory::Ammunition => Some(Slot::Ammunition),
            _ => Some(Slot::Held),
        },
    }
}

const fn weapon_style(kind: ItemKind) -> Option<CombatStyle> {
    match kind {
        ItemKind::Spear | ItemKind::Whetstone => Some(CombatStyle::Melee),
        ItemKind::Bow | ItemKind::Arrow => Some(CombatStyle::Range),
        ItemKind::Wand | ItemKind::Runes => Some(CombatStyle::Mage),
        _ => None,
    }
}

/// The seeded sandbox world.
#[derive(Debug)]
pub struct Sandbox {
    settings: GameSettings,
    rng: StdRng,
    map: Arc<TileGrid>,
    regrow: Vec<(u32, Position, Material)>,
    tick: u32,
    bodies: BTreeMap<EntityId, Body>,
    next_item_id: u32,
}

impl Sandbox {
    /// Build and populate a new world.
    pub fn new(settings: GameSettings, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let map = mapgen::generate(&settings, &mut rng);
        let mut sandbox = Self {
            settings,
            rng,
            map: Arc::new(map),
            regrow: Vec::new(),
            tick: 0,
            bodies: BTreeMap::new(),
            next_item_id: 1,
        };
        sandbox.spawn_players();
        if sandbox.settings.npc_enabled {
            sandbox.spawn_npcs();
        }
        debug!(
            players = sandbox.settings.player_num,
            npcs = sandbox.bodies.len(),
            seed,
            "sandbox reset"
        );
        sandbox
    }

    /// The rules this world runs under.
    pub const fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// The current map.
    pub fn map(&self) -> Arc<TileGrid> {
        Arc::clone(&self.map)
    }

    fn playable(&self) -> (i32, i32) {
        let lo = i32::try_from(self.settings.map_border).unwrap_or(0);
        let hi = i32::try_from(
            self.settings
                .map_border
                .saturating_add(self.settings.map_size),
        )
        .unwrap_or(lo)
        .saturating_sub(1);
        (lo, hi)
    }

    fn random_habitable(&mut self, accept: impl Fn(Position) -> bool) -> Position {
        let (lo, hi) = self.playable();
        for _ in 0..10_000 {
            let pos = Position::new(
                self.rng.random_range(lo..=hi),
                self.rng.random_range(lo..=hi),
            );
            if self.map.is_habitable(pos) && accept(pos) {
                return pos;
            }
        }
        self.settings.center()
    }

    fn spawn_players(&mut self) {
        let (lo, hi) = self.playable();
        let center = self.settings.center();
        let ring = u32::try_from(hi.saturating_sub(lo)).unwrap_or(0) / 2;
        for n in 1..=self.settings.player_num {
            let id = EntityId(i32::try_from(n).unwrap_or(i32::MAX));
            let pos = self.random_habitable(|p| p.linf(center).saturating_add(2) >= ring);
            self.bodies.insert(id, Body::new(id, NpcKind::Player, pos));
        }
    }

    fn npc_profile(&self, pos: Position) -> (NpcKind, u32) {
        let half = self.settings.map_size / 2;
        let d = pos.linf(self.settings.center()).min(half);
        let closeness = half.saturating_sub(d);
        let level = closeness
            .saturating_mul(MAX_NPC_LEVEL.saturating_sub(1))
            .checked_div(half)
            .unwrap_or(0)
            .saturating_add(1);
        let kind = if d.saturating_mul(3) > half.saturating_mul(2) {
            NpcKind::Passive
        } else if d.saturating_mul(3) > half {
            NpcKind::Neutral
        } else {
            NpcKind::Aggressive
        };
        (kind, level)
    }

    fn place_npc(&mut self, id: EntityId) {
        let players: Vec<Position> = self
            .bodies
            .values()
            .filter(|b| b.kind == NpcKind::Player && b.alive)
            .map(|b| b.position)
            .collect();
        let pos = self.random_habitable(|p| players.iter().all(|q| q.linf(p) > 3));
        let (kind, level) = self.npc_profile(pos);
        let mut body = Body::new(id, kind, pos);
        let main = *CombatStyle::ALL.choose(&mut self.rng).unwrap_or(&CombatStyle::Melee);
        for style in CombatStyle::ALL {
            let lvl = if style == main {
                level
            } else {
                (level / 2).max(1)
            };
            if let Some(slot) = body.levels.get_mut(style.skill().index()) {
                *slot = lvl;
            }
        }
        self.bodies.insert(id, body);
    }

    fn spawn_npcs(&mut self) {
        for n in 1..=self.settings.npc_num {
            let id = EntityId(i32::try_from(n).map_or(i32::MIN, i32::wrapping_neg));
            self.place_npc(id);
        }
    }

    fn make_item(&mut self, kind: ItemKind, level: u32) -> InventoryRow {
        let id = self.next_item_id;
        self.next_item_id = self.next_item_id.saturating_add(1);
        let mut attack = [0; 3];
        let mut defense = [0; 3];
        match kind.category() {
            ItemCategory::Weapon => {
                let slot = weapon_style(kind).and_then(|s| attack.get_mut(usize::from(s.index())));
                if let Some(a) = slot {
                    *a = level.saturating_mul(3);
                }
            }
            ItemCategory::Ammunition => {
                let slot = weapon_style(kind).and_then(|s| attack.get_mut(usize::from(s.index())));
                if let Some(a) = slot {
                    *a = level.saturating_mul(2);
                }
            }
            ItemCategory::Armor => defense = [level.saturating_mul(2); 3],
            ItemCategory::Tool => defense = [level; 3],
            ItemCategory::Consumable => {}
        }
        InventoryRow {
            id,
            kind,
            level,
            quantity: 1,
            attack,
            defense,
            equipped: false,
        }
    }

    fn capacity(&self) -> usize {
        usize::try_from(self.settings.inventory_capacity).unwrap_or(12)
    }

    /// Put an item into a body's inventory, stacking ammunition of the same
    /// kind and level. Returns `false` when the inventory is full.
    fn store(&mut self, owner: EntityId, item: InventoryRow) -> bool {
        let capacity = self.capacity();
        let Some(body) = self.bodies.get_mut(&owner) else {
            return false;
        };
        let stack = (item.kind.category() == ItemCategory::Ammunition)
            .then(|| {
                body.inventory
                    .iter_mut()
                    .find(|i| i.kind == item.kind && i.level == item.level)
            })
            .flatten();
        if let Some(stack) = stack {
            stack.quantity = stack.quantity.saturating_add(item.quantity);
            return true;
        }
        if body.inventory.len() >= capacity {
            return false;
        }
        body.inventory.push(item);
        true
    }

    fn visible_ids(&self, viewer: &Body) -> Vec<EntityId> {
        let radius = self.settings.vision_radius;
        self.bodies
            .values()
            .filter(|b| b.alive && b.position.linf(viewer.position) <= radius)
            .map(|b| b.id)
            .collect()
    }

    fn window(&self, center: Position) -> Vec<TileView> {
        let r = i32::try_from(self.settings.vision_radius).unwrap_or(0);
        let mut tiles = Vec::new();
        for d_row in -r..=r {
            for d_col in -r..=r {
                let pos = center.offset(d_row, d_col);
                if let Some(material) = self.map.get(pos) {
                    tiles.push(TileView {
                        position: pos,
                        material,
                        fog: fog::fog_value(&self.settings, self.tick, pos),
                    });
                }
            }
        }
        tiles
    }

    fn mark_hit(&mut self, target: EntityId, attacker: EntityId, damage: u32) {
        let tick = self.tick;
        if let Some(body) = self.bodies.get_mut(&target) {
            body.health = body.health.saturating_sub(damage);
            body.damage = body.damage.saturating_add(damage);
            body.attacker = attacker;
            body.last_hit_by = attacker;
            body.last_combat_tick = Some(tick);
        }
        if let Some(body) = self.bodies.get_mut(&attacker) {
            body.last_combat_tick = Some(tick);
        }
    }

    // -----------------------------------------------------------------------
    // Item actions
    // -----------------------------------------------------------------------

    fn use_item(&mut self, player: EntityId, item_id: u32, events: &mut Vec<GameEvent>) {
        let tick = self.tick;
        let item_enabled = self.settings.item_enabled;
        let Some(body) = self.bodies.get_mut(&player) else {
            return;
        };
        if !item_enabled || body.in_combat(tick) {
            return;
        }
        let Some(idx) = body.inventory.iter().position(|i| i.id == item_id) else {
            return;
        };
        let Some(item) = body.inventory.get(idx).cloned() else {
            return;
        };
        match slot(item.kind) {
            None => {
                let restore = item.level.saturating_mul(5).saturating_add(50);
                if item.kind == ItemKind::Ration {
                    body.food = body.food.saturating_add(restore).min(FULL);
                    body.water = body.water.saturating_add(restore).min(FULL);
                } else {
                    body.health = body.health.saturating_add(restore).min(FULL);
                }
                body.inventory.remove(idx);
                events.push(GameEvent::Consume {
                    player,
                    item: item.kind,
                    level: item.level,
                    quantity: 1,
                });
            }
            Some(target_slot) => {
                if item.equipped {
                    if let Some(i) = body.inventory.get_mut(idx) {
                        i.equipped = false;
                    }
                    return;
                }
                for other in &mut body.inventory {
                    if other.equipped && slot(other.kind) == Some(target_slot) {
                        other.equipped = false;
                    }
                }
                if let Some(i) = body.inventory.get_mut(idx) {
                    i.equipped = true;
                }
            }
        }
    }

    fn destroy_item(&mut self, player: EntityId, item_id: u32) {
        if let Some(body) = self.bodies.get_mut(&player) {
            body.inventory.retain(|i| i.id != item_id || i.equipped);
        }
    }

    fn give_item(
        &mut self,
        giver: EntityId,
        item_id: u32,
        receiver: EntityId,
        events: &mut Vec<GameEvent>,
    ) {
        if giver == receiver || !receiver.is_player() {
            return;
        }
        let capacity = self.capacity();
        let receiver_ok = self
            .bodies
            .get(&receiver)
            .is_some_and(|b| b.alive && b.inventory.len() < capacity);
        if !receiver_ok {
            return;
        }
        let Some(body) = self.bodies.get_mut(&giver) else {
            return;
        };
        let Some(idx) = body
            .inventory
            .iter()
            .position(|i| i.id == item_id && !i.equipped)
        else {
            return;
        };
        let item = body.inventory.remove(idx);
        let (kind, level, quantity) = (item.kind, item.level, item.quantity);
        if self.store(receiver, item) {
            events.push(GameEvent::Give {
                giver,
                receiver,
                item: kind,
                level,
                quantity,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Movement and NPC behaviour
    // -----------------------------------------------------------------------

    fn move_body(&mut self, id: EntityId, direction: Direction) {
        let map = Arc::clone(&self.map);
        if let Some(body) = self.bodies.get_mut(&id) {
            let next = body.position.step(direction);
            if map.is_habitable(next) {
                body.position = next;
            }
        }
    }

    fn step_towards(&self, from: Position, to: Position) -> Direction {
        let radius = i32::try_from(self.settings.vision_radius).unwrap_or(0);
        let bounds = Bounds::new(
            from.row.saturating_sub(radius),
            from.row.saturating_add(radius),
            from.col.saturating_sub(radius),
            from.col.saturating_add(radius),
        );
        route::route(&self.map, from, to, Some(bounds)).direction
    }

    fn npc_turn(&mut self, npc: &Body, attacks: &mut Vec<(EntityId, EntityId, CombatStyle)>) {
        let style = npc.style();
        let reach = self.settings.reach(style);
        let quarry = match npc.kind {
            NpcKind::Aggressive => self
                .bodies
                .values()
                .filter(|b| b.alive && b.kind == NpcKind::Player)
                .filter(|b| b.position.linf(npc.position) <= HUNT_RADIUS)
                .min_by_key(|b| (b.position.linf(npc.position), b.id))
                .map(|b| (b.id, b.position)),
            NpcKind::Neutral if npc.in_combat(self.tick) && npc.last_hit_by.is_player() => self
                .bodies
                .get(&npc.last_hit_by)
                .filter(|b| b.alive)
                .map(|b| (b.id, b.position)),
            _ => None,
        };
        if let Some((target, pos)) = quarry {
            if self.settings.combat_enabled && pos.linf(npc.position) <= reach {
                attacks.push((npc.id, target, style));
            } else {
                let dir = self.step_towards(npc.position, pos);
                self.move_body(npc.id, dir);
            }
        } else if self.rng.random_bool(WANDER) {
            let dir = *Direction::MOVES
                .choose(&mut self.rng)
                .unwrap_or(&Direction::Stay);
            self.move_body(npc.id, dir);
        }
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    fn resolve_attacks(
        &mut self,
        attacks: &[(EntityId, EntityId, CombatStyle)],
        events: &mut Vec<GameEvent>,
    ) {
        let mut hits = Vec::new();
        for &(attacker, target, style) in attacks {
            let (Some(a), Some(t)) = (self.bodies.get(&attacker), self.bodies.get(&target)) else {
                continue;
            };
            if attacker == target
                || !a.alive
                || !t.alive
                || a.position.linf(t.position) > self.settings.reach(style)
            {
                continue;
            }
            let mut damage = a
                .attack_power(style)
                .saturating_sub(t.defense(style))
                .max(1);
            if style.counters() == t.style() {
                damage = damage.saturating_mul(3) / 2;
            }
            hits.push((attacker, target, style, damage.min(t.health)));
        }
        for (attacker, target, style, damage) in hits {
            self.mark_hit(target, attacker, damage);
            events.push(GameEvent::Attack {
                attacker,
                target,
                style,
                damage,
            });
            let progression = self.settings.progression_enabled;
            let level_up = self.bodies.get_mut(&attacker).and_then(|a| {
                let ammo = a.inventory.iter_mut().find(|i| {
                    i.equipped
                        && i.kind.category() == ItemCategory::Ammunition
                        && weapon_style(i.kind) == Some(style)
                });
                if let Some(ammo) = ammo {
                    ammo.quantity = ammo.quantity.saturating_sub(1);
                }
                a.inventory.retain(|i| i.quantity > 0);
                progression.then(|| a.gain_exp(style.skill())).flatten()
            });
            if let (Some(level), true) = (level_up, attacker.is_player()) {
                events.push(GameEvent::LevelUp {
                    player: attacker,
                    skill: style.skill(),
                    level,
                });
            }
        }
    }

    fn resolve_kills(&mut self, events: &mut Vec<GameEvent>) {
        let dead: Vec<(EntityId, EntityId)> = self
            .bodies
            .values()
            .filter(|b| b.alive && b.health == 0 && !b.last_hit_by.is_none() && b.damage > 0)
            .map(|b| (b.id, b.last_hit_by))
            .collect();
        for (victim, killer) in dead {
            let Some(v) = self.bodies.get(&victim) else {
                continue;
            };
            let target_level = v.combat_level();
            let killer_level = self.bodies.get(&killer).map_or(0, Body::combat_level);
            events.push(GameEvent::Kill {
                killer,
                target: victim,
                killer_level,
                target_level,
            });
            let drops = if victim.is_npc() {
                self.npc_drops(target_level)
            } else {
                self.bodies
                    .get_mut(&victim)
                    .map(|b| std::mem::take(&mut b.inventory))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|mut i| {
                        i.equipped = false;
                        i
                    })
                    .collect()
            };
            if killer.is_player() {
                for item in drops {
                    let (kind, level, quantity) = (item.kind, item.level, item.quantity);
                    if self.store(killer, item) {
                        events.push(GameEvent::Loot {
                            player: killer,
                            item: kind,
                            level,
                            quantity,
                        });
                    }
                }
            }
            self.kill(victim, events);
        }
    }

    fn npc_drops(&mut self, level: u32) -> Vec<InventoryRow> {
        const TOOLS: [ItemKind; 5] = [
            ItemKind::Rod,
            ItemKind::Gloves,
            ItemKind::Pickaxe,
            ItemKind::Axe,
            ItemKind::Chisel,
        ];
        const ARMOR: [ItemKind; 3] = [ItemKind::Hat, ItemKind::Top, ItemKind::Bottom];
        let tool = *TOOLS.choose(&mut self.rng).unwrap_or(&ItemKind::Rod);
        let armor = *ARMOR.choose(&mut self.rng).unwrap_or(&ItemKind::Hat);
        vec![self.make_item(tool, level), self.make_item(armor, level)]
    }

    fn kill(&mut self, id: EntityId, events: &mut Vec<GameEvent>) {
        let respawn = self.tick.saturating_add(RESPAWN_TICKS);
        if let Some(body) = self.bodies.get_mut(&id) {
            body.alive = false;
            body.health = 0;
            if id.is_player() {
                events.push(GameEvent::Death { player: id });
            } else {
                body.respawn_at = Some(respawn);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Harvesting and upkeep
    // -----------------------------------------------------------------------

    fn tool_level(body: &Body, tool: ItemKind) -> u32 {
        body.equipped(|k| k == tool)
            .map_or(1, |t| t.level.saturating_add(1))
    }

    fn deplete(&mut self, pos: Position, from: Material, into: Material) {
        let map = Arc::make_mut(&mut self.map);
        if map.set(pos, into).is_ok() {
            self.regrow
                .push((self.tick.saturating_add(REGROW_TICKS), pos, from));
        }
    }

    fn harvest(&mut self, player: EntityId, events: &mut Vec<GameEvent>) {
        let Some(body) = self.bodies.get(&player).filter(|b| b.alive).cloned() else {
            return;
        };
        let pos = body.position;
        let here = self.map.get(pos).unwrap_or(Material::Void);

        if here == Material::Foliage {
            if let Some(b) = self.bodies.get_mut(&player) {
                b.food = FULL;
            }
            self.deplete(pos, Material::Foliage, Material::Scrub);
        }

        let yields = match here {
            Material::Herb => Some((ItemKind::Potion, None, ItemKind::Gloves)),
            Material::Tree => Some((ItemKind::Arrow, Some(ItemKind::Spear), ItemKind::Axe)),
            Material::Ore => Some((ItemKind::Whetstone, Some(ItemKind::Wand), ItemKind::Pickaxe)),
            Material::Crystal => Some((ItemKind::Runes, Some(ItemKind::Bow), ItemKind::Chisel)),
            _ => None,
        };
        if let Some((common, rare, tool)) = yields {
            let kind = match rare {
                Some(r) if self.rng.random_bool(WEAPON_DROP) => r,
                _ => common,
            };
            self.grant_harvest(player, kind, Self::tool_level(&body, tool), here, events);
            if let Some(into) = here.depleted() {
                self.deplete(pos, here, into);
            }
        }

        for adj in pos.adjacent() {
            match self.map.get(adj) {
                Some(Material::Water) => {
                    if let Some(b) = self.bodies.get_mut(&player) {
                        b.water = FULL;
                    }
                }
                Some(Material::Fish) => {
                    let level = Self::tool_level(&body, ItemKind::Rod);
                    self.grant_harvest(player, ItemKind::Ration, level, Material::Fish, events);
                    self.deplete(adj, Material::Fish, Material::Water);
                    break;
                }
                _ => {}
            }
        }
    }

    fn grant_harvest(
        &mut self,
        player: EntityId,
        kind: ItemKind,
        level: u32,
        origin: Material,
        events: &mut Vec<GameEvent>,
    ) {
        if !self.settings.item_enabled {
            return;
        }
        let item = self.make_item(kind, level);
        if self.store(player, item) {
            events.push(GameEvent::Harvest {
                player,
                item: kind,
                level,
                quantity: 1,
                origin,
            });
        }
        let progression = self.settings.progression_enabled;
        if let Some(skill) = Skill::for_resource(origin).filter(|_| progression) {
            let level_up = self.bodies.get_mut(&player).and_then(|b| b.gain_exp(skill));
            if let Some(level) = level_up {
                events.push(GameEvent::LevelUp {
                    player,
                    skill,
                    level,
                });
            }
        }
    }

    fn upkeep(&mut self, player: EntityId) {
        let tick = self.tick;
        let fog_value = self
            .bodies
            .get(&player)
            .map_or(0.0, |b| fog::fog_value(&self.settings, tick, b.position));
        let Some(body) = self.bodies.get_mut(&player).filter(|b| b.alive) else {
            return;
        };
        body.food = body.food.saturating_sub(DEPLETION);
        body.water = body.water.saturating_sub(DEPLETION);
        let empty = u32::from(body.food == 0).saturating_add(u32::from(body.water == 0));
        if empty > 0 {
            body.health = body.health.saturating_sub(STARVATION.saturating_mul(empty));
        } else if body.food > FULL / 2 && body.water > FULL / 2 {
            body.health = body.health.saturating_add(REGENERATION).min(FULL);
        }
        let fog_damage = fog::fog_damage(fog_value);
        if fog_damage > 0 {
            body.health = body.health.saturating_sub(fog_damage);
            body.damage = body.damage.saturating_add(fog_damage);
        }
    }

    fn regrow_and_respawn(&mut self) {
        let tick = self.tick;
        let (due, pending): (Vec<_>, Vec<_>) =
            self.regrow.drain(..).partition(|(at, _, _)| *at <= tick);
        self.regrow = pending;
        if !due.is_empty() {
            let map = Arc::make_mut(&mut self.map);
            for (_, pos, material) in due {
                let _ = map.set(pos, material);
            }
        }
        let respawns: Vec<EntityId> = self
            .bodies
            .values()
            .filter(|b| !b.alive && b.respawn_at.is_some_and(|t| t <= tick))
            .map(|b| b.id)
            .collect();
        for id in respawns {
            self.place_npc(id);
        }
    }
}

impl Simulation for Sandbox {
    fn tick(&self) -> u32 {
        self.tick
    }

    fn players(&self) -> Vec<EntityId> {
        self.bodies.keys().copied().filter(|id| id.is_player()).collect()
    }

    fn observe(&self, player: EntityId) -> Option<Observation> {
        let body = self.bodies.get(&player).filter(|b| b.alive)?;
        let entities = self
            .visible_ids(body)
            .into_iter()
            .filter_map(|id| self.bodies.get(&id).map(Body::to_entity_row))
            .collect();
        Some(Observation {
            tick: self.tick.saturating_add(1),
            agent: AgentRow {
                id: body.id,
                position: body.position,
                health: body.health,
                food: body.food,
                water: body.water,
                damage: body.damage,
                attacker: body.attacker,
                skills: body.levels,
                in_combat: body.in_combat(self.tick),
            },
            tiles: self.window(body.position),
            entities,
            inventory: body.inventory.clone(),
            map: Arc::clone(&self.map),
        })
    }

    #[allow(clippy::too_many_lines)]
    fn step(&mut self, actions: &BTreeMap<EntityId, NativeAction>) -> StepOutcome {
        // Resolve every index against what each player saw before the step.
        let mut orders = Vec::new();
        for (&player, action) in actions {
            let Some(body) = self.bodies.get(&player).filter(|b| b.alive) else {
                continue;
            };
            let visible = self.visible_ids(body);
            let item_id =
                |idx: Option<usize>| idx.and_then(|i| body.inventory.get(i)).map(|i| i.id);
            let give = action.give.and_then(|g| {
                Some((item_id(Some(g.item))?, *visible.get(g.target)?))
            });
            let attack = action
                .attack
                .and_then(|a| Some((*visible.get(a.target)?, a.style)));
            orders.push((
                player,
                action.direction,
                attack,
                item_id(action.use_item),
                item_id(action.destroy_item),
                give,
            ));
        }

        self.tick = self.tick.saturating_add(1);
        for body in self.bodies.values_mut() {
            body.damage = 0;
            if !body.in_combat(self.tick) {
                body.attacker = EntityId::NONE;
            }
        }

        let mut events = Vec::new();
        let mut attacks = Vec::new();
        for &(player, direction, attack, use_item, destroy_item, give) in &orders {
            if let Some(item) = use_item {
                self.use_item(player, item, &mut events);
            }
            if let Some((item, receiver)) = give {
                self.give_item(player, item, receiver, &mut events);
            }
            if let Some(item) = destroy_item {
                self.destroy_item(player, item);
            }
            self.move_body(player, direction);
            if let (Some((target, style)), true) = (attack, self.settings.combat_enabled) {
                attacks.push((player, target, style));
            }
        }

        let npcs: Vec<Body> = self
            .bodies
            .values()
            .filter(|b| b.alive && b.id.is_npc())
            .cloned()
            .collect();
        for npc in &npcs {
            self.npc_turn(npc, &mut attacks);
        }

        self.resolve_attacks(&attacks, &mut events);
        self.resolve_kills(&mut events);

        let players = self.players();
        for &player in &players {
            self.harvest(player, &mut events);
            self.upkeep(player);
        }
        let starved: Vec<EntityId> = players
            .iter()
            .copied()
            .filter(|id| self.bodies.get(id).is_some_and(|b| b.alive && b.health == 0))
            .collect();
        for id in starved {
            self.kill(id, &mut events);
        }
        self.regrow_and_respawn();

        let horizon_reached = self.tick >= self.settings.horizon;
        let mut outcome = StepOutcome {
            events,
            ..StepOutcome::default()
        };
        for player in players {
            let dead = self.bodies.get(&player).is_none_or(|b| !b.alive);
            outcome.terminated.insert(player, dead);
            outcome.truncated.insert(player, horizon_reached);
        }
        debug!(
            tick = self.tick,
            events = outcome.events.len(),
            alive = outcome.terminated.values().filter(|d| !**d).count(),
            "sandbox step"
        );
        outcome
    }
}
