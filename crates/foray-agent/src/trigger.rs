//! Rule-based gate on when a fresh decision is needed.
//!
//! The move/attack decision is sticky: once made it keeps executing until
//! one of the [`Trigger`]s fires or the step budget runs out. Item
//! decisions are re-evaluated every tick by [`should_use`],
//! [`should_destroy`] and [`should_give`].

use foray_types::{
    Area, EntityId, GameEvent, GameSettings, ItemKind, Material, NpcKind, Position,
};
use serde::Serialize;
use tracing::debug;

use crate::action_space::{AttackDirective, MlDirective, MoveDirective, destroy_space};
use crate::eligibility::check_level;
use crate::snapshot::Snapshot;

/// Vitals below this force a decision.
pub const LOW_VITAL: u32 = 30;

/// Chebyshev displacement since the last decision that forces a new one.
pub const DISPLACEMENT_LIMIT: u32 = 5;

/// Why a fresh move/attack decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// First tick, or no decision yet.
    FirstTick,
    /// In combat with a non-passive entity.
    Combat,
    /// The fog appeared this tick.
    FogOnset,
    /// Food, water or health is low.
    LowVital,
    /// The set of entities in the centre area changed.
    EntitiesChanged,
    /// The previous decision was to stay.
    PreviousStay,
    /// The tile the previous decision headed for has been reached.
    TargetReached,
    /// The previous attack target was killed by this player.
    TargetKilled,
    /// The player moved far from where it last decided.
    Displaced,
    /// The previous decision ran for its whole step budget.
    StepBudget,
}

/// What the gate remembers about the last decision.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Anchor {
    position: Position,
    center_ids: Vec<EntityId>,
}

/// Per-player decision gate.
#[derive(Debug, Clone)]
pub struct DecisionGate {
    max_execute_step: u32,
    execute_step: u32,
    anchor: Option<Anchor>,
}

impl DecisionGate {
    /// A gate that forces a decision after `max_execute_step` ticks of
    /// executing the same plan.
    pub const fn new(max_execute_step: u32) -> Self {
        Self {
            max_execute_step,
            execute_step: 0,
            anchor: None,
        }
    }

    /// Ticks the current plan has been executing.
    pub const fn execute_step(&self) -> u32 {
        self.execute_step
    }

    /// Decide whether a new move/attack decision is needed and advance the
    /// gate: a decision resets the step counter and re-anchors on the
    /// snapshot, otherwise the counter increments.
    pub fn should_decide(
        &mut self,
        snapshot: &Snapshot,
        previous: &MlDirective,
        last_events: &[GameEvent],
        settings: &GameSettings,
    ) -> Option<Trigger> {
        let trigger = self.check(snapshot, previous, last_events, settings);
        if let Some(reason) = trigger {
            debug!(
                agent_id = %snapshot.agent.id,
                tick = snapshot.agent.tick,
                trigger = ?reason,
                "new decision required"
            );
            self.execute_step = 0;
            self.anchor = Some(Anchor {
                position: snapshot.agent.position,
                center_ids: snapshot.center_entity_ids(),
            });
        } else {
            self.execute_step = self.execute_step.saturating_add(1);
        }
        trigger
    }

    /// The first trigger that fires, without advancing the gate.
    pub fn check(
        &self,
        snapshot: &Snapshot,
        previous: &MlDirective,
        last_events: &[GameEvent],
        settings: &GameSettings,
    ) -> Option<Trigger> {
        let agent = &snapshot.agent;
        let Some(anchor) = self.anchor.as_ref().filter(|_| agent.tick != 1) else {
            return Some(Trigger::FirstTick);
        };

        if agent.in_combat && engaged_with_threat(snapshot) {
            return Some(Trigger::Combat);
        }
        if settings.fog_onset == Some(agent.tick) {
            return Some(Trigger::FogOnset);
        }
        if agent.vital_below(LOW_VITAL) {
            return Some(Trigger::LowVital);
        }
        if snapshot.center_entity_ids() != anchor.center_ids {
            return Some(Trigger::EntitiesChanged);
        }
        match previous.movement {
            MoveDirective::Stay => return Some(Trigger::PreviousStay),
            MoveDirective::ToNearest(material) if target_reached(snapshot, material) => {
                return Some(Trigger::TargetReached);
            }
            _ => {}
        }
        if let AttackDirective::Target { target, .. } = previous.attack
            && killed_by(last_events, agent.id, target)
        {
            return Some(Trigger::TargetKilled);
        }
        if anchor.position.linf(agent.position) >= DISPLACEMENT_LIMIT {
            return Some(Trigger::Displaced);
        }
        (self.execute_step >= self.max_execute_step).then_some(Trigger::StepBudget)
    }
}

/// A non-passive centre entity in combat with the player.
fn engaged_with_threat(snapshot: &Snapshot) -> bool {
    let me = Some(snapshot.agent.id);
    snapshot.entities.get(Area::Center).iter().any(|e| {
        e.in_combat
            && e.kind != NpcKind::Passive
            && (e.attacker == me || e.target_of_attack == me)
    })
}

fn target_reached(snapshot: &Snapshot, material: Material) -> bool {
    let agent = &snapshot.agent;
    match material {
        Material::Water => agent.water_around,
        Material::Fish => agent.fish_around,
        other => agent.tile == other,
    }
}

fn killed_by(events: &[GameEvent], killer: EntityId, target: EntityId) -> bool {
    events.iter().any(|e| {
        matches!(e, GameEvent::Kill { killer: k, target: t, .. } if *k == killer && *t == target)
    })
}

/// Whether to decide an item use this tick.
pub fn should_use(snapshot: &Snapshot, settings: &GameSettings) -> bool {
    let agent = &snapshot.agent;
    if !settings.item_enabled || agent.in_combat {
        return false;
    }
    let usable = |kind: ItemKind| {
        snapshot
            .inventory
            .consumable
            .iter()
            .any(|i| i.kind == kind && check_level(agent, i.kind, i.level))
    };
    let hungry = (agent.food < 100 || agent.water < 100) && usable(ItemKind::Ration);
    let hurt = agent.health < 100 && usable(ItemKind::Potion);
    hungry || hurt || equippable_gear(snapshot)
}

/// Whether to decide an item destroy this tick: the inventory is full and
/// there is something to destroy.
pub fn should_destroy(snapshot: &Snapshot, settings: &GameSettings) -> bool {
    settings.item_enabled
        && !snapshot.agent.in_combat
        && snapshot.capacity >= settings.inventory_capacity
        && destroy_space(snapshot).len() > 1
}

/// Whether to decide an item give this tick.
pub fn should_give(snapshot: &Snapshot, settings: &GameSettings, allow_give: bool) -> bool {
    allow_give
        && settings.item_enabled
        && snapshot.other_player_visible()
        && equippable_gear(snapshot)
}

fn equippable_gear(snapshot: &Snapshot) -> bool {
    snapshot
        .inventory
        .gear()
        .any(|i| !i.equipped && check_level(&snapshot.agent, i.kind, i.level))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::Scene;
    use foray_types::CombatStyle;

    fn snapshot(scene: &Scene) -> Snapshot {
        Scene::extractor().extract(&scene.observe()).unwrap()
    }

    /// A gate that decided on `scene` at tick 1.
    fn anchored(scene: &Scene) -> DecisionGate {
        let mut gate = DecisionGate::new(10);
        let first = snapshot(&scene.clone().tick(1));
        let settings = Scene::settings();
        assert_eq!(
            gate.should_decide(&first, &MlDirective::default(), &[], &settings),
            Some(Trigger::FirstTick)
        );
        gate
    }

    fn heading_north() -> MlDirective {
        MlDirective::moving(MoveDirective::ToArea(Area::North))
    }

    #[test]
    fn steady_state_continues_the_plan() {
        let scene = Scene::new().entity(-1, NpcKind::Passive, Position::new(9, 9));
        let mut gate = anchored(&scene);
        let later = scene.clone().tick(4).at(Position::new(8, 10));
        let snap = snapshot(&later);
        let settings = Scene::settings();
        assert_eq!(gate.should_decide(&snap, &heading_north(), &[], &settings), None);
        assert_eq!(gate.execute_step(), 1);
    }

    #[test]
    fn step_budget_forces_a_refresh() {
        let scene = Scene::new();
        let mut gate = DecisionGate::new(2);
        let settings = Scene::settings();
        let plan = heading_north();
        assert!(gate.should_decide(&snapshot(&scene), &plan, &[], &settings).is_some());
        let snap = snapshot(&scene.clone().tick(2));
        assert_eq!(gate.should_decide(&snap, &plan, &[], &settings), None);
        assert_eq!(gate.should_decide(&snap, &plan, &[], &settings), None);
        assert_eq!(
            gate.should_decide(&snap, &plan, &[], &settings),
            Some(Trigger::StepBudget)
        );
        assert_eq!(gate.execute_step(), 0);
    }

    #[test]
    fn triggers_fire_in_order() {
        let scene = Scene::new();
        let gate = anchored(&scene);
        let settings = Scene::settings();
        let plan = heading_north();

        let hurt = snapshot(&scene.clone().tick(3).vitals(25, 100, 100));
        assert_eq!(gate.check(&hurt, &plan, &[], &settings), Some(Trigger::LowVital));

        let crowd = snapshot(
            &scene
                .clone()
                .tick(3)
                .entity(-7, NpcKind::Neutral, Position::new(10, 11)),
        );
        assert_eq!(
            gate.check(&crowd, &plan, &[], &settings),
            Some(Trigger::EntitiesChanged)
        );

        let still = snapshot(&scene.clone().tick(3));
        assert_eq!(
            gate.check(&still, &MlDirective::default(), &[], &settings),
            Some(Trigger::PreviousStay)
        );

        let far = snapshot(&scene.clone().tick(3).at(Position::new(15, 10)));
        assert_eq!(gate.check(&far, &plan, &[], &settings), Some(Trigger::Displaced));
    }

    #[test]
    fn fog_onset_tick_triggers() {
        let scene = Scene::new();
        let gate = anchored(&scene);
        let mut settings = Scene::settings();
        settings.fog_onset = Some(6);
        let snap = snapshot(&scene.clone().tick(6));
        assert_eq!(
            gate.check(&snap, &heading_north(), &[], &settings),
            Some(Trigger::FogOnset)
        );
    }

    #[test]
    fn reaching_water_triggers() {
        let scene = Scene::new();
        let gate = anchored(&scene);
        let settings = Scene::settings();
        let plan = MlDirective::moving(MoveDirective::ToNearest(Material::Water));
        let dry = snapshot(&scene.clone().tick(2));
        assert_eq!(gate.check(&dry, &plan, &[], &settings), None);
        let wet = snapshot(
            &scene
                .clone()
                .tick(2)
                .tile(Position::new(10, 11), Material::Water),
        );
        assert_eq!(gate.check(&wet, &plan, &[], &settings), Some(Trigger::TargetReached));

        let foliage = MlDirective::moving(MoveDirective::ToNearest(Material::Foliage));
        let on_it = snapshot(
            &scene
                .clone()
                .tick(2)
                .tile(Position::new(10, 10), Material::Foliage),
        );
        assert_eq!(
            gate.check(&on_it, &foliage, &[], &settings),
            Some(Trigger::TargetReached)
        );
    }

    #[test]
    fn combat_and_kills_trigger() {
        let mut wolf = Scene::entity_row(-3, NpcKind::Aggressive, Position::new(10, 11));
        wolf.attacker = EntityId(1);
        let scene = Scene::new().row(wolf);
        let gate = anchored(&scene);
        let settings = Scene::settings();
        let attack = MlDirective {
            movement: MoveDirective::Chase(EntityId(-3)),
            attack: AttackDirective::Target {
                target: EntityId(-3),
                style: CombatStyle::Melee,
            },
        };

        let fighting = snapshot(&scene.clone().tick(3).in_combat(EntityId(-3), 2));
        assert_eq!(gate.check(&fighting, &attack, &[], &settings), Some(Trigger::Combat));

        let kill = GameEvent::Kill {
            killer: EntityId(1),
            target: EntityId(-3),
            killer_level: 2,
            target_level: 1,
        };
        let calm = snapshot(&scene.clone().tick(3));
        assert_eq!(
            gate.check(&calm, &attack, std::slice::from_ref(&kill), &settings),
            Some(Trigger::TargetKilled)
        );
    }

    #[test]
    fn passive_combat_does_not_trigger() {
        let mut deer = Scene::entity_row(-3, NpcKind::Passive, Position::new(10, 11));
        deer.attacker = EntityId(1);
        let scene = Scene::new().row(deer);
        let gate = anchored(&scene);
        let snap = snapshot(&scene.clone().tick(3).in_combat(EntityId::NONE, 0));
        assert_eq!(
            gate.check(&snap, &heading_north(), &[], &Scene::settings()),
            None
        );
    }

    #[test]
    fn item_triggers() {
        let settings = Scene::settings();
        let thirsty = snapshot(
            &Scene::new()
                .vitals(100, 100, 80)
                .item(1, ItemKind::Ration, 1, false),
        );
        assert!(should_use(&thirsty, &settings));
        assert!(!should_destroy(&thirsty, &settings));

        let fed = snapshot(&Scene::new().item(1, ItemKind::Ration, 1, false));
        assert!(!should_use(&fed, &settings));

        let mut no_items = settings.clone();
        no_items.item_enabled = false;
        assert!(!should_use(&thirsty, &no_items));

        let mut full = Scene::new();
        for id in 0..12 {
            full = full.item(id, ItemKind::Ration, 1, false);
        }
        assert!(should_destroy(&snapshot(&full), &settings));

        let gift = Scene::new()
            .item(1, ItemKind::Hat, 1, false)
            .entity(2, NpcKind::Player, Position::new(10, 12));
        assert!(should_give(&snapshot(&gift), &settings, true));
        assert!(!should_give(&snapshot(&gift), &settings, false));
    }
}
