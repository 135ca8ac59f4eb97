//! Per-tick enumeration of legal actions.
//!
//! Every entry pairs the natural-language label offered to the model with
//! the structured directive it stands for, so a chosen label resolves to its
//! directive by lookup. The directive's own labels are what end up in the
//! merged per-tick action; [`crate::translate::LabelParser`] reads those
//! back.

use foray_types::action::defaults;
use foray_types::{
    ActionCategory, Area, CombatStyle, EntityId, ItemKind, Material, MergedAction, NpcKind,
};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::eligibility::check_level;
use crate::error::AgentError;
use crate::snapshot::{ItemInfo, Snapshot};

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// Where to move this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum MoveDirective {
    /// Do not move.
    Stay,
    /// Head for the middle of a window area.
    ToArea(Area),
    /// Head for the closest reachable tile of a material.
    ToNearest(Material),
    /// Follow an entity.
    Chase(EntityId),
    /// Step away from an entity.
    Evade(EntityId),
}

impl MoveDirective {
    /// Label as written to the merged action.
    pub fn label(&self) -> String {
        match self {
            Self::Stay => defaults::MOVE.to_owned(),
            Self::ToArea(area) => format!("Move to the {area} area"),
            Self::ToNearest(material) => format!("Move to the nearest {material} tile"),
            Self::Chase(id) => format!("Chase {id}"),
            Self::Evade(id) => format!("Evade {id}"),
        }
    }
}

/// Whom to attack this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackDirective {
    /// No attack.
    Nothing,
    /// Attack an entity with a style.
    Target {
        /// Entity to attack.
        target: EntityId,
        /// Style to attack with.
        style: CombatStyle,
    },
}

impl AttackDirective {
    /// Label as written to the merged action.
    pub fn label(&self) -> String {
        match self {
            Self::Nothing => defaults::ATTACK.to_owned(),
            Self::Target { target, style } => format!("Attack {target} with {}", style.label()),
        }
    }
}

/// The combined move and attack decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MlDirective {
    /// Movement half.
    pub movement: MoveDirective,
    /// Attack half.
    pub attack: AttackDirective,
}

impl MlDirective {
    /// Move without attacking.
    pub const fn moving(movement: MoveDirective) -> Self {
        Self {
            movement,
            attack: AttackDirective::Nothing,
        }
    }
}

impl Default for MlDirective {
    fn default() -> Self {
        Self::moving(MoveDirective::Stay)
    }
}

/// The identifying triple of an inventory item as it appears in labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    /// Item instance id.
    pub id: u32,
    /// Item type.
    pub kind: ItemKind,
    /// Item level.
    pub level: u32,
}

impl ItemRef {
    fn phrase(self) -> String {
        format!("level {} {} with id {}", self.level, self.kind, self.id)
    }
}

impl From<&ItemInfo> for ItemRef {
    fn from(item: &ItemInfo) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
            level: item.level,
        }
    }
}

/// Item use decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum UseDirective {
    /// Use nothing.
    #[default]
    Nothing,
    /// Put on an unequipped item.
    Equip(ItemRef),
    /// Take off an equipped item.
    Unequip(ItemRef),
    /// Consume a ration or potion.
    Consume(ItemRef),
}

impl UseDirective {
    /// Label as written to the merged action.
    pub fn label(&self) -> String {
        match self {
            Self::Nothing => defaults::USE.to_owned(),
            Self::Equip(item) => format!("Equip {}", item.phrase()),
            Self::Unequip(item) => format!("Unequip {}", item.phrase()),
            Self::Consume(item) => format!("Use {}", item.phrase()),
        }
    }

    /// The item acted on.
    pub const fn item(&self) -> Option<ItemRef> {
        match self {
            Self::Nothing => None,
            Self::Equip(item) | Self::Unequip(item) | Self::Consume(item) => Some(*item),
        }
    }
}

/// Item destroy decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum DestroyDirective {
    /// Destroy nothing.
    #[default]
    Nothing,
    /// Destroy an item.
    Destroy(ItemRef),
}

impl DestroyDirective {
    /// Label as written to the merged action.
    pub fn label(&self) -> String {
        match self {
            Self::Nothing => defaults::DESTROY.to_owned(),
            Self::Destroy(item) => format!("Destroy {}", item.phrase()),
        }
    }
}

/// Item give decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GiveDirective {
    /// Give nothing.
    #[default]
    Nothing,
    /// Hand an item to another player.
    Give {
        /// Item to give.
        item: ItemRef,
        /// Receiving player.
        target: EntityId,
    },
}

impl GiveDirective {
    /// Label as written to the merged action.
    pub fn label(&self) -> String {
        match self {
            Self::Nothing => defaults::GIVE.to_owned(),
            Self::Give { item, target } => format!("Give {} to {target}", item.phrase()),
        }
    }
}

/// The four resolved decisions of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Move and attack.
    pub ml: MlDirective,
    /// Use, equip or unequip.
    pub item_use: UseDirective,
    /// Destroy.
    pub destroy: DestroyDirective,
    /// Give.
    pub give: GiveDirective,
}

impl Plan {
    /// The labels of this plan as one merged action.
    pub fn merged(&self) -> MergedAction {
        MergedAction {
            r#move: self.ml.movement.label(),
            attack: self.ml.attack.label(),
            r#use: self.item_use.label(),
            destroy: self.destroy.label(),
            give: self.give.label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Action space
// ---------------------------------------------------------------------------

/// Ordered label → directive mapping for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpace<D> {
    category: ActionCategory,
    entries: Vec<(String, D)>,
}

impl<D> ActionSpace<D> {
    /// An empty space for `category`.
    pub const fn new(category: ActionCategory) -> Self {
        Self {
            category,
            entries: Vec::new(),
        }
    }

    /// The category the space enumerates.
    pub const fn category(&self) -> ActionCategory {
        self.category
    }

    /// Add an entry. A repeated label replaces the earlier directive and
    /// keeps its position.
    pub fn insert(&mut self, label: String, directive: D) {
        if let Some(slot) = self.entries.iter_mut().find(|(l, _)| *l == label) {
            slot.1 = directive;
        } else {
            self.entries.push((label, directive));
        }
    }

    /// Directive for `label`, if offered.
    pub fn get(&self, label: &str) -> Option<&D> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, d)| d)
    }

    /// Directive for `label`, or [`AgentError::NotInSpace`].
    pub fn resolve(&self, label: &str) -> Result<&D, AgentError> {
        self.get(label).ok_or_else(|| AgentError::NotInSpace {
            category: self.category.key(),
            label: label.to_owned(),
        })
    }

    /// Whether `label` is offered.
    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// Labels in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &D)> {
        self.entries.iter().map(|(l, d)| (l.as_str(), d))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uniformly random entry.
    pub fn choose_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&str, &D)> {
        self.entries.choose(rng).map(|(l, d)| (l.as_str(), d))
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Move, harvest and attack options.
pub fn ml_space(snapshot: &Snapshot) -> ActionSpace<MlDirective> {
    let mut space = ActionSpace::new(ActionCategory::MlAction);
    for area in Area::ALL.into_iter().filter(|a| *a != Area::Center) {
        space.insert(
            format!("Move to the {area} area"),
            MlDirective::moving(MoveDirective::ToArea(area)),
        );
    }
    space.insert(defaults::MOVE.to_owned(), MlDirective::default());

    for (material, count) in snapshot.resources.get(Area::Center) {
        if count.is_resource && count.reachable > 0 {
            space.insert(
                format!("Harvest {material} in the center area"),
                MlDirective::moving(MoveDirective::ToNearest(*material)),
            );
        }
    }

    let center = snapshot.entities.get(Area::Center);
    let passive = center.iter().filter(|e| e.kind == NpcKind::Passive);
    let others = center.iter().filter(|e| e.kind != NpcKind::Passive);
    for entity in passive.chain(others).filter(|e| e.entity_attackable) {
        for style in CombatStyle::ALL {
            space.insert(
                format!("Attack {} with {}", entity.id, style.label()),
                MlDirective {
                    movement: MoveDirective::Chase(entity.id),
                    attack: AttackDirective::Target {
                        target: entity.id,
                        style,
                    },
                },
            );
        }
    }
    space
}

/// Equip, unequip and consume options, sorted.
pub fn use_space(snapshot: &Snapshot) -> ActionSpace<UseDirective> {
    let mut space = ActionSpace::new(ActionCategory::Use);
    space.insert(defaults::USE.to_owned(), UseDirective::Nothing);
    let agent = &snapshot.agent;
    for item in snapshot.inventory.gear() {
        let directive = if item.equipped {
            UseDirective::Unequip(item.into())
        } else if check_level(agent, item.kind, item.level) {
            UseDirective::Equip(item.into())
        } else {
            continue;
        };
        space.insert(directive.label(), directive);
    }
    for item in &snapshot.inventory.consumable {
        if check_level(agent, item.kind, item.level) {
            let directive = UseDirective::Consume(item.into());
            space.insert(directive.label(), directive);
        }
    }
    space.sort();
    space
}

/// Destroy options: unequipped gear and every consumable, sorted.
pub fn destroy_space(snapshot: &Snapshot) -> ActionSpace<DestroyDirective> {
    let mut space = ActionSpace::new(ActionCategory::Destroy);
    space.insert(defaults::DESTROY.to_owned(), DestroyDirective::Nothing);
    let unequipped = snapshot.inventory.gear().filter(|i| !i.equipped);
    for item in unequipped.chain(&snapshot.inventory.consumable) {
        let directive = DestroyDirective::Destroy(item.into());
        space.insert(directive.label(), directive);
    }
    space.sort();
    space
}

/// Give options: every item not being worn, to every other visible player,
/// sorted.
pub fn give_space(snapshot: &Snapshot) -> ActionSpace<GiveDirective> {
    let mut space = ActionSpace::new(ActionCategory::Give);
    space.insert(defaults::GIVE.to_owned(), GiveDirective::Nothing);
    let me = snapshot.agent.id;
    let players: Vec<EntityId> = snapshot
        .all_entities()
        .map(|e| e.id)
        .filter(|id| id.is_player() && *id != me)
        .collect();
    let giveable = snapshot
        .inventory
        .all()
        .filter(|i| !(i.category().is_equippable() && i.equipped));
    for item in giveable {
        for target in &players {
            let directive = GiveDirective::Give {
                item: item.into(),
                target: *target,
            };
            space.insert(directive.label(), directive);
        }
    }
    space.sort();
    space
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::testkit::Scene;
    use foray_types::Position;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn insert_keeps_first_position_on_collision() {
        let mut space = ActionSpace::new(ActionCategory::MlAction);
        space.insert("a".to_owned(), 1);
        space.insert("b".to_owned(), 2);
        space.insert("a".to_owned(), 3);
        assert_eq!(space.labels().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(space.get("a"), Some(&3));
        assert!(matches!(
            space.resolve("c"),
            Err(AgentError::NotInSpace { category: "ml_action", .. })
        ));
    }

    #[test]
    fn ml_space_lists_moves_harvests_and_attacks() {
        let obs = Scene::new()
            .tile(Position::new(10, 11), Material::Foliage)
            .tile(Position::new(9, 10), Material::Water)
            .entity(-2, NpcKind::Aggressive, Position::new(11, 11))
            .entity(-1, NpcKind::Passive, Position::new(9, 9))
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let space = ml_space(&snap);
        let labels: Vec<&str> = space.labels().collect();

        assert_eq!(labels.first(), Some(&"Move to the north area"));
        assert_eq!(labels.get(8), Some(&"Stay"));
        assert!(space.contains("Harvest Foliage in the center area"));
        assert!(space.contains("Harvest Water in the center area"));
        // Passive targets come before dangerous ones.
        let passive = labels.iter().position(|l| *l == "Attack NPC 1 with melee").unwrap();
        let aggressive = labels.iter().position(|l| *l == "Attack NPC 2 with mage").unwrap();
        assert!(passive < aggressive);
        assert_eq!(space.len(), 9 + 2 + 6);

        let attack = space.get("Attack NPC 2 with range").unwrap();
        assert_eq!(attack.movement, MoveDirective::Chase(EntityId(-2)));
        assert_eq!(attack.attack.label(), "Attack NPC 2 with range");
        let harvest = space.get("Harvest Water in the center area").unwrap();
        assert_eq!(harvest.movement.label(), "Move to the nearest Water tile");
    }

    #[test]
    fn use_space_verbs_follow_equipped_flag_and_level() {
        let obs = Scene::new()
            .skills([2, 1, 1, 1, 1, 1, 1, 1])
            .item(1, ItemKind::Hat, 1, true)
            .item(2, ItemKind::Spear, 2, false)
            .item(3, ItemKind::Bow, 2, false)
            .item(4, ItemKind::Potion, 1, false)
            .item(5, ItemKind::Ration, 3, false)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let labels: Vec<String> = use_space(&snap).labels().map(str::to_owned).collect();
        assert_eq!(
            labels,
            vec![
                "Equip level 2 Spear with id 2",
                "Unequip level 1 Hat with id 1",
                "Use level 1 Potion with id 4",
                "Use nothing",
            ]
        );
    }

    #[test]
    fn destroy_space_skips_equipped_gear() {
        let obs = Scene::new()
            .item(1, ItemKind::Hat, 1, true)
            .item(2, ItemKind::Axe, 5, false)
            .item(3, ItemKind::Ration, 9, false)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let labels: Vec<String> = destroy_space(&snap).labels().map(str::to_owned).collect();
        assert_eq!(
            labels,
            vec![
                "Destroy level 5 Axe with id 2",
                "Destroy level 9 Ration with id 3",
                "Destroy nothing",
            ]
        );
    }

    #[test]
    fn give_space_pairs_items_with_other_players() {
        let obs = Scene::new()
            .entity(2, NpcKind::Player, Position::new(11, 10))
            .entity(-1, NpcKind::Passive, Position::new(9, 9))
            .entity(3, NpcKind::Player, Position::new(8, 12))
            .item(1, ItemKind::Hat, 1, true)
            .item(2, ItemKind::Potion, 1, false)
            .observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let space = give_space(&snap);
        let labels: Vec<&str> = space.labels().collect();
        assert_eq!(
            labels,
            vec![
                "Give level 1 Potion with id 2 to Player 2",
                "Give level 1 Potion with id 2 to Player 3",
                "Give nothing to anyone",
            ]
        );
        let second = space.get(labels.get(1).unwrap()).copied();
        let Some(GiveDirective::Give { item, target }) = second else {
            panic!("expected a give directive");
        };
        assert_eq!((item.id, target), (2, EntityId(3)));
    }

    #[test]
    fn random_choice_comes_from_the_space() {
        let obs = Scene::new().observe();
        let snap = Scene::extractor().extract(&obs).unwrap();
        let space = ml_space(&snap);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (label, _) = space.choose_random(&mut rng).unwrap();
            assert!(space.contains(label));
        }
    }

    #[test]
    fn plan_merges_directive_labels() {
        let plan = Plan {
            ml: MlDirective {
                movement: MoveDirective::Chase(EntityId(-4)),
                attack: AttackDirective::Target {
                    target: EntityId(-4),
                    style: CombatStyle::Mage,
                },
            },
            ..Plan::default()
        };
        let merged = plan.merged();
        assert_eq!(merged.r#move, "Chase NPC 4");
        assert_eq!(merged.attack, "Attack NPC 4 with mage");
        assert_eq!(merged.r#use, "Use nothing");
        assert_eq!(Plan::default().merged(), MergedAction::default());
    }
}
