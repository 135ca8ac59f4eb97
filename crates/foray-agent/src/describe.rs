//! Natural-language rendering of a [`Snapshot`].
//!
//! The text is what the planner reads as "the game state". Sections for
//! game systems switched off in [`GameSettings`] are left out entirely.

use foray_types::{Area, GameSettings, ItemKind, NpcKind, Skill};

use crate::eligibility::check_level;
use crate::snapshot::{AgentInfo, FogStatus, ItemInfo, Snapshot};

/// Render the full game-state description.
///
/// `memory` is the recent interaction log; it is appended under
/// `# Interaction Memory` from the second tick on.
pub fn describe(snapshot: &Snapshot, settings: &GameSettings, memory: Option<&str>) -> String {
    let agent = &snapshot.agent;
    let mut out = String::from("## Basic Information\n");
    out.push_str(&format!("Now is tick {}/{}. \n", agent.tick, settings.horizon));
    out.push_str(&position(agent, settings));
    out.push_str(&vitals(agent));
    out.push('\n');

    out.push_str("## Observation Information\n");
    out.push_str(&observation(snapshot));
    out.push('\n');

    if settings.combat_enabled {
        out.push_str("## Ego's Combat Information\n");
        out.push_str(&ego_combat(agent));
        out.push('\n');
        out.push_str("## Other's Combat Information\n");
        out.push_str(&other_combat(snapshot));
        out.push('\n');
    }

    if settings.item_enabled {
        out.push_str("## Inventory Information\n");
        out.push_str(&inventory(snapshot, settings));
        out.push('\n');
        if settings.equipment_enabled {
            out.push_str("## Equipment Information\n");
            out.push_str(&equipment(snapshot));
            out.push('\n');
        }
    }

    if settings.progression_enabled {
        out.push_str("## Skill Information\n");
        out.push_str(&skills(agent));
    }

    if let Some(memory) = memory
        && agent.tick > 1
    {
        out.push_str("\n\n# Interaction Memory\n");
        out.push_str(memory);
    }
    out
}

// ---------------------------------------------------------------------------
// Basic information
// ---------------------------------------------------------------------------

fn position(agent: &AgentInfo, settings: &GameSettings) -> String {
    let mut out = format!(
        "I am currently located in the {} region of the map. \
         My distance to the center point of the map is {}. \n",
        agent.region, agent.dist_to_center
    );
    if settings.fog_configured() {
        if settings.fog_active(agent.tick) {
            out.push_str("The fog area is expanding. ");
        } else {
            out.push_str("The fog area has not started to expand yet. ");
        }
        if agent.dist_to_safety_zone == 0 {
            out.push_str("I am currently in the safety zone. ");
        } else {
            out.push_str(&format!(
                "My distance to the safety zone is {}. ",
                agent.dist_to_safety_zone
            ));
        }
    }
    out.push('\n');
    out
}

fn vitals(agent: &AgentInfo) -> String {
    format!(
        "My health is {}/100, my food is {}/100, my water is {}/100. \n",
        agent.health, agent.food, agent.water
    )
}

// ---------------------------------------------------------------------------
// Areas
// ---------------------------------------------------------------------------

fn observation(snapshot: &Snapshot) -> String {
    let mut out = String::from(
        "I am in the center area. The information of the surrounding areas is as follows: \n",
    );
    for area in Area::ALL {
        out.push_str(&format!("The {area} area: \n"));
        if !snapshot.passability.get(area).is_reachable() {
            out.push_str(
                "No path leads to this area as it is blocked by water or stones, \
                 or located beyond the map boundary. \n\n",
            );
            continue;
        }
        if let Some(fog) = fog_line(snapshot, area) {
            out.push_str("Fog Status: \n");
            out.push_str(&fog);
            out.push('\n');
        }
        match resource_line(snapshot, area) {
            Some(resources) => {
                out.push_str("Resources: \n");
                out.push_str(&resources);
                out.push('\n');
            }
            None => out.push_str("No resource is in this area. \n"),
        }
        match entity_line(snapshot, area) {
            Some(entities) => {
                out.push_str("NPCs or Players: \n");
                out.push_str(&entities);
                out.push('\n');
            }
            None => out.push_str("No NPC or Player is in this area. \n"),
        }
        if snapshot.agent.region.toward_center().contains(&area) {
            out.push_str("Moving to this area will bring you closer to the center of the map.\n");
        }
        out.push('\n');
    }
    out
}

fn fog_line(snapshot: &Snapshot, area: Area) -> Option<String> {
    let fog = snapshot.fog.as_ref()?.get(area);
    let line = match fog.status {
        FogStatus::OutOfFog => "This area has not yet been covered by fog. ".to_owned(),
        FogStatus::InFog if area == Area::Center && fog.damage > 0.0 => format!(
            "This area is currently covered by fog. My health decreases by {:.0} per tick. ",
            fog.damage.floor()
        ),
        FogStatus::InFog => "This area is currently covered by fog. ".to_owned(),
        FogStatus::OnTheEdge => "This area is on the edge of the fog. ".to_owned(),
        FogStatus::InSafety => "This area is in the safe zone. ".to_owned(),
    };
    Some(line)
}

/// `None` when the area holds neither resources nor harvested remains.
fn resource_line(snapshot: &Snapshot, area: Area) -> Option<String> {
    let parts: Vec<String> = snapshot
        .resources
        .get(area)
        .iter()
        .filter(|(material, _)| material.is_resource() || material.harvested_origin().is_some())
        .map(|(material, count)| match count.origin {
            Some(origin) => format!("{} {material} tiles (harvested {origin})", count.visible),
            None if count.reachable < count.visible => format!(
                "{} {material} tiles ({} reachable)",
                count.visible, count.reachable
            ),
            None => format!("{} {material} tiles", count.visible),
        })
        .collect();
    (!parts.is_empty()).then(|| format!("{}. ", parts.join(", ")))
}

fn entity_line(snapshot: &Snapshot, area: Area) -> Option<String> {
    let entities = snapshot.entities.get(area);
    if entities.is_empty() {
        return None;
    }
    let mut out = String::new();
    for e in entities {
        out.push_str(&format!(
            "{}, Type: {}, Style: {}, Health: {}, Level: {}. ",
            e.id,
            e.kind.name(),
            e.style.label(),
            e.health,
            e.level
        ));
        if e.kind == NpcKind::Aggressive {
            out.push_str("NOTE: This NPC is dangerous. ");
        }
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

fn ego_combat(agent: &AgentInfo) -> String {
    if !agent.in_combat {
        return "I am not currently in combat. \n".to_owned();
    }
    let mut out = String::from("I am in a combat. \n");
    if let Some(target) = agent.target_of_attack {
        out.push_str(&format!(
            "I am attacking {target} with damage {}. \n",
            agent.damage_dealt.unwrap_or(0)
        ));
    }
    if let Some(attacker) = agent.attacker {
        out.push_str(&format!(
            "I am attacked by {attacker} with damage {}. \n",
            agent.damage_taken.unwrap_or(0)
        ));
    }
    if agent.attacker.is_none() && agent.target_of_attack.is_none() {
        out.push_str("I just finished a combat. \n");
    }
    out
}

fn other_combat(snapshot: &Snapshot) -> String {
    let me = snapshot.agent.id;
    let mut out = String::new();
    for e in snapshot.all_entities().filter(|e| e.in_combat) {
        out.push_str(&format!("{} is in combat.\n", e.id));
        match e.target_of_attack {
            Some(target) if target == me => out.push_str(&format!("{} is attacking me.\n", e.id)),
            Some(target) => out.push_str(&format!("{} is attacking {target}.\n", e.id)),
            None => {}
        }
        match e.attacker {
            Some(attacker) if attacker == me => {
                out.push_str(&format!("{} is attacked by me.\n", e.id));
            }
            Some(attacker) => out.push_str(&format!("{} is attacked by {attacker}.\n", e.id)),
            None => {}
        }
    }
    if out.is_empty() {
        out.push_str("No combat information observed. \n");
    }
    out
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

fn inventory(snapshot: &Snapshot, settings: &GameSettings) -> String {
    let mut out = if snapshot.capacity > 0 {
        format!(
            "My inventory capacity is {}/{} and contains the following items: \n",
            snapshot.capacity, settings.inventory_capacity
        )
    } else {
        "My inventory is empty. \n".to_owned()
    };
    let agent = &snapshot.agent;
    let groups: [(&[ItemInfo], &str); 5] = [
        (&snapshot.inventory.armor, "equip this armor"),
        (&snapshot.inventory.weapon, "equip this weapon"),
        (&snapshot.inventory.tool, "equip this tool"),
        (&snapshot.inventory.ammunition, "equip this ammunition"),
        (&snapshot.inventory.consumable, "use this consumable"),
    ];
    for (items, verb) in groups {
        for item in items {
            out.push_str(&item_stats(item));
            if !check_level(agent, item.kind, item.level) {
                out.push_str(&format!("I cannot currently {verb} due to level restriction. "));
            }
            out.push('\n');
        }
    }
    out
}

/// One item line without the trailing newline.
fn item_stats(item: &ItemInfo) -> String {
    let head = format!(
        "item id: {}, name: {}, level: {}",
        item.id, item.kind, item.level
    );
    let [melee_atk, range_atk, mage_atk] = item.attack;
    let [melee_def, range_def, mage_def] = item.defense;
    match item.kind {
        ItemKind::Spear | ItemKind::Bow | ItemKind::Wand => format!(
            "{head}, melee attack: {melee_atk}, range attack: {range_atk}, \
             mage attack: {mage_atk}. "
        ),
        ItemKind::Whetstone | ItemKind::Arrow | ItemKind::Runes => format!(
            "{head}, quantity: {}, melee attack: {melee_atk}, range attack: {range_atk}, \
             mage attack: {mage_atk}. ",
            item.quantity
        ),
        ItemKind::Ration => format!(
            "{head}, resource restore: {}. ",
            item.restore().unwrap_or(0)
        ),
        ItemKind::Potion => format!("{head}, health restore: {}. ", item.restore().unwrap_or(0)),
        _ => format!(
            "{head}, melee defense: {melee_def}, range defense: {range_def}, \
             mage defense: {mage_def}. "
        ),
    }
}

fn equipment(snapshot: &Snapshot) -> String {
    let worn = |kinds: &[ItemKind]| {
        snapshot
            .inventory
            .gear()
            .find(|i| i.equipped && kinds.contains(&i.kind))
    };
    let slots: [(&str, &[ItemKind]); 5] = [
        ("Hat", &[ItemKind::Hat]),
        ("Top", &[ItemKind::Top]),
        ("Bottom", &[ItemKind::Bottom]),
        (
            "Weapon/Tool",
            &[
                ItemKind::Spear,
                ItemKind::Bow,
                ItemKind::Wand,
                ItemKind::Rod,
                ItemKind::Gloves,
                ItemKind::Pickaxe,
                ItemKind::Axe,
                ItemKind::Chisel,
            ],
        ),
        (
            "Ammunition",
            &[ItemKind::Whetstone, ItemKind::Arrow, ItemKind::Runes],
        ),
    ];
    let mut out = String::new();
    for (slot, kinds) in slots {
        match worn(kinds) {
            Some(item) => out.push_str(&format!(
                "My {slot} slot is equipped with: \n{}\n",
                item_stats(item)
            )),
            None => out.push_str(&format!("My {slot} slot is empty. \n")),
        }
    }
    out
}

fn skills(agent: &AgentInfo) -> String {
    let mut out = String::from("My skill levels are: \n");
    for skill in Skill::ALL {
        out.push_str(&format!("{} Level: {}. \n", skill.name(), agent.skill(skill)));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extract::StateExtractor;
    use crate::testkit::Scene;
    use foray_types::{EntityId, Material, Position};

    fn render(scene: &Scene, settings: &GameSettings) -> String {
        let snapshot = StateExtractor::new(settings.clone())
            .extract(&scene.observe())
            .unwrap();
        describe(&snapshot, settings, None)
    }

    #[test]
    fn sections_follow_enabled_systems() {
        let full = render(&Scene::new(), &Scene::settings());
        for heading in [
            "## Basic Information",
            "## Observation Information",
            "## Ego's Combat Information",
            "## Other's Combat Information",
            "## Inventory Information",
            "## Equipment Information",
            "## Skill Information",
        ] {
            assert!(full.contains(heading), "missing {heading}");
        }

        let bare = GameSettings {
            combat_enabled: false,
            item_enabled: false,
            progression_enabled: false,
            ..Scene::settings()
        };
        let text = render(&Scene::new(), &bare);
        assert!(text.contains("## Observation Information"));
        assert!(!text.contains("Combat Information"));
        assert!(!text.contains("## Inventory Information"));
        assert!(!text.contains("## Equipment Information"));
        assert!(!text.contains("## Skill Information"));
    }

    #[test]
    fn basic_information_reports_tick_position_and_vitals() {
        let text = render(&Scene::new().tick(7).vitals(80, 40, 60), &Scene::settings());
        assert!(text.starts_with("## Basic Information\nNow is tick 7/100. \n"));
        assert!(text.contains("located in the center region of the map"));
        assert!(text.contains("My distance to the center point of the map is 0."));
        assert!(text.contains("My health is 80/100, my food is 40/100, my water is 60/100."));
        assert!(!text.contains("fog area"));
    }

    #[test]
    fn fog_is_described_once_active() {
        let settings = GameSettings {
            fog_onset: Some(1),
            ..Scene::settings()
        };
        let scene = Scene::new().fog(Position::new(10, 10), 2.0);
        let text = render(&scene, &settings);
        assert!(text.contains("The fog area is expanding. I am currently in the safety zone."));
        assert!(text.contains(
            "Fog Status: \nThis area is currently covered by fog. \
             My health decreases by 2 per tick."
        ));

        let later = GameSettings {
            fog_onset: Some(50),
            ..Scene::settings()
        };
        let text = render(&scene, &later);
        assert!(text.contains("The fog area has not started to expand yet."));
        assert!(!text.contains("Fog Status"));
    }

    #[test]
    fn blocked_areas_get_only_the_notice() {
        let mut scene = Scene::new();
        for row in 7..=8 {
            for col in 9..=11 {
                scene = scene.tile(Position::new(row, col), Material::Stone);
            }
        }
        let text = render(&scene, &Scene::settings());
        assert!(text.contains(
            "The north area: \nNo path leads to this area as it is blocked by water or stones, \
             or located beyond the map boundary. \n\nThe northeast area: \n"
        ));
    }

    #[test]
    fn resources_entities_and_centre_hint() {
        let scene = Scene::new()
            .at(Position::new(13, 13))
            .tile(Position::new(11, 13), Material::Tree)
            .tile(Position::new(11, 14), Material::Stump)
            .entity(-3, NpcKind::Aggressive, Position::new(10, 13));
        let text = render(&scene, &Scene::settings());
        assert!(text.contains("Resources: \n1 Stump tiles (harvested Tree), 1 Tree tiles. \n"));
        assert!(text.contains(
            "NPCs or Players: \nNPC 3, Type: aggressive, Style: melee, Health: 100, Level: 1. \
             NOTE: This NPC is dangerous. \n"
        ));
        let north = text.split("The north area:").nth(1).unwrap();
        let north = north.split("\n\n").next().unwrap();
        assert!(north.contains("closer to the center of the map"));
        let south = text.split("The south area:").nth(1).unwrap();
        let south = south.split("\n\n").next().unwrap();
        assert!(!south.contains("closer to the center of the map"));
    }

    #[test]
    fn combat_is_told_from_both_perspectives() {
        let mut wolf = Scene::entity_row(-2, NpcKind::Aggressive, Position::new(10, 11));
        wolf.attacker = EntityId(1);
        wolf.damage = 4;
        let scene = Scene::new().in_combat(EntityId(-2), 6).row(wolf);
        let text = render(&scene, &Scene::settings());
        assert!(text.contains(
            "I am in a combat. \nI am attacking NPC 2 with damage 4. \n\
             I am attacked by NPC 2 with damage 6. \n"
        ));
        assert!(text.contains(
            "NPC 2 is in combat.\nNPC 2 is attacking me.\nNPC 2 is attacked by me.\n"
        ));

        let calm = render(&Scene::new(), &Scene::settings());
        assert!(calm.contains("I am not currently in combat."));
        assert!(calm.contains("No combat information observed."));
    }

    #[test]
    fn inventory_flags_level_restrictions() {
        let scene = Scene::new()
            .item(1, ItemKind::Hat, 3, false)
            .item(2, ItemKind::Ration, 1, false)
            .item(3, ItemKind::Spear, 1, true);
        let text = render(&scene, &Scene::settings());
        assert!(text.contains("My inventory capacity is 3/12 and contains the following items:"));
        assert!(text.contains(
            "item id: 1, name: Hat, level: 3, melee defense: 0, range defense: 0, \
             mage defense: 0. I cannot currently equip this armor due to level restriction. \n"
        ));
        assert!(text.contains("item id: 2, name: Ration, level: 1, resource restore: 55. \n"));
        assert!(text.contains("My Hat slot is empty."));
        assert!(text.contains("My Weapon/Tool slot is equipped with: \nitem id: 3, name: Spear"));

        let empty = render(&Scene::new(), &Scene::settings());
        assert!(empty.contains("My inventory is empty."));
    }

    #[test]
    fn skills_are_listed_in_order() {
        let text = render(&Scene::new().skills([2, 1, 1, 4, 1, 1, 1, 3]), &Scene::settings());
        assert!(text.ends_with(
            "My skill levels are: \nMelee Level: 2. \nRange Level: 1. \nMage Level: 1. \n\
             Fishing Level: 4. \nHerbalism Level: 1. \nProspecting Level: 1. \n\
             Carving Level: 1. \nAlchemy Level: 3. \n"
        ));
    }

    #[test]
    fn memory_is_appended_after_the_first_tick() {
        let settings = Scene::settings();
        let extractor = StateExtractor::new(settings.clone());
        let first = extractor.extract(&Scene::new().observe()).unwrap();
        assert!(!describe(&first, &settings, Some("x")).contains("# Interaction Memory"));

        let later = extractor.extract(&Scene::new().tick(3).observe()).unwrap();
        let text = describe(&later, &settings, Some("Interaction event at tick 2: \n"));
        assert!(text.ends_with("\n\n# Interaction Memory\nInteraction event at tick 2: \n"));
    }
}
