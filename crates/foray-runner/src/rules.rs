//! The game rules text shown to the model.
//!
//! Each rule section is a template under `rules/`, rendered once per
//! experiment with the numbers of that experiment's [`GameSettings`].
//! Sections are included only when the subsystem they describe is enabled.
//! The overview is the section summaries alone; the complete text appends
//! each section's detail paragraph. For goal-directed play the rules can be
//! narrowed to the sentences mentioning the game elements a goal names.

use foray_agent::RuleDetail;
use foray_types::{GameSettings, ItemKind, Material, Skill};
use foray_world::sandbox::{DEPLETION, REGENERATION, STARVATION, WEAPON_DROP};
use minijinja::{Environment, context};
use regex::Regex;

use crate::error::RunnerError;

/// Template names of every rule section, detail paragraphs included.
pub const RULE_TEMPLATES: [&str; 13] = [
    "overview",
    "survival",
    "map",
    "resource",
    "resource_detail",
    "fog",
    "combat",
    "combat_detail",
    "item",
    "item_detail",
    "skill",
    "skill_detail",
    "npc",
];

const VITALS: [&str; 5] = ["Health", "Food", "Water", "Defense", "Damage"];
const ENTITIES: [&str; 5] = ["Player", "NPC", "Passive", "Neutral", "Aggressive"];

/// A game element and the sentences that mention it.
#[derive(Debug)]
struct Element {
    pattern: Regex,
    sentences: Vec<usize>,
}

/// Rendered rules for one experiment.
#[derive(Debug)]
pub struct GameRules {
    overview: String,
    complete: String,
    sentences: Vec<String>,
    elements: Vec<Element>,
}

impl GameRules {
    /// Render the enabled sections from the `rules/*` templates in `env`.
    pub fn render(env: &Environment<'_>, settings: &GameSettings) -> Result<Self, RunnerError> {
        let ctx = context! {
            depletion => DEPLETION,
            starvation => STARVATION,
            regeneration => REGENERATION,
            weapon_drop => WEAPON_DROP,
            map_size => settings.map_size,
            view_size => settings.view_size(),
            fog_onset => settings.fog_onset,
            melee_reach => settings.melee_reach,
            range_reach => settings.range_reach,
            mage_reach => settings.mage_reach,
            inventory_capacity => settings.inventory_capacity,
        };
        let render = |name: &str| -> Result<String, RunnerError> {
            let full = format!("rules/{name}");
            env.get_template(&full)
                .map_err(|e| RunnerError::Template(format!("missing {full} template: {e}")))?
                .render(&ctx)
                .map(|text| text.trim().to_owned())
                .map_err(|e| RunnerError::Template(format!("{full} render failed: {e}")))
        };

        let mut sections: Vec<(&str, Option<&str>)> = vec![
            ("overview", None),
            ("survival", None),
            ("map", None),
            ("resource", Some("resource_detail")),
        ];
        if settings.fog_onset.is_some() {
            sections.push(("fog", None));
        }
        if settings.combat_enabled {
            sections.push(("combat", Some("combat_detail")));
        }
        if settings.combat_enabled
            && settings.progression_enabled
            && settings.equipment_enabled
            && settings.item_enabled
        {
            sections.push(("item", Some("item_detail")));
            sections.push(("skill", Some("skill_detail")));
        }
        if settings.npc_enabled {
            sections.push(("npc", None));
        }

        let mut summaries = Vec::with_capacity(sections.len());
        let mut full = Vec::with_capacity(sections.len());
        for (name, detail) in sections {
            let summary = render(name)?;
            let mut section = summary.clone();
            if let Some(detail) = detail {
                section.push('\n');
                section.push_str(&render(detail)?);
            }
            summaries.push(summary);
            full.push(section);
        }

        let complete = full.join("\n\n");
        let sentences = split_sentences(&complete)?;
        let elements = element_names()
            .into_iter()
            .map(|name| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))?;
                let hits = sentences
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| pattern.is_match(s))
                    .map(|(i, _)| i)
                    .collect();
                Ok(Element {
                    pattern,
                    sentences: hits,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()
            .map_err(|e| RunnerError::Template(format!("bad element pattern: {e}")))?;

        Ok(Self {
            overview: summaries.join("\n\n"),
            complete,
            sentences,
            elements,
        })
    }

    /// Section summaries only.
    pub fn overview(&self) -> &str {
        &self.overview
    }

    /// Summaries followed by their detail paragraphs.
    pub fn complete(&self) -> &str {
        &self.complete
    }

    /// The overview plus every rule sentence mentioning an element named in
    /// `goal`, in rule order. `None` when the goal names no element.
    pub fn related(&self, goal: &str) -> Option<String> {
        let mut picked: Vec<usize> = self
            .elements
            .iter()
            .filter(|e| e.pattern.is_match(goal))
            .flat_map(|e| e.sentences.iter().copied())
            .collect();
        if picked.is_empty() {
            return None;
        }
        picked.sort_unstable();
        picked.dedup();
        let lines: Vec<&str> = picked
            .into_iter()
            .filter_map(|i| self.sentences.get(i).map(String::as_str))
            .collect();
        let mut out = self.overview.clone();
        out.push_str("\n\n##Related Game Rules\n");
        out.push_str(&lines.join(".\n"));
        out.push('.');
        Some(out)
    }

    /// The rules text for players with `goal` under `detail`.
    pub fn for_goal(&self, goal: Option<&str>, detail: RuleDetail) -> String {
        match detail {
            RuleDetail::Overview => self.overview.clone(),
            RuleDetail::Complete => self.complete.clone(),
            RuleDetail::Goal => goal
                .and_then(|g| self.related(g))
                .unwrap_or_else(|| self.complete.clone()),
        }
    }
}

/// Sentences of every non-heading line, without their closing periods.
fn split_sentences(text: &str) -> Result<Vec<String>, RunnerError> {
    let boundary = Regex::new(r"\.(?:\s+|$)")
        .map_err(|e| RunnerError::Template(format!("bad sentence pattern: {e}")))?;
    Ok(text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| boundary.split(line))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect())
}

fn element_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = VITALS.to_vec();
    names.extend(ItemKind::ALL.into_iter().map(ItemKind::name));
    names.extend(ENTITIES);
    names.extend(
        Material::ALL
            .into_iter()
            .filter(|m| m.is_resource())
            .map(Material::name),
    );
    names.extend(Skill::ALL.into_iter().map(Skill::name));
    let mut seen = std::collections::BTreeSet::new();
    names.retain(|n| seen.insert(*n));
    names
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shipped_env() -> Environment<'static> {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../templates/rules");
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for name in RULE_TEMPLATES {
            let source = std::fs::read_to_string(format!("{dir}/{name}.j2")).unwrap();
            env.add_template_owned(format!("rules/{name}"), source).unwrap();
        }
        env
    }

    #[test]
    fn sections_follow_the_enabled_systems() {
        let env = shipped_env();
        let all = GameRules::render(
            &env,
            &GameSettings {
                fog_onset: Some(64),
                ..GameSettings::default()
            },
        )
        .unwrap();
        assert!(all.overview().contains("## Fog"));
        assert!(all.overview().contains("## Items"));
        assert!(all.complete().contains("Whetstone adds melee damage"));
        assert!(!all.overview().contains("Whetstone adds melee damage"));
        assert!(all.complete().contains("2.5%"));

        let bare = GameRules::render(
            &env,
            &GameSettings {
                combat_enabled: false,
                npc_enabled: false,
                ..GameSettings::default()
            },
        )
        .unwrap();
        assert!(!bare.complete().contains("## Combat"));
        assert!(!bare.complete().contains("## Items"));
        assert!(!bare.complete().contains("## NPC"));
        assert!(!bare.complete().contains("## Fog"));
        assert!(bare.complete().contains("## Survival"));
    }

    #[test]
    fn goal_related_rules() {
        let rules = GameRules::render(&shipped_env(), &GameSettings::default()).unwrap();
        let related = rules.related("Equip a level 3 pickaxe.").unwrap();
        assert!(related.starts_with(rules.overview()));
        assert!(related.contains("##Related Game Rules\n"));
        assert!(related.contains("Pickaxe raises the level of Ore harvests"));
        assert!(!related.contains("Wand adds mage damage"));
        assert!(related.ends_with('.'));

        assert!(rules.related("Dance in circles").is_none());
        assert_eq!(
            rules.for_goal(Some("Dance in circles"), RuleDetail::Goal),
            rules.complete()
        );
        assert_eq!(rules.for_goal(None, RuleDetail::Overview), rules.overview());
    }

    #[test]
    fn sentences_split_on_periods_followed_by_space() {
        let sentences = split_sentences("## Title\nLevel 1.5 items. Next one.\nLast").unwrap();
        assert_eq!(sentences, ["Level 1.5 items", "Next one", "Last"]);
    }
}
