//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/` directory)
//! so operators can tune prompts without recompiling. Four templates build
//! the two conversations of the decision loop (`action_system.j2`,
//! `action_user.j2`, `verify_system.j2`, `verify_user.j2`); the `rules/`
//! subdirectory holds the game rule sections rendered by [`GameRules`].

use foray_types::ActionCategory;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::RunnerError;
use crate::llm::{ChatMessage, ResponseSchema};
use crate::rules::{GameRules, RULE_TEMPLATES};

const PROMPT_TEMPLATES: [&str; 4] =
    ["action_system", "action_user", "verify_system", "verify_user"];

/// What a player is asked to pursue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// Complete a set goal as quickly as possible.
    Task,
    /// Survive, indifferent to the others.
    Individual,
    /// Survive by outlasting the others.
    Competitive,
    /// Survive by helping the others.
    Cooperative,
}

impl PlayerRole {
    /// Template key.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Individual => "individual",
            Self::Competitive => "competitive",
            Self::Cooperative => "cooperative",
        }
    }
}

/// The reply to an action prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Why the action was chosen.
    pub reason: String,
    /// The chosen label.
    pub choice: String,
}

impl ResponseSchema for ActionResponse {
    fn template() -> Self {
        Self {
            reason: "reason for selecting the action. Limit the reason to 100 words.".to_owned(),
            choice: "*Only* return the action you select. Do not add extra text".to_owned(),
        }
    }
}

/// The reply to a verification prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Feedback on the candidate.
    pub reason: String,
    /// `Yes` or `No`.
    pub evaluation: String,
}

impl ResponseSchema for VerifyResponse {
    fn template() -> Self {
        Self {
            reason: "The reason for evaluation. ".to_owned(),
            evaluation: "Yes or No. ".to_owned(),
        }
    }
}

impl VerifyResponse {
    /// Whether the verdict accepts the candidate.
    pub fn accepts(&self) -> bool {
        let verdict = self.evaluation.trim();
        let verdict = verdict.strip_suffix('.').unwrap_or(verdict);
        verdict.trim().eq_ignore_ascii_case("yes")
    }
}

/// Everything a prompt says about one decision.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    /// The player's role.
    pub role: PlayerRole,
    /// The decision category.
    pub category: ActionCategory,
    /// Whether fog is part of this game.
    pub fog: bool,
    /// Long-term goal, for task players.
    pub goal: Option<&'a str>,
    /// Game rules text.
    pub rules: &'a str,
    /// Described game state.
    pub state: &'a str,
    /// Past movement-and-attack labels, oldest first.
    pub history: &'a [String],
    /// Candidate labels.
    pub actions: &'a [String],
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message: the role, the category and the reply format.
    pub system: String,
    /// User message: goal, rules, state, history and candidates.
    pub user: String,
}

impl RenderedPrompt {
    /// The prompt as a two-message conversation.
    pub fn messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }
}

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create a prompt engine loading templates from the given directory.
    ///
    /// The directory must contain the four prompt templates and a `rules/`
    /// subdirectory with every rule section.
    pub fn new(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for name in PROMPT_TEMPLATES {
            let source = load_template(templates_dir, &format!("{name}.j2"))?;
            env.add_template_owned(name, source).map_err(|e| {
                RunnerError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        for name in RULE_TEMPLATES {
            let source = load_template(templates_dir, &format!("rules/{name}.j2"))?;
            env.add_template_owned(format!("rules/{name}"), source).map_err(|e| {
                RunnerError::Template(format!("failed to add rules/{name} template: {e}"))
            })?;
        }

        Ok(Self { env })
    }

    /// Render the game rules for one experiment's settings.
    pub fn rules(&self, settings: &foray_types::GameSettings) -> Result<GameRules, RunnerError> {
        GameRules::render(&self.env, settings)
    }

    /// The prompt asking for an action, optionally revising `candidate` in
    /// light of the verifier's `feedback`.
    pub fn action_prompt(
        &self,
        input: &PromptInput<'_>,
        candidate: Option<&str>,
        feedback: Option<&str>,
    ) -> Result<RenderedPrompt, RunnerError> {
        let response_format = pretty(&ActionResponse::template())?;
        let system = self.render(
            "action_system",
            context! {
                fog => input.fog,
                role => input.role.key(),
                category => input.category.key(),
                feedback => feedback.is_some(),
                response_format => response_format,
            },
        )?;
        let user = self.render(
            "action_user",
            context! {
                goal => input.goal,
                rules => input.rules,
                state => input.state,
                history => history_text(input.history),
                history_len => input.history.len(),
                candidate => candidate,
                feedback => feedback,
                actions => serde_json::to_string(input.actions)?,
            },
        )?;
        Ok(RenderedPrompt { system, user })
    }

    /// The prompt asking whether `candidate` should be executed.
    pub fn verify_prompt(
        &self,
        input: &PromptInput<'_>,
        candidate: &str,
    ) -> Result<RenderedPrompt, RunnerError> {
        let response_format = pretty(&VerifyResponse::template())?;
        let system = self.render(
            "verify_system",
            context! {
                role => input.role.key(),
                category => input.category.key(),
                response_format => response_format,
            },
        )?;
        let user = self.render(
            "verify_user",
            context! {
                goal => input.goal,
                rules => input.rules,
                history => history_text(input.history),
                history_len => input.history.len(),
                state => input.state,
                actions => serde_json::to_string(input.actions)?,
                candidate => candidate,
            },
        )?;
        Ok(RenderedPrompt { system, user })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map(|text| text.trim_end().to_owned())
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

/// `value` as JSON indented by four spaces.
pub fn pretty<T: Serialize>(value: &T) -> Result<String, RunnerError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| RunnerError::Parse(format!("non-UTF-8 JSON: {e}")))
}

fn history_text(history: &[String]) -> String {
    history.join("\n")
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use foray_types::GameSettings;

    const SHIPPED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../templates");

    fn input<'a>(
        rules: &'a str,
        history: &'a [String],
        actions: &'a [String],
        category: ActionCategory,
    ) -> PromptInput<'a> {
        PromptInput {
            role: PlayerRole::Competitive,
            category,
            fog: true,
            goal: None,
            rules,
            state: "## Survival\nHealth 100/100",
            history,
            actions,
        }
    }

    #[test]
    fn action_prompt_sections() {
        let engine = PromptEngine::new(SHIPPED).unwrap();
        let history = vec!["Stay & Attack nothing".to_owned()];
        let actions = vec!["Stay".to_owned(), "Harvest Water".to_owned()];
        let prompt = engine
            .action_prompt(
                &input("RULES", &history, &actions, ActionCategory::MlAction),
                None,
                None,
            )
            .unwrap();
        assert!(prompt.system.contains("expanding toxic fog"));
        assert!(prompt.system.contains("outlast them"));
        assert!(prompt.system.contains("\"choice\""));
        assert!(prompt.system.contains("\n    \"reason\""));
        assert!(!prompt.system.contains("verifier"));
        assert!(prompt.user.contains("# Game Introduction\nRULES"));
        assert!(prompt.user.contains("# My Past 1 Actions\nStay & Attack nothing"));
        assert!(prompt.user.ends_with("# Available Actions\n[\"Stay\",\"Harvest Water\"]"));
        assert!(!prompt.user.contains("# My Long-term Goal"));
        assert!(!prompt.user.contains("# Candidate Action"));

        let revised = engine
            .action_prompt(
                &input("RULES", &[], &actions, ActionCategory::MlAction),
                Some("Stay"),
                Some("Water is low."),
            )
            .unwrap();
        assert!(revised.system.contains("verifier"));
        assert!(revised.user.contains("# Candidate Action\nStay"));
        assert!(revised.user.contains("# Action Feedback\nWater is low."));
        assert!(!revised.user.contains("# My Past"));
    }

    #[test]
    fn verify_prompt_ends_with_the_candidate() {
        let engine = PromptEngine::new(SHIPPED).unwrap();
        let actions = vec!["Use nothing".to_owned(), "Use Potion level 1".to_owned()];
        let prompt = engine
            .verify_prompt(
                &input("RULES", &[], &actions, ActionCategory::Use),
                "Use Potion level 1",
            )
            .unwrap();
        assert!(prompt.system.contains("respond with 'No'"));
        assert!(prompt.system.contains("\"evaluation\""));
        assert!(prompt.user.contains("# Available Actions\n[\"Use nothing\","));
        assert!(prompt.user.ends_with("(not yet executed) is:\nUse Potion level 1"));
    }

    #[test]
    fn engine_renders_rules() {
        let engine = PromptEngine::new(SHIPPED).unwrap();
        let rules = engine.rules(&GameSettings::default()).unwrap();
        assert!(rules.overview().starts_with("## Overview"));
    }

    #[test]
    fn verdicts() {
        let verdict = |e: &str| VerifyResponse {
            reason: String::new(),
            evaluation: e.to_owned(),
        };
        assert!(verdict("Yes").accepts());
        assert!(verdict(" yes. ").accepts());
        assert!(!verdict("No").accepts());
        assert!(!verdict("Yes, but").accepts());
    }

    #[test]
    fn missing_template_returns_error() {
        let unique = format!(
            "foray_missing_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("action_system.j2"), "test").ok();

        let result = PromptEngine::new(dir.to_str().unwrap_or(""));
        assert!(matches!(result, Err(RunnerError::Template(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
