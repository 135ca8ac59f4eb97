//! One LLM-driven player.
//!
//! Each tick a player extracts its snapshot, lets the decision gate say
//! whether the sticky move/attack decision needs refreshing, decides the
//! item categories whose triggers fire and translates the merged plan into
//! a native action. Everything a player mutates is its own, so players can
//! act concurrently.

use std::collections::VecDeque;
use std::sync::Arc;

use foray_agent::action_space::{
    DestroyDirective, GiveDirective, UseDirective, destroy_space, give_space, ml_space, use_space,
};
use foray_agent::config::{AgentConfig, EnvConfig};
use foray_agent::trigger::{should_destroy, should_give, should_use};
use foray_agent::{DecisionGate, EpisodicMemory, Plan, StateExtractor, Translator, describe};
use foray_types::action::defaults;
use foray_types::{ActionCategory, EntityId, GameEvent, GameSettings, MergedAction, NativeAction};
use foray_world::Observation;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::decision::DecisionLoop;
use crate::error::RunnerError;
use crate::llm::{LlmClient, TokenUsage};
use crate::logs::{ActionCsv, PromptLog};
use crate::prompt::{PlayerRole, PromptEngine, PromptInput};

/// Past move/attack labels kept for prompts.
pub const HISTORY_LEN: usize = 10;

/// The shared, read-only parts of every player in an episode.
#[derive(Clone)]
pub struct PlayerContext {
    /// Templates.
    pub prompts: Arc<PromptEngine>,
    /// Game settings.
    pub settings: GameSettings,
    /// Decision-loop options.
    pub agent: AgentConfig,
}

/// Per-player log sinks.
#[derive(Debug, Default)]
pub struct PlayerLogs {
    /// Prompt transcript.
    pub prompts: PromptLog,
    /// Merged actions, when written.
    pub actions: Option<ActionCsv>,
}

/// One player and its decision state.
pub struct Player {
    id: EntityId,
    role: PlayerRole,
    goal: Option<String>,
    rules: String,
    llm: LlmClient,
    ctx: PlayerContext,
    extractor: StateExtractor,
    translator: Translator,
    gate: DecisionGate,
    plan: Plan,
    ml_label: String,
    history: VecDeque<String>,
    memory: EpisodicMemory,
    last_tick: u32,
    last_action: MergedAction,
    rng: StdRng,
    logs: PlayerLogs,
}

impl Player {
    /// A player that has not acted yet.
    pub fn new(
        id: EntityId,
        role: PlayerRole,
        rules: String,
        llm: LlmClient,
        ctx: PlayerContext,
        rng: StdRng,
        logs: PlayerLogs,
    ) -> Self {
        let goal = if role == PlayerRole::Task {
            ctx.agent.goal.clone()
        } else {
            None
        };
        Self {
            id,
            role,
            goal,
            rules,
            llm,
            extractor: StateExtractor::new(ctx.settings.clone()),
            translator: Translator::new(ctx.agent.path_find_depth),
            gate: DecisionGate::new(ctx.agent.max_execute_step),
            plan: Plan::default(),
            ml_label: defaults::MOVE.to_owned(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            memory: EpisodicMemory::new(id),
            last_tick: 0,
            last_action: MergedAction::default(),
            ctx,
            rng,
            logs,
        }
    }

    /// The player's entity id.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The player's role.
    pub const fn role(&self) -> PlayerRole {
        self.role
    }

    /// The long-term goal, for task players.
    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Tokens used so far.
    pub const fn token_usage(&self) -> TokenUsage {
        self.llm.usage()
    }

    /// The interaction memory.
    pub const fn memory(&self) -> &EpisodicMemory {
        &self.memory
    }

    /// The plan executing now.
    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Decide and translate this tick's action.
    pub async fn act(&mut self, obs: &Observation) -> Result<NativeAction, RunnerError> {
        let tick = obs.tick;
        let snapshot = self.extractor.extract(obs)?;
        let settings = self.extractor.settings();
        let agent = &self.ctx.agent;

        let memory = if agent.use_interaction_memory && tick > 1 {
            self.memory.recent_description(agent.memory_window)
        } else {
            None
        };
        let state = describe(&snapshot, settings, memory.as_deref());
        let history: Vec<String> = if agent.add_action_history {
            self.history.iter().cloned().collect()
        } else {
            Vec::new()
        };
        let context = PromptInput {
            role: self.role,
            category: ActionCategory::MlAction,
            fog: settings.fog_onset.is_some(),
            goal: self.goal.as_deref(),
            rules: &self.rules,
            state: &state,
            history: &history,
            actions: &[],
        };
        let mut decisions = DecisionLoop {
            llm: &mut self.llm,
            prompts: &self.ctx.prompts,
            log: &self.logs.prompts,
            rng: &mut self.rng,
            max_verify_time: agent.max_verify_time,
        };

        let last_events = self.memory.last_tick_record(tick);
        let trigger = self
            .gate
            .should_decide(&snapshot, &self.plan.ml, last_events, settings);
        if let Some(trigger) = trigger {
            info!(agent_id = %self.id, tick, trigger = ?trigger, "deciding move and attack");
            let decision = decisions.decide(tick, &context, &ml_space(&snapshot)).await?;
            self.plan.ml = decision.directive;
            self.ml_label = decision.label;
        } else {
            debug!(
                agent_id = %self.id,
                tick,
                execute_step = self.gate.execute_step(),
                action = %self.ml_label,
                "continuing move and attack"
            );
        }

        self.plan.item_use = if should_use(&snapshot, settings) {
            decisions.decide(tick, &context, &use_space(&snapshot)).await?.directive
        } else {
            UseDirective::default()
        };
        self.plan.destroy = if should_destroy(&snapshot, settings) {
            decisions.decide(tick, &context, &destroy_space(&snapshot)).await?.directive
        } else {
            DestroyDirective::default()
        };
        self.plan.give = if should_give(&snapshot, settings, agent.allow_give_action) {
            decisions.decide(tick, &context, &give_space(&snapshot)).await?.directive
        } else {
            GiveDirective::default()
        };

        if self.history.len() >= HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(self.ml_label.clone());

        let merged = self.plan.merged();
        if let Some(csv) = &self.logs.actions
            && let Err(e) = csv.append(tick, &merged)
        {
            warn!(agent_id = %self.id, tick, error = %e, "failed to write action row");
        }
        let native = self.translator.translate(&self.plan, obs)?;
        debug!(agent_id = %self.id, tick, action = ?native, "action translated");

        self.last_tick = tick;
        self.last_action = merged;
        Ok(native)
    }

    /// Remember the events of the step that executed the last action.
    pub fn record(&mut self, events: &[GameEvent]) {
        if let Some(entry) = self.memory.record(self.last_tick, &self.last_action, events) {
            debug!(
                agent_id = %self.id,
                tick = entry.tick,
                events = entry.events.len(),
                "interaction remembered"
            );
            if let Err(e) = self.logs.prompts.note(entry.tick, &entry.description) {
                warn!(agent_id = %self.id, error = %e, "failed to write memory note");
            }
        }
    }
}

/// Roles for `env.game.player_num` players in random order; every player
/// is a task player when a goal is set.
pub fn assign_roles(env: &EnvConfig, goal: Option<&str>, rng: &mut StdRng) -> Vec<PlayerRole> {
    let count = usize::try_from(env.game.player_num).unwrap_or_default();
    if goal.is_some() {
        return vec![PlayerRole::Task; count];
    }
    let mut roles = Vec::with_capacity(count);
    for (role, num) in [
        (PlayerRole::Individual, env.individual_num),
        (PlayerRole::Competitive, env.competitive_num),
        (PlayerRole::Cooperative, env.cooperative_num),
    ] {
        roles.extend(std::iter::repeat_n(role, usize::try_from(num).unwrap_or_default()));
    }
    roles.resize(count, PlayerRole::Individual);
    roles.shuffle(rng);
    roles
}
