//! The tick loop of one episode.
//!
//! Every tick the living players act in parallel, one task each, with at
//! most `max_concurrent_agents` deciding at once. The world steps only after
//! every task has returned; each player then remembers the events of that
//! step and the run status is rewritten.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use foray_types::EntityId;
use foray_world::Simulation;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::RunnerError;
use crate::llm::TokenUsage;
use crate::logs::{RunStatus, StatusEntry, StatusLog, TaskProgress};
use crate::player::Player;

/// How an episode ended.
pub struct EpisodeReport {
    /// Ticks played.
    pub ticks: u32,
    /// Final status.
    pub status: RunStatus,
    /// Tokens used by all players.
    pub usage: TokenUsage,
    /// Last tick each player was alive after.
    pub survived: BTreeMap<EntityId, u32>,
    /// Players alive at the end.
    pub alive: BTreeSet<EntityId>,
    /// The players, in id order.
    pub players: Vec<Player>,
}

impl EpisodeReport {
    /// Survival progress of every player against `horizon`.
    pub fn progress(&self, horizon: u32) -> Vec<TaskProgress> {
        self.players
            .iter()
            .map(|p| {
                let survived_ticks = self.survived.get(&p.id()).copied().unwrap_or(0);
                let progress = if horizon == 0 {
                    0.0
                } else {
                    f64::from(survived_ticks) / f64::from(horizon)
                };
                TaskProgress {
                    player: p.id().to_string(),
                    role: p.role().key(),
                    goal: p.goal().map(ToOwned::to_owned),
                    survived_ticks,
                    progress,
                    alive: self.alive.contains(&p.id()),
                }
            })
            .collect()
    }
}

/// Drives players through an episode.
pub struct EpisodeRunner {
    horizon: u32,
    permits: Arc<Semaphore>,
    status: Option<StatusLog>,
}

impl EpisodeRunner {
    /// A runner for `horizon` ticks with at most `max_concurrent_agents`
    /// players deciding at once.
    pub fn new(horizon: u32, max_concurrent_agents: usize) -> Self {
        Self {
            horizon,
            permits: Arc::new(Semaphore::new(max_concurrent_agents.max(1))),
            status: None,
        }
    }

    /// Write the run status to `log` after every tick.
    #[must_use]
    pub fn with_status(mut self, log: StatusLog) -> Self {
        self.status = Some(log);
        self
    }

    /// Play `players` in `world` until every player is dead or the horizon
    /// is reached.
    pub async fn run<S: Simulation>(
        &mut self,
        world: &mut S,
        players: Vec<Player>,
    ) -> Result<EpisodeReport, RunnerError> {
        let started = Instant::now();
        let mut players: BTreeMap<EntityId, Player> =
            players.into_iter().map(|p| (p.id(), p)).collect();
        let mut alive: BTreeSet<EntityId> = players
            .keys()
            .copied()
            .filter(|id| world.observe(*id).is_some())
            .collect();
        let mut survived: BTreeMap<EntityId, u32> = BTreeMap::new();
        let mut status = RunStatus::Running;
        let mut ticks = 0;

        info!(players = players.len(), horizon = self.horizon, "episode started");

        for tick in 1..=self.horizon {
            let mut tasks = JoinSet::new();
            for id in &alive {
                let Some(obs) = world.observe(*id) else {
                    continue;
                };
                let Some(mut player) = players.remove(id) else {
                    continue;
                };
                let permits = Arc::clone(&self.permits);
                tasks.spawn(async move {
                    let result = match permits.acquire_owned().await {
                        Ok(_permit) => player.act(&obs).await,
                        Err(e) => Err(RunnerError::Task(format!("decision pool closed: {e}"))),
                    };
                    (player, result)
                });
            }

            let mut actions = BTreeMap::new();
            let mut failure = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((player, result)) => {
                        let id = player.id();
                        match result {
                            Ok(action) => {
                                actions.insert(id, action);
                            }
                            Err(e) => {
                                error!(agent_id = %id, tick, error = %e, "player failed to act");
                                failure.get_or_insert(e);
                            }
                        }
                        players.insert(id, player);
                    }
                    Err(e) => {
                        error!(tick, error = %e, "player task panicked or was cancelled");
                        failure.get_or_insert(RunnerError::Task(e.to_string()));
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }

            let outcome = world.step(&actions);
            for id in &alive {
                if let Some(player) = players.get_mut(id) {
                    player.record(&outcome.events);
                }
            }
            alive.retain(|id| !outcome.terminated.get(id).copied().unwrap_or(false));
            for id in &alive {
                survived.insert(*id, tick);
            }
            ticks = tick;

            status = if alive.is_empty() {
                RunStatus::AllDead
            } else {
                RunStatus::from_flags(&outcome.terminated, &outcome.truncated)
            };
            let usage = total_usage(players.values());
            info!(
                tick,
                alive = alive.len(),
                events = outcome.events.len(),
                total_tokens = usage.total_tokens,
                status = ?status,
                "tick complete"
            );
            if let Some(log) = self.status.as_mut() {
                let entry = StatusEntry::now(
                    alive.len(),
                    usage,
                    started.elapsed().as_secs_f64(),
                    status,
                );
                if let Err(e) = log.record(tick, entry) {
                    warn!(tick, error = %e, "failed to write run status");
                }
            }
            if status.is_final() {
                break;
            }
        }
        if status == RunStatus::Running {
            status = RunStatus::GameEnd;
        }

        let players: Vec<Player> = players.into_values().collect();
        let usage = total_usage(players.iter());
        info!(ticks, alive = alive.len(), status = ?status, "episode finished");
        Ok(EpisodeReport {
            ticks,
            status,
            usage,
            survived,
            alive,
            players,
        })
    }
}

fn total_usage<'a>(players: impl Iterator<Item = &'a Player>) -> TokenUsage {
    let mut total = TokenUsage::default();
    for player in players {
        total.absorb(player.token_usage());
    }
    total
}
