//! The propose-then-verify loop for one action category.
//!
//! A proposal asks the model for a label from the action space; the
//! verifier then judges the candidate. A rejection feeds the verifier's
//! reason into the next proposal. The loop makes at most
//! `max_verify_time + 1` proposals and `max_verify_time` verifications and
//! commits the last candidate when the rounds run out. A proposal the model
//! cannot deliver falls back to a uniform random label; a verification it
//! cannot deliver accepts the candidate.

use foray_agent::ActionSpace;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::llm::LlmClient;
use crate::logs::PromptLog;
use crate::prompt::{ActionResponse, PromptEngine, PromptInput, VerifyResponse};

/// Where a committed label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The model proposed it.
    Model,
    /// The model failed and it was drawn at random.
    Random,
}

/// The committed outcome of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision<D> {
    /// Chosen label.
    pub label: String,
    /// Its directive.
    pub directive: D,
    /// Who chose it.
    pub source: Source,
    /// Whether the verifier accepted it.
    pub accepted: bool,
    /// Proposal calls made.
    pub proposals: u32,
    /// Verification calls made.
    pub verifications: u32,
}

/// The collaborators of one player's decisions.
pub struct DecisionLoop<'a> {
    /// The player's model client.
    pub llm: &'a mut LlmClient,
    /// Shared templates.
    pub prompts: &'a PromptEngine,
    /// The player's transcript.
    pub log: &'a PromptLog,
    /// Fallback randomness.
    pub rng: &'a mut StdRng,
    /// Verification rounds before the last candidate is committed.
    pub max_verify_time: u32,
}

impl DecisionLoop<'_> {
    /// Choose a label from `space` for the decision described by `context`
    /// (its `actions` are replaced by the labels of `space`).
    pub async fn decide<D: Copy>(
        &mut self,
        tick: u32,
        context: &PromptInput<'_>,
        space: &ActionSpace<D>,
    ) -> Result<Decision<D>, RunnerError> {
        let category = space.category().key();
        if space.is_empty() {
            return Err(RunnerError::EmptySpace(category));
        }
        let labels: Vec<String> = space.labels().map(ToOwned::to_owned).collect();
        let input = PromptInput {
            category: space.category(),
            actions: &labels,
            ..*context
        };

        let mut candidate: Option<(String, Source)> = None;
        let mut feedback: Option<String> = None;
        let mut accepted = false;
        let mut proposals: u32 = 0;
        let mut verifications: u32 = 0;

        for round in 0..=self.max_verify_time {
            if let Some((label, _)) = &candidate {
                verifications = verifications.saturating_add(1);
                match self.verify(tick, &input, label).await? {
                    Some(verdict) if !verdict.accepts() => {
                        debug!(tick, category, round, candidate = %label, "candidate rejected");
                        feedback = Some(verdict.reason);
                    }
                    _ => {
                        accepted = true;
                        break;
                    }
                }
            }
            proposals = proposals.saturating_add(1);
            let previous = candidate.as_ref().map(|(label, _)| label.as_str());
            candidate = Some(
                self.propose(tick, &input, space, previous, feedback.as_deref())
                    .await?,
            );
        }

        let (label, source) = candidate.ok_or(RunnerError::EmptySpace(category))?;
        let directive = *space.resolve(&label)?;
        info!(
            tick,
            category,
            action = %label,
            accepted,
            proposals,
            verifications,
            random = source == Source::Random,
            "action committed"
        );
        Ok(Decision {
            label,
            directive,
            source,
            accepted,
            proposals,
            verifications,
        })
    }

    async fn propose<D>(
        &mut self,
        tick: u32,
        input: &PromptInput<'_>,
        space: &ActionSpace<D>,
        candidate: Option<&str>,
        feedback: Option<&str>,
    ) -> Result<(String, Source), RunnerError> {
        let category = input.category.key();
        let prompt = self.prompts.action_prompt(input, candidate, feedback)?;
        let reply: Option<ActionResponse> =
            self.llm.generate(&prompt.messages(), Some(input.actions)).await;

        let (label, source, text) = match reply {
            Some(reply) => {
                let text = format!("reason: {}\nchoice: {}", reply.reason, reply.choice);
                (reply.choice, Source::Model, text)
            }
            None => {
                let (label, _) = space
                    .choose_random(&mut *self.rng)
                    .ok_or(RunnerError::EmptySpace(category))?;
                warn!(tick, category, action = %label, "no usable reply, choosing at random");
                let text = format!("random fallback: {label}");
                (label.to_owned(), Source::Random, text)
            }
        };
        if let Err(e) = self.log.exchange(tick, &format!("{category} action"), &prompt, &text) {
            warn!(tick, error = %e, "failed to write prompt transcript");
        }
        Ok((label, source))
    }

    async fn verify(
        &mut self,
        tick: u32,
        input: &PromptInput<'_>,
        candidate: &str,
    ) -> Result<Option<VerifyResponse>, RunnerError> {
        let category = input.category.key();
        let prompt = self.prompts.verify_prompt(input, candidate)?;
        let reply: Option<VerifyResponse> = self.llm.generate(&prompt.messages(), None).await;

        let text = reply.as_ref().map_or_else(
            || "no usable reply, accepting the candidate".to_owned(),
            |r| format!("reason: {}\nevaluation: {}", r.reason, r.evaluation),
        );
        if reply.is_none() {
            warn!(tick, category, candidate, "verifier unavailable, accepting the candidate");
        }
        if let Err(e) = self.log.exchange(tick, &format!("{category} verify"), &prompt, &text) {
            warn!(tick, error = %e, "failed to write prompt transcript");
        }
        Ok(reply)
    }
}
