//! LLM backends and the validating client the decision loop talks to.
//!
//! Backends use enum dispatch, avoiding the dyn-compatibility issues with
//! async trait methods. Two talk HTTP via `reqwest` (OpenAI-compatible chat
//! completions and the Anthropic Messages API); two run in-process: an
//! offline random policy and a scripted backend for replays and tests.
//!
//! [`LlmClient::generate`] owns the transport-level retry budget: a reply
//! is accepted only when it holds a JSON object whose keys match the
//! expected response schema and whose `choice`, when choices are given, is
//! one of them. Exhausting the budget yields `None`, never an error.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::RunnerError;
use crate::parse::{extract_object, flatten_keys, lowercase_keys};

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// Content.
    User,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Tokens billed by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Prompt plus completion tokens.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Add `other` to this tally.
    pub const fn absorb(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A structured reply shape. The template value doubles as the format shown
/// to the model and as the expected key set.
pub trait ResponseSchema: Serialize + DeserializeOwned {
    /// The reply with each field holding its instruction text.
    fn template() -> Self;
}

/// Parameters sent with every request of one client.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Ask the serving template to enable thinking.
    pub enable_thinking: bool,
}

/// A request as seen by a backend.
#[derive(Debug, Clone, Copy)]
pub struct LlmRequest<'a> {
    /// The conversation.
    pub messages: &'a [ChatMessage],
    /// The expected reply as a template object.
    pub schema: &'a Map<String, Value>,
    /// Allowed `choice` values, if constrained.
    pub choices: Option<&'a [String]>,
}

impl LlmRequest<'_> {
    /// Whether the reply is a verification verdict.
    pub fn is_verification(&self) -> bool {
        self.schema.contains_key("evaluation")
    }
}

/// Raw text returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Reply text.
    pub text: String,
    /// What the call cost.
    pub usage: TokenUsage,
}

// ---------------------------------------------------------------------------
// Backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that turns a conversation into reply text.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// Uniform random policy.
    Offline(OfflineBackend),
    /// Canned replies.
    Scripted(ScriptedBackend),
}

impl LlmBackend {
    /// Send a request and return the reply text.
    pub async fn complete(
        &mut self,
        request: &LlmRequest<'_>,
        params: &SamplingParams,
    ) -> Result<Completion, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(request.messages, params).await,
            Self::Anthropic(backend) => backend.complete(request.messages, params).await,
            Self::Offline(backend) => Ok(backend.complete(request)),
            Self::Scripted(backend) => backend.complete(request),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Offline(_) => "offline",
            Self::Scripted(_) => "scripted",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiBackend {
    /// Create a backend sharing `client`'s connection pool.
    pub fn new(config: &LlmBackendConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<Completion, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);

        let mut body = serde_json::json!({
            "model": params.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        if params.enable_thinking
            && let Some(fields) = body.as_object_mut()
        {
            fields.insert(
                "chat_template_kwargs".to_owned(),
                serde_json::json!({"enable_thinking": true}),
            );
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::LlmBackend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("OpenAI response parse failed: {e}")))?;

        Ok(Completion {
            text: extract_openai_content(&json)?,
            usage: extract_openai_usage(&json),
        })
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

fn extract_openai_usage(json: &Value) -> TokenUsage {
    let field = |name: &str| {
        json.get("usage")
            .and_then(|u| u.get(name))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    TokenUsage {
        prompt_tokens: field("prompt_tokens"),
        completion_tokens: field("completion_tokens"),
        total_tokens: field("total_tokens"),
    }
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// System messages go into the top-level `system` field; the reply text is
/// `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl AnthropicBackend {
    /// Create a backend sharing `client`'s connection pool.
    pub fn new(config: &LlmBackendConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<Completion, RunnerError> {
        let url = format!("{}/messages", self.api_url);

        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<&ChatMessage> = messages.iter().filter(|m| m.role != Role::System).collect();

        let body = serde_json::json!({
            "model": params.model,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "system": system.join("\n\n"),
            "messages": turns,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::LlmBackend(format!(
                "Anthropic returned {status}: {error_body}"
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            RunnerError::LlmBackend(format!("Anthropic response parse failed: {e}"))
        })?;

        Ok(Completion {
            text: extract_anthropic_content(&json)?,
            usage: extract_anthropic_usage(&json),
        })
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &Value) -> Result<String, RunnerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend("Anthropic response missing content[0].text".to_owned())
        })
}

fn extract_anthropic_usage(json: &Value) -> TokenUsage {
    let field = |name: &str| {
        json.get("usage")
            .and_then(|u| u.get(name))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    let prompt_tokens = field("input_tokens");
    let completion_tokens = field("output_tokens");
    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens.saturating_add(completion_tokens),
    }
}

// ---------------------------------------------------------------------------
// In-process backends
// ---------------------------------------------------------------------------

/// Answers every request without a model: a uniform random `choice`, a
/// `Yes` verdict and placeholder text for every other field.
pub struct OfflineBackend {
    rng: StdRng,
}

impl OfflineBackend {
    /// A random policy seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn complete(&mut self, request: &LlmRequest<'_>) -> Completion {
        let mut reply = Map::new();
        for (key, template) in request.schema {
            let value = match key.as_str() {
                "choice" => request
                    .choices
                    .and_then(|c| c.choose(&mut self.rng))
                    .map_or_else(|| template.clone(), |c| Value::String(c.clone())),
                "evaluation" => Value::String("Yes".to_owned()),
                _ => Value::String("Chosen without a model.".to_owned()),
            };
            reply.insert(key.clone(), value);
        }
        Completion {
            text: Value::Object(reply).to_string(),
            usage: TokenUsage::default(),
        }
    }
}

/// Reply function of a [`ScriptedBackend`]; `None` ends the script.
pub type Responder = Box<dyn FnMut(&LlmRequest<'_>) -> Option<String> + Send>;

/// Replies produced by a function of the request.
pub struct ScriptedBackend {
    responder: Responder,
    calls: u32,
}

impl ScriptedBackend {
    /// A backend answering with `responder`.
    pub fn new(responder: Responder) -> Self {
        Self {
            responder,
            calls: 0,
        }
    }

    /// A backend replaying `replies` in order, then failing.
    pub fn replies<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut queue: VecDeque<String> = replies.into_iter().collect();
        Self::new(Box::new(move |_| queue.pop_front()))
    }

    /// Requests seen so far.
    pub const fn calls(&self) -> u32 {
        self.calls
    }

    fn complete(&mut self, request: &LlmRequest<'_>) -> Result<Completion, RunnerError> {
        self.calls = self.calls.saturating_add(1);
        let text = (self.responder)(request)
            .ok_or_else(|| RunnerError::LlmBackend("script exhausted".to_owned()))?;
        Ok(Completion {
            text,
            usage: TokenUsage::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// HTTP client shared by every player's backend.
pub fn http_client(request_timeout_ms: u64) -> Result<reqwest::Client, RunnerError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(request_timeout_ms))
        .build()
        .map_err(|e| RunnerError::LlmBackend(format!("failed to build HTTP client: {e}")))
}

/// Create the backend named by `config`. `seed` only matters offline.
pub fn create_backend(
    config: &LlmBackendConfig,
    client: &reqwest::Client,
    seed: u64,
) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config, client.clone())),
        BackendType::Anthropic => {
            LlmBackend::Anthropic(AnthropicBackend::new(config, client.clone()))
        }
        BackendType::Offline => LlmBackend::Offline(OfflineBackend::new(seed)),
    }
}

// ---------------------------------------------------------------------------
// Validating client
// ---------------------------------------------------------------------------

/// A backend plus its retry budget and token tally.
pub struct LlmClient {
    backend: LlmBackend,
    params: SamplingParams,
    max_try_time: u32,
    usage: TokenUsage,
}

impl LlmClient {
    /// A client making at most `max_try_time + 1` attempts per reply.
    pub fn new(backend: LlmBackend, params: SamplingParams, max_try_time: u32) -> Self {
        Self {
            backend,
            params,
            max_try_time,
            usage: TokenUsage::default(),
        }
    }

    /// The backend in use.
    pub const fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.params.model
    }

    /// Tokens used since creation or the last reset.
    pub const fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Zero the token tally.
    pub const fn reset_usage(&mut self) {
        self.usage = TokenUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
        };
    }

    /// Ask for a `T`, retrying on failed calls and malformed replies.
    pub async fn generate<T: ResponseSchema>(
        &mut self,
        messages: &[ChatMessage],
        choices: Option<&[String]>,
    ) -> Option<T> {
        let schema = match serde_json::to_value(T::template()) {
            Ok(Value::Object(schema)) => schema,
            _ => {
                warn!("response template is not a JSON object");
                return None;
            }
        };
        let expected = flatten_keys(&schema);
        let request = LlmRequest {
            messages,
            schema: &schema,
            choices,
        };

        for attempt in 0..=self.max_try_time {
            let completion = match self.backend.complete(&request, &self.params).await {
                Ok(completion) => completion,
                Err(e) => {
                    warn!(backend = self.backend.name(), attempt, error = %e, "LLM call failed");
                    continue;
                }
            };
            self.usage.absorb(completion.usage);
            match validate::<T>(&completion.text, &expected, choices) {
                Ok(reply) => {
                    debug!(backend = self.backend.name(), attempt, "LLM reply accepted");
                    return Some(reply);
                }
                Err(e) => warn!(
                    backend = self.backend.name(),
                    attempt,
                    error = %e,
                    raw_response = %completion.text,
                    "LLM reply rejected"
                ),
            }
        }
        None
    }
}

/// Check a raw reply against the expected keys and choices.
fn validate<T: DeserializeOwned>(
    raw: &str,
    expected: &BTreeSet<String>,
    choices: Option<&[String]>,
) -> Result<T, RunnerError> {
    let object = extract_object(raw)
        .ok_or_else(|| RunnerError::Parse("no JSON object in reply".to_owned()))?;
    let keys = flatten_keys(&object);
    if keys != *expected {
        return Err(RunnerError::Parse(format!(
            "reply keys {keys:?} do not match {expected:?}"
        )));
    }
    let object = lowercase_keys(object);
    if let Some(choices) = choices {
        let choice = object.get("choice").and_then(Value::as_str).unwrap_or_default();
        if !choices.iter().any(|c| c == choice) {
            return Err(RunnerError::Parse(format!("choice {choice:?} is not available")));
        }
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Pick {
        reason: String,
        choice: String,
    }

    impl ResponseSchema for Pick {
        fn template() -> Self {
            Self {
                reason: "why".to_owned(),
                choice: "what".to_owned(),
            }
        }
    }

    fn params() -> SamplingParams {
        SamplingParams {
            model: "test-model".to_owned(),
            temperature: 0.1,
            max_tokens: 256,
            enable_thinking: false,
        }
    }

    fn scripted(replies: &[&str], max_try_time: u32) -> LlmClient {
        let backend = ScriptedBackend::replies(replies.iter().map(|r| (*r).to_owned()));
        LlmClient::new(LlmBackend::Scripted(backend), params(), max_try_time)
    }

    fn calls(client: &LlmClient) -> u32 {
        match client.backend() {
            LlmBackend::Scripted(b) => b.calls(),
            _ => 0,
        }
    }

    fn choices() -> Vec<String> {
        vec!["Stay".to_owned(), "Move to the north area".to_owned()]
    }

    #[tokio::test]
    async fn accepts_a_valid_reply() {
        let mut client = scripted(&[r#"{"Reason": "safe", "Choice": "Stay"}"#], 3);
        let choices = choices();
        let reply: Pick = client
            .generate(&[ChatMessage::user("pick")], Some(&choices))
            .await
            .unwrap();
        assert_eq!(reply.choice, "Stay");
        assert_eq!(calls(&client), 1);
    }

    #[tokio::test]
    async fn retries_past_malformed_replies() {
        let mut client = scripted(
            &[
                "not json",
                r#"{"choice": "Stay"}"#,
                r#"{"reason": "r", "choice": "Fly away"}"#,
                r#"{"reason": "r", "choice": "Move to the north area"}"#,
            ],
            3,
        );
        let choices = choices();
        let reply: Option<Pick> = client.generate(&[], Some(&choices)).await;
        assert_eq!(reply.unwrap().choice, "Move to the north area");
        assert_eq!(calls(&client), 4);
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let mut client = scripted(&["x", "y", "z"], 1);
        let reply: Option<Pick> = client.generate(&[], None).await;
        assert!(reply.is_none());
        assert_eq!(calls(&client), 2);
    }

    #[tokio::test]
    async fn offline_picks_from_the_choices() {
        let backend = LlmBackend::Offline(OfflineBackend::new(5));
        let mut client = LlmClient::new(backend, params(), 0);
        let choices = choices();
        for _ in 0..10 {
            let reply: Pick = client.generate(&[], Some(&choices)).await.unwrap();
            assert!(choices.contains(&reply.choice));
        }
        assert_eq!(client.usage(), TokenUsage::default());
    }

    #[test]
    fn extract_openai_reply_and_usage() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "{\"choice\": \"Stay\"}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        });
        assert!(extract_openai_content(&json).unwrap().contains("Stay"));
        assert_eq!(extract_openai_usage(&json).total_tokens, 150);
        assert!(extract_openai_content(&serde_json::json!({"error": "rate_limit"})).is_err());
    }

    #[test]
    fn extract_anthropic_reply_and_usage() {
        let json = serde_json::json!({
            "content": [{"type": "text", "text": "{\"choice\": \"Stay\"}"}],
            "usage": {"input_tokens": 100, "output_tokens": 20}
        });
        assert!(extract_anthropic_content(&json).unwrap().contains("Stay"));
        let usage = extract_anthropic_usage(&json);
        assert_eq!((usage.prompt_tokens, usage.total_tokens), (100, 120));
        assert!(extract_anthropic_content(&serde_json::json!({"content": []})).is_err());
    }

    #[test]
    fn usage_accumulates() {
        let mut total = TokenUsage::default();
        let call = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 2,
            total_tokens: 12,
        };
        total.absorb(call);
        total.absorb(call);
        assert_eq!(total.total_tokens, 24);
    }

    #[test]
    fn create_backend_dispatches_on_the_tag() {
        let client = reqwest::Client::new();
        let mut config = LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "https://api.openai.com/v1".to_owned(),
            api_key: "test".to_owned(),
            model: None,
        };
        assert_eq!(create_backend(&config, &client, 1).name(), "openai-compatible");
        config.backend_type = BackendType::Anthropic;
        assert_eq!(create_backend(&config, &client, 1).name(), "anthropic");
        config.backend_type = BackendType::Offline;
        assert_eq!(create_backend(&config, &client, 1).name(), "offline");
    }
}
