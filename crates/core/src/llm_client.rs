use crate::{error::AgentError, turn::Role};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A transcript entry as sent to the provider: role and content only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A single chat completion request.
///
/// Model and temperature are chosen by the calling agent's profile, never by
/// the end user.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

/// A generic client for obtaining one assistant reply from an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Submits the ordered messages and returns the assistant's text.
    ///
    /// Implementations make a single attempt; retries are the caller's business.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AgentError>;
}

/// An implementation of `CompletionClient` for any OpenAI-compatible API.
///
/// The underlying HTTP client is built on first use and cached for the
/// lifetime of this value.
pub struct OpenAICompletionClient {
    api_key: Option<String>,
    api_base: String,
    client: OnceCell<Client<OpenAIConfig>>,
}

impl OpenAICompletionClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Credential for the service. `None` is accepted here and
    ///   reported as [`AgentError::Authentication`] on the first request.
    /// * `api_base` - Base URL, e.g. `https://api.openai.com/v1`.
    pub fn new(api_key: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key,
            api_base: api_base.into(),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client<OpenAIConfig>, AgentError> {
        self.client
            .get_or_try_init(|| async {
                let api_key = self
                    .api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| {
                        AgentError::Authentication("no API key configured".to_string())
                    })?;
                info!(api_base = %self.api_base, "Creating completion client");
                let config = OpenAIConfig::new()
                    .with_api_key(api_key)
                    .with_api_base(&self.api_base);
                Ok(Client::with_config(config))
            })
            .await
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.clone();
    Ok(match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    })
}

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AgentError> {
        let client = self.client().await?;

        let messages = request
            .messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let openai_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .temperature(request.temperature)
            .messages(messages)
            .build()?;

        debug!(model = %request.model, messages = request.messages.len(), "Sending completion request");
        let response: CreateChatCompletionResponse = client.chat().create(openai_request).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AgentError::Provider("No response choice from LLM".to_string()))?;

        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

/// A `CompletionClient` that replays a fixed script of replies.
///
/// Useful for local development and integration tests: no network, no API
/// cost, fully deterministic. Every request is recorded so tests can inspect
/// what was sent.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a provider failure as the next reply.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(Err(message.into()));
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err("scripted replies exhausted".to_string()))
            .map_err(AgentError::Provider)
    }
}
