//! API Models
//!
//! Request and response bodies of the HTTP boundary, annotated for OpenAPI
//! generation with `utoipa`.

use parley_core::{ChatOutcome, ChatReply, RawTurn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug)]
pub struct ChatRequest {
    /// The user's message. Must not be empty.
    #[serde(default)]
    #[schema(example = "What is the latest stable Rust release?")]
    pub message: String,
    /// Earlier turns of the conversation, each with `role`, `content` and `type`.
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<RawTurn>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[schema(value_type = String, example = "answered")]
    pub outcome: ChatOutcome,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            response: reply.response,
            observation: reply.observation,
            outcome: reply.outcome,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct SearchRequest {
    #[schema(example = "rust async runtimes")]
    pub query: Option<String>,
    /// Must be `true`; search is only exposed to the agent system.
    #[serde(default, rename = "agentRequest")]
    pub agent_request: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SearchResponse {
    /// Result descriptions joined by newlines.
    pub results: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ActionsResponse {
    pub actions: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
