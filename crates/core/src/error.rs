use std::time::Duration;

/// Failures that can occur while driving a plan / act / speak cycle.
///
/// Only [`AgentError::InvalidInput`] ever escapes [`crate::orchestrator::Orchestrator::chat`];
/// every other variant is folded into a textual reply by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The caller supplied an empty or otherwise unusable message.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A turn handed to an agent was missing one of `role`, `content` or `type`.
    #[error("Each message must contain 'role', 'content', and 'type' ({0})")]
    MalformedMessage(String),

    /// The planner asked for an action that is not registered.
    #[error("Unknown action: {name}. Available actions: {}", .available.join(", "))]
    UnknownAction { name: String, available: Vec<String> },

    /// A registered action handler returned an error.
    #[error("Error executing {action}: {detail}")]
    ActionExecution { action: String, detail: String },

    /// The completion provider failed (network, rate limit, malformed response).
    #[error("Provider error: {0}")]
    Provider(String),

    /// No usable credential is configured for the completion provider.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A downstream call did not finish within the configured deadline.
    #[error("{what} timed out after {}s", .after.as_secs_f32())]
    Timeout { what: String, after: Duration },
}

impl From<async_openai::error::OpenAIError> for AgentError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        AgentError::Provider(err.to_string())
    }
}
