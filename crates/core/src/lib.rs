//! Parley Core
//!
//! Building blocks of the plan / act / speak loop: the turn model, the two
//! conversational agents, the completion client seam, the action registry
//! with its web search action, and the orchestrator tying them together.

pub mod actions;
pub mod agent;
pub mod directive;
pub mod error;
pub mod llm_client;
pub mod orchestrator;
pub mod search;
pub mod turn;

pub use actions::{Action, ActionRegistry, CallerContext};
pub use agent::{Agent, AgentProfile};
pub use error::AgentError;
pub use orchestrator::{ChatOutcome, ChatReply, Orchestrator, OrchestratorConfig};
pub use turn::{Prompt, RawTurn, Role, Turn, TurnKind};
