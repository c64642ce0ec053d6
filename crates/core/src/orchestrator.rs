//! Plan / Act / Speak Orchestration
//!
//! The orchestrator drives a bounded loop: the planner reasons and may emit an
//! action directive, the directive is dispatched through the
//! [`ActionRegistry`], the observation is fed back to the planner, and once
//! the planner stops asking for actions the speaker writes the reply.
//!
//! Every failure past input validation is turned into a textual reply tagged
//! with a [`ChatOutcome`], so callers always have something to show.

use crate::{
    actions::{Action, ActionRegistry, CallerContext},
    agent::Agent,
    directive::{Directive, parse_directive},
    error::AgentError,
    turn::{Prompt, RawTurn, Turn},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

/// Reply returned when the planner never settles.
pub const MAX_TURNS_REACHED: &str = "Maximum turns reached";

/// Loop limits.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Upper bound on planner calls per `chat` invocation.
    pub max_turns: usize,
    /// Deadline for each completion call and each action; `None` disables it.
    pub call_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: 3,
            call_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// How a `chat` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOutcome {
    /// The speaker produced a reply.
    Answered,
    /// The planner named an action that is not registered.
    UnknownAction,
    /// A registered action failed or timed out.
    ActionFailed,
    /// The planner or speaker call failed.
    AgentFailed,
    /// The planner kept requesting actions until the turn limit.
    MaxTurnsReached,
}

/// The result of one `chat` invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// The last action result, present only on [`ChatOutcome::Answered`].
    pub observation: Option<String>,
    pub outcome: ChatOutcome,
}

impl ChatReply {
    fn failed(outcome: ChatOutcome, response: String) -> Self {
        Self {
            response,
            observation: None,
            outcome,
        }
    }
}

/// Mutable state of one conversation: both transcripts plus loop bookkeeping.
pub struct Session {
    planner: Agent,
    speaker: Agent,
    turns_taken: usize,
    last_observation: Option<String>,
}

impl Session {
    pub fn planner(&self) -> &Agent {
        &self.planner
    }

    pub fn speaker(&self) -> &Agent {
        &self.speaker
    }

    /// Planner calls made by the most recent `chat` invocation.
    pub fn turns_taken(&self) -> usize {
        self.turns_taken
    }

    pub fn last_observation(&self) -> Option<&str> {
        self.last_observation.as_deref()
    }
}

/// Runs the plan / act / speak loop for one session.
///
/// `chat` takes `&mut self`, so a single orchestrator can never run two loops
/// at once. Allocate one per conversation and share the registry and the
/// completion client between them.
pub struct Orchestrator {
    session: Session,
    actions: Arc<ActionRegistry>,
    config: OrchestratorConfig,
    caller: CallerContext,
}

impl Orchestrator {
    /// Builds an orchestrator; the config's `call_timeout` is applied to both agents.
    pub fn new(
        planner: Agent,
        speaker: Agent,
        actions: Arc<ActionRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        info!(
            max_turns = config.max_turns,
            actions = ?actions.names(),
            "Initializing orchestrator"
        );
        Self {
            session: Session {
                planner: planner.with_call_timeout(config.call_timeout),
                speaker: speaker.with_call_timeout(config.call_timeout),
                turns_taken: 0,
                last_observation: None,
            },
            actions,
            config,
            caller: CallerContext::new("anonymous"),
        }
    }

    /// Sets the identity forwarded to action handlers.
    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = caller;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Answers `message`, optionally continuing from `history`.
    ///
    /// Returns `Err` only for an empty message. Everything else, including
    /// provider and action failures, comes back as a [`ChatReply`].
    #[instrument(name = "chat", skip_all, fields(caller = %self.caller.caller_id))]
    pub async fn chat(
        &mut self,
        message: &str,
        history: Vec<RawTurn>,
    ) -> Result<ChatReply, AgentError> {
        if message.is_empty() {
            return Err(AgentError::InvalidInput("Message is required".to_string()));
        }

        let mut next_prompt = if history.is_empty() {
            Prompt::Text(message.to_string())
        } else {
            let mut turns = history;
            turns.push(Turn::user(message).into());
            Prompt::Turns(turns)
        };

        self.session.turns_taken = 0;
        self.session.last_observation = None;

        while self.session.turns_taken < self.config.max_turns {
            self.session.turns_taken += 1;
            info!(
                turn = self.session.turns_taken,
                max_turns = self.config.max_turns,
                "Starting turn"
            );

            let plan = match self.session.planner.call(next_prompt).await {
                Ok(plan) => plan,
                Err(e) => return Ok(agent_failure(e)),
            };

            match parse_directive(&plan) {
                Directive::NoAction => {
                    info!("No action requested, generating reply");
                    return Ok(self.speak(message, &plan).await);
                }
                Directive::Action { name, input } => {
                    info!(action = %name, "Detected action");
                    let Some(action) = self.actions.resolve(&name) else {
                        let unknown = AgentError::UnknownAction {
                            name,
                            available: self.actions.names(),
                        };
                        warn!(error = %unknown, "Unknown action");
                        return Ok(ChatReply::failed(
                            ChatOutcome::UnknownAction,
                            unknown.to_string(),
                        ));
                    };

                    match self.run_action(&name, action.as_ref(), &input).await {
                        Ok(observation) => {
                            info!(action = %name, "Action completed");
                            next_prompt = Prompt::Text(format!("Observation: {observation}"));
                            self.session.last_observation = Some(observation);
                        }
                        Err(e) => {
                            error!(action = %name, error = %e, "Action failed");
                            return Ok(ChatReply::failed(ChatOutcome::ActionFailed, e.to_string()));
                        }
                    }
                }
            }
        }

        warn!(max_turns = self.config.max_turns, "Maximum turns reached");
        Ok(ChatReply::failed(
            ChatOutcome::MaxTurnsReached,
            MAX_TURNS_REACHED.to_string(),
        ))
    }

    async fn run_action(
        &self,
        name: &str,
        action: &dyn Action,
        input: &str,
    ) -> Result<String, AgentError> {
        let run = action.run(input, &self.caller);
        let result = match self.config.call_timeout {
            Some(limit) => match timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    let expired = AgentError::Timeout {
                        what: format!("action {name}"),
                        after: limit,
                    };
                    return Err(AgentError::ActionExecution {
                        action: name.to_string(),
                        detail: expired.to_string(),
                    });
                }
            },
            None => run.await,
        };
        result.map_err(|e| AgentError::ActionExecution {
            action: name.to_string(),
            detail: format!("{e:#}"),
        })
    }

    /// Hands the planner's transcript plus a context summary to the speaker.
    async fn speak(&mut self, message: &str, plan: &str) -> ChatReply {
        let mut context = format!("General Context: {message}\nPlanner Context: {plan}");
        if let Some(observation) = self
            .session
            .last_observation
            .as_deref()
            .filter(|o| !o.is_empty())
        {
            context.push_str(&format!("\nAdditional Context: {observation}"));
        }

        let mut handoff = self.session.planner.transcript().to_vec();
        handoff.push(Turn::user(context));

        match self.session.speaker.call(handoff).await {
            Ok(response) => ChatReply {
                response,
                observation: self.session.last_observation.clone(),
                outcome: ChatOutcome::Answered,
            },
            Err(e) => agent_failure(e),
        }
    }
}

fn agent_failure(e: AgentError) -> ChatReply {
    error!(error = %e, "Error in agent loop");
    ChatReply::failed(ChatOutcome::AgentFailed, format!("Error in agent loop: {e}"))
}
