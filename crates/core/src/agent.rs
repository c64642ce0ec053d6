//! Conversational Agents
//!
//! The planner and the speaker are the same state machine: a transcript that
//! grows by one input batch and one assistant reply per call. What tells them
//! apart is their [`AgentProfile`] (persona, model and temperature).

use crate::{
    error::AgentError,
    llm_client::{ChatMessage, CompletionClient, CompletionRequest},
    turn::{Prompt, Turn},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default persona for the planning agent.
pub const PLANNER_PROMPT: &str = r#"=== Role ===
You are a planning agent. You read a human's request, decide whether an
external action is needed to answer it, request that action, and report what
you found to another agent. You never talk to the human directly.

You work in a loop of Thought, Action and Observation. When no further action
is needed, finish with a Response.

1. Thought: reason about the request and what is still missing.
2. Action: when you need an action, write one line in exactly this format:
   Action: <action_name>: <input>
3. Observation: the result of your action will be sent back to you.
4. Response: summarise what was done and what was learned.

Request at most one action per reply.

=== Available Actions ===

web_search
  Searches the web for current information.
  Input: the search query as plain text.
  Returns: text snippets from the search results.
  Example: Action: web_search: latest stable Rust release

=== Failures ===
If an action fails, the Observation will contain the error. Explain what went
wrong in your Response.

=== Example ===

Request: Who won the most recent Tour de France?
Thought: This needs up-to-date results, so I should search the web.
Action: web_search: most recent Tour de France winner

Observation: [search results]

Response: I searched for the latest Tour de France result and found the winner
and the margin of victory in the snippets above."#;

/// Default persona for the speaking agent.
pub const SPEAKER_PROMPT: &str = r#"You are a friendly assistant who talks to the human. Another agent has
already analysed the request and may have gathered search results for you.

Your input arrives in this shape:
General Context: the human's latest message
Planner Context: the planning agent's analysis
Additional Context: optional results from searches or other actions

When you answer:
- use the provided context and results where they are relevant
- be direct, clear and concise
- stay conversational and professional
- never reveal the internal planning process or tool details"#;

/// Fixed generation settings and persona for one agent role.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    /// Short label used in logs, e.g. `planner`.
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
}

impl AgentProfile {
    /// The planning role: chooses actions, sampled at temperature 1.0.
    pub fn planner() -> Self {
        Self {
            name: "planner".to_string(),
            system_prompt: PLANNER_PROMPT.to_string(),
            model: "gpt-4o".to_string(),
            temperature: 1.0,
        }
    }

    /// The speaking role: turns accumulated context into the final reply.
    pub fn speaker() -> Self {
        Self {
            name: "speaker".to_string(),
            system_prompt: SPEAKER_PROMPT.to_string(),
            model: "gpt-4o".to_string(),
            temperature: 1.0,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

/// A stateful wrapper around a [`CompletionClient`].
///
/// Each instance owns its transcript; a fresh instance starts a fresh
/// conversation.
pub struct Agent {
    profile: AgentProfile,
    client: Arc<dyn CompletionClient>,
    transcript: Vec<Turn>,
    call_timeout: Option<Duration>,
}

impl Agent {
    /// Creates an agent whose transcript is seeded with the profile's persona.
    pub fn new(profile: AgentProfile, client: Arc<dyn CompletionClient>) -> Self {
        let transcript = if profile.system_prompt.is_empty() {
            Vec::new()
        } else {
            vec![Turn::system(profile.system_prompt.clone())]
        };
        Self::with_transcript(profile, client, transcript)
    }

    /// Creates an agent that continues an existing transcript verbatim.
    pub fn with_transcript(
        profile: AgentProfile,
        client: Arc<dyn CompletionClient>,
        transcript: Vec<Turn>,
    ) -> Self {
        debug!(agent = %profile.name, turns = transcript.len(), "Initializing agent");
        Self {
            profile,
            client,
            transcript,
            call_timeout: None,
        }
    }

    pub fn planner(client: Arc<dyn CompletionClient>) -> Self {
        Self::new(AgentProfile::planner(), client)
    }

    pub fn speaker(client: Arc<dyn CompletionClient>) -> Self {
        Self::new(AgentProfile::speaker(), client)
    }

    /// Bounds every completion call; `None` waits indefinitely.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// The accumulated conversation, oldest first.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// Appends `prompt`, asks the model for a reply, records and returns it.
    ///
    /// A batch of turns is validated as a whole before anything is appended,
    /// so a malformed batch leaves the transcript untouched and never reaches
    /// the provider. If the provider fails, the input stays in the transcript
    /// without a reply.
    pub async fn call(&mut self, prompt: impl Into<Prompt>) -> Result<String, AgentError> {
        match prompt.into() {
            Prompt::Text(text) => self.transcript.push(Turn::user(text)),
            Prompt::Turns(batch) => {
                let turns = batch
                    .into_iter()
                    .enumerate()
                    .map(|(i, raw)| {
                        Turn::try_from(raw).map_err(|e| match e {
                            AgentError::MalformedMessage(detail) => {
                                AgentError::MalformedMessage(format!("turn {i}: {detail}"))
                            }
                            other => other,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .inspect_err(|e| warn!(agent = %self.profile.name, error = %e, "Rejected malformed turn batch"))?;
                self.transcript.extend(turns);
            }
        }

        let request = CompletionRequest {
            model: self.profile.model.clone(),
            temperature: self.profile.temperature,
            messages: self
                .transcript
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role,
                    content: turn.content.clone(),
                })
                .collect(),
        };

        debug!(agent = %self.profile.name, turns = self.transcript.len(), "Executing completion request");
        let reply = match self.call_timeout {
            Some(limit) => timeout(limit, self.client.complete(request))
                .await
                .map_err(|_| AgentError::Timeout {
                    what: format!("{} completion", self.profile.name),
                    after: limit,
                })??,
            None => self.client.complete(request).await?,
        };

        self.transcript.push(Turn::assistant(reply.clone()));
        info!(agent = %self.profile.name, reply_len = reply.len(), "Completion processed");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockCompletionClient;
    use crate::turn::{RawTurn, Role, TurnKind};

    fn replying(reply: &'static str) -> Arc<MockCompletionClient> {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(move |_| Ok(reply.to_string()));
        Arc::new(client)
    }

    #[test]
    fn test_new_agent_is_seeded_with_persona() {
        let agent = Agent::planner(replying("unused"));
        assert_eq!(agent.transcript().len(), 1);
        assert_eq!(agent.transcript()[0], Turn::system(PLANNER_PROMPT));

        let agent = Agent::speaker(replying("unused"));
        assert_eq!(agent.transcript(), &[Turn::system(SPEAKER_PROMPT)]);
    }

    #[test]
    fn test_explicit_transcript_is_used_verbatim() {
        let history = vec![Turn::system("custom"), Turn::user("earlier")];
        let agent =
            Agent::with_transcript(AgentProfile::planner(), replying("unused"), history.clone());
        assert_eq!(agent.transcript(), history.as_slice());
    }

    #[tokio::test]
    async fn test_call_with_text_appends_user_and_assistant_turns() {
        let mut agent = Agent::planner(replying("Response: nothing to do"));

        let reply = agent.call("hello").await.unwrap();

        assert_eq!(reply, "Response: nothing to do");
        assert_eq!(
            agent.transcript(),
            &[
                Turn::system(PLANNER_PROMPT),
                Turn::user("hello"),
                Turn::assistant("Response: nothing to do"),
            ]
        );
    }

    #[tokio::test]
    async fn test_request_carries_profile_and_full_transcript() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|req| {
                req.model == "gpt-4o-mini"
                    && req.temperature == 1.0
                    && req.messages.len() == 3
                    && req.messages[0].role == Role::System
                    && req.messages[1].content == "earlier question"
                    && req.messages[2].content == "follow-up"
            })
            .times(1)
            .returning(|_| Ok("ok".to_string()));

        let profile = AgentProfile::planner().with_model("gpt-4o-mini");
        let mut agent = Agent::new(profile, Arc::new(client));
        agent
            .call(vec![Turn::user("earlier question"), Turn::user("follow-up")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transcript_grows_across_calls() {
        let mut client = MockCompletionClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("first".to_string()));
        client
            .expect_complete()
            .withf(|req| req.messages.len() == 4)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("second".to_string()));

        let mut agent = Agent::speaker(Arc::new(client));
        agent.call("one").await.unwrap();
        agent.call("two").await.unwrap();

        let contents: Vec<&str> = agent
            .transcript()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents[1..], ["one", "first", "two", "second"]);
    }

    #[tokio::test]
    async fn test_malformed_batch_is_rejected_before_network_call() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().never();
        let mut agent = Agent::planner(Arc::new(client));

        let batch = vec![
            RawTurn::from(Turn::user("fine")),
            RawTurn {
                role: Some(Role::User),
                content: Some("no kind".to_string()),
                kind: None,
            },
        ];
        let err = agent.call(Prompt::Turns(batch)).await.unwrap_err();

        match err {
            AgentError::MalformedMessage(detail) => assert!(detail.contains("turn 1")),
            other => panic!("Expected MalformedMessage, got {:?}", other),
        }
        assert_eq!(agent.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_input_without_reply() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_| Err(AgentError::Provider("rate limited".to_string())));
        let mut agent = Agent::planner(Arc::new(client));

        let err = agent.call("hello").await.unwrap_err();

        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(agent.transcript().len(), 2);
        assert_eq!(agent.transcript()[1].role, Role::User);
        assert_eq!(agent.transcript()[1].kind, TurnKind::Text);
    }

    #[tokio::test]
    async fn test_slow_provider_hits_call_timeout() {
        struct Stalled;

        #[async_trait::async_trait]
        impl CompletionClient for Stalled {
            async fn complete(&self, _request: CompletionRequest) -> Result<String, AgentError> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("too late".to_string())
            }
        }

        let mut agent = Agent::planner(Arc::new(Stalled))
            .with_call_timeout(Some(Duration::from_millis(20)));
        let err = agent.call("hello").await.unwrap_err();

        match err {
            AgentError::Timeout { what, after } => {
                assert_eq!(what, "planner completion");
                assert_eq!(after, Duration::from_millis(20));
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }
}
