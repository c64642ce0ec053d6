//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared
//! completion client, the action registry and the agent profiles. Handlers
//! build a fresh orchestrator from it for every request.

use parley_core::{
    Agent, AgentProfile, CallerContext, Orchestrator, OrchestratorConfig,
    actions::ActionRegistry, llm_client::CompletionClient, search::SearchProvider,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub completion_client: Arc<dyn CompletionClient>,
    pub actions: Arc<ActionRegistry>,
    pub search: Arc<dyn SearchProvider>,
    pub planner_profile: AgentProfile,
    pub speaker_profile: AgentProfile,
    pub orchestrator_config: OrchestratorConfig,
}

impl AppState {
    /// Wires the web search action over `search` and uses the default profiles.
    pub fn new(
        completion_client: Arc<dyn CompletionClient>,
        search: Arc<dyn SearchProvider>,
        orchestrator_config: OrchestratorConfig,
    ) -> Self {
        Self {
            completion_client,
            actions: Arc::new(ActionRegistry::with_web_search(search.clone())),
            search,
            planner_profile: AgentProfile::planner(),
            speaker_profile: AgentProfile::speaker(),
            orchestrator_config,
        }
    }

    pub fn with_profiles(mut self, planner: AgentProfile, speaker: AgentProfile) -> Self {
        self.planner_profile = planner;
        self.speaker_profile = speaker;
        self
    }

    /// A fresh session: new transcripts, shared client and registry.
    pub fn new_orchestrator(&self, caller: CallerContext) -> Orchestrator {
        let planner = Agent::new(self.planner_profile.clone(), self.completion_client.clone());
        let speaker = Agent::new(self.speaker_profile.clone(), self.completion_client.clone());
        Orchestrator::new(
            planner,
            speaker,
            self.actions.clone(),
            self.orchestrator_config.clone(),
        )
        .with_caller(caller)
    }
}
