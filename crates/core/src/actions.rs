//! Action Registry
//!
//! Maps action names emitted by the planner (`Action: <name>: <input>`) to
//! asynchronous handlers. The registry is assembled once at startup and then
//! shared read-only between sessions.

use crate::search::{SearchProvider, join_descriptions};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name under which the built-in search action is registered.
pub const WEB_SEARCH: &str = "web_search";

/// Who asked for an action, passed through to every handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallerContext {
    /// Opaque identifier of the end user.
    pub caller_id: String,
    /// Free-form data a handler may consult. Unused by the built-ins.
    pub data: Option<Value>,
}

impl CallerContext {
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            data: None,
        }
    }
}

/// An external capability the planner can invoke.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Action: Send + Sync {
    /// Executes the action with the raw directive input.
    async fn run(&self, input: &str, ctx: &CallerContext) -> Result<String>;
}

/// Adapts an async closure into an [`Action`].
pub struct FnAction<F>(F);

impl<F> FnAction<F>
where
    F: Fn(String, CallerContext) -> BoxFuture<'static, Result<String>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(String, CallerContext) -> BoxFuture<'static, Result<String>> + Send + Sync,
{
    async fn run(&self, input: &str, ctx: &CallerContext) -> Result<String> {
        (self.0)(input.to_string(), ctx.clone()).await
    }
}

/// The built-in `web_search` action.
///
/// Forwards its input verbatim to the search provider and returns the result
/// descriptions joined by newlines. Provider failures are returned unchanged.
pub struct WebSearchAction {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchAction {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Action for WebSearchAction {
    async fn run(&self, input: &str, _ctx: &CallerContext) -> Result<String> {
        let results = self.provider.search(input).await?;
        debug!(count = results.len(), "web_search returned results");
        Ok(join_descriptions(&results))
    }
}

/// Name-keyed table of actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the built-in `web_search` action.
    pub fn with_web_search(provider: Arc<dyn SearchProvider>) -> Self {
        let mut registry = Self::new();
        registry.register(WEB_SEARCH, WebSearchAction::new(provider));
        registry
    }

    /// Registers `action` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, action: impl Action + 'static) {
        let name = name.into();
        if self
            .actions
            .insert(name.clone(), Arc::new(action))
            .is_some()
        {
            warn!(action = %name, "Replacing previously registered action");
        }
    }

    /// Registers an async closure under `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(String, CallerContext) -> BoxFuture<'static, Result<String>> + Send + Sync + 'static,
    {
        self.register(name, FnAction::new(f));
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
