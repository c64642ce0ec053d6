use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use parley_api::{router::create_router, state::AppState};
use parley_core::{
    ActionRegistry, CallerContext, OrchestratorConfig,
    llm_client::ScriptedCompletionClient,
    search::{SearchProvider, SearchResult, StaticSearch},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        max_turns: 3,
        call_timeout: Some(Duration::from_secs(5)),
    }
}

fn app_with(client: Arc<ScriptedCompletionClient>, search: Arc<dyn SearchProvider>) -> Router {
    create_router(Arc::new(AppState::new(client, search, config())))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_chat_answers_without_action() {
    let client = Arc::new(ScriptedCompletionClient::new([
        "Thought: a greeting needs no lookup.\nResponse: greet back",
        "Hello! How can I help?",
    ]));
    let app = app_with(client.clone(), Arc::new(StaticSearch::default()));

    let (status, body) = send(app, "POST", "/chat", Some(json!({"message": "hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Hello! How can I help?");
    assert_eq!(body["outcome"], "answered");
    assert!(body.get("observation").is_none());
    assert_eq!(client.requests().len(), 2);
}

#[tokio::test]
async fn test_chat_with_web_search_returns_observation() {
    let client = Arc::new(ScriptedCompletionClient::new([
        "Thought: need fresh data\nAction: web_search: latest rust release",
        "Response: found the release notes",
        "Rust 1.90 is the latest release.",
    ]));
    let search = Arc::new(StaticSearch::from_snippets([
        "Rust 1.90 released",
        "Cargo gains new features",
    ]));
    let app = app_with(client.clone(), search);

    let (status, body) = send(
        app,
        "POST",
        "/chat",
        Some(json!({"message": "What is the latest Rust?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "answered");
    assert_eq!(body["response"], "Rust 1.90 is the latest release.");
    assert_eq!(
        body["observation"],
        "Rust 1.90 released\nCargo gains new features"
    );

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    let speaker_input = &requests[2].messages.last().unwrap().content;
    assert!(speaker_input.starts_with("General Context: What is the latest Rust?"));
    assert!(speaker_input.contains("Additional Context: Rust 1.90 released"));
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let client = Arc::new(ScriptedCompletionClient::new(Vec::<String>::new()));
    let app = app_with(client.clone(), Arc::new(StaticSearch::default()));

    let (status, body) = send(app.clone(), "POST", "/chat", Some(json!({"message": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message is required");

    let (status, _) = send(app, "POST", "/chat", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_chat_whitespace_message_is_answered() {
    let client = Arc::new(ScriptedCompletionClient::new([
        "Response: the message was blank",
        "Did you mean to ask something?",
    ]));
    let app = app_with(client.clone(), Arc::new(StaticSearch::default()));

    let (status, body) = send(app, "POST", "/chat", Some(json!({"message": "   "}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "answered");
    assert_eq!(body["response"], "Did you mean to ask something?");
    assert_eq!(client.requests().len(), 2);
}

#[tokio::test]
async fn test_chat_malformed_history_is_agent_failure() {
    let client = Arc::new(ScriptedCompletionClient::new(["never used"]));
    let app = app_with(client.clone(), Arc::new(StaticSearch::default()));

    let payload = json!({
        "message": "and tomorrow?",
        "history": [{"role": "user", "content": "weather today?"}]
    });
    let (status, body) = send(app, "POST", "/chat", Some(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "agent_failed");
    assert!(
        body["response"]
            .as_str()
            .unwrap()
            .starts_with("Error in agent loop:")
    );
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_chat_history_is_forwarded_to_planner() {
    let client = Arc::new(ScriptedCompletionClient::new([
        "Response: nothing to look up",
        "Tomorrow looks sunny too.",
    ]));
    let app = app_with(client.clone(), Arc::new(StaticSearch::default()));

    let payload = json!({
        "message": "and tomorrow?",
        "history": [
            {"role": "user", "content": "weather today?", "type": "text"},
            {"role": "assistant", "content": "sunny", "type": "text"}
        ]
    });
    let (status, body) = send(app, "POST", "/chat", Some(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "answered");

    let planner_messages = &client.requests()[0].messages;
    let contents: Vec<&str> = planner_messages
        .iter()
        .skip(1)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, ["weather today?", "sunny", "and tomorrow?"]);
}

#[tokio::test]
async fn test_chat_unknown_action_lists_registered_actions() {
    let client = Arc::new(ScriptedCompletionClient::new(["Action: calculator: 2+2"]));
    let app = app_with(client.clone(), Arc::new(StaticSearch::default()));

    let (status, body) = send(app, "POST", "/chat", Some(json!({"message": "2+2?"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unknown_action");
    assert_eq!(
        body["response"],
        "Unknown action: calculator. Available actions: web_search"
    );
    assert_eq!(client.requests().len(), 1);
}

#[tokio::test]
async fn test_chat_forwards_caller_id_to_actions() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let mut registry = ActionRegistry::new();
    registry.register_fn(
        "whoami",
        move |_input: String, ctx: CallerContext| -> BoxFuture<'static, anyhow::Result<String>> {
            recorder.lock().unwrap().push(ctx.caller_id.clone());
            Box::pin(async move { Ok::<_, anyhow::Error>(format!("you are {}", ctx.caller_id)) })
        },
    );

    let client = Arc::new(ScriptedCompletionClient::new([
        "Action: whoami: ",
        "Response: identified",
        "You are user-7.",
        "Action: whoami: ",
        "Response: identified",
        "You are anonymous.",
    ]));
    let mut state = AppState::new(client, Arc::new(StaticSearch::default()), config());
    state.actions = Arc::new(registry);
    let app = create_router(Arc::new(state));

    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .header("x-user-id", "user-7")
        .body(Body::from(json!({"message": "who am I?"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(app, "POST", "/chat", Some(json!({"message": "who am I?"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["observation"], "you are anonymous");

    assert_eq!(*seen.lock().unwrap(), ["user-7", "anonymous"]);
}

#[tokio::test]
async fn test_search_requires_agent_flag() {
    let client = Arc::new(ScriptedCompletionClient::default());
    let app = app_with(client, Arc::new(StaticSearch::from_snippets(["a"])));

    let (status, body) = send(app, "POST", "/search", Some(json!({"query": "rust"}))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Search can only be performed through the agent system"
    );
}

#[tokio::test]
async fn test_search_requires_query() {
    let client = Arc::new(ScriptedCompletionClient::default());
    let app = app_with(client, Arc::new(StaticSearch::from_snippets(["a"])));

    let (status, body) = send(
        app.clone(),
        "POST",
        "/search",
        Some(json!({"agentRequest": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Query is required");

    let (status, _) = send(
        app,
        "POST",
        "/search",
        Some(json!({"query": "", "agentRequest": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_joins_descriptions() {
    let search = StaticSearch::new(vec![
        SearchResult {
            title: "Tokio".to_string(),
            description: "An async runtime".to_string(),
            url: "https://tokio.rs".to_string(),
        },
        SearchResult {
            title: "async-std".to_string(),
            description: "Another runtime".to_string(),
            url: "https://async.rs".to_string(),
        },
    ]);
    let app = app_with(Arc::new(ScriptedCompletionClient::default()), Arc::new(search));

    let (status, body) = send(
        app,
        "POST",
        "/search",
        Some(json!({"query": "rust async runtimes", "agentRequest": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], "An async runtime\nAnother runtime");
}

#[tokio::test]
async fn test_search_provider_failure_is_internal_error() {
    struct Broken;

    #[async_trait::async_trait]
    impl SearchProvider for Broken {
        async fn search(&self, _query: &str) -> anyhow::Result<Vec<SearchResult>> {
            anyhow::bail!("upstream unavailable")
        }
    }

    let app = app_with(Arc::new(ScriptedCompletionClient::default()), Arc::new(Broken));
    let (status, body) = send(
        app,
        "POST",
        "/search",
        Some(json!({"query": "rust", "agentRequest": true})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "An internal server error occurred.");
}

#[tokio::test]
async fn test_list_actions_and_health() {
    let app = app_with(
        Arc::new(ScriptedCompletionClient::default()),
        Arc::new(StaticSearch::default()),
    );

    let (status, body) = send(app.clone(), "GET", "/actions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"actions": ["web_search"]}));

    let (status, body) = send(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = app_with(
        Arc::new(ScriptedCompletionClient::default()),
        Arc::new(StaticSearch::default()),
    );

    let (status, body) = send(app, "GET", "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    for path in ["/chat", "/search", "/actions", "/health"] {
        assert!(body["paths"].get(path).is_some(), "missing {path}");
    }
}
