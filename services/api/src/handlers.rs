//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling chat, search and discovery
//! requests. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use parley_core::{AgentError, CallerContext, search::join_descriptions};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    models::{
        ActionsResponse, ChatRequest, ChatResponse, ErrorResponse, HealthResponse, SearchRequest,
        SearchResponse,
    },
    state::AppState,
};

/// Caller id used when the `x-user-id` header is absent.
pub const ANONYMOUS_CALLER: &str = "anonymous";

pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn caller_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CALLER)
        .to_string()
}

/// Answer a message through the plan / act / speak loop.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Reply produced (check `outcome` for failures)", body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "The ID of the calling user, forwarded to actions")
    )
)]
#[instrument(name = "chat_request", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let caller = CallerContext::new(caller_id(&headers));
    info!(caller = %caller.caller_id, history = payload.history.len(), "Received chat request");

    let mut orchestrator = state.new_orchestrator(caller);
    let reply = orchestrator
        .chat(&payload.message, payload.history)
        .await
        .map_err(|e| match e {
            AgentError::InvalidInput(message) => ApiError::BadRequest(message),
            other => ApiError::from(other),
        })?;

    info!(outcome = ?reply.outcome, "Chat request completed");
    Ok(Json(reply.into()))
}

/// Run a web search on behalf of the agent system.
#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Result descriptions, one per line", body = SearchResponse),
        (status = 400, description = "Missing query", body = ErrorResponse),
        (status = 403, description = "Not an agent request", body = ErrorResponse),
        (status = 500, description = "Search provider failed", body = ErrorResponse)
    )
)]
#[instrument(name = "search_request", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = payload
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query is required".to_string()))?;

    if !payload.agent_request {
        warn!("Rejected search request from outside the agent system");
        return Err(ApiError::Forbidden(
            "Search can only be performed through the agent system".to_string(),
        ));
    }

    let results = state
        .search
        .search(&query)
        .await
        .map_err(|e| ApiError::InternalServerError(e.context("Failed to perform search")))?;

    info!(results = results.len(), "Search completed");
    Ok(Json(SearchResponse {
        results: join_descriptions(&results),
    }))
}

/// List the actions the planner may invoke.
#[utoipa::path(
    get,
    path = "/actions",
    responses(
        (status = 200, description = "Registered action names", body = ActionsResponse)
    )
)]
pub async fn list_actions(State(state): State<Arc<AppState>>) -> Json<ActionsResponse> {
    Json(ActionsResponse {
        actions: state.actions.names(),
    })
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
