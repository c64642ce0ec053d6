//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ActionsResponse, ChatRequest, ChatResponse, ErrorResponse, HealthResponse, SearchRequest,
        SearchResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::chat,
        handlers::search,
        handlers::list_actions,
        handlers::health,
    ),
    components(
        schemas(ChatRequest, ChatResponse, SearchRequest, SearchResponse, ActionsResponse, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Parley API", description = "Plan / act / speak chat agent with web search")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/search", post(handlers::search))
        .route("/actions", get(handlers::list_actions))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
}
