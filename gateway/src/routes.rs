use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::{
    ApiError, ChatQuery, ChatResponse, ClearMemoryRequest, ClearMemoryResponse, HealthResponse,
};
use tabchat_core::chat::{Assistant, ChatRequest};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Assistant,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", get(chat))
        .route("/clear-memory", post(clear_memory))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- HANDLERS ---

async fn chat(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = ChatRequest::from_params(query.message, query.tabs.as_deref(), query.api_key, query.tab_id)
        .inspect_err(|e| warn!("Rejected chat request: {}", e))?;

    let response = state.assistant.respond(request).await?;
    Ok(Json(ChatResponse {
        response,
        success: true,
    }))
}

async fn clear_memory(
    State(state): State<AppState>,
    payload: Result<Json<ClearMemoryRequest>, JsonRejection>,
) -> Result<Json<ClearMemoryResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        error!("Bad clear-memory body: {}", rejection.body_text());
        ApiError {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    })?;

    let tab_id = payload.tab_id.unwrap_or_default();
    let message = if state.assistant.store().clear(&tab_id).await {
        info!("Cleared memory for tab '{}'", tab_id);
        "Memory cleared successfully"
    } else {
        "No memory found for this tab"
    };

    Ok(Json(ClearMemoryResponse {
        message: message.to_string(),
        success: true,
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        active_conversations: state.assistant.store().count().await,
    })
}
