use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tabchat_core::error::ChatError;
use tabchat_core::structured::ResponseEnvelope;

// Input: query string of GET /chat. Everything optional, validation happens in core.
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    pub message: Option<String>,
    pub tabs: Option<String>,   // JSON-encoded array of tabs
    pub api_key: Option<String>,
    pub tab_id: Option<String>,
}

// Input: body of POST /clear-memory
#[derive(Debug, Default, Deserialize)]
pub struct ClearMemoryRequest {
    #[serde(default)]
    pub tab_id: Option<String>,
}

// Output: successful chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: ResponseEnvelope,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearMemoryResponse {
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_conversations: usize,
}

// Output: any failure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub success: bool,
}

/// A failure on its way back to the caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            success: false,
        };
        (self.status, Json(body)).into_response()
    }
}
