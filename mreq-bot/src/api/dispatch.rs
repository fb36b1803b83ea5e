//! POST /dispatch

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::OutboundPayload;
use crate::{ApiError, ApiResult, AppState};

/// One inbound chat message
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    /// Stable id of the conversation (group id, or user id for direct chats)
    pub conversation_key: String,
    pub text: String,
}

/// Reply for the adapter; `matched: false` means stay silent
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<OutboundPayload>,
    /// Rendered message text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

pub async fn dispatch_message(
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> ApiResult<Json<DispatchResponse>> {
    if request.conversation_key.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "conversation_key must not be empty".to_string(),
        ));
    }

    let response = match state
        .dispatcher
        .handle(&request.conversation_key, &request.text)
        .await
    {
        Some(payload) => DispatchResponse {
            matched: true,
            text: Some(payload.to_text()),
            payload: Some(payload),
        },
        None => {
            debug!(conversation_key = %request.conversation_key, "Message not addressed to bot");
            DispatchResponse {
                matched: false,
                payload: None,
                text: None,
            }
        }
    };

    Ok(Json(response))
}

/// Build dispatch routes
pub fn dispatch_routes() -> Router<AppState> {
    Router::new().route("/dispatch", post(dispatch_message))
}
