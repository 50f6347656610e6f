//! REST endpoints for board messages.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::model::{CreateMessage, Message, UpdateMessage, from_json_object};
use crate::error::DatabaseError;
use crate::store::MessageStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
}

/// Build the Axum router with the message REST routes.
pub fn message_routes(store: Arc<dyn MessageStore>) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/messages", get(list_messages).post(create_message))
        .route("/messages/{id}", patch(update_message).delete(delete_message))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Handler failure, mapped onto a fixed HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// No message with the requested id (404, empty body).
    NotFound,
    /// Anything else (500, generic body, cause logged).
    Internal(String),
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        if e.is_not_found() {
            Self::NotFound
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Internal(format!("Unreadable request payload: {}", e.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    // A non-integer id can't name a message
    fn from(_: PathRejection) -> Self {
        Self::NotFound
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Internal(message) => {
                error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    })),
                )
                    .into_response()
            }
        }
    }
}

// ── REST Endpoints ──────────────────────────────────────────────────────

/// Unwrap a JSON body that must be an object shaped like `T`.
fn decode_payload<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = payload?;
    from_json_object(value)
        .map_err(|e| ApiError::Internal(format!("Unreadable request payload: {e}")))
}

async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state.store.list_all().await?;
    Ok(Json(messages))
}

async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let payload: CreateMessage = decode_payload(payload)?;
    let message = state
        .store
        .insert(payload.body.as_deref(), payload.username.as_deref())
        .await?;
    info!(message_id = message.id, "Message created");
    Ok(Json(message))
}

async fn update_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let Path(id) = id?;
    let payload: UpdateMessage = match decode_payload(payload) {
        Ok(payload) => payload,
        Err(err) => {
            // An unknown id is reported before a bad payload
            state.store.find_by_id(id).await?.ok_or(ApiError::NotFound)?;
            return Err(err);
        }
    };

    let message = state.store.update(id, payload.body.as_deref()).await?;
    Ok(Json(message))
}

async fn delete_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.store.delete(id).await?;
    info!(message_id = id, "Message deleted");
    Ok(StatusCode::NO_CONTENT)
}
