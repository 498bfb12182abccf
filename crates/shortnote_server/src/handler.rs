//! Request handlers for the note endpoints.
//!
//! Handlers only extract, check presence of required fields, and translate
//! results. Every rule about identifiers and content lives in the core
//! gateway, so validation is identical across transports.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use shortnote_core::Note;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckQuery {
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentRequest {
    pub content: Option<String>,
}

/// Acknowledgement for writes: the affected id plus a display message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAck {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: shortnote_core::ping().to_string(),
        version: shortnote_core::core_version().to_string(),
    })
}

/// `GET /api/notes/check?id=`: reports whether the id is taken.
pub async fn check_handler(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<ExistsResponse>, ApiError> {
    let id = required(query.id, "Missing ID.")?;
    let exists = state
        .run("check", move |service| service.exists(&id))
        .await?;
    Ok(Json(ExistsResponse { exists }))
}

/// `POST /api/notes`: stores content under a caller-allocated id.
pub async fn create_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteAck>), ApiError> {
    let Json(request) = payload.map_err(reject_body)?;
    let (id, content) = match (request.id, request.content) {
        (Some(id), Some(content)) if !id.is_empty() && !content.is_empty() => (id, content),
        _ => {
            return Err(ApiError::bad_request(
                "Missing ID or content in request body.",
            ))
        }
    };

    let note = state
        .run("create", move |service| service.create(&id, &content))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ack(&note, "Note created successfully.")),
    ))
}

/// `POST /api/notes/publish`: allocates an id server-side and stores content.
pub async fn publish_handler(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteAck>), ApiError> {
    let Json(request) = payload.map_err(reject_body)?;
    let content = required(request.content, "Missing content in request body.")?;

    let note = state
        .run("publish", move |service| service.publish(&content))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ack(&note, "Note published successfully.")),
    ))
}

/// `GET /api/notes/{id}`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let note = state.run("get", move |service| service.get(&id)).await?;
    Ok(Json(note))
}

/// `PUT /api/notes/{id}`: replaces content in full.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<NoteAck>, ApiError> {
    let Json(request) = payload.map_err(reject_body)?;
    let content = request
        .content
        .ok_or_else(|| ApiError::bad_request("Missing content for update."))?;

    let note = state
        .run("update", move |service| service.update(&id, &content))
        .await?;
    Ok(Json(ack(&note, "Note updated successfully.")))
}

fn required(value: Option<String>, message: &'static str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("Malformed request body: {}", rejection.body_text()))
}

fn ack(note: &Note, message: &str) -> NoteAck {
    NoteAck {
        id: note.id.to_string(),
        message: message.to_string(),
    }
}
