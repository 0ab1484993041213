//! HTTP handlers for the room API and uploads.
//!
//! Every failure is converted at this boundary into an [`ApiError`] with the
//! right status code; a failed action never disturbs coordination state —
//! the room simply stays in its prior phase.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use coinsketch_core::catalog;
use coinsketch_core::protocol::{
    CreateRoomResponse, DeleteRoomRequest, HostRequest, JoinRoomRequest, JoinRoomResponse,
    LeaveRequest, StartRoundRequest, UploadResponse, normalize_room_code, validate_room_code,
};
use coinsketch_core::room::{Coin, Room};

use crate::AppState;
use crate::rooms::RoomsError;
use crate::store::StoreError;
use crate::upload::UploadError;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RoomsError> for ApiError {
    fn from(err: RoomsError) -> Self {
        match err {
            RoomsError::Store(StoreError::RoomNotFound) => {
                ApiError::NotFound("Room not found".to_string())
            }
            RoomsError::Store(StoreError::PlayerNotFound) => {
                ApiError::NotFound("Player not found".to_string())
            }
            RoomsError::Store(e @ StoreError::PhaseConflict { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            e @ RoomsError::NotHost(_) => ApiError::Forbidden(e.to_string()),
            RoomsError::Transition(e) => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        RoomsError::from(err).into()
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotAnImage => ApiError::BadRequest(err.to_string()),
            UploadError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/coins` — the catalog in randomized order.
pub async fn coins() -> Json<Vec<Coin>> {
    Json(catalog::shuffled())
}

/// `POST /api/rooms` — create a room in the lobby phase.
pub async fn create_room(State(state): State<AppState>) -> Json<CreateRoomResponse> {
    let room = state.coordinator.create_room().await;
    Json(CreateRoomResponse { room })
}

/// `POST /api/rooms/join` — lookup by code, player upsert, host claim.
pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let code = checked_code(&req.room_code)?;
    let client_id = checked_client_id(&req.client_id)?;

    let joined = state
        .coordinator
        .join(&code, client_id, req.name.as_deref())
        .await?;
    Ok(Json(JoinRoomResponse {
        room: joined.room,
        player: joined.player,
        is_host: joined.is_host,
    }))
}

/// `POST /api/rooms/{code}/start` — host-only `waiting → memorize`,
/// storing the round's coin in the same write.
pub async fn start_round(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<StartRoundRequest>,
) -> Result<Json<Room>, ApiError> {
    let code = checked_code(&code)?;
    let client_id = checked_client_id(&req.client_id)?;
    let room = state
        .coordinator
        .start_round(&code, client_id, req.coin)
        .await?;
    Ok(Json(room))
}

/// `POST /api/rooms/{code}/next-round` — host-only `compare → memorize`.
pub async fn next_round(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<StartRoundRequest>,
) -> Result<Json<Room>, ApiError> {
    let code = checked_code(&code)?;
    let client_id = checked_client_id(&req.client_id)?;
    let room = state
        .coordinator
        .next_round(&code, client_id, req.coin)
        .await?;
    Ok(Json(room))
}

/// `POST /api/rooms/{code}/lobby` — host-only `compare → waiting`.
pub async fn back_to_lobby(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<HostRequest>,
) -> Result<Json<Room>, ApiError> {
    let code = checked_code(&code)?;
    let client_id = checked_client_id(&req.client_id)?;
    let room = state.coordinator.back_to_lobby(&code, client_id).await?;
    Ok(Json(room))
}

/// `POST /api/rooms/{code}/leave` — delete the caller's player row.
pub async fn leave_room(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<LeaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let code = checked_code(&code)?;
    let client_id = checked_client_id(&req.client_id)?;
    state.coordinator.leave(&code, client_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/delete-room` — origin-gated room deletion with cascade.
pub async fn delete_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeleteRoomRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !state.allowed_origins.iter().any(|o| o == origin) {
        tracing::warn!(origin, "Unauthorized origin on delete-room");
        return Err(ApiError::Forbidden("Unauthorized origin".to_string()));
    }

    if req.room_id.is_empty() {
        return Err(ApiError::BadRequest("Missing roomId".to_string()));
    }

    state.coordinator.delete_room(&req.room_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/upload` — sniff, store under a generated unique path, return
/// the retrieval reference.
pub async fn upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let stored = state.drawings.store_upload(&body).await?;
    Ok(Json(UploadResponse {
        url: stored.url,
        path: stored.path,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    pub client_id: String,
}

/// `POST /api/rooms/{code}/submit` — store the caller's drawing, mark the
/// player row done, and auto-advance to compare once everyone has submitted.
pub async fn submit_drawing(
    Path(code): Path<String>,
    Query(params): Query<SubmitParams>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let code = checked_code(&code)?;
    let client_id = checked_client_id(&params.client_id)?;

    let room = state.store.room_by_code(&code).await?;
    let player = state.store.player_by_client(&room.id, client_id).await?;

    let stored = state.drawings.store_drawing(&code, &player.id, &body).await?;
    state
        .coordinator
        .record_submission(&code, client_id, &stored.url)
        .await?;

    Ok(Json(UploadResponse {
        url: stored.url,
        path: stored.path,
    }))
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn checked_code(raw: &str) -> Result<String, ApiError> {
    let code = normalize_room_code(raw);
    validate_room_code(&code).map_err(ApiError::BadRequest)?;
    Ok(code)
}

fn checked_client_id(raw: &str) -> Result<&str, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing client_id".to_string()));
    }
    Ok(raw)
}
