//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};

use crate::{
    domain::{Identity, RoomKey},
    infrastructure::dto::http::{CreateRoomRequest, OnlineUsersDto, RoomDto, UserPresenceDto},
    ui::state::AppState,
    usecase::{ConnectError, RoomError},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get the current online snapshot
pub async fn list_online(State(state): State<Arc<AppState>>) -> Json<OnlineUsersDto> {
    let snapshot = state.engine.online_snapshot();

    // Domain Model から DTO への変換
    Json((&snapshot).into())
}

/// Get every user known to the store with their presence
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserPresenceDto>>, StatusCode> {
    match state.engine.list_users().await {
        Ok(users) => Ok(Json(users.into_iter().map(UserPresenceDto::from).collect())),
        Err(e) => {
            tracing::error!("Failed to list users: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Get the rooms the caller is a member of
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomDto>>, StatusCode> {
    let identity = authorize(&state, &headers).await?;

    let rooms = state
        .engine
        .rooms_of(&identity.user_id)
        .await
        .map_err(room_error_status)?;
    Ok(Json(rooms.into_iter().map(RoomDto::from).collect()))
}

/// Create a room with the caller as its first member
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomDto>), StatusCode> {
    let identity = authorize(&state, &headers).await?;

    let key = RoomKey::new(request.room_id).map_err(|e| {
        tracing::warn!("'{}' sent an invalid room id: {}", identity, e);
        StatusCode::BAD_REQUEST
    })?;

    let room = state
        .engine
        .create_room(&identity, key, request.name)
        .await
        .map_err(room_error_status)?;
    Ok((StatusCode::CREATED, Json(room.into())))
}

/// `Authorization: Bearer <token>` の値
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authenticate the caller with the same collaborator the WebSocket endpoint uses
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Identity, StatusCode> {
    let Some(token) = bearer_token(headers) else {
        tracing::warn!("HTTP request without bearer token. Rejecting request.");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state.engine.authenticate(token).await {
        Ok(authenticated) => Ok(authenticated.into_identity()),
        Err(e @ (ConnectError::Unauthenticated(_) | ConnectError::AuthTimeout)) => {
            tracing::warn!("Rejecting HTTP request: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            tracing::error!("Rejecting HTTP request: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

fn room_error_status(error: RoomError) -> StatusCode {
    match error {
        RoomError::InvalidName(_) => StatusCode::BAD_REQUEST,
        RoomError::AlreadyExists(room) => {
            tracing::warn!("Room '{}' already exists", room);
            StatusCode::CONFLICT
        }
        RoomError::StoreUnavailable(detail) => {
            tracing::error!("Room request failed: {}", detail);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
