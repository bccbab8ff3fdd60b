use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use lendline_database::{Participant, Room, EMPTY_ROOM_PREVIEW};
use serde::{Deserialize, Serialize};

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub listing_id: i64,
    pub lender_id: i64,
    pub borrower_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: i64,
}

/// Find or create the negotiation room for a (listing, lender, borrower)
/// triple. Idempotent; both parties land in the same room.
pub async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let _ = state.authenticate(&token).await?;

    let room = state
        .rooms()
        .find_or_create(payload.listing_id, payload.lender_id, payload.borrower_id)
        .await?;

    Ok(Json(CreateRoomResponse { room_id: room.id }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListEntry {
    pub room_id: i64,
    pub listing_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_title: Option<String>,
    pub partner_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_display_name: Option<String>,
    pub last_message_content: String,
    pub last_message_time: String,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomListEntry>,
}

/// All rooms the caller participates in, newest first, each with a preview
/// of the latest message and the caller's unread count.
pub async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoomListResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let rooms = state.rooms().list_for_user(user.id).await?;

    let mut entries = Vec::with_capacity(rooms.len());
    for room in rooms {
        entries.push(room_list_entry(&state, &room, user.id).await?);
    }

    Ok(Json(RoomListResponse { rooms: entries }))
}

async fn room_list_entry(
    state: &AppState,
    room: &Room,
    viewer_id: i64,
) -> Result<RoomListEntry, ApiError> {
    let partner_id = room.other_party(viewer_id);
    let partner = state.participants().find_by_id(partner_id).await?;
    let listing_title = state.rooms().listing_title(room.listing_id).await?;
    let latest = state.messages().latest(room.id).await?;
    let unread_count = state.read_tracker().unread_count(room.id, viewer_id).await?;

    let (last_message_content, last_message_time) = match &latest {
        Some(message) => (message.preview_text().to_string(), message.sent_at.clone()),
        None => (EMPTY_ROOM_PREVIEW.to_string(), room.created_at.clone()),
    };

    Ok(RoomListEntry {
        room_id: room.id,
        listing_id: room.listing_id,
        listing_title,
        partner_id,
        partner_display_name: partner.and_then(|partner| partner.display_name),
        last_message_content,
        last_message_time,
        unread_count,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoResponse {
    pub room: Room,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_title: Option<String>,
    pub lender: Participant,
    pub borrower: Participant,
}

pub async fn room_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> Result<Json<RoomInfoResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let _ = state.authenticate(&token).await?;

    let room = state
        .rooms()
        .find_by_id(room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("room not found"))?;

    let lender = state.participants().require(room.lender_id).await?;
    let borrower = state.participants().require(room.borrower_id).await?;
    let listing_title = state.rooms().listing_title(room.listing_id).await?;

    Ok(Json(RoomInfoResponse {
        room,
        listing_title,
        lender,
        borrower,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: u64,
    pub unread_count: i64,
}

/// Flip everything the partner sent in this room to read. Safe to call on
/// every room open or refresh.
pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    state
        .rooms()
        .find_by_id(room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("room not found"))?;

    let updated = state.read_tracker().mark_read(room_id, user.id).await?;
    let unread_count = state.read_tracker().unread_count(room_id, user.id).await?;

    Ok(Json(MarkReadResponse {
        updated,
        unread_count,
    }))
}
