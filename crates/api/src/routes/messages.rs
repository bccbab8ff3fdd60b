use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use lendline_database::Message;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

/// Full room history, ascending by send time.
pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let _ = state.authenticate(&token).await?;

    let messages = state.messages().history(room_id).await?;

    Ok(Json(HistoryResponse { messages }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: Message,
}

/// REST send path: persist with the caller as sender, then fan out.
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let message = state
        .send_message(
            room_id,
            user.id,
            payload.content.as_deref(),
            payload.image_url.as_deref(),
        )
        .await?;

    Ok(Json(SendMessageResponse { message }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    pub image_url: String,
}

/// Store a chat image on disk and hand back the url to reference from a
/// subsequent send. Serving the bytes is left to static hosting.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<UploadImageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    state
        .rooms()
        .find_by_id(room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("room not found"))?;

    let mut image_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("malformed multipart payload"))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("failed to read image field"))?;
            image_bytes = Some(bytes);
            break;
        }
    }

    let Some(bytes) = image_bytes else {
        return Err(ApiError::bad_request("no image to upload"));
    };
    if bytes.is_empty() {
        return Err(ApiError::bad_request("no image to upload"));
    }

    let dir = state.uploads_dir().join("chat").join(room_id.to_string());
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        error!(error = ?e, room_id, "failed to create upload directory");
        ApiError::internal_server_error("failed to store chat image")
    })?;

    let filename = format!("chat_{}_{}.jpg", user.id, cuid2::create_id());
    let path = dir.join(&filename);
    tokio::fs::write(&path, &bytes).await.map_err(|e| {
        error!(error = ?e, path = %path.display(), "failed to write chat image");
        ApiError::internal_server_error("failed to store chat image")
    })?;

    Ok(Json(UploadImageResponse {
        image_url: format!("/uploads/chat/{room_id}/{filename}"),
    }))
}
