use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterTokenResponse {
    pub ok: bool,
}

/// Register the caller's mobile device token for push notifications.
/// A new token replaces whatever was stored before.
pub async fn register_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterTokenRequest>,
) -> Result<Json<RegisterTokenResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let device_token = payload.token.trim();
    if device_token.is_empty() {
        return Err(ApiError::bad_request("device token must not be empty"));
    }

    state
        .participants()
        .set_device_token(user.id, device_token)
        .await?;

    Ok(Json(RegisterTokenResponse { ok: true }))
}
