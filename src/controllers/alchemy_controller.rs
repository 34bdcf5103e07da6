use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    services::{
        alchemy::{verify_signature, AddressActivityPayload},
        wallet_watch,
    },
    AppState,
};

pub const SIGNATURE_HEADER: &str = "x-alchemy-signature";

pub async fn post_alchemy_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let key = state.settings.alchemy_signing_key.as_str();
    if key.is_empty() {
        tracing::warn!("alchemy webhook rejected: ALCHEMY_SIGNING_KEY is not set");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "success": false }))).into_response();
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(key, &body, signature) {
        tracing::warn!("alchemy webhook rejected: bad signature");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "success": false }))).into_response();
    }

    let payload: AddressActivityPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "alchemy webhook: unreadable payload");
            return (StatusCode::BAD_REQUEST, Json(json!({ "success": false }))).into_response();
        }
    };

    match wallet_watch::notify_activity(&state, &payload).await {
        Ok(sent) => {
            tracing::info!(webhook_id = %payload.webhook_id, sent, "wallet activity delivered");
            (StatusCode::OK, Json(json!({ "success": true, "sent": sent }))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "wallet activity fan-out failed");
            (StatusCode::OK, Json(json!({ "success": false, "error": e }))).into_response()
        }
    }
}
