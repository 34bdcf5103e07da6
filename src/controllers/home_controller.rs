use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::AppState;

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false, "error": "not found" })))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok".to_string())
}

pub async fn health_store(State(state): State<AppState>) -> impl IntoResponse {
    let Some(store) = state.store.as_ref() else {
        return (StatusCode::OK, "store: disabled".to_string()).into_response();
    };

    match store.ping().await {
        Ok(_) => (StatusCode::OK, "store: ok".to_string()).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("store error: {}", e),
        )
            .into_response(),
    }
}
