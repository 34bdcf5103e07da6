use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::{
    services::{event_broadcast, price_alert_service, reminder_monitor},
    AppState,
};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

type HmacSha256 = Hmac<Sha256>;

/// Constant-time secret check: both values are MACed under `expected` and the
/// tags compared with `verify_slice`.
pub fn secret_matches(expected: &str, presented: &str) -> bool {
    let tag = |value: &str| {
        let mut mac = HmacSha256::new_from_slice(expected.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };

    match (tag(presented), tag(expected)) {
        (Some(mac), Some(reference)) => mac.verify_slice(&reference.finalize().into_bytes()).is_ok(),
        _ => false,
    }
}

fn presented_secret(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if let Some(v) = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(v.to_string());
    }

    serde_json::from_slice::<Value>(body)
        .ok()?
        .get("secret")?
        .as_str()
        .map(str::to_string)
}

/// `Err` carries the response to return as-is.
fn authorize(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
    let expected = state.settings.cron_secret.as_str();
    if expected.is_empty() {
        tracing::warn!("cron call rejected: CRON_SECRET is not set");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "error": "cron secret not configured" })),
        )
            .into_response());
    }

    match presented_secret(headers, body) {
        Some(s) if secret_matches(expected, &s) => Ok(()),
        _ => {
            tracing::warn!("cron call rejected: bad secret");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "unauthorized" })),
            )
                .into_response())
        }
    }
}

fn report_response<T: Serialize>(job: &str, res: Result<T, String>) -> Response {
    match res {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({ "success": true, "job": job, "report": report })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(job, error = %e, "cron job failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "job": job, "error": e })),
            )
                .into_response()
        }
    }
}

pub async fn post_reminders(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(resp) = authorize(&state, &headers, &body) {
        return resp;
    }
    report_response("reminders", reminder_monitor::run_reminder_check(&state, Utc::now()).await)
}

pub async fn post_price_alerts(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(resp) = authorize(&state, &headers, &body) {
        return resp;
    }
    report_response("price-alerts", price_alert_service::run_price_alert_check(&state).await)
}

pub async fn post_events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(resp) = authorize(&state, &headers, &body) {
        return resp;
    }
    report_response("events", event_broadcast::run_event_broadcast(&state, Utc::now()).await)
}
