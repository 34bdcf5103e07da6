mod common;

use axum::{
    body::Body,
    http::{header, Request},
};
use chrono::{TimeZone, Utc};
use coinpilot::{
    routes,
    services::{event_broadcast, kv_store::KvStore},
};
use common::{test_env, text_update};
use serde_json::json;
use tower::ServiceExt;

async fn send_text(env: &common::TestEnv, chat_id: i64, text: &str) {
    let req = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(text_update(chat_id, 1, text).to_string()))
        .unwrap();
    routes::app(env.state.clone()).oneshot(req).await.unwrap();
}

#[tokio::test]
async fn event_digest_sent_once_per_day() {
    let env = test_env().await;
    let store: &dyn KvStore = &*env.store;
    *env.upstream.events.lock().unwrap() = json!({
        "airdrops": [
            { "token": "ABC", "date": "2030-01-01", "time": "10:00", "amount": "100", "points": "200" },
            { "token": "", "date": "2030-01-01" }
        ]
    });

    send_text(&env, 42, "/notify on").await;
    assert!(event_broadcast::is_subscribed(store, 42).await.unwrap());
    env.upstream.clear();

    let now = Utc.with_ymd_and_hms(2030, 1, 1, 3, 0, 0).unwrap();
    let first = event_broadcast::run_event_broadcast(&env.state, now).await.unwrap();
    let second = event_broadcast::run_event_broadcast(&env.state, now + chrono::Duration::hours(2))
        .await
        .unwrap();

    assert_eq!(first.events, 1);
    assert_eq!(first.sent, 1);
    assert_eq!(second.skipped, 1);

    let sent = env.upstream.calls("sendMessage");
    assert_eq!(sent.len(), 1);
    let text = sent[0].body["text"].as_str().unwrap();
    assert!(text.contains("*ABC*"), "{text}");
    assert!(text.contains("200 pts"), "{text}");

    send_text(&env, 42, "/notify off").await;
    assert!(!event_broadcast::is_subscribed(store, 42).await.unwrap());
}

#[tokio::test]
async fn failed_digest_is_retried() {
    let env = test_env().await;
    let store: &dyn KvStore = &*env.store;
    *env.upstream.events.lock().unwrap() = json!({
        "airdrops": [{ "token": "ABC", "date": "2030-01-01", "time": "10:00" }]
    });
    event_broadcast::subscribe(store, 42).await.unwrap();

    let now = Utc.with_ymd_and_hms(2030, 1, 1, 3, 0, 0).unwrap();
    env.upstream.fail_telegram(true);
    let first = event_broadcast::run_event_broadcast(&env.state, now).await.unwrap();
    env.upstream.fail_telegram(false);
    let second = event_broadcast::run_event_broadcast(&env.state, now).await.unwrap();

    assert_eq!(first.errors, 1);
    assert_eq!(second.sent, 1);
}

#[tokio::test]
async fn no_subscribers_means_no_digest() {
    let env = test_env().await;

    let now = Utc.with_ymd_and_hms(2030, 1, 1, 3, 0, 0).unwrap();
    let report = event_broadcast::run_event_broadcast(&env.state, now).await.unwrap();

    assert_eq!(report.groups, 0);
    assert!(env.upstream.calls("sendMessage").is_empty());
}
