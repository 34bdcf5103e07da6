mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use coinpilot::{
    routes,
    services::{chat_settings, kv_store::KvStore, tasks_service},
};
use common::{response_body_string, test_env, test_env_with, text_update};
use serde_json::{json, Value};
use tower::ServiceExt;

const WBNB: &str = "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c";
const USDT: &str = "0x55d398326f99059ff775485246999027b3197955";

fn post_update(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(env: &common::TestEnv, update: Value) -> (StatusCode, String) {
    let app = routes::app(env.state.clone());
    let res = app.oneshot(post_update("/webhook", update.to_string())).await.unwrap();
    let status = res.status();
    (status, response_body_string(res).await)
}

fn refresh_callback(reply_to_text: Option<&str>) -> Value {
    let mut message = json!({
        "message_id": 50,
        "chat": { "id": 42, "type": "private" },
        "text": "old report"
    });
    if let Some(t) = reply_to_text {
        message["reply_to_message"] = json!({
            "message_id": 49,
            "chat": { "id": 42, "type": "private" },
            "text": t
        });
    }

    json!({
        "update_id": 9,
        "callback_query": {
            "id": "cb-1",
            "data": "refresh_portfolio",
            "message": message
        }
    })
}

#[tokio::test]
async fn missing_token_returns_500() {
    let env = test_env_with(&[("TELEGRAM_TOKEN", "")]).await;

    let (status, body) = send(&env, text_update(42, 1, "/help")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Bot token not configured");
    assert!(env.upstream.telegram.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unparseable_update_is_acknowledged() {
    let env = test_env().await;
    let app = routes::app(env.state.clone());

    let res = app.oneshot(post_update("/", "not json".to_string())).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(body, json!({ "success": true }));
    assert!(env.upstream.telegram.lock().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_portfolio_edits_and_never_sends() {
    let env = test_env().await;
    env.upstream.set_price("bsc", WBNB, 1.5, "WBNB");
    env.upstream.set_price("bsc", USDT, 10.0, "USDT");

    let original = format!("2 {WBNB} bsc\n3 {USDT} bsc");
    let (status, _) = send(&env, refresh_callback(Some(&original))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(env.upstream.calls("answerCallbackQuery").len(), 1);
    assert!(env.upstream.calls("sendMessage").is_empty());

    let edits = env.upstream.calls("editMessageText");
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].body["chat_id"], 42);
    assert_eq!(edits[0].body["message_id"], 50);
    assert_eq!(
        edits[0].body["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
        "refresh_portfolio"
    );

    let text = edits[0].body["text"].as_str().unwrap();
    assert!(text.contains("*WBNB*"), "{text}");
    assert!(text.contains("*USDT*"), "{text}");
    assert!(text.contains("Total: $33.00"), "{text}");
}

#[tokio::test]
async fn refresh_without_original_message_edits_an_error() {
    let env = test_env().await;

    send(&env, refresh_callback(None)).await;

    assert!(env.upstream.calls("sendMessage").is_empty());
    let edits = env.upstream.calls("editMessageText");
    assert_eq!(edits.len(), 1);
    assert!(edits[0].body["text"].as_str().unwrap().contains("original message"));
}

#[tokio::test]
async fn close_button_deletes_the_message() {
    let env = test_env().await;
    let update = json!({
        "update_id": 3,
        "callback_query": {
            "id": "cb-2",
            "data": "close_message",
            "message": { "message_id": 77, "chat": { "id": 42, "type": "private" } }
        }
    });

    send(&env, update).await;

    let deletes = env.upstream.calls("deleteMessage");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].body["message_id"], 77);
}

#[tokio::test]
async fn portfolio_message_sends_placeholder_then_edits_total() {
    let env = test_env().await;
    env.upstream.set_price("bsc", WBNB, 600.0, "WBNB");

    let text = format!("100 {WBNB} bsc\n1 0xnotanaddress bsc");
    send(&env, text_update(42, 10, &text)).await;

    let sends = env.upstream.calls("sendMessage");
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].body["reply_to_message_id"], 10);

    let edits = env.upstream.calls("editMessageText");
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].body["message_id"], 777);

    let report = edits[0].body["text"].as_str().unwrap();
    assert!(report.contains("Total: $60,000.00"), "{report}");
    assert!(report.contains("Line 2"), "{report}");
}

#[tokio::test]
async fn contract_address_searches_networks_in_order() {
    let env = test_env().await;
    env.upstream.set_price("eth", WBNB, 2.0, "WBNB");

    send(&env, text_update(42, 11, WBNB)).await;

    let requested = env.upstream.gecko_requests.lock().unwrap().clone();
    assert_eq!(requested, vec![format!("bsc:{WBNB}"), format!("eth:{WBNB}")]);

    let edits = env.upstream.calls("editMessageText");
    assert_eq!(edits.len(), 1);
    let card = edits[0].body["text"].as_str().unwrap();
    assert!(card.contains("Found on ETH"), "{card}");
    assert_eq!(
        edits[0].body["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
        "close_message"
    );
}

#[tokio::test]
async fn stop_silences_non_commands_until_start() {
    let env = test_env().await;
    env.upstream.set_price("bsc", WBNB, 1.0, "WBNB");

    send(&env, text_update(42, 1, "/sto")).await;
    assert!(!chat_settings::is_enabled(&*env.store, 42).await);
    env.upstream.clear();

    send(&env, text_update(42, 2, WBNB)).await;
    assert!(env.upstream.telegram.lock().unwrap().is_empty());

    // commands still answer while paused
    send(&env, text_update(42, 3, "/help")).await;
    assert_eq!(env.upstream.calls("sendMessage").len(), 1);

    send(&env, text_update(42, 4, "/start")).await;
    assert!(chat_settings::is_enabled(&*env.store, 42).await);
    env.upstream.clear();

    send(&env, text_update(42, 5, WBNB)).await;
    assert_eq!(env.upstream.calls("editMessageText").len(), 1);
}

#[tokio::test]
async fn add_then_list_reminders() {
    let env = test_env().await;

    send(&env, text_update(42, 1, "/add 25/12/2099 09:00 - Claim airdrop")).await;

    let store: &dyn KvStore = &*env.store;
    let tasks = tasks_service::load_tasks(store, 42).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Claim airdrop");
    assert_eq!(tasks_service::task_chat_ids(store).await.unwrap(), vec![42]);

    let sent = env.upstream.calls("sendMessage");
    assert!(sent[0].body["text"].as_str().unwrap().contains("Reminder scheduled"));

    env.upstream.clear();
    send(&env, text_update(42, 2, "/lich")).await;
    let listed = env.upstream.calls("sendMessage");
    let text = listed[0].body["text"].as_str().unwrap();
    assert!(text.contains("1. `09:00 25/12/2099`"), "{text}");
}

#[tokio::test]
async fn bracket_reminder_in_the_past_is_rejected() {
    let env = test_env().await;

    send(&env, text_update(42, 1, "<09:00 UTC+7 25/12/2001>:Too late")).await;

    let sent = env.upstream.calls("sendMessage");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body["text"].as_str().unwrap().contains("in the past"));
    assert!(tasks_service::load_tasks(&*env.store, 42).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_command_gets_a_hint() {
    let env = test_env().await;

    send(&env, text_update(42, 1, "/wat")).await;

    let sent = env.upstream.calls("sendMessage");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body["text"].as_str().unwrap().contains("Unknown command"));
}
