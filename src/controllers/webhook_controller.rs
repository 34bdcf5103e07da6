use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    controllers::commands,
    models::{CallbackQuery, Message, Update},
    services::{
        address, chat_settings,
        command_router::{self, Route},
        portfolio_service, token_lookup,
        telegram::SendOptions,
    },
    AppState,
};

fn ok() -> Response {
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

pub async fn post_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    if !state.telegram.has_token() {
        tracing::error!("TELEGRAM_TOKEN is not set, rejecting update");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Bot token not configured").into_response();
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparseable update");
            return ok();
        }
    };

    tracing::debug!(update_id = update.update_id, "update received");

    if let Some(cq) = update.callback_query {
        handle_callback(&state, &cq).await;
    } else if let Some(msg) = update.message {
        handle_message(&state, &msg).await;
    }

    ok()
}

// ---------------- Callbacks ----------------

async fn handle_callback(state: &AppState, cq: &CallbackQuery) {
    if let Err(e) = state.telegram.answer_callback_query(&cq.id, None).await {
        tracing::warn!(error = %e, "answerCallbackQuery failed");
    }

    let Some(msg) = cq.message.as_ref() else {
        return;
    };

    match cq.data.as_deref() {
        Some(portfolio_service::REFRESH_CALLBACK) => refresh_portfolio(state, msg).await,
        Some(token_lookup::CLOSE_CALLBACK) => {
            if let Err(e) = state.telegram.delete_message(msg.chat.id, msg.message_id).await {
                tracing::warn!(chat_id = msg.chat.id, error = %e, "deleteMessage failed");
            }
        }
        other => tracing::debug!(data = ?other, "unhandled callback data"),
    }
}

/// Re-values the portfolio from the message the bot's report replied to and
/// edits the report in place.
async fn refresh_portfolio(state: &AppState, msg: &Message) {
    let chat_id = msg.chat.id;

    let original = msg
        .reply_to_message
        .as_deref()
        .and_then(|m| m.text.as_deref());

    let Some(original) = original else {
        let text = "❌ Could not find the original message to refresh.";
        if let Err(e) = state
            .telegram
            .edit_message_text(chat_id, msg.message_id, text, SendOptions::default())
            .await
        {
            tracing::warn!(chat_id, error = %e, "editMessageText failed");
        }
        return;
    };

    let lines = command_router::parse_portfolio_lines(original);
    let Some(report) = portfolio_service::value_portfolio(&state.gecko, &lines).await else {
        return;
    };

    let opts = SendOptions::default().with_markup(portfolio_service::refresh_markup());
    if let Err(e) = state
        .telegram
        .edit_message_text(chat_id, msg.message_id, &portfolio_service::format_portfolio(&report), opts)
        .await
    {
        tracing::warn!(chat_id, error = %e, "portfolio refresh edit failed");
    }
}

// ---------------- Messages ----------------

async fn handle_message(state: &AppState, msg: &Message) {
    let Some(text) = msg.trimmed_text() else {
        return;
    };

    let route = command_router::classify(text);

    if let Route::Command { name, args } = &route {
        commands::dispatch(state, msg, name, args).await;
        return;
    }

    if let Some(store) = state.store.as_ref() {
        if !chat_settings::is_enabled(store.as_ref(), msg.chat.id).await {
            return;
        }
    }

    match route {
        Route::ContractAddress(addr) => lookup_address(state, msg, &addr).await,
        Route::Portfolio(lines) => send_portfolio(state, msg, &lines).await,
        Route::Reminder(text) => commands::add_reminder(state, msg, &text, false).await,
        Route::FreeText | Route::Command { .. } => {}
    }
}

async fn send_placeholder(state: &AppState, msg: &Message, text: &str) -> Option<i64> {
    match state
        .telegram
        .send_message(msg.chat.id, text, SendOptions::reply_to(msg.message_id))
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(chat_id = msg.chat.id, error = %e, "placeholder not sent");
            None
        }
    }
}

async fn lookup_address(state: &AppState, msg: &Message, addr: &str) {
    let placeholder = format!("🔍 Searching for `{}`", address::short(addr));
    let Some(placeholder_id) = send_placeholder(state, msg, &placeholder).await else {
        return;
    };

    let text = token_lookup::lookup_message(&state.gecko, addr, &state.settings.auto_search_networks).await;
    let opts = SendOptions::default()
        .no_preview()
        .with_markup(token_lookup::close_markup());

    if let Err(e) = state
        .telegram
        .edit_message_text(msg.chat.id, placeholder_id, &text, opts)
        .await
    {
        tracing::warn!(chat_id = msg.chat.id, error = %e, "token card edit failed");
    }
}

async fn send_portfolio(state: &AppState, msg: &Message, lines: &[command_router::PortfolioLine]) {
    let Some(placeholder_id) = send_placeholder(state, msg, "⏳ Calculating portfolio...").await else {
        return;
    };

    let text = match portfolio_service::value_portfolio(&state.gecko, lines).await {
        Some(report) => portfolio_service::format_portfolio(&report),
        None => "❌ No valid portfolio lines found.".to_string(),
    };
    let opts = SendOptions::default().with_markup(portfolio_service::refresh_markup());

    if let Err(e) = state
        .telegram
        .edit_message_text(msg.chat.id, placeholder_id, &text, opts)
        .await
    {
        tracing::warn!(chat_id = msg.chat.id, error = %e, "portfolio edit failed");
    }
}
