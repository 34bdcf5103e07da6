use super::kv_store::KvStore;

/// Hash: chat id -> "1" | "0".
pub const BOT_ENABLED_KEY: &str = "bot_enabled";

/// Chats are enabled until they opt out with `/stop`. A store failure also
/// reads as enabled.
pub async fn is_enabled(store: &dyn KvStore, chat_id: i64) -> bool {
    match store.hget(BOT_ENABLED_KEY, &chat_id.to_string()).await {
        Ok(Some(v)) => v != "0",
        Ok(None) => true,
        Err(e) => {
            tracing::warn!(chat_id, error = %e, "could not read bot state, assuming enabled");
            true
        }
    }
}

pub async fn set_enabled(store: &dyn KvStore, chat_id: i64, enabled: bool) -> Result<(), String> {
    store
        .hset(BOT_ENABLED_KEY, &chat_id.to_string(), if enabled { "1" } else { "0" })
        .await
}
