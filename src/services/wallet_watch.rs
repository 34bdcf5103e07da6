use super::address;
use super::alchemy::{Activity, AddressActivityPayload};
use super::formatting::{escape_markdown, fmt_num};
use super::kv_store::KvStore;
use super::telegram::SendOptions;
use crate::AppState;

/// Hash: lowercase address -> JSON array of chat ids.
pub const WATCHERS_KEY: &str = "wallet_watchers";

pub async fn watchers_of(store: &dyn KvStore, addr: &str) -> Result<Vec<i64>, String> {
    let Some(raw) = store.hget(WATCHERS_KEY, &addr.to_lowercase()).await? else {
        return Ok(Vec::new());
    };
    Ok(serde_json::from_str::<Vec<i64>>(&raw).unwrap_or_default())
}

async fn save_watchers(store: &dyn KvStore, addr: &str, chats: &[i64]) -> Result<(), String> {
    let field = addr.to_lowercase();
    if chats.is_empty() {
        return store.hdel(WATCHERS_KEY, &field).await;
    }
    let raw = serde_json::to_string(chats).map_err(|e| e.to_string())?;
    store.hset(WATCHERS_KEY, &field, &raw).await
}

/// Returns false if the chat already watched the address.
pub async fn watch(state: &AppState, chat_id: i64, addr: &str) -> Result<bool, String> {
    if !address::is_evm_address(addr) {
        return Err("❌ Only EVM addresses (`0x` + 40 hex) can be watched.".to_string());
    }
    let store: &dyn KvStore = state.store()?.as_ref();
    let addr = addr.to_lowercase();

    let mut chats = watchers_of(store, &addr).await?;
    if chats.contains(&chat_id) {
        return Ok(false);
    }

    if chats.is_empty() {
        state
            .alchemy
            .update_webhook_addresses(std::slice::from_ref(&addr), &[])
            .await
            .map_err(|e| {
                tracing::warn!(address = %addr, error = %e, "alchemy registration failed");
                "⚠️ Could not register the address with Alchemy.".to_string()
            })?;
    }

    chats.push(chat_id);
    save_watchers(store, &addr, &chats).await?;
    Ok(true)
}

/// Returns false if the chat was not watching the address.
pub async fn unwatch(state: &AppState, chat_id: i64, addr: &str) -> Result<bool, String> {
    let store: &dyn KvStore = state.store()?.as_ref();
    let addr = addr.to_lowercase();

    let mut chats = watchers_of(store, &addr).await?;
    let before = chats.len();
    chats.retain(|c| *c != chat_id);
    if chats.len() == before {
        return Ok(false);
    }

    save_watchers(store, &addr, &chats).await?;

    if chats.is_empty() {
        if let Err(e) = state
            .alchemy
            .update_webhook_addresses(&[], std::slice::from_ref(&addr))
            .await
        {
            tracing::warn!(address = %addr, error = %e, "alchemy deregistration failed");
        }
    }

    Ok(true)
}

pub async fn watched_by(store: &dyn KvStore, chat_id: i64) -> Result<Vec<String>, String> {
    let all = store.hgetall(WATCHERS_KEY).await?;
    let mut out: Vec<String> = all
        .into_iter()
        .filter(|(_, raw)| {
            serde_json::from_str::<Vec<i64>>(raw)
                .map(|chats| chats.contains(&chat_id))
                .unwrap_or(false)
        })
        .map(|(addr, _)| addr)
        .collect();
    out.sort();
    Ok(out)
}

pub fn format_activity(activity: &Activity, network: &str, watched: &str) -> String {
    let direction = if activity.to_address.eq_ignore_ascii_case(watched) {
        "📥 Incoming"
    } else {
        "📤 Outgoing"
    };
    let value = activity
        .value
        .map(|v| fmt_num(v, 4))
        .unwrap_or_else(|| "?".to_string());
    let asset = activity.asset.as_deref().unwrap_or("?");

    format!(
        "{} *{} {}* on `{}`\nWallet: `{}`\nFrom: `{}`\nTo: `{}`\nTx: `{}`",
        direction,
        value,
        escape_markdown(asset),
        network,
        watched,
        address::short(&activity.from_address),
        address::short(&activity.to_address),
        activity.hash
    )
}

/// Fans an Alchemy address-activity notification out to watching chats.
/// Returns the number of messages sent.
pub async fn notify_activity(state: &AppState, payload: &AddressActivityPayload) -> Result<usize, String> {
    let store: &dyn KvStore = state.store()?.as_ref();
    let network = payload.event.network.as_str();
    let mut sent = 0;

    for activity in &payload.event.activity {
        let mut addrs = vec![activity.from_address.to_lowercase(), activity.to_address.to_lowercase()];
        addrs.dedup();

        for addr in addrs.iter().filter(|a| !a.is_empty()) {
            for chat_id in watchers_of(store, addr).await? {
                let text = format_activity(activity, network, addr);
                match state
                    .telegram
                    .send_message(chat_id, &text, SendOptions::default().no_preview())
                    .await
                {
                    Ok(_) => sent += 1,
                    Err(e) => tracing::warn!(chat_id, error = %e, "wallet activity not delivered"),
                }
            }
        }
    }

    Ok(sent)
}
