use chrono::{DateTime, Utc};
use serde::Serialize;

use super::formatting::{escape_markdown, fmt_num, fmt_price};
use super::kv_store::KvStore;
use super::telegram::SendOptions;
use crate::{models::AlphaEvent, AppState};

pub const GROUPS_KEY: &str = "event_notification_groups";

const DIGEST_MARKER_TTL_SECS: u64 = 36 * 3600;

#[derive(Debug, Default, Clone, Serialize)]
pub struct BroadcastReport {
    pub events: usize,
    pub groups: usize,
    pub sent: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub async fn subscribe(store: &dyn KvStore, chat_id: i64) -> Result<(), String> {
    store.sadd(GROUPS_KEY, &chat_id.to_string()).await
}

pub async fn unsubscribe(store: &dyn KvStore, chat_id: i64) -> Result<(), String> {
    store.srem(GROUPS_KEY, &chat_id.to_string()).await
}

pub async fn is_subscribed(store: &dyn KvStore, chat_id: i64) -> Result<bool, String> {
    store.sismember(GROUPS_KEY, &chat_id.to_string()).await
}

pub fn digest_marker(chat_id: i64, local_date: &str) -> String {
    format!("event_notified:{chat_id}:{local_date}")
}

pub fn format_events(events: &[AlphaEvent], date_label: &str) -> String {
    if events.is_empty() {
        return format!("No alpha events listed for {date_label}.");
    }

    let mut lines = vec![format!("*📣 Alpha events {date_label}:*")];
    for e in events {
        let name = e.name.as_deref().unwrap_or("?");
        let mut line = format!("- *{}*", escape_markdown(name));
        if let Some(t) = e.time.as_deref().filter(|t| !t.trim().is_empty()) {
            line.push_str(&format!(" at `{}`", t.trim()));
        }
        if let Some(a) = e.amount {
            line.push_str(&format!(", amount {}", fmt_num(a, 0)));
        }
        if let Some(p) = e.points {
            line.push_str(&format!(", {} pts", fmt_num(p, 0)));
        }
        if let Some(p) = e.price {
            line.push_str(&format!(", {}", fmt_price(p)));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Sends today's digest once per subscribed chat per local day.
pub async fn run_event_broadcast(state: &AppState, now: DateTime<Utc>) -> Result<BroadcastReport, String> {
    let store: &dyn KvStore = state.store()?.as_ref();
    let groups: Vec<i64> = store
        .smembers(GROUPS_KEY)
        .await?
        .iter()
        .filter_map(|m| m.parse::<i64>().ok())
        .collect();

    let mut report = BroadcastReport {
        groups: groups.len(),
        ..BroadcastReport::default()
    };
    if groups.is_empty() {
        return Ok(report);
    }

    let events = state.alpha_events.today().await?;
    report.events = events.len();
    if events.is_empty() {
        return Ok(report);
    }

    let local_date = now
        .with_timezone(&state.settings.utc_offset())
        .format("%Y-%m-%d")
        .to_string();
    let text = format_events(&events, "today");

    for chat_id in groups {
        let marker = digest_marker(chat_id, &local_date);
        if !store.set_nx_ex(&marker, &now.to_rfc3339(), DIGEST_MARKER_TTL_SECS).await? {
            report.skipped += 1;
            continue;
        }

        match state.telegram.send_message(chat_id, &text, SendOptions::default()).await {
            Ok(_) => report.sent += 1,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "event digest not delivered");
                if let Err(e) = store.del(&marker).await {
                    tracing::warn!(chat_id, error = %e, "failed to release digest marker");
                }
                report.errors += 1;
            }
        }
    }

    Ok(report)
}
