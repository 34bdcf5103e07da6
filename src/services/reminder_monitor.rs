//! Reminder due-check, run on every cron poll.
//!
//! Each task is in one of three delivery states relative to `now`:
//! `Pending` (outside the lookahead window), `Upcoming` (inside it) or
//! `Expired` (due time reached). Upcoming pings are claimed through a TTL'd
//! `last_reminded:<chat_id>:<time_iso>` marker written with `SET NX EX`, so
//! overlapping or repeated polls inside the throttle window send one message.
//! Expired tasks are dropped after a final "due" ping when none was sent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time;

use super::formatting::{escape_markdown, fmt_price, fmt_usd};
use super::kv_store::KvStore;
use super::task_parser::{format_local, offset_label};
use super::tasks_service;
use super::telegram::SendOptions;
use super::{address, price_alert_service};
use crate::{
    models::{Task, TaskKind},
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Upcoming { minutes_left: i64 },
    Expired,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ReminderReport {
    pub chats: usize,
    pub notified: usize,
    pub removed: usize,
    pub errors: usize,
}

pub fn classify(task: &Task, now: DateTime<Utc>, lookahead: chrono::Duration) -> DeliveryState {
    let remaining = task.time_iso - now;
    if remaining <= chrono::Duration::zero() {
        DeliveryState::Expired
    } else if remaining <= lookahead {
        // round up so "in 0 minutes" never shows for a task still ahead
        let secs = remaining.num_seconds();
        DeliveryState::Upcoming {
            minutes_left: (secs + 59) / 60,
        }
    } else {
        DeliveryState::Pending
    }
}

pub fn marker_key(chat_id: i64, task: &Task) -> String {
    format!("last_reminded:{}:{}", chat_id, task.time_key())
}

async fn alpha_details(state: &AppState, task: &Task) -> String {
    let TaskKind::Alpha { amount, contract } = &task.kind else {
        return String::new();
    };
    let Some(contract) = contract else {
        return String::new();
    };

    let network = if address::is_tron_address(contract) { "tron" } else { "bsc" };
    match state.gecko.token_price(network, contract).await {
        Ok(Some(p)) => {
            let mut s = format!("\nPrice: *{}* ({})", fmt_price(p.price_usd), escape_markdown(&p.symbol));
            if let Some(a) = amount {
                s.push_str(&format!("\nEst. value: *{}*", fmt_usd(a * p.price_usd)));
            }
            s
        }
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!(contract = %contract, error = %e, "alpha price lookup failed");
            String::new()
        }
    }
}

async fn upcoming_message(state: &AppState, task: &Task, minutes_left: i64) -> String {
    let offset = state.settings.utc_offset();
    format!(
        "⏰ *Upcoming reminder*\n\nTask: *{}*\nStarts in *{} min* (`{} {}`){}",
        escape_markdown(&task.name),
        minutes_left,
        format_local(task.time_iso, offset),
        offset_label(offset),
        alpha_details(state, task).await
    )
}

async fn due_message(state: &AppState, task: &Task) -> String {
    format!(
        "⏰ *TASK DUE!*\n\nTask: *{}*{}",
        escape_markdown(&task.name),
        alpha_details(state, task).await
    )
}

async fn release_claim(store: &dyn KvStore, marker: &str) {
    if let Err(e) = store.del(marker).await {
        tracing::warn!(marker, error = %e, "failed to release reminder claim");
    }
}

async fn check_chat(
    state: &AppState,
    store: &dyn KvStore,
    chat_id: i64,
    now: DateTime<Utc>,
    report: &mut ReminderReport,
) -> Result<(), String> {
    let lookahead = chrono::Duration::minutes(state.settings.reminder_lookahead_minutes.max(1));
    let throttle_secs = (state.settings.reminder_throttle_minutes.max(1) * 60) as u64;

    let tasks = tasks_service::load_tasks(store, chat_id).await?;
    let mut keep: Vec<Task> = Vec::with_capacity(tasks.len());
    let mut removed_any = false;

    for task in tasks {
        let marker = marker_key(chat_id, &task);

        match classify(&task, now, lookahead) {
            DeliveryState::Pending => keep.push(task),

            DeliveryState::Upcoming { minutes_left } => {
                let claimed = store.set_nx_ex(&marker, &now.to_rfc3339(), throttle_secs).await?;
                if claimed {
                    let text = upcoming_message(state, &task, minutes_left).await;
                    match state.telegram.send_message(chat_id, &text, SendOptions::default()).await {
                        Ok(_) => report.notified += 1,
                        Err(e) => {
                            tracing::warn!(chat_id, error = %e, "upcoming reminder not delivered");
                            // release the claim so the next poll retries
                            release_claim(store, &marker).await;
                            report.errors += 1;
                        }
                    }
                }
                keep.push(task);
            }

            DeliveryState::Expired => {
                // already pinged, or another poll is delivering the due message
                if !store.set_nx_ex(&marker, &now.to_rfc3339(), throttle_secs).await? {
                    removed_any = true;
                    report.removed += 1;
                    continue;
                }

                let text = due_message(state, &task).await;
                match state.telegram.send_message(chat_id, &text, SendOptions::default()).await {
                    Ok(_) => {
                        report.notified += 1;
                        report.removed += 1;
                        removed_any = true;
                    }
                    Err(e) => {
                        tracing::warn!(chat_id, error = %e, "due reminder not delivered, keeping task");
                        release_claim(store, &marker).await;
                        report.errors += 1;
                        keep.push(task);
                    }
                }
            }
        }
    }

    if removed_any {
        tasks_service::save_tasks(store, chat_id, &mut keep).await?;
    }

    Ok(())
}

pub async fn run_reminder_check(state: &AppState, now: DateTime<Utc>) -> Result<ReminderReport, String> {
    let store: &dyn KvStore = state.store()?.as_ref();
    let chat_ids = tasks_service::task_chat_ids(store).await?;

    let mut report = ReminderReport {
        chats: chat_ids.len(),
        ..ReminderReport::default()
    };

    for chat_id in chat_ids {
        if let Err(e) = check_chat(state, store, chat_id, now, &mut report).await {
            tracing::error!(chat_id, error = %e, "reminder check failed for chat");
            report.errors += 1;
        }
    }

    tracing::info!(
        chats = report.chats,
        notified = report.notified,
        removed = report.removed,
        errors = report.errors,
        "reminder check finished"
    );

    Ok(report)
}

/// In-process stand-in for the external cron, for local development.
pub fn spawn_local_scheduler(state: AppState, every_secs: u64) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(every_secs));

        loop {
            interval.tick().await;

            if let Err(e) = run_reminder_check(&state, Utc::now()).await {
                tracing::error!(error = %e, "[local-scheduler] reminder tick failed");
            }
            if let Err(e) = price_alert_service::run_price_alert_check(&state).await {
                tracing::error!(error = %e, "[local-scheduler] price alert tick failed");
            }
        }
    });
}
