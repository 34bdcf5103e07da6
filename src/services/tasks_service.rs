use chrono::{DateTime, FixedOffset, Utc};

use super::formatting::{escape_markdown, fmt_num};
use super::kv_store::KvStore;
use super::task_parser::{format_local, offset_label};
use crate::models::{Task, TaskKind};

/// Chats that currently hold at least one task; lets the poller enumerate
/// lists without `KEYS tasks:*`.
pub const TASK_CHATS_KEY: &str = "task_chats";

pub fn tasks_key(chat_id: i64) -> String {
    format!("tasks:{chat_id}")
}

pub async fn load_tasks(store: &dyn KvStore, chat_id: i64) -> Result<Vec<Task>, String> {
    let Some(raw) = store.get(&tasks_key(chat_id)).await? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<Task>>(&raw) {
        Ok(tasks) => Ok(tasks),
        Err(e) => {
            tracing::warn!(chat_id, error = %e, "discarding unreadable task list");
            Ok(Vec::new())
        }
    }
}

/// Rewrites the whole list, sorted by due time. An empty list deletes the key.
pub async fn save_tasks(store: &dyn KvStore, chat_id: i64, tasks: &mut Vec<Task>) -> Result<(), String> {
    let key = tasks_key(chat_id);

    if tasks.is_empty() {
        store.del(&key).await?;
        store.srem(TASK_CHATS_KEY, &chat_id.to_string()).await?;
        return Ok(());
    }

    tasks.sort_by_key(|t| t.time_iso);
    let raw = serde_json::to_string(tasks).map_err(|e| e.to_string())?;
    store.set(&key, &raw).await?;
    store.sadd(TASK_CHATS_KEY, &chat_id.to_string()).await?;
    Ok(())
}

/// Returns the number of pending tasks after the insert.
pub async fn add_task(store: &dyn KvStore, chat_id: i64, task: Task) -> Result<usize, String> {
    let mut tasks = load_tasks(store, chat_id).await?;
    tasks.push(task);
    save_tasks(store, chat_id, &mut tasks).await?;
    Ok(tasks.len())
}

/// Current tasks for a chat. Past-due entries are dropped from storage as a
/// side effect.
pub async fn list_tasks(store: &dyn KvStore, chat_id: i64, now: DateTime<Utc>) -> Result<Vec<Task>, String> {
    let mut tasks = load_tasks(store, chat_id).await?;
    let before = tasks.len();
    tasks.retain(|t| t.time_iso > now);

    if tasks.len() != before {
        save_tasks(store, chat_id, &mut tasks).await?;
    }

    tasks.sort_by_key(|t| t.time_iso);
    Ok(tasks)
}

/// Removes the task at the 1-based position shown by `/list`.
pub async fn delete_task(
    store: &dyn KvStore,
    chat_id: i64,
    position: usize,
    now: DateTime<Utc>,
) -> Result<Option<Task>, String> {
    let mut tasks = list_tasks(store, chat_id, now).await?;
    if position == 0 || position > tasks.len() {
        return Ok(None);
    }
    let removed = tasks.remove(position - 1);
    save_tasks(store, chat_id, &mut tasks).await?;
    Ok(Some(removed))
}

pub async fn clear_tasks(store: &dyn KvStore, chat_id: i64) -> Result<usize, String> {
    let mut tasks = load_tasks(store, chat_id).await?;
    let n = tasks.len();
    tasks.clear();
    save_tasks(store, chat_id, &mut tasks).await?;
    Ok(n)
}

pub async fn task_chat_ids(store: &dyn KvStore) -> Result<Vec<i64>, String> {
    let members = store.smembers(TASK_CHATS_KEY).await?;
    Ok(members.iter().filter_map(|m| m.parse::<i64>().ok()).collect())
}

fn describe(task: &Task) -> String {
    let name = escape_markdown(&task.name);
    match &task.kind {
        TaskKind::Simple => name,
        TaskKind::Alpha { amount, contract } => {
            let mut s = format!("🅰️ {name}");
            if let Some(a) = amount {
                s.push_str(&format!(" x{}", fmt_num(*a, 2)));
            }
            if let Some(c) = contract {
                s.push_str(&format!(" `{c}`"));
            }
            s
        }
    }
}

pub fn format_task_list(tasks: &[Task], offset: FixedOffset) -> String {
    if tasks.is_empty() {
        return "You have no pending reminders.".to_string();
    }

    let mut lines = vec![format!("*🗓️ Your reminders ({}):*", offset_label(offset))];
    for (i, t) in tasks.iter().enumerate() {
        lines.push(format!(
            "{}. `{}` - {}",
            i + 1,
            format_local(t.time_iso, offset),
            describe(t)
        ));
    }
    lines.push(String::new());
    lines.push("Use `/del <number>` to remove one.".to_string());
    lines.join("\n")
}

pub fn format_task_added(task: &Task, offset: FixedOffset, pending: usize) -> String {
    format!(
        "✅ *Reminder scheduled!*\n\nTask: {}\nTime: `{} ({})`\n\nYou now have {} pending. Type /list to see all.",
        describe(task),
        format_local(task.time_iso, offset),
        offset_label(offset),
        pending
    )
}
