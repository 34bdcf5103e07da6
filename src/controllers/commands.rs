//! `/command` handlers. Every handler answers in the chat; failures become
//! Markdown replies instead of errors.

use chrono::{DateTime, Utc};

use crate::{
    models::Message,
    services::{
        address, chat_settings,
        coingecko::resolve_coin_id,
        event_broadcast,
        formatting::{
            escape_markdown, escape_markdown_truncated, fmt_change, fmt_compact_usd, fmt_price, TELEGRAM_TEXT_LIMIT,
        },
        kv_store::KvStore,
        price_alert_service, task_parser,
        tasks_service::{self, format_task_added, format_task_list},
        telegram::SendOptions,
        wallet_watch,
    },
    AppState,
};

const HELP_TEXT: &str = "🤖 *coinpilot*\n\n\
1️⃣ *Token lookup:* send a single contract address.\n\
Example: `0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c`\n\n\
2️⃣ *Portfolio:* one token per line as `[amount] [address] [network]`.\n\n\
3️⃣ *Reminders:*\n\
`/add 25/12 09:00 - Claim token X`\n\
`/alpha 25/12 15:00 - Alpha ABC 1000 0x...`\n\
`<09:00 UTC+7 25/12/2025>:Claim token X`\n\
`/list` or `/lich`, `/del <n>`, `/clear`, `/pin`\n\n\
4️⃣ *Market:* `/gia btc`, `/perp btc`, `/chart eth 30`, `/gas`\n\n\
5️⃣ *Alerts:* `/alert <address> <network> <percent>`, `/alerts`, `/unalert <address>`\n\n\
6️⃣ *Events:* `/events`, `/notify on|off`\n\n\
7️⃣ *Wallets:* `/watch <0x...>`, `/unwatch <0x...>`, `/watched`\n\n\
8️⃣ *AI:* `/ask <question>`\n\n\
Type /stop to pause the bot, /start to resume.";

const STOP_TEXT: &str = "☑️ *Bot paused.* Messages other than commands are ignored.\n\nType /start to resume.";

pub async fn dispatch(state: &AppState, msg: &Message, name: &str, args: &str) {
    tracing::info!(chat_id = msg.chat.id, command = %name, "command");

    match name {
        "start" | "sta" => set_enabled(state, msg, true).await,
        "stop" | "sto" => set_enabled(state, msg, false).await,
        "help" => reply(state, msg, HELP_TEXT).await,

        "add" => add_reminder(state, msg, args, false).await,
        "alpha" => add_reminder(state, msg, args, true).await,
        "list" | "lich" => list_reminders(state, msg).await,
        "del" => delete_reminder(state, msg, args).await,
        "clear" => clear_reminders(state, msg).await,
        "pin" => pin_reminders(state, msg).await,

        "gia" | "price" => coin_price(state, msg, args).await,
        "perp" => perpetuals(state, msg, args).await,
        "chart" => chart(state, msg, args).await,
        "gas" => gas(state, msg).await,
        "ask" => ask(state, msg, args).await,

        "alert" => create_alert(state, msg, args).await,
        "alerts" => list_alerts(state, msg).await,
        "unalert" => remove_alert(state, msg, args).await,

        "notify" => notify(state, msg, args).await,
        "events" => events(state, msg).await,

        "watch" => watch(state, msg, args).await,
        "unwatch" => unwatch(state, msg, args).await,
        "watched" => watched(state, msg).await,

        _ => {
            let hint = format!("🤔 Unknown command `/{}`. Type /help for the list.", escape_markdown(name));
            reply(state, msg, &hint).await
        }
    }
}

async fn reply(state: &AppState, msg: &Message, text: &str) {
    let opts = SendOptions::reply_to(msg.message_id).no_preview();
    if let Err(e) = state.telegram.send_message(msg.chat.id, text, opts).await {
        tracing::warn!(chat_id = msg.chat.id, error = %e, "reply not sent");
    }
}

async fn reply_result(state: &AppState, msg: &Message, res: Result<String, String>) {
    match res {
        Ok(text) | Err(text) => reply(state, msg, &text).await,
    }
}

fn store(state: &AppState) -> Result<&dyn KvStore, String> {
    Ok(state.store()?.as_ref())
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

// ---------------- On / off ----------------

async fn set_enabled(state: &AppState, msg: &Message, enabled: bool) {
    if let Ok(store) = store(state) {
        if let Err(e) = chat_settings::set_enabled(store, msg.chat.id, enabled).await {
            tracing::warn!(chat_id = msg.chat.id, error = %e, "could not save bot state");
        }
    }

    if enabled {
        reply(state, msg, &format!("✅ *Bot enabled.*\n\n{HELP_TEXT}")).await
    } else {
        reply(state, msg, STOP_TEXT).await
    }
}

// ---------------- Reminders ----------------

/// Shared by `/add`, `/alpha` and the `<HH:MM UTC+7 DD/MM/YYYY>:Name` form.
pub async fn add_reminder(state: &AppState, msg: &Message, text: &str, alpha: bool) {
    let res: Result<String, String> = async {
        let store = store(state)?;
        let offset = state.settings.utc_offset();

        if text.trim().is_empty() {
            return Err(task_parser::TaskParseError::Format.user_message().to_string());
        }

        let parsed = if alpha {
            task_parser::parse_alpha_task(text, now(), offset)
        } else {
            task_parser::parse_simple_task(text, now(), offset)
        };
        let task = parsed.map_err(|e| e.user_message().to_string())?;

        let pending = tasks_service::add_task(store, msg.chat.id, task.clone())
            .await
            .map_err(|e| {
                tracing::error!(chat_id = msg.chat.id, error = %e, "saving task failed");
                "⚠️ Could not save the reminder, try again later.".to_string()
            })?;

        Ok(format_task_added(&task, offset, pending))
    }
    .await;

    reply_result(state, msg, res).await
}

async fn reminder_list_text(state: &AppState, chat_id: i64) -> Result<String, String> {
    let tasks = tasks_service::list_tasks(store(state)?, chat_id, now()).await?;
    Ok(format_task_list(&tasks, state.settings.utc_offset()))
}

async fn list_reminders(state: &AppState, msg: &Message) {
    let res = reminder_list_text(state, msg.chat.id).await;
    reply_result(state, msg, res).await
}

async fn delete_reminder(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let store = store(state)?;
        let n: usize = args
            .trim()
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Usage: `/del <number>` (see /list)".to_string())?;

        match tasks_service::delete_task(store, msg.chat.id, n, now()).await? {
            Some(t) => Ok(format!("🗑️ Removed reminder #{n}: {}", escape_markdown(&t.name))),
            None => Ok(format!("❌ There is no reminder #{n}. Type /list to see them.")),
        }
    }
    .await;

    reply_result(state, msg, res).await
}

async fn clear_reminders(state: &AppState, msg: &Message) {
    let res: Result<String, String> = async {
        let n = tasks_service::clear_tasks(store(state)?, msg.chat.id).await?;
        Ok(format!("🧹 Cleared {n} reminder(s)."))
    }
    .await;

    reply_result(state, msg, res).await
}

/// Sends the reminder list and pins it.
async fn pin_reminders(state: &AppState, msg: &Message) {
    let text = match reminder_list_text(state, msg.chat.id).await {
        Ok(t) => t,
        Err(e) => return reply(state, msg, &e).await,
    };

    let sent = state
        .telegram
        .send_message(msg.chat.id, &text, SendOptions::default())
        .await;

    match sent {
        Ok(message_id) => {
            if let Err(e) = state.telegram.pin_chat_message(msg.chat.id, message_id).await {
                tracing::warn!(chat_id = msg.chat.id, error = %e, "pinChatMessage failed");
                reply(state, msg, "⚠️ Could not pin the list. Is the bot an admin here?").await
            }
        }
        Err(e) => tracing::warn!(chat_id = msg.chat.id, error = %e, "reminder list not sent"),
    }
}

// ---------------- Market data ----------------

fn symbol_arg(args: &str, usage: &str) -> Result<String, String> {
    args.split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| usage.to_string())
}

async fn coin_price(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let sym = symbol_arg(args, "Usage: `/gia <symbol>`, e.g. `/gia btc`")?;
        let id = resolve_coin_id(&sym);

        let price = state
            .coingecko
            .simple_price(&id)
            .await
            .map_err(|e| {
                tracing::warn!(coin = %id, error = %e, "coingecko price failed");
                "⚠️ Could not reach CoinGecko, try again later.".to_string()
            })?
            .ok_or_else(|| format!("❌ Unknown coin `{}`.", escape_markdown(&sym)))?;

        let change = price
            .change_24h
            .map(fmt_change)
            .unwrap_or_else(|| "N/A".to_string());

        Ok(format!(
            "💰 *{}* (`{}`)\nPrice: *{}*\n24h: *{}*",
            escape_markdown(&sym.to_uppercase()),
            id,
            fmt_price(price.usd),
            change
        ))
    }
    .await;

    reply_result(state, msg, res).await
}

async fn perpetuals(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let sym = symbol_arg(args, "Usage: `/perp <symbol>`, e.g. `/perp btc`")?;

        let items = state.coingecko.perpetuals(&sym, 5).await.map_err(|e| {
            tracing::warn!(symbol = %sym, error = %e, "coingecko derivatives failed");
            "⚠️ Could not reach CoinGecko, try again later.".to_string()
        })?;

        if items.is_empty() {
            return Ok(format!("❌ No perpetual markets for `{}`.", escape_markdown(&sym)));
        }

        let mut lines = vec![format!("*📊 {} perpetuals (top by OI):*", escape_markdown(&sym.to_uppercase()))];
        for d in &items {
            lines.push(format!(
                "- *{}* `{}`: {} | funding {} | OI {} | vol {}",
                escape_markdown(&d.market),
                escape_markdown(&d.symbol),
                d.price.map(fmt_price).unwrap_or_else(|| "N/A".to_string()),
                d.funding_rate
                    .map(|f| format!("{f:.4}%"))
                    .unwrap_or_else(|| "N/A".to_string()),
                d.open_interest.map(fmt_compact_usd).unwrap_or_else(|| "N/A".to_string()),
                d.volume_24h.map(fmt_compact_usd).unwrap_or_else(|| "N/A".to_string()),
            ));
        }
        Ok(lines.join("\n"))
    }
    .await;

    reply_result(state, msg, res).await
}

const CHART_MAX_POINTS: usize = 60;

async fn chart(state: &AppState, msg: &Message, args: &str) {
    let res: Result<(), String> = async {
        let sym = symbol_arg(args, "Usage: `/chart <symbol> [days]`, e.g. `/chart eth 30`")?;
        let days: u32 = args
            .split_whitespace()
            .nth(1)
            .and_then(|d| d.parse().ok())
            .unwrap_or(7)
            .clamp(1, 365);
        let id = resolve_coin_id(&sym);

        let points = state.coingecko.market_chart(&id, days).await.map_err(|e| {
            tracing::warn!(coin = %id, error = %e, "coingecko market chart failed");
            "⚠️ Could not reach CoinGecko, try again later.".to_string()
        })?;
        if points.is_empty() {
            return Err(format!("❌ No chart data for `{}`.", escape_markdown(&sym)));
        }

        let step = points.len().div_ceil(CHART_MAX_POINTS).max(1);
        let sampled: Vec<&(f64, f64)> = points.iter().step_by(step).collect();
        let offset = state.settings.utc_offset();
        let labels: Vec<String> = sampled
            .iter()
            .map(|(ts, _)| {
                DateTime::from_timestamp_millis(*ts as i64)
                    .map(|dt| dt.with_timezone(&offset).format("%d/%m %H:%M").to_string())
                    .unwrap_or_default()
            })
            .collect();
        let values: Vec<f64> = sampled.iter().map(|(_, v)| *v).collect();

        let title = format!("{} {}d", sym.to_uppercase(), days);
        let url = state
            .quickchart
            .create_line_chart(&title, &labels, &values)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "quickchart failed");
                "⚠️ Could not render the chart.".to_string()
            })?;

        let last = values.last().copied().unwrap_or_default();
        let caption = format!("📈 *{}* last {} day(s), now {}", escape_markdown(&sym.to_uppercase()), days, fmt_price(last));
        state
            .telegram
            .send_photo(msg.chat.id, &url, &caption, Some(msg.message_id))
            .await
            .map_err(|e| {
                tracing::warn!(chat_id = msg.chat.id, error = %e, "sendPhoto failed");
                "⚠️ Could not send the chart.".to_string()
            })
    }
    .await;

    if let Err(text) = res {
        reply(state, msg, &text).await
    }
}

async fn gas(state: &AppState, msg: &Message) {
    let res = match state.etherscan.gas_oracle().await {
        Ok(g) => Ok(format!(
            "⛽ *Ethereum gas (gwei)*\n🐢 Safe: `{}`\n🚶 Standard: `{}`\n🚀 Fast: `{}`",
            g.safe, g.propose, g.fast
        )),
        Err(e) => {
            tracing::warn!(error = %e, "gas oracle failed");
            Err("⚠️ Could not fetch gas prices right now.".to_string())
        }
    };

    reply_result(state, msg, res).await
}

async fn ask(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        if !state.gemini.has_key() {
            return Err("⚠️ AI answers are disabled (no Gemini API key).".to_string());
        }
        let question = args.trim();
        if question.is_empty() {
            return Err("Usage: `/ask <question>`".to_string());
        }

        let answer = state.gemini.generate(question).await.map_err(|e| {
            tracing::warn!(error = %e, "gemini failed");
            "⚠️ The AI service did not answer, try again later.".to_string()
        })?;
        // free-form model output: escape it and keep room for the prefix
        Ok(format!(
            "🤖 {}",
            escape_markdown_truncated(&answer, TELEGRAM_TEXT_LIMIT - 96)
        ))
    }
    .await;

    match res {
        Ok(text) => {
            let opts = SendOptions::reply_to(msg.message_id).no_preview();
            if let Err(e) = state.telegram.send_message(msg.chat.id, &text, opts).await {
                tracing::warn!(chat_id = msg.chat.id, error = %e, "AI answer not delivered");
                reply(state, msg, "⚠️ Could not deliver the AI answer, try again later.").await
            }
        }
        Err(text) => reply(state, msg, &text).await,
    }
}

// ---------------- Price alerts ----------------

async fn create_alert(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let (addr, network, pct) = price_alert_service::parse_alert_args(args)?;
        let alert = price_alert_service::create_alert(state, msg.chat.id, &addr, &network, pct).await?;

        Ok(format!(
            "🔔 Alert set for *{}* on `{}`: ±{}% from {}.",
            escape_markdown(&alert.symbol),
            alert.network,
            alert.threshold_percent,
            fmt_price(alert.reference_price)
        ))
    }
    .await;

    reply_result(state, msg, res).await
}

async fn list_alerts(state: &AppState, msg: &Message) {
    let res: Result<String, String> = async {
        let alerts = price_alert_service::list_alerts(store(state)?, msg.chat.id).await?;
        Ok(price_alert_service::format_alert_list(&alerts))
    }
    .await;

    reply_result(state, msg, res).await
}

async fn remove_alert(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let addr = symbol_arg(args, "Usage: `/unalert <address>`")?;
        if price_alert_service::remove_alert(store(state)?, msg.chat.id, &addr).await? {
            Ok(format!("🗑️ Alert for `{}` removed.", address::short(&addr)))
        } else {
            Ok(format!("❌ No alert for `{}`.", address::short(&addr)))
        }
    }
    .await;

    reply_result(state, msg, res).await
}

// ---------------- Events ----------------

async fn notify(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let store = store(state)?;
        match args.trim().to_lowercase().as_str() {
            "on" => {
                event_broadcast::subscribe(store, msg.chat.id).await?;
                Ok("📣 Daily alpha event digest *enabled* for this chat.".to_string())
            }
            "off" => {
                event_broadcast::unsubscribe(store, msg.chat.id).await?;
                Ok("🔕 Daily alpha event digest *disabled* for this chat.".to_string())
            }
            _ => {
                let on = event_broadcast::is_subscribed(store, msg.chat.id).await?;
                Ok(format!(
                    "Event digest is currently *{}*. Use `/notify on` or `/notify off`.",
                    if on { "on" } else { "off" }
                ))
            }
        }
    }
    .await;

    reply_result(state, msg, res).await
}

async fn events(state: &AppState, msg: &Message) {
    let res = match state.alpha_events.today().await {
        Ok(list) => Ok(event_broadcast::format_events(&list, "today")),
        Err(e) => {
            tracing::warn!(error = %e, "alpha events fetch failed");
            Err("⚠️ Could not load today's events.".to_string())
        }
    };

    reply_result(state, msg, res).await
}

// ---------------- Wallet watch ----------------

async fn watch(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        if !state.alchemy.is_configured() {
            return Err("⚠️ Wallet watching is disabled (Alchemy is not configured).".to_string());
        }
        let addr = symbol_arg(args, "Usage: `/watch <0x address>`")?;

        if wallet_watch::watch(state, msg.chat.id, &addr).await? {
            Ok(format!("👀 Watching `{}`. You will be pinged on every transfer.", addr.to_lowercase()))
        } else {
            Ok(format!("You are already watching `{}`.", addr.to_lowercase()))
        }
    }
    .await;

    reply_result(state, msg, res).await
}

async fn unwatch(state: &AppState, msg: &Message, args: &str) {
    let res: Result<String, String> = async {
        let addr = symbol_arg(args, "Usage: `/unwatch <0x address>`")?;

        if wallet_watch::unwatch(state, msg.chat.id, &addr).await? {
            Ok(format!("🙈 Stopped watching `{}`.", addr.to_lowercase()))
        } else {
            Ok(format!("You were not watching `{}`.", addr.to_lowercase()))
        }
    }
    .await;

    reply_result(state, msg, res).await
}

async fn watched(state: &AppState, msg: &Message) {
    let res: Result<String, String> = async {
        let addrs = wallet_watch::watched_by(store(state)?, msg.chat.id).await?;
        if addrs.is_empty() {
            return Ok("You are not watching any wallet. Use `/watch <0x address>`.".to_string());
        }

        let mut lines = vec!["*👀 Watched wallets:*".to_string()];
        lines.extend(addrs.iter().map(|a| format!("- `{a}`")));
        Ok(lines.join("\n"))
    }
    .await;

    reply_result(state, msg, res).await
}
