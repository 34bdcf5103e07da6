use std::collections::HashMap;

use serde::Serialize;

use super::address;
use super::formatting::{escape_markdown, fmt_change, fmt_price};
use super::kv_store::KvStore;
use super::telegram::SendOptions;
use crate::{models::PriceAlert, AppState};

pub const PRICE_ALERTS_KEY: &str = "price_alerts";

#[derive(Debug, Default, Clone, Serialize)]
pub struct PriceAlertReport {
    pub alerts: usize,
    pub triggered: usize,
    pub errors: usize,
}

/// `/alert <address> <network> <percent>`
pub fn parse_alert_args(args: &str) -> Result<(String, String, f64), String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [addr, network, pct] = parts.as_slice() else {
        return Err("Usage: `/alert <address> <network> <percent>`\nExample: `/alert 0xbb4c...095c bsc 10`".to_string());
    };

    if !address::is_contract_address(addr) {
        return Err("❌ Invalid contract address.".to_string());
    }

    let pct = pct
        .trim_end_matches('%')
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| "❌ The percent must be a positive number.".to_string())?;

    Ok((address::normalize(addr), network.to_lowercase(), pct))
}

pub async fn create_alert(
    state: &AppState,
    chat_id: i64,
    addr: &str,
    network: &str,
    threshold_percent: f64,
) -> Result<PriceAlert, String> {
    let store = state.store()?;

    let price = state
        .gecko
        .token_price(network, addr)
        .await
        .map_err(|_| "⚠️ Network error while fetching the price.".to_string())?
        .ok_or_else(|| format!("❌ No price for `{}` on `{}`.", address::short(addr), network))?;

    let alert = PriceAlert {
        address: addr.to_string(),
        network: network.to_string(),
        symbol: price.symbol,
        name: price.name,
        chat_id,
        threshold_percent,
        reference_price: price.price_usd,
    };

    let raw = serde_json::to_string(&alert).map_err(|e| e.to_string())?;
    store
        .hset(PRICE_ALERTS_KEY, &PriceAlert::field(chat_id, addr), &raw)
        .await?;

    Ok(alert)
}

pub async fn all_alerts(store: &dyn KvStore) -> Result<Vec<(String, PriceAlert)>, String> {
    let raw = store.hgetall(PRICE_ALERTS_KEY).await?;

    let mut out: Vec<(String, PriceAlert)> = raw
        .into_iter()
        .filter_map(|(field, json)| match serde_json::from_str::<PriceAlert>(&json) {
            Ok(a) => Some((field, a)),
            Err(e) => {
                tracing::warn!(field = %field, error = %e, "skipping unreadable price alert");
                None
            }
        })
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

pub async fn list_alerts(store: &dyn KvStore, chat_id: i64) -> Result<Vec<PriceAlert>, String> {
    Ok(all_alerts(store)
        .await?
        .into_iter()
        .map(|(_, a)| a)
        .filter(|a| a.chat_id == chat_id)
        .collect())
}

/// Returns false when the chat had no alert for that address.
pub async fn remove_alert(store: &dyn KvStore, chat_id: i64, addr: &str) -> Result<bool, String> {
    let field = PriceAlert::field(chat_id, &address::normalize(addr));
    if store.hget(PRICE_ALERTS_KEY, &field).await?.is_none() {
        return Ok(false);
    }
    store.hdel(PRICE_ALERTS_KEY, &field).await?;
    Ok(true)
}

pub fn format_alert_list(alerts: &[PriceAlert]) -> String {
    if alerts.is_empty() {
        return "You have no price alerts. Add one with `/alert <address> <network> <percent>`.".to_string();
    }

    let mut lines = vec!["*🔔 Your price alerts:*".to_string()];
    for a in alerts {
        lines.push(format!(
            "- *{}* on `{}`: ±{}% from {}\n  `{}`",
            escape_markdown(&a.symbol),
            a.network,
            a.threshold_percent,
            fmt_price(a.reference_price),
            a.address
        ));
    }
    lines.join("\n")
}

pub fn format_alert_triggered(alert: &PriceAlert, price: f64) -> String {
    format!(
        "🚨 *Price alert: {}* ({})\n\n{} → *{}*\nMove: *{}*\n\n`{}`",
        escape_markdown(&alert.symbol),
        alert.network.to_uppercase(),
        fmt_price(alert.reference_price),
        fmt_price(price),
        fmt_change(alert.change_percent(price)),
        alert.address
    )
}

/// One price request per token per tick; crossed alerts are pinged and get
/// their reference price moved to the current price.
pub async fn run_price_alert_check(state: &AppState) -> Result<PriceAlertReport, String> {
    let store: &dyn KvStore = state.store()?.as_ref();
    let alerts = all_alerts(store).await?;

    let mut report = PriceAlertReport {
        alerts: alerts.len(),
        ..PriceAlertReport::default()
    };

    let mut by_token: HashMap<(String, String), Vec<(String, PriceAlert)>> = HashMap::new();
    for (field, a) in alerts {
        by_token
            .entry((a.network.clone(), a.address.clone()))
            .or_default()
            .push((field, a));
    }

    for ((network, addr), group) in by_token {
        let price = match state.gecko.token_price(&network, &addr).await {
            Ok(Some(p)) => p.price_usd,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(address = %addr, network = %network, error = %e, "price alert lookup failed");
                report.errors += 1;
                continue;
            }
        };

        if !price.is_finite() || price <= 0.0 {
            continue;
        }

        for (field, mut alert) in group {
            if !alert.is_crossed(price) {
                continue;
            }

            let text = format_alert_triggered(&alert, price);
            if let Err(e) = state
                .telegram
                .send_message(alert.chat_id, &text, SendOptions::default().no_preview())
                .await
            {
                tracing::warn!(chat_id = alert.chat_id, error = %e, "price alert not delivered");
                report.errors += 1;
                continue;
            }

            alert.reference_price = price;
            let raw = serde_json::to_string(&alert).map_err(|e| e.to_string())?;
            store.hset(PRICE_ALERTS_KEY, &field, &raw).await?;
            report.triggered += 1;
        }
    }

    Ok(report)
}
