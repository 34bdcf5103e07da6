use super::address;
use super::formatting::{escape_markdown, fmt_change, fmt_price};
use super::geckoterminal::{GeckoTerminalClient, TokenInfo};
use crate::models::InlineKeyboardMarkup;

pub const CLOSE_CALLBACK: &str = "close_message";

/// Networks to scan for a bare address, in priority order.
pub fn networks_for(address: &str, evm_networks: &[String]) -> Vec<String> {
    if address::is_tron_address(address) {
        vec!["tron".to_string()]
    } else {
        evm_networks.to_vec()
    }
}

/// Stops at the first network that knows the token.
pub async fn find_token_across_networks(
    gecko: &GeckoTerminalClient,
    address: &str,
    networks: &[String],
) -> Option<TokenInfo> {
    let addr = address::normalize(address);

    for network in networks {
        tracing::debug!(address = %addr, network = %network, "searching token");
        match gecko.token_info(network, &addr).await {
            Ok(Some(info)) => return Some(info),
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(address = %addr, network = %network, error = %e, "token lookup failed");
                continue;
            }
        }
    }

    None
}

pub fn format_token_info(info: &TokenInfo) -> String {
    let price = info
        .price_usd
        .map(fmt_price)
        .unwrap_or_else(|| "N/A".to_string());
    let change = info
        .price_change_24h
        .map(fmt_change)
        .unwrap_or_else(|| "N/A".to_string());
    let dex = info.top_dex_name.as_deref().unwrap_or("N/A");

    format!(
        "✅ *Found on {}*\n*{} ({})*\n\nPrice: *{}*\n24h: *{}*\nTop DEX: `{}`\n\n🔗 [View on GeckoTerminal]({})\n\n`{}`",
        info.network.to_uppercase(),
        escape_markdown(&info.name),
        escape_markdown(&info.symbol),
        price,
        change,
        dex,
        info.gecko_terminal_link(),
        info.address
    )
}

pub fn format_not_found(address: &str, networks: &[String]) -> String {
    format!(
        "❌ No token found for `{}` on the scanned networks: `{}`.",
        address::short(address),
        networks.join("`, `")
    )
}

pub async fn lookup_message(gecko: &GeckoTerminalClient, address: &str, evm_networks: &[String]) -> String {
    let networks = networks_for(address, evm_networks);
    match find_token_across_networks(gecko, address, &networks).await {
        Some(info) => format_token_info(&info),
        None => format_not_found(address, &networks),
    }
}

pub fn close_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single("✖ Close", CLOSE_CALLBACK)
}
