use futures_util::future::join_all;

use super::address;
use super::command_router::{Holding, PortfolioLine};
use super::formatting::{escape_markdown, fmt_price, fmt_usd};
use super::geckoterminal::GeckoTerminalClient;
use crate::models::InlineKeyboardMarkup;

pub const REFRESH_CALLBACK: &str = "refresh_portfolio";

#[derive(Debug, Clone, PartialEq)]
pub enum PortfolioRow {
    Priced {
        line: usize,
        symbol: String,
        price: f64,
        amount_text: String,
        value: f64,
    },
    Unpriced {
        line: usize,
        address: String,
        network: String,
        error: Option<String>,
    },
    InvalidAddress {
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub rows: Vec<PortfolioRow>,
    pub total_usd: f64,
}

async fn price_row(gecko: &GeckoTerminalClient, h: &Holding) -> PortfolioRow {
    match gecko.token_price(&h.network, &h.address).await {
        Ok(Some(p)) => PortfolioRow::Priced {
            line: h.line,
            symbol: p.symbol,
            price: p.price_usd,
            amount_text: h.amount_text.clone(),
            value: h.amount * p.price_usd,
        },
        Ok(None) => PortfolioRow::Unpriced {
            line: h.line,
            address: h.address.clone(),
            network: h.network.clone(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(address = %h.address, network = %h.network, error = %e, "portfolio price lookup failed");
            PortfolioRow::Unpriced {
                line: h.line,
                address: h.address.clone(),
                network: h.network.clone(),
                error: Some(e),
            }
        }
    }
}

/// Prices every holding concurrently. `None` when there is nothing to value.
pub async fn value_portfolio(gecko: &GeckoTerminalClient, lines: &[PortfolioLine]) -> Option<PortfolioReport> {
    let holdings: Vec<&Holding> = lines
        .iter()
        .filter_map(|l| match l {
            PortfolioLine::Holding(h) => Some(h),
            PortfolioLine::InvalidAddress { .. } => None,
        })
        .collect();

    if holdings.is_empty() {
        return None;
    }

    let priced = join_all(holdings.iter().map(|h| price_row(gecko, h))).await;
    let mut priced = priced.into_iter();

    // keep the user's line order, invalid rows included
    let mut rows = Vec::with_capacity(lines.len());
    for l in lines {
        match l {
            PortfolioLine::Holding(_) => {
                if let Some(row) = priced.next() {
                    rows.push(row);
                }
            }
            PortfolioLine::InvalidAddress { line } => rows.push(PortfolioRow::InvalidAddress { line: *line }),
        }
    }

    let total_usd = rows
        .iter()
        .map(|r| match r {
            PortfolioRow::Priced { value, .. } => *value,
            _ => 0.0,
        })
        .sum();

    Some(PortfolioReport { rows, total_usd })
}

pub fn format_portfolio(report: &PortfolioReport) -> String {
    let mut lines: Vec<String> = report
        .rows
        .iter()
        .map(|r| match r {
            PortfolioRow::Priced {
                symbol,
                price,
                amount_text,
                value,
                ..
            } => format!(
                "*{}*: {} x {} = *{}*",
                escape_markdown(symbol),
                fmt_price(*price),
                escape_markdown(amount_text),
                fmt_usd(*value)
            ),
            PortfolioRow::Unpriced {
                address: addr,
                network,
                error: None,
                ..
            } => format!(
                "❌ No price for `{}` on `{}`.",
                address::short(addr),
                network
            ),
            PortfolioRow::Unpriced {
                address: addr,
                network,
                error: Some(_),
                ..
            } => format!(
                "⚠️ Network error pricing `{}` on `{}`.",
                address::short(addr),
                network
            ),
            PortfolioRow::InvalidAddress { line } => format!("Line {line}: ❌ Invalid address."),
        })
        .collect();

    lines.push("--------------------".to_string());
    lines.push(format!("*Total: {}*", fmt_usd(report.total_usd)));
    lines.join("\n")
}

pub fn refresh_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single("🔄 Refresh", REFRESH_CALLBACK)
}
