//! Classifies the text of an incoming message.
//!
//! Precedence is first-match: explicit `/command`, then a single-token
//! contract address, then an `amount address network` table, then the
//! angle-bracket reminder syntax, and finally free text.

use super::{address, task_parser};

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Command { name: String, args: String },
    ContractAddress(String),
    Portfolio(Vec<PortfolioLine>),
    Reminder(String),
    FreeText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortfolioLine {
    Holding(Holding),
    // 1-based line number of a row whose address failed validation
    InvalidAddress { line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub line: usize,
    pub amount: f64,
    pub amount_text: String,
    pub address: String,
    pub network: String,
}

pub fn classify(text: &str) -> Route {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix('/') {
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((h, a)) => (h, a.trim()),
            None => (rest, ""),
        };
        // "/gia@my_bot btc" in groups
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        if !name.is_empty() {
            return Route::Command {
                name,
                args: args.to_string(),
            };
        }
    }

    let mut tokens = text.split_whitespace();
    if let (Some(only), None) = (tokens.next(), tokens.next()) {
        if address::is_contract_address(only) {
            return Route::ContractAddress(only.to_string());
        }
    }

    let lines = parse_portfolio_lines(text);
    if lines.iter().any(|l| matches!(l, PortfolioLine::Holding(_))) {
        return Route::Portfolio(lines);
    }

    if task_parser::is_bracket_form(text) {
        return Route::Reminder(text.to_string());
    }

    Route::FreeText
}

/// Parses every `amount address network` row. Rows that are not three tokens
/// or whose amount is not a number are skipped; rows with a bad address are
/// flagged. Never fails as a whole.
pub fn parse_portfolio_lines(text: &str) -> Vec<PortfolioLine> {
    let mut out = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        let [amount_str, addr, network] = parts.as_slice() else {
            continue;
        };

        let amount = match amount_str.replace(',', "").parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => continue,
        };

        if !address::is_contract_address(addr) {
            out.push(PortfolioLine::InvalidAddress { line: i + 1 });
            continue;
        }

        out.push(PortfolioLine::Holding(Holding {
            line: i + 1,
            amount,
            amount_text: amount_str.to_string(),
            address: address::normalize(addr),
            network: network.to_lowercase(),
        }));
    }

    out
}

pub fn holdings(lines: &[PortfolioLine]) -> Vec<&Holding> {
    lines
        .iter()
        .filter_map(|l| match l {
            PortfolioLine::Holding(h) => Some(h),
            PortfolioLine::InvalidAddress { .. } => None,
        })
        .collect()
}
