/// Escapes user text for Telegram's legacy `Markdown` parse mode.
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Telegram rejects message text longer than this.
pub const TELEGRAM_TEXT_LIMIT: usize = 4096;

/// [`escape_markdown`] capped at `max_chars` characters, ending in `…` when
/// cut. An escape pair is never split.
pub fn escape_markdown_truncated(s: &str, max_chars: usize) -> String {
    let escaped = escape_markdown(s);
    if escaped.chars().count() <= max_chars {
        return escaped;
    }

    let budget = max_chars.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let special = matches!(c, '_' | '*' | '`' | '[');
        let width = if special { 2 } else { 1 };
        if used + width > budget {
            break;
        }
        if special {
            out.push('\\');
        }
        out.push(c);
        used += width;
    }
    out.push('…');
    out
}

fn group_thousands(int_part: &str) -> String {
    let digits: Vec<char> = int_part.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

/// `1234.5` with 2 decimals -> `1,234.50`.
pub fn fmt_num(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let sign = if value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(f) => format!("{sign}{}.{f}", group_thousands(int_part)),
        None => format!("{sign}{}", group_thousands(int_part)),
    }
}

/// Token prices span many orders of magnitude; keep enough precision for
/// sub-cent tokens.
pub fn fmt_price(value: f64) -> String {
    let decimals = if value >= 1.0 {
        4
    } else if value >= 0.0001 {
        6
    } else {
        8
    };
    format!("${}", fmt_num(value, decimals))
}

pub fn fmt_usd(value: f64) -> String {
    if value < 0.0 {
        format!("-${}", fmt_num(-value, 2))
    } else {
        format!("${}", fmt_num(value, 2))
    }
}

/// `📈 +3.20%` / `📉 -1.05%`.
pub fn fmt_change(pct: f64) -> String {
    let emoji = if pct >= 0.0 { "📈" } else { "📉" };
    format!("{emoji} {pct:+.2}%")
}

/// `$1.23B`, `$45.6M`, `$7.8K`.
pub fn fmt_compact_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${value:.2}")
    }
}
