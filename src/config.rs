use std::env;

use chrono::{FixedOffset, Offset, Utc};

fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.parse::<T>().ok())
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub telegram_token: String,
    pub redis_url: Option<String>,
    pub cron_secret: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub coingecko_api_key: String,
    pub etherscan_api_key: String,

    pub alchemy_auth_token: String,
    pub alchemy_webhook_id: String,
    pub alchemy_signing_key: String,

    // local wall clock used for parsing and displaying reminders
    pub utc_offset_hours: i32,
    pub reminder_lookahead_minutes: i64,
    pub reminder_throttle_minutes: i64,
    pub local_scheduler_secs: Option<u64>,

    pub auto_search_networks: Vec<String>,

    pub telegram_api_base: String,
    pub geckoterminal_api_base: String,
    pub coingecko_api_base: String,
    pub gemini_api_base: String,
    pub quickchart_api_base: String,
    pub etherscan_api_base: String,
    pub alchemy_api_base: String,
    pub alpha_events_api_base: String,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    Settings::from_lookup(|name| env::var(name).ok())
}

impl Settings {
    /// Builds settings from any variable source; `load` passes the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Settings {
        let var = |name: &str| get(name).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let var_or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let auto_search_networks = var_or("AUTO_SEARCH_NETWORKS", "bsc,eth,polygon,arbitrum,base")
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Settings {
            host: var_or("HOST", "127.0.0.1"),
            port: parsed(var("PORT")).unwrap_or(3000),

            telegram_token: var_or("TELEGRAM_TOKEN", ""),
            redis_url: var("REDIS_URL"),
            cron_secret: var_or("CRON_SECRET", ""),

            gemini_api_key: var_or("GEMINI_API_KEY", ""),
            gemini_model: var_or("GEMINI_MODEL", "gemini-1.5-flash"),
            coingecko_api_key: var_or("COINGECKO_API_KEY", ""),
            etherscan_api_key: var_or("ETHERSCAN_API_KEY", ""),

            alchemy_auth_token: var_or("ALCHEMY_AUTH_TOKEN", ""),
            alchemy_webhook_id: var_or("ALCHEMY_WEBHOOK_ID", ""),
            alchemy_signing_key: var_or("ALCHEMY_SIGNING_KEY", ""),

            utc_offset_hours: parsed(var("BOT_UTC_OFFSET_HOURS")).unwrap_or(7),
            reminder_lookahead_minutes: parsed(var("REMINDER_LOOKAHEAD_MINUTES")).unwrap_or(30),
            reminder_throttle_minutes: parsed(var("REMINDER_THROTTLE_MINUTES")).unwrap_or(60),
            local_scheduler_secs: parsed::<u64>(var("LOCAL_SCHEDULER_SECS")).filter(|secs| *secs > 0),

            auto_search_networks,

            telegram_api_base: var_or("TELEGRAM_API_BASE", "https://api.telegram.org"),
            geckoterminal_api_base: var_or(
                "GECKOTERMINAL_API_BASE",
                "https://api.geckoterminal.com/api/v2",
            ),
            coingecko_api_base: var_or("COINGECKO_API_BASE", "https://api.coingecko.com/api/v3"),
            gemini_api_base: var_or(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            quickchart_api_base: var_or("QUICKCHART_API_BASE", "https://quickchart.io"),
            etherscan_api_base: var_or("ETHERSCAN_API_BASE", "https://api.etherscan.io/v2/api"),
            alchemy_api_base: var_or("ALCHEMY_API_BASE", "https://dashboard.alchemy.com/api"),
            alpha_events_api_base: var_or("ALPHA_EVENTS_API_BASE", "https://alpha123.uk"),
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        let secs = self.utc_offset_hours.clamp(-12, 14) * 3600;
        FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
    }
}
