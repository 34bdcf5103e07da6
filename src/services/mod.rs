pub mod kv_store;
pub mod formatting;
pub mod address;

pub mod telegram;
pub mod geckoterminal;
pub mod coingecko;
pub mod gemini;
pub mod quickchart;
pub mod etherscan;
pub mod alchemy;
pub mod alpha_events;

pub mod command_router;
pub mod task_parser;
pub mod tasks_service;
pub mod reminder_monitor;
pub mod chat_settings;
pub mod portfolio_service;
pub mod token_lookup;
pub mod price_alert_service;
pub mod event_broadcast;
pub mod wallet_watch;
