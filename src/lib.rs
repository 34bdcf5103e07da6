//! Library entrypoint for coinpilot.
//!
//! The binary in `main.rs` only wires settings, storage and the router;
//! everything else lives here so the integration tests under `tests/` can
//! build an `AppState` and drive the routers directly.

pub mod config;
pub mod models;
pub mod services;
pub mod controllers;
pub mod routes;

use services::{
    alchemy::AlchemyClient, alpha_events::AlphaEventsClient, coingecko::CoinGeckoClient,
    etherscan::EtherscanClient, gemini::GeminiClient, geckoterminal::GeckoTerminalClient,
    kv_store::SharedStore, quickchart::QuickChartClient, telegram::TelegramClient,
};

pub const STORAGE_DISABLED: &str = "⚠️ Storage is not configured, this feature is disabled.";

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Option<SharedStore>,
    pub telegram: TelegramClient,
    pub gecko: GeckoTerminalClient,
    pub coingecko: CoinGeckoClient,
    pub gemini: GeminiClient,
    pub quickchart: QuickChartClient,
    pub etherscan: EtherscanClient,
    pub alchemy: AlchemyClient,
    pub alpha_events: AlphaEventsClient,
}

impl AppState {
    pub fn new(settings: config::Settings, store: Option<SharedStore>) -> Self {
        let s = &settings;

        let telegram = TelegramClient::new(&s.telegram_api_base, s.telegram_token.clone());
        let gecko = GeckoTerminalClient::new(&s.geckoterminal_api_base);
        let coingecko = CoinGeckoClient::new(&s.coingecko_api_base, s.coingecko_api_key.clone());
        let gemini = GeminiClient::new(&s.gemini_api_base, s.gemini_api_key.clone(), s.gemini_model.clone());
        let quickchart = QuickChartClient::new(&s.quickchart_api_base);
        let etherscan = EtherscanClient::new(&s.etherscan_api_base, s.etherscan_api_key.clone());
        let alchemy = AlchemyClient::new(
            &s.alchemy_api_base,
            s.alchemy_auth_token.clone(),
            s.alchemy_webhook_id.clone(),
        );
        let alpha_events = AlphaEventsClient::new(&s.alpha_events_api_base);

        Self {
            settings,
            store,
            telegram,
            gecko,
            coingecko,
            gemini,
            quickchart,
            etherscan,
            alchemy,
            alpha_events,
        }
    }

    /// The configured store, or the user-facing "disabled" message.
    pub fn store(&self) -> Result<&SharedStore, String> {
        self.store.as_ref().ok_or_else(|| STORAGE_DISABLED.to_string())
    }
}
