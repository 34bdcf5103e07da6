#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use coinpilot::{
    config::Settings,
    services::kv_store::{MemoryStore, SharedStore},
    AppState,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";
pub const CRON_SECRET: &str = "cron-secret";
pub const SIGNING_KEY: &str = "whsec_test";
pub const CHART_URL: &str = "https://quickchart.io/chart/render/sf-test";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub body: Value,
}

/// Stand-in for every upstream API; records what the bot sent.
#[derive(Default)]
pub struct Upstream {
    pub telegram: Mutex<Vec<Call>>,
    pub alchemy: Mutex<Vec<Value>>,
    pub gecko_requests: Mutex<Vec<String>>,
    // (network, lowercase address) -> (price, symbol)
    pub prices: Mutex<HashMap<(String, String), (f64, String)>>,
    pub events: Mutex<Value>,
    pub telegram_fails: AtomicBool,
    // failures left before Telegram answers normally again
    pub telegram_fail_next: AtomicUsize,
    // reject Markdown text Telegram could not parse, like the real API
    pub strict_markdown: AtomicBool,
    // CoinGecko, Gemini, QuickChart and Etherscan answer 500
    pub market_fails: AtomicBool,
    pub gemini_answer: Mutex<String>,
    pub gemini_prompts: Mutex<Vec<String>>,
    pub charts: Mutex<Vec<Value>>,
}

impl Upstream {
    pub fn set_price(&self, network: &str, address: &str, price: f64, symbol: &str) {
        self.prices.lock().unwrap().insert(
            (network.to_string(), address.to_lowercase()),
            (price, symbol.to_string()),
        );
    }

    pub fn fail_telegram(&self, fail: bool) {
        self.telegram_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_telegram(&self, n: usize) {
        self.telegram_fail_next.store(n, Ordering::SeqCst);
    }

    pub fn fail_market(&self, fail: bool) {
        self.market_fails.store(fail, Ordering::SeqCst);
    }

    pub fn strict_markdown(&self, strict: bool) {
        self.strict_markdown.store(strict, Ordering::SeqCst);
    }

    pub fn set_gemini_answer(&self, answer: &str) {
        *self.gemini_answer.lock().unwrap() = answer.to_string();
    }

    /// Text of every sendMessage, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls("sendMessage")
            .iter()
            .map(|c| c.body["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn calls(&self, method: &str) -> Vec<Call> {
        self.telegram
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.telegram.lock().unwrap().clear();
    }
}

async fn telegram_api(
    State(up): State<Arc<Upstream>>,
    Path((_bot, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let rejection = markdown_rejection(&up, &body);
    up.telegram.lock().unwrap().push(Call {
        method: method.clone(),
        body,
    });

    let fail_once = up
        .telegram_fail_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if up.telegram_fails.load(Ordering::SeqCst) || fail_once {
        return Json(json!({ "ok": false, "description": "Bad Request: chat not found" })).into_response();
    }
    if let Some(reason) = rejection {
        return Json(json!({ "ok": false, "description": reason })).into_response();
    }

    let result = match method.as_str() {
        "sendMessage" | "sendPhoto" => json!({ "message_id": 777 }),
        _ => json!(true),
    };
    Json(json!({ "ok": true, "result": result })).into_response()
}

fn markdown_rejection(up: &Upstream, body: &Value) -> Option<String> {
    if !up.strict_markdown.load(Ordering::SeqCst) || body["parse_mode"] != "Markdown" {
        return None;
    }
    let text = body["text"].as_str()?;
    if text.chars().count() > 4096 {
        return Some("Bad Request: message is too long".to_string());
    }

    let mut open: HashMap<char, bool> = HashMap::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '_' | '`' => {
                let entry = open.entry(c).or_insert(false);
                *entry = !*entry;
            }
            _ => {}
        }
    }
    open.values()
        .any(|unclosed| *unclosed)
        .then(|| "Bad Request: can't parse entities".to_string())
}

fn market_down(up: &Upstream) -> Option<Response> {
    up.market_fails
        .load(Ordering::SeqCst)
        .then(|| (StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response())
}

async fn coingecko_price(
    State(up): State<Arc<Upstream>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if let Some(res) = market_down(&up) {
        return res;
    }
    match q.get("ids").map(String::as_str) {
        Some("bitcoin") => Json(json!({ "bitcoin": { "usd": 65000.5, "usd_24h_change": 1.25 } })).into_response(),
        _ => Json(json!({})).into_response(),
    }
}

async fn coingecko_derivatives(State(up): State<Arc<Upstream>>) -> Response {
    if let Some(res) = market_down(&up) {
        return res;
    }
    Json(json!([
        {
            "market": "Bybit", "symbol": "BTCUSDT", "index_id": "BTC", "price": "65010.1",
            "contract_type": "perpetual", "funding_rate": 0.01, "open_interest": 2.0e9, "volume_24h": 5.0e9
        },
        {
            "market": "Binance", "symbol": "BTCUSDT", "index_id": "BTC", "price": 65000.0,
            "contract_type": "perpetual", "funding_rate": "0.012", "open_interest": 8.0e9, "volume_24h": 2.0e10
        },
        {
            "market": "Deribit", "symbol": "BTC-27DEC", "index_id": "BTC", "price": 66000.0,
            "contract_type": "futures", "open_interest": 9.0e9
        },
        {
            "market": "Binance", "symbol": "ETHUSDT", "index_id": "ETH", "price": 3000.0,
            "contract_type": "perpetual", "open_interest": 4.0e9
        }
    ]))
    .into_response()
}

async fn coingecko_chart(State(up): State<Arc<Upstream>>, Path(_coin): Path<String>) -> Response {
    if let Some(res) = market_down(&up) {
        return res;
    }
    let start = 1_893_456_000_000_i64;
    let prices: Vec<Value> = (0..100)
        .map(|i| json!([start + i * 3_600_000, 3000.0 + i as f64]))
        .collect();
    Json(json!({ "prices": prices })).into_response()
}

async fn gemini_generate(
    State(up): State<Arc<Upstream>>,
    Path(_call): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(res) = market_down(&up) {
        return res;
    }
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    up.gemini_prompts.lock().unwrap().push(prompt.to_string());

    let answer = up.gemini_answer.lock().unwrap().clone();
    Json(json!({ "candidates": [{ "content": { "parts": [{ "text": answer }] } }] })).into_response()
}

async fn quickchart_create(State(up): State<Arc<Upstream>>, Json(body): Json<Value>) -> Response {
    if let Some(res) = market_down(&up) {
        return res;
    }
    up.charts.lock().unwrap().push(body);
    Json(json!({ "success": true, "url": CHART_URL })).into_response()
}

async fn etherscan_api(State(up): State<Arc<Upstream>>) -> Response {
    if let Some(res) = market_down(&up) {
        return res;
    }
    Json(json!({
        "status": "1",
        "message": "OK",
        "result": { "SafeGasPrice": "10", "ProposeGasPrice": "12", "FastGasPrice": "15" }
    }))
    .into_response()
}

async fn gecko_token(
    State(up): State<Arc<Upstream>>,
    Path((network, address)): Path<(String, String)>,
) -> Response {
    up.gecko_requests
        .lock()
        .unwrap()
        .push(format!("{network}:{address}"));

    let found = up
        .prices
        .lock()
        .unwrap()
        .get(&(network.clone(), address.to_lowercase()))
        .cloned();

    match found {
        Some((price, symbol)) => Json(json!({
            "data": {
                "id": format!("{network}_{address}"),
                "attributes": {
                    "address": address,
                    "name": format!("{symbol} Token"),
                    "symbol": symbol,
                    "price_usd": price.to_string(),
                    "price_change_percentage": { "h24": "2.5" }
                }
            }
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "errors": [] }))).into_response(),
    }
}

async fn alchemy_update(State(up): State<Arc<Upstream>>, Json(body): Json<Value>) -> Response {
    up.alchemy.lock().unwrap().push(body);
    Json(json!({})).into_response()
}

async fn alpha_events(State(up): State<Arc<Upstream>>) -> Response {
    Json(up.events.lock().unwrap().clone()).into_response()
}

/// Serves the mock upstream on an ephemeral port and returns its base URL.
pub async fn spawn_upstream() -> (String, Arc<Upstream>) {
    let up = Arc::new(Upstream::default());
    *up.events.lock().unwrap() = json!([]);
    up.set_gemini_answer("Bitcoin is a decentralized digital currency.");

    let app = Router::new()
        .route("/tg/:bot/:method", post(telegram_api))
        .route("/gecko/networks/:network/tokens/:address", get(gecko_token))
        .route("/alchemy/update-webhook-addresses", patch(alchemy_update))
        .route("/alpha/api/price/", get(alpha_events))
        .route("/coingecko/simple/price", get(coingecko_price))
        .route("/coingecko/derivatives", get(coingecko_derivatives))
        .route("/coingecko/coins/:coin/market_chart", get(coingecko_chart))
        .route("/gemini/models/:call", post(gemini_generate))
        .route("/quickchart/chart/create", post(quickchart_create))
        .route("/etherscan", get(etherscan_api))
        .with_state(up.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), up)
}

pub fn settings(base: &str, overrides: &[(&str, &str)]) -> Settings {
    let mut vars: HashMap<String, String> = [
        ("TELEGRAM_TOKEN", TOKEN.to_string()),
        ("CRON_SECRET", CRON_SECRET.to_string()),
        ("ALCHEMY_SIGNING_KEY", SIGNING_KEY.to_string()),
        ("ALCHEMY_AUTH_TOKEN", "alchemy-token".to_string()),
        ("ALCHEMY_WEBHOOK_ID", "wh_123".to_string()),
        ("AUTO_SEARCH_NETWORKS", "bsc,eth".to_string()),
        ("TELEGRAM_API_BASE", format!("{base}/tg")),
        ("GECKOTERMINAL_API_BASE", format!("{base}/gecko")),
        ("COINGECKO_API_BASE", format!("{base}/coingecko")),
        ("GEMINI_API_BASE", format!("{base}/gemini")),
        ("QUICKCHART_API_BASE", format!("{base}/quickchart")),
        ("ETHERSCAN_API_BASE", format!("{base}/etherscan")),
        ("ALCHEMY_API_BASE", format!("{base}/alchemy")),
        ("ALPHA_EVENTS_API_BASE", format!("{base}/alpha")),
        ("GEMINI_API_KEY", "gemini-key".to_string()),
        ("ETHERSCAN_API_KEY", "etherscan-key".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    Settings::from_lookup(|name| vars.get(name).cloned())
}

pub struct TestEnv {
    pub state: AppState,
    pub upstream: Arc<Upstream>,
    pub store: Arc<MemoryStore>,
}

pub async fn test_env() -> TestEnv {
    test_env_with(&[]).await
}

pub async fn test_env_with(overrides: &[(&str, &str)]) -> TestEnv {
    let (base, upstream) = spawn_upstream().await;
    let store = Arc::new(MemoryStore::new());
    let shared: SharedStore = store.clone();
    let state = AppState::new(settings(&base, overrides), Some(shared));

    TestEnv {
        state,
        upstream,
        store,
    }
}

pub async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

pub fn text_update(chat_id: i64, message_id: i64, text: &str) -> Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": message_id,
            "chat": { "id": chat_id, "type": "private" },
            "from": { "id": chat_id, "first_name": "Tester" },
            "text": text
        }
    })
}
