use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Deserializer};

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoinPrice {
    pub usd: f64,
    pub change_24h: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Derivative {
    #[serde(default)]
    pub market: String,

    #[serde(default)]
    pub symbol: String,

    #[serde(default)]
    pub index_id: String,

    #[serde(default, deserialize_with = "num_or_string")]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "num_or_string")]
    pub price_percentage_change_24h: Option<f64>,

    #[serde(default)]
    pub contract_type: String,

    #[serde(default, deserialize_with = "num_or_string")]
    pub funding_rate: Option<f64>,

    #[serde(default, deserialize_with = "num_or_string")]
    pub open_interest: Option<f64>,

    #[serde(default, deserialize_with = "num_or_string")]
    pub volume_24h: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

fn num_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Maps common tickers to CoinGecko ids; anything else is assumed to already be an id.
pub fn resolve_coin_id(symbol: &str) -> String {
    let s = symbol.trim().to_lowercase();
    let id = match s.as_str() {
        "btc" => "bitcoin",
        "eth" => "ethereum",
        "bnb" => "binancecoin",
        "sol" => "solana",
        "xrp" => "ripple",
        "doge" => "dogecoin",
        "ada" => "cardano",
        "trx" => "tron",
        "ton" => "the-open-network",
        "avax" => "avalanche-2",
        "dot" => "polkadot",
        "link" => "chainlink",
        "matic" | "pol" => "polygon-ecosystem-token",
        "arb" => "arbitrum",
        "op" => "optimism",
        "sui" => "sui",
        "apt" => "aptos",
        "near" => "near",
        "ltc" => "litecoin",
        "usdt" => "tether",
        "usdc" => "usd-coin",
        other => other,
    };
    id.to_string()
}

impl CoinGeckoClient {
    pub fn new(api_base: &str, api_key: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        let req = self.http.get(url).header("accept", "application/json");
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.header("x-cg-demo-api-key", &self.api_key)
        }
    }

    pub async fn simple_price(&self, coin_id: &str) -> Result<Option<CoinPrice>, String> {
        let res = self
            .get("/simple/price")
            .query(&[
                ("ids", coin_id),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("CoinGecko price failed: {status}"));
        }

        let body: HashMap<String, SimplePriceEntry> = res.json().await.map_err(|e| e.to_string())?;

        Ok(body.get(coin_id).and_then(|e| {
            e.usd.map(|usd| CoinPrice {
                usd,
                change_24h: e.usd_24h_change,
            })
        }))
    }

    pub async fn derivatives(&self) -> Result<Vec<Derivative>, String> {
        let res = self
            .get("/derivatives")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("CoinGecko derivatives failed: {status}"));
        }

        res.json::<Vec<Derivative>>().await.map_err(|e| e.to_string())
    }

    /// Perpetual contracts on `symbol`, largest open interest first.
    pub async fn perpetuals(&self, symbol: &str, limit: usize) -> Result<Vec<Derivative>, String> {
        let sym = symbol.trim().to_uppercase();
        let mut items: Vec<Derivative> = self
            .derivatives()
            .await?
            .into_iter()
            .filter(|d| d.contract_type.eq_ignore_ascii_case("perpetual"))
            .filter(|d| d.index_id.eq_ignore_ascii_case(&sym))
            .collect();

        items.sort_by(|a, b| {
            let a = a.open_interest.unwrap_or(0.0);
            let b = b.open_interest.unwrap_or(0.0);
            b.total_cmp(&a)
        });
        items.truncate(limit);
        Ok(items)
    }

    /// `(unix_ms, usd)` points.
    pub async fn market_chart(&self, coin_id: &str, days: u32) -> Result<Vec<(f64, f64)>, String> {
        let path = format!("/coins/{coin_id}/market_chart");
        let days = days.to_string();
        let res = self
            .get(&path)
            .query(&[("vs_currency", "usd"), ("days", days.as_str())])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("CoinGecko market chart failed: {status}"));
        }

        let body: MarketChartResponse = res.json().await.map_err(|e| e.to_string())?;
        Ok(body.prices)
    }
}
