use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

#[derive(Clone)]
pub struct GeckoTerminalClient {
    http: Client,
    api_base: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenPrice {
    pub price_usd: f64,
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub network: String,
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub top_dex_name: Option<String>,
}

impl TokenInfo {
    pub fn gecko_terminal_link(&self) -> String {
        format!("https://www.geckoterminal.com/{}/tokens/{}", self.network, self.address)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    data: TokenData,

    #[serde(default)]
    included: Vec<IncludedItem>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    attributes: TokenAttributes,

    #[serde(default)]
    relationships: Option<TokenRelationships>,
}

#[derive(Debug, Deserialize)]
struct TokenAttributes {
    #[serde(default)]
    address: Option<String>,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    symbol: Option<String>,

    // GeckoTerminal sends decimals as strings
    #[serde(default)]
    price_usd: Option<String>,

    #[serde(default)]
    price_change_percentage: Option<HashMap<String, Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct TokenRelationships {
    #[serde(default)]
    top_pools: Option<RelList>,
}

#[derive(Debug, Deserialize)]
struct RelList {
    #[serde(default)]
    data: Vec<RelRef>,
}

#[derive(Debug, Deserialize)]
struct RelOne {
    #[serde(default)]
    data: Option<RelRef>,
}

#[derive(Debug, Deserialize)]
struct RelRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncludedItem {
    id: String,

    #[serde(default)]
    attributes: Option<serde_json::Value>,

    #[serde(default)]
    relationships: Option<IncludedRelationships>,
}

#[derive(Debug, Deserialize)]
struct IncludedRelationships {
    #[serde(default)]
    dex: Option<RelOne>,
}

fn parse_num(s: Option<&String>) -> Option<f64> {
    s.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl GeckoTerminalClient {
    pub fn new(api_base: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_token(&self, network: &str, address: &str, include_pools: bool) -> Result<Option<TokenResponse>, String> {
        let url = format!("{}/networks/{}/tokens/{}", self.api_base, network, address);
        let mut req = self.http.get(&url).header("accept", "application/json");
        if include_pools {
            req = req.query(&[("include", "top_pools")]);
        }

        let res = req.send().await.map_err(|e| e.to_string())?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("GeckoTerminal token lookup failed: {status}"));
        }

        res.json::<TokenResponse>()
            .await
            .map(Some)
            .map_err(|e| e.to_string())
    }

    /// `Ok(None)` when the token is unknown on that network or has no price.
    pub async fn token_price(&self, network: &str, address: &str) -> Result<Option<TokenPrice>, String> {
        let Some(resp) = self.fetch_token(network, address, false).await? else {
            return Ok(None);
        };

        let attrs = resp.data.attributes;
        let Some(price_usd) = parse_num(attrs.price_usd.as_ref()) else {
            return Ok(None);
        };

        Ok(Some(TokenPrice {
            price_usd,
            symbol: attrs.symbol.unwrap_or_else(|| "N/A".to_string()),
            name: attrs.name.unwrap_or_default(),
        }))
    }

    pub async fn token_info(&self, network: &str, address: &str) -> Result<Option<TokenInfo>, String> {
        let Some(resp) = self.fetch_token(network, address, true).await? else {
            return Ok(None);
        };

        let included: HashMap<&str, &IncludedItem> =
            resp.included.iter().map(|i| (i.id.as_str(), i)).collect();

        let top_dex_name = resp
            .data
            .relationships
            .as_ref()
            .and_then(|r| r.top_pools.as_ref())
            .and_then(|p| p.data.first())
            .and_then(|pool_ref| included.get(pool_ref.id.as_str()))
            .and_then(|pool| pool.relationships.as_ref())
            .and_then(|r| r.dex.as_ref())
            .and_then(|d| d.data.as_ref())
            .and_then(|dex_ref| included.get(dex_ref.id.as_str()))
            .and_then(|dex| dex.attributes.as_ref())
            .and_then(|a| a.get("name"))
            .and_then(|n| n.as_str())
            .map(str::to_string);

        let attrs = &resp.data.attributes;
        let price_change_24h = attrs
            .price_change_percentage
            .as_ref()
            .and_then(|m| m.get("h24"))
            .and_then(|v| parse_num(v.as_ref()));

        Ok(Some(TokenInfo {
            network: network.to_string(),
            address: attrs.address.clone().unwrap_or_else(|| address.to_string()),
            name: attrs.name.clone().unwrap_or_else(|| "N/A".to_string()),
            symbol: attrs.symbol.clone().unwrap_or_else(|| "N/A".to_string()),
            price_usd: parse_num(attrs.price_usd.as_ref()),
            price_change_24h,
            top_dex_name,
        }))
    }
}
