use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::models::AlphaEvent;

#[derive(Clone)]
pub struct AlphaEventsClient {
    http: Client,
    api_base: String,
}

impl AlphaEventsClient {
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

    /// Today's airdrop / listing events.
    pub async fn today(&self) -> Result<Vec<AlphaEvent>, String> {
        let url = format!("{}/api/price/", self.api_base);
        let res = self
            .http
            .get(&url)
            .query(&[("batch", "today")])
            // the feed rejects requests that do not come from its own site
            .header("referer", format!("{}/vi/index.html", self.api_base))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("Alpha events request failed: {status}"));
        }

        let body: Value = res.json().await.map_err(|e| e.to_string())?;
        Ok(parse_events(body))
    }
}

/// Accepts either a bare array or an object wrapping one.
pub fn parse_events(body: Value) -> Vec<AlphaEvent> {
    let list = match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => ["airdrops", "data", "items"]
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    list.into_iter()
        .filter_map(|v| serde_json::from_value::<AlphaEvent>(v).ok())
        .filter(|e| e.name.as_deref().is_some_and(|n| !n.trim().is_empty()))
        .collect()
}
