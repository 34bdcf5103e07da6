use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

#[derive(Clone)]
pub struct EtherscanClient {
    http: Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasOracle {
    #[serde(rename = "SafeGasPrice")]
    pub safe: String,

    #[serde(rename = "ProposeGasPrice")]
    pub propose: String,

    #[serde(rename = "FastGasPrice")]
    pub fast: String,
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,

    #[serde(default)]
    message: String,

    result: serde_json::Value,
}

impl EtherscanClient {
    pub fn new(api_base: &str, api_key: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn gas_oracle(&self) -> Result<GasOracle, String> {
        if self.api_key.trim().is_empty() {
            return Err("ETHERSCAN_API_KEY is missing".to_string());
        }

        let res = self
            .http
            .get(&self.api_base)
            .query(&[
                ("chainid", "1"),
                ("module", "gastracker"),
                ("action", "gasoracle"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("Etherscan request failed: {status}"));
        }

        let body: EtherscanResponse = res.json().await.map_err(|e| e.to_string())?;
        if body.status != "1" {
            return Err(format!("Etherscan error: {}", body.message));
        }

        serde_json::from_value(body.result).map_err(|e| e.to_string())
    }
}
