//! Alchemy address-activity webhooks: registering watched addresses and
//! verifying the signed notifications Alchemy sends back.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct AlchemyClient {
    http: Client,
    api_base: String,
    auth_token: String,
    webhook_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressActivityPayload {
    #[serde(rename = "webhookId", default)]
    pub webhook_id: String,

    #[serde(rename = "type", default)]
    pub kind: String,

    pub event: ActivityEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityEvent {
    #[serde(default)]
    pub network: String,

    #[serde(default)]
    pub activity: Vec<Activity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    #[serde(rename = "fromAddress", default)]
    pub from_address: String,

    #[serde(rename = "toAddress", default)]
    pub to_address: String,

    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub asset: Option<String>,

    #[serde(default)]
    pub hash: String,

    #[serde(default)]
    pub category: String,
}

/// Checks `X-Alchemy-Signature` (hex HMAC-SHA256 of the raw body).
pub fn verify_signature(signing_key: &str, body: &[u8], signature_hex: &str) -> bool {
    if signing_key.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(signing_key.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub fn sign(signing_key: &str, body: &[u8]) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes()).map_err(|e| e.to_string())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

impl AlchemyClient {
    pub fn new(api_base: &str, auth_token: String, webhook_id: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            auth_token,
            webhook_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.auth_token.trim().is_empty() && !self.webhook_id.trim().is_empty()
    }

    pub async fn update_webhook_addresses(&self, add: &[String], remove: &[String]) -> Result<(), String> {
        if !self.is_configured() {
            return Err("ALCHEMY_AUTH_TOKEN / ALCHEMY_WEBHOOK_ID are missing".to_string());
        }

        let url = format!("{}/update-webhook-addresses", self.api_base);
        let res = self
            .http
            .patch(&url)
            .header("X-Alchemy-Token", &self.auth_token)
            .json(&json!({
                "webhook_id": self.webhook_id,
                "addresses_to_add": add,
                "addresses_to_remove": remove,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Alchemy update failed: {status} {body}"));
        }

        Ok(())
    }
}
