use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone)]
pub struct QuickChartClient {
    http: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    url: Option<String>,
}

impl QuickChartClient {
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

    /// Renders a single-series line chart and returns its short URL.
    pub async fn create_line_chart(&self, title: &str, labels: &[String], values: &[f64]) -> Result<String, String> {
        let chart = json!({
            "type": "line",
            "data": {
                "labels": labels,
                "datasets": [{
                    "label": title,
                    "data": values,
                    "fill": false,
                    "pointRadius": 0,
                    "borderColor": "rgb(54, 162, 235)",
                }]
            },
            "options": {
                "title": { "display": true, "text": title },
                "legend": { "display": false },
            }
        });

        let url = format!("{}/chart/create", self.api_base);
        let res = self
            .http
            .post(&url)
            .json(&json!({
                "chart": chart,
                "width": 800,
                "height": 400,
                "backgroundColor": "white",
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("QuickChart failed: {status}"));
        }

        let body: CreateResponse = res.json().await.map_err(|e| e.to_string())?;
        match (body.success, body.url) {
            (true, Some(u)) => Ok(u),
            _ => Err("QuickChart did not return a chart url".to_string()),
        }
    }
}
