use serde::{Deserialize, Deserializer, Serialize};

/// Entry of the daily alpha airdrop feed. The upstream shape is loose, so
/// every field is optional and numbers may arrive as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlphaEvent {
    #[serde(default, alias = "token")]
    pub name: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub time: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub points: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
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
