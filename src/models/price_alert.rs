use serde::{Deserialize, Serialize};

/// Percent-move alert for one contract in one chat. Lives in the
/// `price_alerts` hash under the field `<chat_id>:<address>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub address: String,
    pub network: String,
    pub symbol: String,
    pub name: String,
    pub chat_id: i64,
    pub threshold_percent: f64,

    // price at creation, overwritten every time the threshold is crossed
    pub reference_price: f64,
}

impl PriceAlert {
    pub fn field(chat_id: i64, address: &str) -> String {
        format!("{}:{}", chat_id, address.to_lowercase())
    }

    pub fn change_percent(&self, price: f64) -> f64 {
        if self.reference_price <= 0.0 {
            return 0.0;
        }
        (price - self.reference_price) / self.reference_price * 100.0
    }

    pub fn is_crossed(&self, price: f64) -> bool {
        self.change_percent(price).abs() >= self.threshold_percent
    }
}
