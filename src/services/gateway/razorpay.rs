use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::PaymentGateway;

pub struct RazorpayGateway {
    base_url: String,
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
}

impl RazorpayGateway {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> anyhow::Result<String> {
        let url = format!("{}/v1/orders", self.base_url);

        // the gateway takes amounts in the currency's minor unit
        let minor_units = amount
            .checked_mul(100)
            .with_context(|| format!("order amount {amount} out of range"))?;
        let body = serde_json::json!({
            "amount": minor_units,
            "currency": currency,
            "receipt": receipt,
        });

        let order: OrderResponse = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("payment gateway returned error")?
            .json()
            .await
            .context("invalid payment gateway response")?;

        Ok(order.id)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
