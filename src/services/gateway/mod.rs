pub mod razorpay;

use async_trait::async_trait;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens an order for `amount` whole currency units and returns the
    /// gateway's order id.
    async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> anyhow::Result<String>;

    /// Public key handed to the client-side checkout.
    fn key_id(&self) -> &str;
}
