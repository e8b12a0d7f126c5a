use std::env;

use chrono::{Duration, NaiveDateTime, Utc};

use crate::services::payment::PaymentPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub gateway_url: String,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub currency: String,
    pub advance_amount: i64,
    pub slot_step_minutes: i64,
    pub utc_offset_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salon.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            gateway_url: env::var("GATEWAY_URL").unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            gateway_key_id: env::var("GATEWAY_KEY_ID").unwrap_or_default(),
            gateway_key_secret: env::var("GATEWAY_KEY_SECRET").unwrap_or_default(),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            advance_amount: env::var("ADVANCE_AMOUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            slot_step_minutes: env::var("SLOT_STEP_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&m| m > 0 && m <= 24 * 60)
                .unwrap_or(30),
            utc_offset_minutes: env::var("UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| m.abs() <= 24 * 60)
                .unwrap_or(0),
        }
    }

    pub fn payment_policy(&self) -> PaymentPolicy {
        PaymentPolicy {
            advance_amount: self.advance_amount,
            currency: self.currency.clone(),
        }
    }

    /// Wall-clock time at the shops.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(self.utc_offset_minutes)
    }
}
