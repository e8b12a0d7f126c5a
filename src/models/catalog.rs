use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: String,
    pub name: String,
    /// Shops listed in the marketplace need at least one active barber.
    pub requires_active_barber: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barber {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub origin: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// A single service never takes more than a day.
pub const MAX_SERVICE_MINUTES: i64 = 24 * 60;
/// Keeps booking totals and gateway minor-unit amounts far from `i64` overflow.
pub const MAX_SERVICE_PRICE: i64 = 10_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub price: i64,
    pub duration_minutes: i64,
}
