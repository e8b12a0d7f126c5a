use serde::Serialize;

use crate::models::ServiceSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_price: i64,
    pub total_duration: i64,
}

/// Sums price and duration of the selection. `None` if either total overflows.
pub fn aggregate(services: &[ServiceSnapshot]) -> Option<Totals> {
    services.iter().try_fold(Totals::default(), |acc, s| {
        Some(Totals {
            total_price: acc.total_price.checked_add(s.price)?,
            total_duration: acc.total_duration.checked_add(s.duration_minutes)?,
        })
    })
}
