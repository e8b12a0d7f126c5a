use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    /// Saturates at the end of the calendar instead of overflowing.
    pub fn new(start: NaiveDateTime, duration_minutes: i64) -> Self {
        Self::try_new(start, duration_minutes).unwrap_or(Self {
            start,
            end: NaiveDateTime::MAX,
        })
    }

    /// `None` when the end would fall outside the representable range.
    pub fn try_new(start: NaiveDateTime, duration_minutes: i64) -> Option<Self> {
        let end = start.checked_add_signed(Duration::try_minutes(duration_minutes)?)?;
        Some(Self { start, end })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Service as it was priced when the booking was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move booking from {from} to {to}")]
pub struct InvalidTransition {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Full,
    Advance,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Full => "full",
            PaymentType::Advance => "advance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(PaymentType::Full),
            "advance" => Some(PaymentType::Advance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub shop_id: String,
    pub barber_id: String,
    pub customer_id: String,
    pub services: Vec<ServiceSnapshot>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub total_price: i64,
    pub total_duration: i64,
    pub booking_status: BookingStatus,
    pub payment_type: Option<PaymentType>,
    pub payment_status: PaymentStatus,
    pub amount_paid: i64,
    pub remaining_amount: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn transition(&mut self, next: BookingStatus, at: NaiveDateTime) -> Result<(), InvalidTransition> {
        if !self.booking_status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.booking_status,
                to: next,
            });
        }
        self.booking_status = next;
        self.updated_at = at;
        Ok(())
    }

    /// Credits a verified payment and confirms a pending booking.
    pub fn record_payment(&mut self, amount: i64, at: NaiveDateTime) -> Result<(), InvariantViolation> {
        if self.booking_status == BookingStatus::Cancelled {
            return Err(InvariantViolation(format!(
                "payment credited to cancelled booking {}",
                self.id
            )));
        }
        let paid = self.amount_paid + amount;
        if amount <= 0 || paid > self.total_price {
            debug_assert!(
                false,
                "payment of {amount} on booking {} would take amount_paid to {paid} of {}",
                self.id, self.total_price
            );
            return Err(InvariantViolation(format!(
                "payment of {amount} on booking {} would take amount_paid to {paid} of {}",
                self.id, self.total_price
            )));
        }

        self.amount_paid = paid;
        self.remaining_amount = self.total_price - paid;
        self.payment_status = if self.remaining_amount == 0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };
        if self.booking_status == BookingStatus::Pending {
            self.booking_status = BookingStatus::Confirmed;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.amount_paid + self.remaining_amount != self.total_price || self.remaining_amount < 0 {
            return Err(InvariantViolation(format!(
                "booking {}: paid {} + remaining {} != total {}",
                self.id, self.amount_paid, self.remaining_amount, self.total_price
            )));
        }
        let paid = self.remaining_amount == 0 && self.amount_paid > 0;
        if paid != (self.payment_status == PaymentStatus::Paid) {
            return Err(InvariantViolation(format!(
                "booking {}: payment status {} disagrees with remaining {}",
                self.id,
                self.payment_status.as_str(),
                self.remaining_amount
            )));
        }
        Ok(())
    }
}
