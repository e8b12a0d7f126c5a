use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries::{self, DATETIME_FMT};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Who is asking for a booking to change.
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    Customer(&'a str),
    Shop,
}

#[derive(Debug, Serialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub next_cursor: Option<String>,
}

/// Opaque position in a customer's newest-first booking list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: NaiveDateTime,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", self.created_at.format(DATETIME_FMT), self.id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(s: &str) -> Result<Self, AppError> {
        let invalid = || AppError::Validation("invalid cursor".to_string());
        let raw = URL_SAFE_NO_PAD.decode(s).map_err(|_| invalid())?;
        let raw = String::from_utf8(raw).map_err(|_| invalid())?;
        let (created_at, id) = raw.split_once('|').ok_or_else(invalid)?;
        let created_at = NaiveDateTime::parse_from_str(created_at, DATETIME_FMT).map_err(|_| invalid())?;
        if id.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            created_at,
            id: id.to_string(),
        })
    }
}

pub fn customer_bookings(
    conn: &Connection,
    customer_id: &str,
    cursor: Option<&str>,
    limit: Option<i64>,
) -> Result<BookingPage, AppError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let after = cursor.map(Cursor::decode).transpose()?;

    let mut bookings = queries::get_bookings_for_customer(
        conn,
        customer_id,
        after.as_ref().map(|c| (&c.created_at, c.id.as_str())),
        limit + 1,
    )?;

    let next_cursor = if bookings.len() as i64 > limit {
        bookings.truncate(limit as usize);
        bookings.last().map(|b| {
            Cursor {
                created_at: b.created_at,
                id: b.id.clone(),
            }
            .encode()
        })
    } else {
        None
    };

    Ok(BookingPage { bookings, next_cursor })
}

pub fn customer_booking(conn: &Connection, booking_id: &str, customer_id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, booking_id)?
        .filter(|b| b.customer_id == customer_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

/// Cancels a pending or confirmed booking. Its slot is immediately offered
/// again and any open payment order is abandoned.
pub fn cancel_booking(
    conn: &mut Connection,
    booking_id: &str,
    actor: Actor<'_>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking_by_id(&tx, booking_id)?
        .filter(|b| match actor {
            Actor::Customer(id) => b.customer_id == id,
            Actor::Shop => true,
        })
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    booking.transition(BookingStatus::Cancelled, now)?;
    queries::update_booking_state(&tx, &booking)?;
    let abandoned = queries::abandon_open_orders(&tx, booking_id, &now)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking_id,
        by_shop = matches!(actor, Actor::Shop),
        abandoned_orders = abandoned,
        amount_paid = booking.amount_paid,
        "booking cancelled"
    );

    Ok(booking)
}

/// Shop-side fulfilment: `confirmed -> completed`.
pub fn complete_booking(conn: &mut Connection, booking_id: &str, now: NaiveDateTime) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking_by_id(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    booking.transition(BookingStatus::Completed, now)?;
    queries::update_booking_state(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking_id, remaining = booking.remaining_amount, "booking completed");

    Ok(booking)
}
