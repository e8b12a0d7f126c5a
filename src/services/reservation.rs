use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::models::{Booking, BookingStatus, PaymentStatus, ServiceSnapshot, TimeSlot};
use crate::services::pricing;
use crate::services::slots::{self, SlotRejection};

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub shop_id: String,
    pub barber_id: String,
    pub service_ids: Vec<String>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("service {0} is not offered by this shop")]
    InvalidService(String),

    #[error("slot overlaps an existing booking")]
    SlotConflict,

    #[error("slot is not offered by the shop's current hours")]
    StaleSlot,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for ReservationError {
    fn from(err: rusqlite::Error) -> Self {
        ReservationError::Store(err.into())
    }
}

/// Claims `req.slot` for `customer_id` and records a pending, unpaid booking.
///
/// Every check that depends on stored state runs inside one immediate
/// transaction together with the insert, so two requests racing for the same
/// barber cannot both observe the slot as free.
pub fn reserve(
    conn: &mut Connection,
    customer_id: &str,
    req: &ReservationRequest,
    now: NaiveDateTime,
    step_minutes: i64,
) -> Result<Booking, ReservationError> {
    for (field, value) in [
        ("customer_id", customer_id),
        ("shop_id", req.shop_id.as_str()),
        ("barber_id", req.barber_id.as_str()),
    ] {
        if value.trim().is_empty() {
            return Err(ReservationError::Validation(format!("{field} is required")));
        }
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let barber = queries::get_barber(&tx, &req.barber_id)?
        .filter(|b| b.shop_id == req.shop_id)
        .ok_or_else(|| {
            ReservationError::Validation(format!(
                "barber {} does not work at shop {}",
                req.barber_id, req.shop_id
            ))
        })?;
    if !barber.is_active {
        return Err(ReservationError::Validation(format!(
            "barber {} is not taking bookings",
            barber.id
        )));
    }

    if req.service_ids.is_empty() {
        return Err(ReservationError::Validation("select at least one service".to_string()));
    }
    let mut seen = HashSet::new();
    let mut services = Vec::with_capacity(req.service_ids.len());
    for id in &req.service_ids {
        if !seen.insert(id.as_str()) {
            return Err(ReservationError::Validation(format!("service {id} selected twice")));
        }
        match queries::get_service(&tx, id)? {
            Some(s) if s.shop_id == req.shop_id => services.push(ServiceSnapshot {
                id: s.id,
                name: s.name,
                price: s.price,
                duration_minutes: s.duration_minutes,
            }),
            _ => return Err(ReservationError::InvalidService(id.clone())),
        }
    }
    let totals = pricing::aggregate(&services).ok_or_else(|| {
        ReservationError::Validation("selected services add up to more than can be booked".to_string())
    })?;

    if req.date < now.date() {
        return Err(ReservationError::Validation(format!("{} is in the past", req.date)));
    }
    if req.slot.start.date() != req.date {
        return Err(ReservationError::Validation("slot must start on the booked date".to_string()));
    }
    if req.slot.start <= now {
        return Err(ReservationError::Validation("slot has already started".to_string()));
    }
    if req.slot.duration_minutes() != totals.total_duration {
        return Err(ReservationError::Validation(format!(
            "slot lasts {} minutes but the selected services take {}",
            req.slot.duration_minutes(),
            totals.total_duration
        )));
    }

    let hours = queries::get_working_hours(&tx, &req.shop_id, slots::weekday_index(req.date))?;
    let booked = queries::get_live_slots(&tx, &req.barber_id, &req.date)?;
    match slots::check_slot(req.date, &hours, &booked, &req.slot, step_minutes) {
        Ok(()) => {}
        Err(SlotRejection::OutsideHours) => {
            tracing::info!(barber_id = %req.barber_id, slot_start = %req.slot.start, "rejected stale slot");
            return Err(ReservationError::StaleSlot);
        }
        Err(SlotRejection::Taken) => {
            tracing::info!(barber_id = %req.barber_id, slot_start = %req.slot.start, "slot already taken");
            return Err(ReservationError::SlotConflict);
        }
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        shop_id: req.shop_id.clone(),
        barber_id: req.barber_id.clone(),
        customer_id: customer_id.to_string(),
        services,
        date: req.date,
        slot: req.slot,
        total_price: totals.total_price,
        total_duration: totals.total_duration,
        booking_status: BookingStatus::Pending,
        payment_type: None,
        payment_status: PaymentStatus::Unpaid,
        amount_paid: 0,
        remaining_amount: totals.total_price,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = queries::create_booking(&tx, &booking) {
        if queries::is_constraint_violation(&e) {
            tracing::warn!(barber_id = %req.barber_id, slot_start = %req.slot.start, "live slot index rejected booking");
            return Err(ReservationError::SlotConflict);
        }
        return Err(e.into());
    }
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        barber_id = %booking.barber_id,
        slot_start = %booking.slot.start,
        total_price = booking.total_price,
        "reservation created"
    );

    Ok(booking)
}
