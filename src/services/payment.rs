use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use rusqlite::{Connection, TransactionBehavior};
use sha2::Sha256;

use crate::db::queries;
use crate::models::{
    Booking, BookingStatus, InvariantViolation, OrderStatus, PaymentOrder, PaymentStatus, PaymentType,
};
use crate::services::gateway::PaymentGateway;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct PaymentPolicy {
    /// Flat amount charged when the customer pays in advance.
    pub advance_amount: i64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("booking is already paid")]
    AlreadyPaid,

    #[error("booking is cancelled")]
    BookingCancelled,

    #[error("booking changed while the order was being created, please try again")]
    BookingChanged,

    #[error("payment signature does not match")]
    SignatureMismatch,

    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("payment order was superseded, contact support")]
    OrderAbandoned,

    #[error("payment order was already settled by another payment")]
    OrderAlreadyConsumed,

    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for PaymentError {
    fn from(err: rusqlite::Error) -> Self {
        PaymentError::Store(err.into())
    }
}

/// Lowercase hex HMAC-SHA256 of `order_id|payment_id`, as the gateway signs
/// successful checkouts.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| anyhow::anyhow!("invalid signing key: {e}"))?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(supplied) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    mac.verify_slice(&supplied).is_ok()
}

fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, PaymentError> {
    db.lock()
        .map_err(|_| PaymentError::Store(anyhow::anyhow!("database lock poisoned")))
}

fn load_customer_booking(conn: &Connection, booking_id: &str, customer_id: &str) -> Result<Booking, PaymentError> {
    queries::get_booking_by_id(conn, booking_id)?
        .filter(|b| b.customer_id == customer_id)
        .ok_or_else(|| PaymentError::NotFound(format!("booking {booking_id}")))
}

/// Amount the next order for `booking` must request.
pub fn order_amount(booking: &Booking, payment_type: PaymentType, policy: &PaymentPolicy) -> Result<i64, PaymentError> {
    if booking.booking_status == BookingStatus::Cancelled {
        return Err(PaymentError::BookingCancelled);
    }
    if booking.payment_status == PaymentStatus::Paid {
        return Err(PaymentError::AlreadyPaid);
    }

    let amount = match payment_type {
        PaymentType::Full => booking.remaining_amount,
        PaymentType::Advance => {
            if booking.payment_status != PaymentStatus::Unpaid {
                return Err(PaymentError::Validation(
                    "an advance can only be paid before any other payment".to_string(),
                ));
            }
            policy.advance_amount.min(booking.total_price)
        }
    };

    if amount <= 0 {
        return Err(PaymentError::Validation("nothing to pay on this booking".to_string()));
    }
    Ok(amount)
}

/// Opens a gateway order for the customer's booking. The booking itself is
/// not touched beyond recording the payment type; money only counts once
/// [`verify`] accepts the gateway's signature.
///
/// Any older open order of the booking is abandoned, so a retry after a
/// gateway failure always gets a fresh order id.
pub async fn create_order(
    db: &Mutex<Connection>,
    gateway: &dyn PaymentGateway,
    policy: &PaymentPolicy,
    booking_id: &str,
    customer_id: &str,
    payment_type: PaymentType,
    now: NaiveDateTime,
) -> Result<PaymentOrder, PaymentError> {
    let (amount, paid_before) = {
        let conn = lock(db)?;
        let booking = load_customer_booking(&conn, booking_id, customer_id)?;
        (order_amount(&booking, payment_type, policy)?, booking.amount_paid)
    };

    let order_id = gateway
        .create_order(amount, &policy.currency, booking_id)
        .await
        .map_err(|e| {
            tracing::error!(booking_id = %booking_id, error = %e, "gateway order creation failed");
            PaymentError::GatewayUnavailable(e.to_string())
        })?;

    let order = {
        let mut conn = lock(db)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut booking = load_customer_booking(&tx, booking_id, customer_id)?;
        let amount_now = order_amount(&booking, payment_type, policy)?;
        if amount_now != amount || booking.amount_paid != paid_before {
            return Err(PaymentError::BookingChanged);
        }

        let abandoned = queries::abandon_open_orders(&tx, booking_id, &now)?;
        if abandoned > 0 {
            tracing::info!(booking_id = %booking_id, abandoned, "abandoned earlier payment orders");
        }

        if booking.payment_type.is_none() {
            booking.payment_type = Some(payment_type);
            booking.updated_at = now;
            queries::update_booking_state(&tx, &booking)?;
        }

        let order = PaymentOrder {
            id: order_id,
            booking_id: booking_id.to_string(),
            payment_type,
            amount,
            currency: policy.currency.clone(),
            status: OrderStatus::Created,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };
        queries::create_payment_order(&tx, &order)?;
        tx.commit()?;
        order
    };

    tracing::info!(
        booking_id = %booking_id,
        order_id = %order.id,
        amount = order.amount,
        payment_type = order.payment_type.as_str(),
        "payment order created"
    );

    Ok(order)
}

/// Applies a gateway-confirmed payment to its booking.
///
/// Replaying the same `(order_id, payment_id)` returns the booking as it
/// stands without crediting the amount again.
pub fn verify(
    conn: &mut Connection,
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
    now: NaiveDateTime,
) -> Result<Booking, PaymentError> {
    for (field, value) in [("order_id", order_id), ("payment_id", payment_id), ("signature", signature)] {
        if value.trim().is_empty() {
            return Err(PaymentError::Validation(format!("{field} is required")));
        }
    }

    if !verify_signature(secret, order_id, payment_id, signature) {
        tracing::warn!(order_id = %order_id, payment_id = %payment_id, "payment signature mismatch");
        return Err(PaymentError::SignatureMismatch);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let order = queries::get_payment_order(&tx, order_id)?
        .ok_or_else(|| PaymentError::NotFound(format!("payment order {order_id}")))?;
    let mut booking = queries::get_booking_by_id(&tx, &order.booking_id)?
        .ok_or_else(|| PaymentError::NotFound(format!("booking {}", order.booking_id)))?;

    match order.status {
        OrderStatus::Created => {}
        OrderStatus::Paid if order.payment_id.as_deref() == Some(payment_id) => {
            tracing::info!(order_id = %order_id, payment_id = %payment_id, "payment already applied");
            return Ok(booking);
        }
        OrderStatus::Paid => return Err(PaymentError::OrderAlreadyConsumed),
        OrderStatus::Abandoned => {
            tracing::warn!(order_id = %order_id, payment_id = %payment_id, "payment received for abandoned order");
            return Err(PaymentError::OrderAbandoned);
        }
    }

    if booking.booking_status == BookingStatus::Cancelled {
        return Err(PaymentError::BookingCancelled);
    }

    booking.record_payment(order.amount, now)?;
    booking.check_invariants()?;
    queries::update_booking_state(&tx, &booking)?;

    match queries::mark_order_paid(&tx, order_id, payment_id, &now) {
        Ok(true) => {}
        Ok(false) => return Err(PaymentError::OrderAlreadyConsumed),
        Err(e) if queries::is_constraint_violation(&e) => return Err(PaymentError::OrderAlreadyConsumed),
        Err(e) => return Err(e.into()),
    }
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        order_id = %order_id,
        amount = order.amount,
        payment_status = booking.payment_status.as_str(),
        remaining = booking.remaining_amount,
        "payment verified"
    );

    Ok(booking)
}
