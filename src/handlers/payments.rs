use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::actor_id;
use crate::errors::AppError;
use crate::models::{Booking, PaymentType};
use crate::services::payment;
use crate::state::AppState;

// POST /api/bookings/:id/payment-order
#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub payment_type: PaymentType,
}

/// What the client needs to open the gateway checkout.
#[derive(Serialize)]
pub struct CreateOrderResponse {
    order_id: String,
    amount: i64,
    currency: String,
    key_id: String,
}

pub async fn create_payment_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let customer_id = actor_id(&headers)?;

    let order = payment::create_order(
        &state.db,
        state.gateway.as_ref(),
        &state.config.payment_policy(),
        &booking_id,
        &customer_id,
        body.payment_type,
        state.config.local_now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            key_id: state.gateway.key_id().to_string(),
        }),
    ))
}

// POST /api/payments/verify
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut db = state.conn()?;
    let booking = payment::verify(
        &mut db,
        &state.config.gateway_key_secret,
        &body.order_id,
        &body.payment_id,
        &body.signature,
        state.config.local_now(),
    )?;
    Ok(Json(booking))
}
