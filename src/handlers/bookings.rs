use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::actor_id;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Booking;
use crate::services::bookings::{self, Actor, BookingPage};
use crate::services::calendar::generate_ics;
use crate::services::reservation::{reserve, ReservationRequest};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let customer_id = actor_id(&headers)?;

    let booking = {
        let mut db = state.conn()?;
        reserve(
            &mut db,
            &customer_id,
            &req,
            state.config.local_now(),
            state.config.slot_step_minutes,
        )?
    };

    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<BookingPage>, AppError> {
    let customer_id = actor_id(&headers)?;
    let db = state.conn()?;
    let page = bookings::customer_bookings(&db, &customer_id, query.cursor.as_deref(), query.limit)?;
    Ok(Json(page))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let customer_id = actor_id(&headers)?;
    let db = state.conn()?;
    Ok(Json(bookings::customer_booking(&db, &id, &customer_id)?))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let customer_id = actor_id(&headers)?;
    let mut db = state.conn()?;
    let booking = bookings::cancel_booking(
        &mut db,
        &id,
        Actor::Customer(&customer_id),
        state.config.local_now(),
    )?;
    Ok(Json(booking))
}

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let customer_id = actor_id(&headers)?;

    let (booking, shop_name, barber_name) = {
        let db = state.conn()?;
        let booking = bookings::customer_booking(&db, &id, &customer_id)?;
        let shop_name = queries::get_shop(&db, &booking.shop_id)?
            .map(|s| s.name)
            .unwrap_or_else(|| "Salon".to_string());
        let barber_name = queries::get_barber(&db, &booking.barber_id)?
            .map(|b| b.name)
            .unwrap_or_else(|| "your barber".to_string());
        (booking, shop_name, barber_name)
    };

    let ics = generate_ics(&booking, &shop_name, &barber_name);
    let filename = format!("booking-{}.ics", booking.id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
