use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use rusqlite::TransactionBehavior;
use serde::Deserialize;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::catalog::{MAX_SERVICE_MINUTES, MAX_SERVICE_PRICE};
use crate::models::{Barber, Booking, BookingStatus, Service, Shop};
use crate::services::bookings::{self, Actor};
use crate::state::AppState;

fn require_name(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

// POST /api/admin/shops
#[derive(Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
    #[serde(default = "default_true")]
    pub requires_active_barber: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create_shop(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<Shop>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let shop = Shop {
        id: uuid::Uuid::new_v4().to_string(),
        name: require_name(&body.name, "name")?,
        requires_active_barber: body.requires_active_barber,
        created_at: state.config.local_now(),
    };

    {
        let db = state.conn()?;
        queries::insert_shop(&db, &shop)?;
    }

    tracing::info!(shop_id = %shop.id, name = %shop.name, "shop created");
    Ok((StatusCode::CREATED, Json(shop)))
}

// GET /api/admin/shops/:shop_id/bookings
#[derive(Deserialize)]
pub struct ShopBookingsQuery {
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

pub async fn get_shop_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shop_id): Path<String>,
    Query(query): Query<ShopBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| BookingStatus::parse(s).ok_or_else(|| AppError::Validation(format!("unknown status: {s}"))))
        .transpose()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let db = state.conn()?;
    if queries::get_shop(&db, &shop_id)?.is_none() {
        return Err(AppError::NotFound(format!("shop {shop_id}")));
    }
    let found = queries::get_shop_bookings(&db, &shop_id, status, query.date.as_ref(), limit)?;
    Ok(Json(found))
}

// POST /api/admin/shops/:shop_id/barbers
#[derive(Deserialize)]
pub struct AddBarberRequest {
    pub name: String,
    pub origin: Option<String>,
}

pub async fn add_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shop_id): Path<String>,
    Json(body): Json<AddBarberRequest>,
) -> Result<(StatusCode, Json<Barber>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let barber = Barber {
        id: uuid::Uuid::new_v4().to_string(),
        shop_id: shop_id.clone(),
        name: require_name(&body.name, "name")?,
        origin: body.origin.filter(|o| !o.trim().is_empty()),
        is_active: true,
        created_at: state.config.local_now(),
    };

    {
        let db = state.conn()?;
        if queries::get_shop(&db, &shop_id)?.is_none() {
            return Err(AppError::NotFound(format!("shop {shop_id}")));
        }
        queries::insert_barber(&db, &barber)?;
    }

    tracing::info!(shop_id = %shop_id, barber_id = %barber.id, "barber added");
    Ok((StatusCode::CREATED, Json(barber)))
}

// DELETE /api/admin/shops/:shop_id/barbers/:barber_id
//
// Barbers are deactivated rather than deleted so their bookings keep
// pointing at a real row.
pub async fn remove_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((shop_id, barber_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let mut db = state.conn()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let shop = queries::get_shop(&tx, &shop_id)?
        .ok_or_else(|| AppError::NotFound(format!("shop {shop_id}")))?;
    queries::get_barber(&tx, &barber_id)?
        .filter(|b| b.shop_id == shop_id && b.is_active)
        .ok_or_else(|| AppError::NotFound(format!("barber {barber_id}")))?;

    if shop.requires_active_barber && queries::count_active_barbers(&tx, &shop_id)? <= 1 {
        return Err(AppError::Conflict(
            "a shop needs at least one active barber".to_string(),
        ));
    }

    queries::deactivate_barber(&tx, &barber_id)?;
    tx.commit()?;

    tracing::info!(shop_id = %shop_id, barber_id = %barber_id, "barber deactivated");
    Ok(Json(serde_json::json!({"ok": true})))
}

// PUT /api/admin/shops/:shop_id/services/:service_id
#[derive(Deserialize)]
pub struct UpsertServiceRequest {
    pub name: String,
    pub price: i64,
    pub duration_minutes: i64,
}

pub async fn upsert_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((shop_id, service_id)): Path<(String, String)>,
    Json(body): Json<UpsertServiceRequest>,
) -> Result<Json<Service>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if !(0..=MAX_SERVICE_PRICE).contains(&body.price) {
        return Err(AppError::Validation(format!(
            "price must be between 0 and {MAX_SERVICE_PRICE}"
        )));
    }
    if !(1..=MAX_SERVICE_MINUTES).contains(&body.duration_minutes) {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {MAX_SERVICE_MINUTES}"
        )));
    }

    let service = Service {
        id: service_id,
        shop_id: shop_id.clone(),
        name: require_name(&body.name, "name")?,
        price: body.price,
        duration_minutes: body.duration_minutes,
    };

    let db = state.conn()?;
    if queries::get_shop(&db, &shop_id)?.is_none() {
        return Err(AppError::NotFound(format!("shop {shop_id}")));
    }
    if let Some(existing) = queries::get_service(&db, &service.id)? {
        if existing.shop_id != shop_id {
            return Err(AppError::Conflict(format!(
                "service id {} belongs to another shop",
                service.id
            )));
        }
    }
    queries::upsert_service(&db, &service)?;

    tracing::info!(shop_id = %shop_id, service_id = %service.id, price = service.price, "service saved");
    Ok(Json(service))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let mut db = state.conn()?;
    let booking = bookings::cancel_booking(&mut db, &id, Actor::Shop, state.config.local_now())?;
    Ok(Json(booking))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let mut db = state.conn()?;
    let booking = bookings::complete_booking(&mut db, &id, state.config.local_now())?;
    Ok(Json(booking))
}
