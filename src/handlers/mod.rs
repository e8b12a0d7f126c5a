pub mod admin;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod hours;
pub mod payments;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/shops/:shop_id/hours", get(hours::list_hours))
        .route("/api/shops/:shop_id/hours/:weekday", get(hours::get_hours))
        .route(
            "/api/shops/:shop_id/barbers/:barber_id/availability",
            get(availability::get_availability),
        )
        .route(
            "/api/bookings",
            get(bookings::list_my_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/calendar.ics", get(bookings::download_ics))
        .route(
            "/api/bookings/:id/payment-order",
            post(payments::create_payment_order),
        )
        .route("/api/payments/verify", post(payments::verify_payment))
        .route("/api/admin/shops", post(admin::create_shop))
        .route(
            "/api/admin/shops/:shop_id/hours/:weekday",
            put(hours::set_hours),
        )
        .route(
            "/api/admin/shops/:shop_id/bookings",
            get(admin::get_shop_bookings),
        )
        .route("/api/admin/shops/:shop_id/barbers", post(admin::add_barber))
        .route(
            "/api/admin/shops/:shop_id/barbers/:barber_id",
            delete(admin::remove_barber),
        )
        .route(
            "/api/admin/shops/:shop_id/services/:service_id",
            put(admin::upsert_service),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(admin::cancel_booking),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(admin::complete_booking),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Customer id vouched for by the identity service in front of us.
pub(crate) fn actor_id(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}
