use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::working_hours::{check_weekday, WEEKDAY_NAMES};
use crate::models::WorkingHours;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DayHours {
    weekday: u8,
    day: &'static str,
    #[serde(flatten)]
    hours: WorkingHours,
}

fn ensure_shop(conn: &rusqlite::Connection, shop_id: &str) -> Result<(), AppError> {
    if queries::get_shop(conn, shop_id)?.is_none() {
        return Err(AppError::NotFound(format!("shop {shop_id}")));
    }
    Ok(())
}

// GET /api/shops/:shop_id/hours
pub async fn list_hours(
    State(state): State<Arc<AppState>>,
    Path(shop_id): Path<String>,
) -> Result<Json<Vec<DayHours>>, AppError> {
    let db = state.conn()?;
    ensure_shop(&db, &shop_id)?;

    let mut week = Vec::with_capacity(7);
    for (weekday, &day) in WEEKDAY_NAMES.iter().enumerate() {
        let weekday = weekday as u8;
        week.push(DayHours {
            weekday,
            day,
            hours: queries::get_working_hours(&db, &shop_id, weekday)?,
        });
    }
    Ok(Json(week))
}

// GET /api/shops/:shop_id/hours/:weekday
pub async fn get_hours(
    State(state): State<Arc<AppState>>,
    Path((shop_id, weekday)): Path<(String, u8)>,
) -> Result<Json<WorkingHours>, AppError> {
    let weekday = check_weekday(weekday)?;
    let db = state.conn()?;
    ensure_shop(&db, &shop_id)?;
    Ok(Json(queries::get_working_hours(&db, &shop_id, weekday)?))
}

// PUT /api/admin/shops/:shop_id/hours/:weekday
pub async fn set_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((shop_id, weekday)): Path<(String, u8)>,
    Json(hours): Json<WorkingHours>,
) -> Result<Json<WorkingHours>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let weekday = check_weekday(weekday)?;
    let hours = hours.validated()?;

    let db = state.conn()?;
    ensure_shop(&db, &shop_id)?;
    queries::set_working_hours(&db, &shop_id, weekday, &hours)?;

    tracing::info!(
        shop_id = %shop_id,
        day = WEEKDAY_NAMES[weekday as usize],
        hours = %hours.to_human_readable(),
        "working hours updated"
    );

    Ok(Json(hours))
}
