use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::ServiceSnapshot;
use crate::services::pricing;
use crate::services::slots::{self, DayPeriod};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    /// Total minutes of work; alternatively derived from `service_ids`.
    pub duration: Option<i64>,
    /// Comma-separated service ids.
    pub service_ids: Option<String>,
}

#[derive(Serialize)]
pub struct SlotView {
    start: NaiveDateTime,
    end: NaiveDateTime,
    period: DayPeriod,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    date: NaiveDate,
    duration_minutes: i64,
    slots: Vec<SlotView>,
}

// GET /api/shops/:shop_id/barbers/:barber_id/availability
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path((shop_id, barber_id)): Path<(String, String)>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let db = state.conn()?;

    let duration = match (query.duration, query.service_ids.as_deref()) {
        (Some(minutes), _) => minutes,
        (None, Some(ids)) => {
            let mut selected = vec![];
            for id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                let service = queries::get_service(&db, id)?
                    .filter(|s| s.shop_id == shop_id)
                    .ok_or_else(|| AppError::InvalidService(id.to_string()))?;
                selected.push(ServiceSnapshot {
                    id: service.id,
                    name: service.name,
                    price: service.price,
                    duration_minutes: service.duration_minutes,
                });
            }
            pricing::aggregate(&selected)
                .ok_or_else(|| AppError::Validation("selected services add up to more than can be booked".to_string()))?
                .total_duration
        }
        (None, None) => {
            return Err(AppError::Validation("either duration or service_ids is required".to_string()));
        }
    };

    let found = slots::availability(
        &db,
        &shop_id,
        &barber_id,
        query.date,
        duration,
        state.config.slot_step_minutes,
        state.config.local_now(),
    )?;

    Ok(Json(AvailabilityResponse {
        date: query.date,
        duration_minutes: duration,
        slots: found
            .into_iter()
            .map(|s| SlotView {
                start: s.start,
                end: s.end,
                period: DayPeriod::of(s.start.time()),
            })
            .collect(),
    }))
}
