use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{TimeSlot, WorkingHours};

/// Longest slot anyone can ask for: a whole day.
pub const MAX_SLOT_MINUTES: i64 = 24 * 60;

/// Coarse band of the day a slot starts in, as shown to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Noon,
    Evening,
    Night,
}

impl DayPeriod {
    pub fn of(time: NaiveTime) -> Self {
        match time.hour() {
            0..=11 => DayPeriod::Morning,
            12..=15 => DayPeriod::Noon,
            16..=19 => DayPeriod::Evening,
            _ => DayPeriod::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRejection {
    /// Not a slot the shop's current hours would offer.
    OutsideHours,
    /// Offered by the hours but overlapping a live booking.
    Taken,
}

/// Candidate slots of `duration_minutes`, starting every `step_minutes` from
/// the beginning of each working interval, that fit inside the interval and
/// overlap none of `booked`. Ordered by start time.
pub fn resolve_slots(
    date: NaiveDate,
    hours: &WorkingHours,
    booked: &[TimeSlot],
    duration_minutes: i64,
    step_minutes: i64,
) -> Vec<TimeSlot> {
    if hours.is_closed || duration_minutes <= 0 || duration_minutes > MAX_SLOT_MINUTES {
        return vec![];
    }
    let step = Duration::minutes(step_minutes.clamp(1, MAX_SLOT_MINUTES));

    let mut slots = vec![];
    for (open, close) in hours.open_intervals() {
        let interval_end = date.and_time(close);
        let mut start = date.and_time(open);
        loop {
            let Some(candidate) = TimeSlot::try_new(start, duration_minutes) else {
                break;
            };
            if candidate.end > interval_end {
                break;
            }
            if !booked.iter().any(|b| b.overlaps(&candidate)) {
                slots.push(candidate);
            }
            start += step;
        }
    }
    slots
}

/// Re-derives whether `slot` would be offered right now, and if not, why.
pub fn check_slot(
    date: NaiveDate,
    hours: &WorkingHours,
    booked: &[TimeSlot],
    slot: &TimeSlot,
    step_minutes: i64,
) -> Result<(), SlotRejection> {
    let offered_by_hours = resolve_slots(date, hours, &[], slot.duration_minutes(), step_minutes);
    if !offered_by_hours.contains(slot) {
        return Err(SlotRejection::OutsideHours);
    }
    if booked.iter().any(|b| b.overlaps(slot)) {
        return Err(SlotRejection::Taken);
    }
    Ok(())
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Bookable slots for one barber of one shop on `date`. Slots that have
/// already started by `now` are left out.
pub fn availability(
    conn: &Connection,
    shop_id: &str,
    barber_id: &str,
    date: NaiveDate,
    duration_minutes: i64,
    step_minutes: i64,
    now: NaiveDateTime,
) -> Result<Vec<TimeSlot>, AppError> {
    if duration_minutes <= 0 {
        return Err(AppError::Validation("duration must be a positive number of minutes".to_string()));
    }
    if duration_minutes > MAX_SLOT_MINUTES {
        return Err(AppError::Validation(format!(
            "duration must be at most {MAX_SLOT_MINUTES} minutes"
        )));
    }

    match queries::get_barber(conn, barber_id)? {
        Some(barber) if barber.shop_id == shop_id && barber.is_active => {}
        _ => return Err(AppError::NotFound(format!("barber {barber_id} in shop {shop_id}"))),
    }

    let hours = queries::get_working_hours(conn, shop_id, weekday_index(date))?;
    let booked = queries::get_live_slots(conn, barber_id, &date)?;

    let mut slots = resolve_slots(date, &hours, &booked, duration_minutes, step_minutes);
    slots.retain(|s| s.start > now);
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BreakInterval;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn monday() -> NaiveDate {
        // 2025-06-16 is a Monday
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn shop_hours() -> WorkingHours {
        WorkingHours::open(
            t("09:00"),
            t("21:00"),
            vec![BreakInterval {
                start: t("13:00"),
                end: t("14:00"),
            }],
        )
    }

    #[test]
    fn test_closed_day_has_no_slots() {
        assert!(resolve_slots(monday(), &WorkingHours::closed(), &[], 30, 30).is_empty());
    }

    #[test]
    fn test_slots_skip_break() {
        let slots = resolve_slots(monday(), &shop_hours(), &[], 60, 30);
        assert_eq!(slots.first().unwrap().start, dt("2025-06-16 09:00"));
        assert_eq!(slots.last().unwrap().end, dt("2025-06-16 21:00"));

        let lunch = TimeSlot {
            start: dt("2025-06-16 13:00"),
            end: dt("2025-06-16 14:00"),
        };
        assert!(slots.iter().all(|s| !s.overlaps(&lunch)));
        // 12:00-13:00 fits right before the break, 14:00 right after
        assert!(slots.contains(&TimeSlot::new(dt("2025-06-16 12:00"), 60)));
        assert!(slots.contains(&TimeSlot::new(dt("2025-06-16 14:00"), 60)));
        assert!(!slots.contains(&TimeSlot::new(dt("2025-06-16 13:30"), 60)));
        assert!(!slots.contains(&TimeSlot::new(dt("2025-06-16 12:30"), 60)));
    }

    #[test]
    fn test_slots_skip_existing_bookings() {
        let booked = vec![TimeSlot::new(dt("2025-06-16 10:00"), 60)];
        let slots = resolve_slots(monday(), &shop_hours(), &booked, 60, 30);
        assert!(slots.iter().all(|s| !s.overlaps(&booked[0])));
        assert!(slots.contains(&TimeSlot::new(dt("2025-06-16 09:00"), 60)));
        assert!(slots.contains(&TimeSlot::new(dt("2025-06-16 11:00"), 60)));
        assert!(!slots.contains(&TimeSlot::new(dt("2025-06-16 10:30"), 60)));
    }

    #[test]
    fn test_duration_wider_than_any_interval() {
        let hours = WorkingHours::open(
            t("09:00"),
            t("12:00"),
            vec![BreakInterval {
                start: t("10:00"),
                end: t("10:30"),
            }],
        );
        assert!(resolve_slots(monday(), &hours, &[], 120, 15).is_empty());
        assert_eq!(resolve_slots(monday(), &hours, &[], 90, 15).len(), 1);
    }

    #[test]
    fn test_oversized_duration_yields_nothing() {
        let hours = WorkingHours::open(t("00:00"), t("23:59"), vec![]);
        assert!(resolve_slots(monday(), &hours, &[], 1_000_000_000_000, 30).is_empty());
        assert!(resolve_slots(monday(), &hours, &[], i64::MAX, 30).is_empty());
        assert_eq!(resolve_slots(monday(), &hours, &[], 60, i64::MAX).len(), 1);
    }

    #[test]
    fn test_step_controls_density() {
        let hours = WorkingHours::open(t("09:00"), t("11:00"), vec![]);
        assert_eq!(resolve_slots(monday(), &hours, &[], 60, 60).len(), 2);
        assert_eq!(resolve_slots(monday(), &hours, &[], 60, 15).len(), 5);
    }

    #[test]
    fn test_resolution_is_restartable() {
        let booked = vec![TimeSlot::new(dt("2025-06-16 15:00"), 45)];
        let a = resolve_slots(monday(), &shop_hours(), &booked, 45, 15);
        let b = resolve_slots(monday(), &shop_hours(), &booked, 45, 15);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_slot_overlaps_breaks_or_bookings() {
        let hours = WorkingHours::open(
            t("08:00"),
            t("22:00"),
            vec![
                BreakInterval {
                    start: t("11:10"),
                    end: t("11:40"),
                },
                BreakInterval {
                    start: t("16:00"),
                    end: t("17:05"),
                },
            ],
        );
        let booked = vec![
            TimeSlot::new(dt("2025-06-16 09:20"), 35),
            TimeSlot::new(dt("2025-06-16 19:00"), 90),
        ];
        let breaks: Vec<TimeSlot> = hours
            .breaks
            .iter()
            .map(|b| TimeSlot {
                start: monday().and_time(b.start),
                end: monday().and_time(b.end),
            })
            .collect();

        for duration in [15, 20, 45, 60, 95] {
            for step in [5, 10, 15, 30] {
                for slot in resolve_slots(monday(), &hours, &booked, duration, step) {
                    assert_eq!(slot.duration_minutes(), duration);
                    assert!(booked.iter().all(|b| !b.overlaps(&slot)));
                    assert!(breaks.iter().all(|b| !b.overlaps(&slot)));
                    assert!(slot.start >= dt("2025-06-16 08:00") && slot.end <= dt("2025-06-16 22:00"));
                }
            }
        }
    }

    #[test]
    fn test_check_slot_distinguishes_stale_from_taken() {
        let booked = vec![TimeSlot::new(dt("2025-06-16 10:00"), 60)];
        let hours = shop_hours();

        assert_eq!(
            check_slot(monday(), &hours, &booked, &TimeSlot::new(dt("2025-06-16 13:30"), 60), 30),
            Err(SlotRejection::OutsideHours)
        );
        assert_eq!(
            check_slot(monday(), &hours, &booked, &TimeSlot::new(dt("2025-06-16 09:10"), 60), 30),
            Err(SlotRejection::OutsideHours)
        );
        assert_eq!(
            check_slot(monday(), &hours, &booked, &TimeSlot::new(dt("2025-06-16 10:30"), 60), 30),
            Err(SlotRejection::Taken)
        );
        assert_eq!(
            check_slot(monday(), &hours, &booked, &TimeSlot::new(dt("2025-06-16 11:00"), 60), 30),
            Ok(())
        );
    }

    #[test]
    fn test_day_periods() {
        assert_eq!(DayPeriod::of(t("09:00")), DayPeriod::Morning);
        assert_eq!(DayPeriod::of(t("12:00")), DayPeriod::Noon);
        assert_eq!(DayPeriod::of(t("17:30")), DayPeriod::Evening);
        assert_eq!(DayPeriod::of(t("20:00")), DayPeriod::Night);
    }

    #[test]
    fn test_weekday_index_starts_monday() {
        assert_eq!(weekday_index(monday()), 0);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 6, 22).unwrap()), 6);
    }
}
