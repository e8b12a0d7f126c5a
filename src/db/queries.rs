use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, ErrorCode};

use crate::models::{
    Barber, Booking, BookingStatus, BreakInterval, OrderStatus, PaymentOrder, PaymentStatus, PaymentType,
    Service, ServiceSnapshot, Shop, TimeSlot, WorkingHours,
};

pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).with_context(|| format!("invalid stored timestamp: {s}"))
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT).with_context(|| format!("invalid stored time: {s}"))
}

/// True when the error came from a UNIQUE/CHECK constraint rejecting a write.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
    )
}

// ── Shops ──

pub fn insert_shop(conn: &Connection, shop: &Shop) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO shops (id, name, requires_active_barber, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            shop.id,
            shop.name,
            shop.requires_active_barber as i32,
            fmt_datetime(&shop.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_shop(conn: &Connection, id: &str) -> anyhow::Result<Option<Shop>> {
    let result = conn.query_row(
        "SELECT id, name, requires_active_barber, created_at FROM shops WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)? != 0,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((id, name, requires_active_barber, created_at)) => Ok(Some(Shop {
            id,
            name,
            requires_active_barber,
            created_at: parse_datetime(&created_at)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Barbers ──

pub fn insert_barber(conn: &Connection, barber: &Barber) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO barbers (id, shop_id, name, origin, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            barber.id,
            barber.shop_id,
            barber.name,
            barber.origin,
            barber.is_active as i32,
            fmt_datetime(&barber.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_barber(conn: &Connection, id: &str) -> anyhow::Result<Option<Barber>> {
    let result = conn.query_row(
        "SELECT id, shop_id, name, origin, is_active, created_at FROM barbers WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i32>(4)? != 0,
                row.get::<_, String>(5)?,
            ))
        },
    );

    match result {
        Ok((id, shop_id, name, origin, is_active, created_at)) => Ok(Some(Barber {
            id,
            shop_id,
            name,
            origin,
            is_active,
            created_at: parse_datetime(&created_at)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn count_active_barbers(conn: &Connection, shop_id: &str) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM barbers WHERE shop_id = ?1 AND is_active = 1",
        params![shop_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn deactivate_barber(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("UPDATE barbers SET is_active = 0 WHERE id = ?1 AND is_active = 1", params![id])?;
    Ok(count > 0)
}

// ── Services ──

pub fn upsert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, shop_id, name, price, duration_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           price = excluded.price,
           duration_minutes = excluded.duration_minutes,
           updated_at = datetime('now')
         WHERE services.shop_id = excluded.shop_id",
        params![
            service.id,
            service.shop_id,
            service.name,
            service.price,
            service.duration_minutes,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, shop_id, name, price, duration_minutes FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(Service {
                id: row.get(0)?,
                shop_id: row.get(1)?,
                name: row.get(2)?,
                price: row.get(3)?,
                duration_minutes: row.get(4)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Working Hours ──

/// A weekday with no stored record is closed.
pub fn get_working_hours(conn: &Connection, shop_id: &str, weekday: u8) -> anyhow::Result<WorkingHours> {
    let result = conn.query_row(
        "SELECT is_closed, open_time, close_time, breaks FROM working_hours WHERE shop_id = ?1 AND weekday = ?2",
        params![shop_id, weekday],
        |row| {
            Ok((
                row.get::<_, i32>(0)? != 0,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((is_closed, open, close, breaks_json)) => {
            let stored: Vec<(String, String)> =
                serde_json::from_str(&breaks_json).context("invalid stored breaks")?;
            let mut breaks = Vec::with_capacity(stored.len());
            for (start, end) in stored {
                breaks.push(BreakInterval {
                    start: parse_time(&start)?,
                    end: parse_time(&end)?,
                });
            }
            Ok(WorkingHours {
                is_closed,
                open: open.as_deref().map(parse_time).transpose()?,
                close: close.as_deref().map(parse_time).transpose()?,
                breaks,
            })
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(WorkingHours::closed()),
        Err(e) => Err(e.into()),
    }
}

pub fn set_working_hours(conn: &Connection, shop_id: &str, weekday: u8, hours: &WorkingHours) -> anyhow::Result<()> {
    let breaks: Vec<(String, String)> = hours
        .breaks
        .iter()
        .map(|b| (b.start.format(TIME_FMT).to_string(), b.end.format(TIME_FMT).to_string()))
        .collect();
    let breaks_json = serde_json::to_string(&breaks)?;

    conn.execute(
        "INSERT INTO working_hours (shop_id, weekday, is_closed, open_time, close_time, breaks)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(shop_id, weekday) DO UPDATE SET
           is_closed = excluded.is_closed,
           open_time = excluded.open_time,
           close_time = excluded.close_time,
           breaks = excluded.breaks,
           updated_at = datetime('now')",
        params![
            shop_id,
            weekday,
            hours.is_closed as i32,
            hours.open.map(|t| t.format(TIME_FMT).to_string()),
            hours.close.map(|t| t.format(TIME_FMT).to_string()),
            breaks_json,
        ],
    )?;
    Ok(())
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, shop_id, barber_id, customer_id, services, date, slot_start, slot_end, \
     total_price, total_duration, booking_status, payment_type, payment_status, amount_paid, remaining_amount, \
     created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let services = serde_json::to_string(&booking.services)?;

    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            booking.id,
            booking.shop_id,
            booking.barber_id,
            booking.customer_id,
            services,
            fmt_date(&booking.date),
            fmt_datetime(&booking.slot.start),
            fmt_datetime(&booking.slot.end),
            booking.total_price,
            booking.total_duration,
            booking.booking_status.as_str(),
            booking.payment_type.map(|t| t.as_str()),
            booking.payment_status.as_str(),
            booking.amount_paid,
            booking.remaining_amount,
            fmt_datetime(&booking.created_at),
            fmt_datetime(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Writes back the mutable part of a booking: status and payment fields.
pub fn update_booking_state(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET
           booking_status = ?1,
           payment_type = ?2,
           payment_status = ?3,
           amount_paid = ?4,
           remaining_amount = ?5,
           updated_at = ?6
         WHERE id = ?7",
        params![
            booking.booking_status.as_str(),
            booking.payment_type.map(|t| t.as_str()),
            booking.payment_status.as_str(),
            booking.amount_paid,
            booking.remaining_amount,
            fmt_datetime(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Slots held by the barber's non-cancelled bookings on `date`.
pub fn get_live_slots(conn: &Connection, barber_id: &str, date: &NaiveDate) -> anyhow::Result<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(
        "SELECT slot_start, slot_end FROM bookings
         WHERE barber_id = ?1 AND date = ?2 AND booking_status != 'cancelled'
         ORDER BY slot_start ASC",
    )?;

    let rows = stmt.query_map(params![barber_id, fmt_date(date)], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut slots = vec![];
    for row in rows {
        let (start, end) = row?;
        slots.push(TimeSlot {
            start: parse_datetime(&start)?,
            end: parse_datetime(&end)?,
        });
    }
    Ok(slots)
}

/// Newest first. `after` is the `(created_at, id)` of the last booking on the
/// previous page.
pub fn get_bookings_for_customer(
    conn: &Connection,
    customer_id: &str,
    after: Option<(&NaiveDateTime, &str)>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match after {
        Some((created_at, id)) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE customer_id = ?1 AND (created_at < ?2 OR (created_at = ?2 AND id < ?3))
                 ORDER BY created_at DESC, id DESC LIMIT ?4"
            ),
            vec![
                Box::new(customer_id.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(fmt_datetime(created_at)),
                Box::new(id.to_string()),
                Box::new(limit),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE customer_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ),
            vec![
                Box::new(customer_id.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
    };

    query_bookings(conn, &sql, &params_vec)
}

pub fn get_shop_bookings(
    conn: &Connection,
    shop_id: &str,
    status: Option<BookingStatus>,
    date: Option<&NaiveDate>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE shop_id = ?1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(shop_id.to_string())];

    if let Some(status) = status {
        params_vec.push(Box::new(status.as_str()));
        sql.push_str(&format!(" AND booking_status = ?{}", params_vec.len()));
    }
    if let Some(date) = date {
        params_vec.push(Box::new(fmt_date(date)));
        sql.push_str(&format!(" AND date = ?{}", params_vec.len()));
    }
    params_vec.push(Box::new(limit));
    sql.push_str(&format!(" ORDER BY slot_start ASC LIMIT ?{}", params_vec.len()));

    query_bookings(conn, &sql, &params_vec)
}

fn query_bookings(
    conn: &Connection,
    sql: &str,
    params_vec: &[Box<dyn rusqlite::types::ToSql>],
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let services_json: String = row.get(4)?;
    let date_str: String = row.get(5)?;
    let slot_start: String = row.get(6)?;
    let slot_end: String = row.get(7)?;
    let status_str: String = row.get(10)?;
    let payment_type: Option<String> = row.get(11)?;
    let payment_status: String = row.get(12)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    let services: Vec<ServiceSnapshot> =
        serde_json::from_str(&services_json).context("invalid stored service snapshot")?;

    Ok(Booking {
        id: row.get(0)?,
        shop_id: row.get(1)?,
        barber_id: row.get(2)?,
        customer_id: row.get(3)?,
        services,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT).with_context(|| format!("invalid stored date: {date_str}"))?,
        slot: TimeSlot {
            start: parse_datetime(&slot_start)?,
            end: parse_datetime(&slot_end)?,
        },
        total_price: row.get(8)?,
        total_duration: row.get(9)?,
        booking_status: BookingStatus::parse(&status_str)
            .with_context(|| format!("unknown booking status: {status_str}"))?,
        payment_type: match payment_type {
            Some(s) => Some(PaymentType::parse(&s).with_context(|| format!("unknown payment type: {s}"))?),
            None => None,
        },
        payment_status: PaymentStatus::parse(&payment_status)
            .with_context(|| format!("unknown payment status: {payment_status}"))?,
        amount_paid: row.get(13)?,
        remaining_amount: row.get(14)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

// ── Payment Orders ──

pub fn create_payment_order(conn: &Connection, order: &PaymentOrder) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payment_orders (id, booking_id, payment_type, amount, currency, status, payment_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            order.id,
            order.booking_id,
            order.payment_type.as_str(),
            order.amount,
            order.currency,
            order.status.as_str(),
            order.payment_id,
            fmt_datetime(&order.created_at),
            fmt_datetime(&order.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_payment_order(conn: &Connection, id: &str) -> anyhow::Result<Option<PaymentOrder>> {
    let result = conn.query_row(
        "SELECT id, booking_id, payment_type, amount, currency, status, payment_id, created_at, updated_at
         FROM payment_orders WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        },
    );

    match result {
        Ok((id, booking_id, payment_type, amount, currency, status, payment_id, created_at, updated_at)) => {
            Ok(Some(PaymentOrder {
                id,
                booking_id,
                payment_type: PaymentType::parse(&payment_type)
                    .with_context(|| format!("unknown payment type: {payment_type}"))?,
                amount,
                currency,
                status: OrderStatus::parse(&status).with_context(|| format!("unknown order status: {status}"))?,
                payment_id,
                created_at: parse_datetime(&created_at)?,
                updated_at: parse_datetime(&updated_at)?,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Marks every still-open order of the booking as abandoned.
pub fn abandon_open_orders(conn: &Connection, booking_id: &str, at: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE payment_orders SET status = 'abandoned', updated_at = ?1 WHERE booking_id = ?2 AND status = 'created'",
        params![fmt_datetime(at), booking_id],
    )?;
    Ok(count)
}

pub fn mark_order_paid(conn: &Connection, id: &str, payment_id: &str, at: &NaiveDateTime) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payment_orders SET status = 'paid', payment_id = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'created'",
        params![payment_id, fmt_datetime(at), id],
    )?;
    Ok(count > 0)
}
