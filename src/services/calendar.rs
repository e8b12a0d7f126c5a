use crate::models::{Booking, BookingStatus};

/// Escapes TEXT values per RFC 5545.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

pub fn generate_ics(booking: &Booking, shop_name: &str, barber_name: &str) -> String {
    let dtstart = booking.slot.start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = booking.slot.end.format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@salon-booking", booking.id);

    let summary = escape_text(&format!("{shop_name} with {barber_name}"));
    let services = booking
        .services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let description = escape_text(&format!(
        "{services}. Total {}, paid {}, due at shop {}.",
        booking.total_price, booking.amount_paid, booking.remaining_amount
    ));
    let status = match booking.booking_status {
        BookingStatus::Pending => "TENTATIVE",
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Confirmed | BookingStatus::Completed => "CONFIRMED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Salon Booking//Appointments//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, PaymentType, ServiceSnapshot, TimeSlot};
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        let slot = TimeSlot::new(dt("2025-03-15 14:00"), 60);
        Booking {
            id: "test-123".to_string(),
            shop_id: "shop-1".to_string(),
            barber_id: "barber-1".to_string(),
            customer_id: "cust-1".to_string(),
            services: vec![
                ServiceSnapshot {
                    id: "haircut".to_string(),
                    name: "Haircut".to_string(),
                    price: 300,
                    duration_minutes: 20,
                },
                ServiceSnapshot {
                    id: "beard".to_string(),
                    name: "Beard trim".to_string(),
                    price: 200,
                    duration_minutes: 40,
                },
            ],
            date: slot.start.date(),
            slot,
            total_price: 500,
            total_duration: 60,
            booking_status: status,
            payment_type: Some(PaymentType::Advance),
            payment_status: PaymentStatus::Partial,
            amount_paid: 100,
            remaining_amount: 400,
            created_at: dt("2025-03-10 10:00"),
            updated_at: dt("2025-03-10 10:05"),
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking(BookingStatus::Confirmed), "Bob's Barbershop", "Ravi");
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("DTSTART:20250315T140000"));
        assert!(ics.contains("DTEND:20250315T150000"));
        assert!(ics.contains("DTSTAMP:20250310T100500"));
        assert!(ics.contains("SUMMARY:Bob's Barbershop with Ravi"));
        assert!(ics.contains("DESCRIPTION:Haircut\\, Beard trim. Total 500\\, paid 100\\, due at shop 400."));
        assert!(ics.contains("UID:test-123@salon-booking"));
        assert!(ics.contains("STATUS:CONFIRMED"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_pending_booking_is_tentative() {
        let ics = generate_ics(&booking(BookingStatus::Pending), "Shop; Co", "Ravi");
        assert!(ics.contains("STATUS:TENTATIVE"));
        assert!(ics.contains("SUMMARY:Shop\\; Co with Ravi"));
    }
}
