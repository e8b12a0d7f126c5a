pub mod booking;
pub mod catalog;
pub mod payment;
pub mod working_hours;

pub use booking::{
    Booking, BookingStatus, InvalidTransition, InvariantViolation, PaymentStatus, PaymentType, ServiceSnapshot,
    TimeSlot,
};
pub use catalog::{Barber, Service, Shop};
pub use payment::{OrderStatus, PaymentOrder};
pub use working_hours::{BreakInterval, ScheduleError, WorkingHours};
