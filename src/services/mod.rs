pub mod bookings;
pub mod calendar;
pub mod gateway;
pub mod payment;
pub mod pricing;
pub mod reservation;
pub mod slots;
