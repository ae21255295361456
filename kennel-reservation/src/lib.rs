pub mod service;

pub use service::{BookingService, NewBooking, ReservationError};
