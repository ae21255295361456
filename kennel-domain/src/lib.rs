pub mod booking;
pub mod hold;
pub mod lifecycle;
pub mod occupancy;
pub mod policy;
pub mod range;

pub use booking::{Booking, BookingStatus, CancelledBy, PaymentDetails, RefundRecord};
pub use hold::Hold;
pub use lifecycle::TransitionError;
pub use policy::{CancellationPolicy, RefundQuote, RefundReason};
pub use range::{DateRange, RangeError};
