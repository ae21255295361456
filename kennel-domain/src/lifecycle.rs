use crate::booking::{Booking, BookingStatus, CancelledBy, RefundRecord};
use chrono::{DateTime, Utc};

/// Attempted transition rejected by the table below, naming the current
/// status so the caller can report it and stop retrying.
#[derive(Debug, thiserror::Error)]
#[error("Booking is {current}, cannot {attempted}")]
pub struct TransitionError {
    pub current: BookingStatus,
    pub attempted: &'static str,
}

/// Legal lifecycle edges. Everything not listed here is a conflict.
///
/// | from               | event    | to        |
/// |--------------------|----------|-----------|
/// | Pending            | confirm  | Confirmed |
/// | Pending            | reject   | Rejected  |
/// | Pending, Confirmed | cancel   | Cancelled |
/// | Confirmed          | complete | Completed |
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Rejected)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
            | (Confirmed, Completed)
    )
}

/// Pending -> Confirmed after a successful payment capture. A declined
/// capture never reaches this function; the booking stays pending.
pub fn confirm(
    booking: &mut Booking,
    payment_ref: String,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    guard(booking.status, BookingStatus::Confirmed, "confirm")?;
    booking.status = BookingStatus::Confirmed;
    booking.payment.intent_ref = Some(payment_ref);
    booking.payment.failure_reason = None;
    booking.confirmed_at = Some(now);
    Ok(())
}

/// Pending -> Rejected (admin decision, no payment was taken).
pub fn reject(
    booking: &mut Booking,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    guard(booking.status, BookingStatus::Rejected, "reject")?;
    booking.status = BookingStatus::Rejected;
    booking.rejection_reason = reason.or_else(|| Some("Not specified".to_string()));
    booking.rejected_at = Some(now);
    Ok(())
}

/// Pending/Confirmed -> Cancelled, recording the refund quote exactly once.
pub fn cancel(
    booking: &mut Booking,
    refund: RefundRecord,
    by: CancelledBy,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    guard(booking.status, BookingStatus::Cancelled, "cancel")?;
    booking.status = BookingStatus::Cancelled;
    booking.refund = Some(refund);
    booking.cancelled_by = Some(by);
    booking.cancelled_at = Some(now);
    Ok(())
}

/// Confirmed -> Completed once the stay has ended.
pub fn complete(booking: &mut Booking, now: DateTime<Utc>) -> Result<(), TransitionError> {
    guard(booking.status, BookingStatus::Completed, "complete")?;
    booking.status = BookingStatus::Completed;
    booking.completed_at = Some(now);
    Ok(())
}

fn guard(
    current: BookingStatus,
    to: BookingStatus,
    attempted: &'static str,
) -> Result<(), TransitionError> {
    if can_transition(current, to) {
        Ok(())
    } else {
        Err(TransitionError { current, attempted })
    }
}
