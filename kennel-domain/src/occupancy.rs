use crate::booking::Booking;
use crate::hold::Hold;
use crate::range::DateRange;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Per-day occupied quantity over `range`, dense: every day in the range
/// appears, zero-filled when nothing covers it.
///
/// Counts pending/confirmed bookings plus holds with `expires_at > now`.
/// Callers gating a write must pass a snapshot taken inside the store's
/// range lock so the check and the write see the same state.
pub fn occupancy_by_day(
    range: &DateRange,
    bookings: &[Booking],
    holds: &[Hold],
    now: DateTime<Utc>,
) -> BTreeMap<NaiveDate, u32> {
    let mut by_day: BTreeMap<NaiveDate, u32> = range.days().map(|d| (d, 0)).collect();

    for booking in bookings {
        if !booking.status.counts_toward_capacity() {
            continue;
        }
        add_covered_days(&mut by_day, &booking.range, booking.quantity);
    }

    for hold in holds {
        if !hold.is_active(now) {
            continue;
        }
        add_covered_days(&mut by_day, &hold.range, hold.quantity);
    }

    by_day
}

/// Peak occupancy over the range, 0 when the range is empty of load.
pub fn max_occupancy(
    range: &DateRange,
    bookings: &[Booking],
    holds: &[Hold],
    now: DateTime<Utc>,
) -> u32 {
    occupancy_by_day(range, bookings, holds, now)
        .values()
        .copied()
        .max()
        .unwrap_or(0)
}

fn add_covered_days(by_day: &mut BTreeMap<NaiveDate, u32>, covered: &DateRange, quantity: u32) {
    for (day, count) in by_day.iter_mut() {
        if covered.contains_day(*day) {
            *count += quantity;
        }
    }
}
