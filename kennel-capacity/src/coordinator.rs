use crate::holds::HoldManager;
use chrono::{Datelike, NaiveDate};
use kennel_core::{Clock, ReservationStore, StoreError};
use kennel_domain::{occupancy, Booking, BookingStatus, DateRange, Hold, RangeError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    #[error("No capacity for the requested dates: {spots_available} spots available")]
    CapacityExceeded { spots_available: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CapacityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded { spots_available } => {
                CapacityError::CapacityExceeded { spots_available }
            }
            other => CapacityError::Store(other),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub spots_available: u32,
    pub max_capacity: u32,
    pub requested_quantity: u32,
    pub occupancy_by_day: BTreeMap<NaiveDate, u32>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_of_week: u32,
    pub occupancy: u32,
    pub available: u32,
    pub is_full: bool,
}

/// Orchestration entry point for every capacity question: read-only
/// availability checks, hold admission, booking admission and the month
/// calendar. Sole gatekeeper allowed to grow occupancy.
pub struct AvailabilityCoordinator {
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    holds: HoldManager,
    max_capacity: u32,
}

impl AvailabilityCoordinator {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
        hold_ttl: chrono::Duration,
        max_capacity: u32,
    ) -> Self {
        let holds = HoldManager::new(store.clone(), clock.clone(), hold_ttl, max_capacity);
        Self {
            store,
            clock,
            holds,
            max_capacity,
        }
    }

    pub fn holds(&self) -> &HoldManager {
        &self.holds
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    /// Pure read: would `quantity` more units fit on every day of `range`?
    pub async fn check_availability(
        &self,
        range: DateRange,
        quantity: u32,
    ) -> Result<AvailabilityReport, CapacityError> {
        if quantity < 1 {
            return Err(CapacityError::InvalidQuantity);
        }

        let now = self.clock.now();
        let (bookings, holds) = self.load_range(&range).await?;
        let by_day = occupancy::occupancy_by_day(&range, &bookings, &holds, now);
        let peak = by_day.values().copied().max().unwrap_or(0);

        Ok(AvailabilityReport {
            available: peak
                .checked_add(quantity)
                .is_some_and(|total| total <= self.max_capacity),
            spots_available: self.max_capacity.saturating_sub(peak),
            max_capacity: self.max_capacity,
            requested_quantity: quantity,
            occupancy_by_day: by_day,
        })
    }

    /// Takes a checkout hold for the range; fails with the remaining spot
    /// count when it no longer fits.
    pub async fn admit_hold(
        &self,
        range: DateRange,
        quantity: u32,
        session_id: Option<String>,
    ) -> Result<Hold, CapacityError> {
        self.holds.create_hold(range, quantity, session_id).await
    }

    /// Admits a new pending booking at intake, consuming the checkout hold
    /// (if given) within the same atomic capacity check.
    pub async fn admit_booking(
        &self,
        booking: Booking,
        release_hold: Option<Uuid>,
    ) -> Result<Booking, CapacityError> {
        if booking.quantity < 1 {
            return Err(CapacityError::InvalidQuantity);
        }
        let now = self.clock.now();
        let admitted = self
            .store
            .insert_booking_checked(booking, self.max_capacity, release_hold, now)
            .await?;
        Ok(admitted)
    }

    /// Read-only per-day projection over a whole month.
    pub async fn month_calendar(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<CalendarDay>, CapacityError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(CapacityError::InvalidMonth(month))?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or(CapacityError::InvalidMonth(month))?;
        let range = DateRange::new(first, next_month)?;

        let now = self.clock.now();
        let (bookings, holds) = self.load_range(&range).await?;
        let by_day = occupancy::occupancy_by_day(&range, &bookings, &holds, now);

        Ok(by_day
            .into_iter()
            .map(|(date, occupancy)| CalendarDay {
                date,
                day_of_week: date.weekday().num_days_from_sunday(),
                occupancy,
                available: self.max_capacity.saturating_sub(occupancy),
                is_full: occupancy >= self.max_capacity,
            })
            .collect())
    }

    async fn load_range(
        &self,
        range: &DateRange,
    ) -> Result<(Vec<Booking>, Vec<Hold>), CapacityError> {
        let bookings = self
            .store
            .bookings_overlapping(range, &[BookingStatus::Pending, BookingStatus::Confirmed])
            .await?;
        let holds = self.store.holds_overlapping(range, self.clock.now()).await?;
        Ok((bookings, holds))
    }
}
