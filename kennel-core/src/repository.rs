use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kennel_domain::{Booking, BookingStatus, DateRange, Hold};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No capacity for the requested dates: {spots_available} spots available")]
    CapacityExceeded { spots_available: u32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Transient(String),
}

/// Persistence collaborator for bookings and holds.
///
/// The store is the transaction boundary: the `*_checked` operations run
/// the occupancy read and the write as one atomic unit keyed by the
/// affected day range, so two overlapping admissions can never both pass
/// the capacity check. Plain reads take no lock.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn bookings_by_email(&self, email: &str) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_overlapping(
        &self,
        range: &DateRange,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError>;

    /// Unexpired holds (`expires_at > now`) overlapping the range.
    async fn holds_overlapping(
        &self,
        range: &DateRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, StoreError>;

    /// Atomically insert the hold unless peak occupancy over its range
    /// plus its quantity would exceed `max_capacity`.
    async fn insert_hold_checked(
        &self,
        hold: Hold,
        max_capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<Hold, StoreError>;

    /// Atomically insert a pending booking under the same capacity check,
    /// consuming the checkout hold (if any) in the same atomic step.
    async fn insert_booking_checked(
        &self,
        booking: Booking,
        max_capacity: u32,
        release_hold: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Booking, StoreError>;

    /// Serializes status transitions on one booking record. The guard must
    /// be held across the whole read-check-write of a transition, including
    /// any gateway call the transition makes; two concurrent transitions on
    /// the same booking must never both pass the status guard.
    async fn lock_booking(&self, id: Uuid) -> OwnedMutexGuard<()>;

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Idempotent: deleting a missing hold is not an error.
    async fn delete_hold(&self, id: Uuid) -> Result<(), StoreError>;

    /// Removes every hold with `expires_at < now`, returning the count.
    async fn delete_expired_holds(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
