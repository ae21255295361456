use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use kennel_core::{ReservationStore, StoreError};
use kennel_domain::{occupancy, Booking, BookingStatus, DateRange, Hold};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// In-process document store.
///
/// Mutations that grow occupancy go through `lock_range`, which takes one
/// mutex per calendar day of the affected range, in date order. Overlapping
/// admissions serialize on their shared days; disjoint ranges run in
/// parallel. Status transitions serialize on a per-booking lock handed out
/// by `lock_booking`. Plain reads only touch the lock-free maps.
pub struct MemoryStore {
    bookings: DashMap<Uuid, Booking>,
    holds: DashMap<Uuid, Hold>,
    day_locks: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
    booking_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            bookings: DashMap::new(),
            holds: DashMap::new(),
            day_locks: Mutex::new(HashMap::new()),
            booking_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the per-day locks covering `range`, ascending. The sorted
    /// order makes concurrent overlapping acquisitions deadlock-free.
    async fn lock_range(&self, range: &DateRange) -> Vec<OwnedMutexGuard<()>> {
        let day_mutexes: Vec<Arc<Mutex<()>>> = {
            let mut registry = self.day_locks.lock().await;
            range
                .days()
                .map(|day| registry.entry(day).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(day_mutexes.len());
        for mutex in day_mutexes {
            guards.push(mutex.lock_owned().await);
        }
        guards
    }

    fn snapshot_bookings(&self, range: &DateRange) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|entry| entry.value().range.overlaps(range))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn snapshot_holds(&self, range: &DateRange, now: DateTime<Utc>) -> Vec<Hold> {
        self.holds
            .iter()
            .filter(|entry| entry.value().range.overlaps(range) && entry.value().is_active(now))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Occupancy check shared by both checked inserts. Must be called with
    /// the range locks held.
    fn check_capacity(
        &self,
        range: &DateRange,
        quantity: u32,
        max_capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let bookings = self.snapshot_bookings(range);
        let holds = self.snapshot_holds(range, now);
        let peak = occupancy::max_occupancy(range, &bookings, &holds, now);

        // quantity is client-supplied; an overflowing sum can never fit
        let fits = peak
            .checked_add(quantity)
            .is_some_and(|total| total <= max_capacity);
        if !fits {
            return Err(StoreError::CapacityExceeded {
                spots_available: max_capacity.saturating_sub(peak),
            });
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|entry| entry.value().clone()))
    }

    async fn bookings_by_email(&self, email: &str) -> Result<Vec<Booking>, StoreError> {
        let needle = email.to_lowercase();
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| entry.value().email.to_lowercase() == needle)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn bookings_overlapping(
        &self,
        range: &DateRange,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|entry| {
                let booking = entry.value();
                booking.range.overlaps(range) && statuses.contains(&booking.status)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn holds_overlapping(
        &self,
        range: &DateRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, StoreError> {
        Ok(self.snapshot_holds(range, now))
    }

    async fn insert_hold_checked(
        &self,
        hold: Hold,
        max_capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<Hold, StoreError> {
        let _guards = self.lock_range(&hold.range).await;

        self.check_capacity(&hold.range, hold.quantity, max_capacity, now)?;
        debug!(hold_id = %hold.id, "hold admitted");
        self.holds.insert(hold.id, hold.clone());
        Ok(hold)
    }

    async fn insert_booking_checked(
        &self,
        booking: Booking,
        max_capacity: u32,
        release_hold: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Booking, StoreError> {
        let _guards = self.lock_range(&booking.range).await;

        // The checkout hold belongs to this booking; it must not count
        // against its own admission.
        let consumed = release_hold.and_then(|id| self.holds.remove(&id).map(|(_, h)| h));

        if let Err(err) = self.check_capacity(&booking.range, booking.quantity, max_capacity, now) {
            if let Some(hold) = consumed {
                self.holds.insert(hold.id, hold);
            }
            return Err(err);
        }

        debug!(booking_id = %booking.id, "booking admitted");
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn lock_booking(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut registry = self.booking_locks.lock().await;
            registry.entry(id).or_default().clone()
        };
        mutex.lock_owned().await
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        match self.bookings.get_mut(&booking.id) {
            Some(mut entry) => {
                *entry.value_mut() = booking.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(booking.id.to_string())),
        }
    }

    async fn delete_hold(&self, id: Uuid) -> Result<(), StoreError> {
        self.holds.remove(&id);
        Ok(())
    }

    async fn delete_expired_holds(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.holds.len();
        self.holds.retain(|_, hold| hold.expires_at >= now);

        // Piggyback on the periodic sweep to prune lock registry entries
        // nobody holds anymore, so neither registry grows without bound.
        self.day_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        self.booking_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        Ok(before - self.holds.len())
    }
}
