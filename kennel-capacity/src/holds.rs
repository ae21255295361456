use crate::coordinator::CapacityError;
use chrono::{DateTime, Duration, Utc};
use kennel_core::{Clock, ReservationStore};
use kennel_domain::{DateRange, Hold};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Creates, releases and sweeps checkout holds. The capacity check and the
/// insert run as one atomic step inside the store.
pub struct HoldManager {
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_capacity: u32,
}

impl HoldManager {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        max_capacity: u32,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            max_capacity,
        }
    }

    pub async fn create_hold(
        &self,
        range: DateRange,
        quantity: u32,
        session_id: Option<String>,
    ) -> Result<Hold, CapacityError> {
        if quantity < 1 {
            return Err(CapacityError::InvalidQuantity);
        }

        let now = self.clock.now();
        let hold = Hold::new(range, quantity, session_id, now, self.ttl);
        let admitted = self
            .store
            .insert_hold_checked(hold, self.max_capacity, now)
            .await?;

        info!(hold_id = %admitted.id, quantity, expires_at = %admitted.expires_at, "hold created");
        Ok(admitted)
    }

    /// Idempotent; releasing an unknown or already-released hold succeeds.
    pub async fn release_hold(&self, id: Uuid) -> Result<(), CapacityError> {
        self.store.delete_hold(id).await?;
        debug!(hold_id = %id, "hold released");
        Ok(())
    }

    /// Deletes every hold that expired before `now`, returning the count.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, CapacityError> {
        let swept = self.store.delete_expired_holds(now).await?;
        if swept > 0 {
            info!(swept, "expired holds cleaned up");
        }
        Ok(swept)
    }
}
