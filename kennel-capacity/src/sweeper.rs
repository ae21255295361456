use kennel_core::{Clock, ReservationStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Periodic hold-expiry sweep, independent of any request's lifecycle.
/// Errors are logged and the loop keeps running; a raced `create_hold` is
/// safe because occupancy reads already filter on `expires_at > now`.
pub fn spawn_expiry_sweeper(
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = every.as_secs(), "expiry sweeper started");
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match store.delete_expired_holds(clock.now()).await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "expired holds cleaned up"),
                Err(err) => error!(%err, "hold expiry sweep failed"),
            }
        }
    })
}
