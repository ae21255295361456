use kennel_capacity::AvailabilityCoordinator;
use kennel_core::{CancellationTokens, Clock, ReservationStore};
use kennel_domain::CancellationPolicy;
use kennel_reservation::BookingService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub coordinator: Arc<AvailabilityCoordinator>,
    pub bookings: Arc<BookingService>,
    pub tokens: CancellationTokens,
    pub clock: Arc<dyn Clock>,
    pub policy: CancellationPolicy,
    pub admin_api_key: String,
}
