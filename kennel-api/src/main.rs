use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kennel_api::{app, AppState};
use kennel_capacity::{spawn_expiry_sweeper, AvailabilityCoordinator};
use kennel_core::{CancellationTokens, MockPaymentGateway, SystemClock, TracingNotifier};
use kennel_domain::CancellationPolicy;
use kennel_reservation::BookingService;
use kennel_store::{Config, MemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kennel_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let rules = &config.business_rules;
    tracing::info!(
        port = config.server.port,
        max_capacity = rules.max_capacity,
        "starting kennel API"
    );

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);
    let coordinator = Arc::new(AvailabilityCoordinator::new(
        store.clone(),
        clock.clone(),
        chrono::Duration::minutes(rules.hold_ttl_minutes),
        rules.max_capacity,
    ));

    let policy = CancellationPolicy {
        free_cancellation_days: rules.free_cancellation_days,
        partial_refund_percentage: rules.partial_refund_percentage,
        no_refund_hours: rules.no_refund_hours,
    };

    let bookings = Arc::new(BookingService::new(
        coordinator.clone(),
        store.clone(),
        Arc::new(MockPaymentGateway),
        Arc::new(TracingNotifier),
        clock.clone(),
        policy.clone(),
        rules.currency.clone(),
    ));

    let tokens = CancellationTokens::new(
        config.auth.jwt_secret.clone(),
        config.auth.cancellation_token_days,
    );

    spawn_expiry_sweeper(
        store.clone(),
        clock.clone(),
        Duration::from_secs(rules.sweep_interval_seconds),
    );

    let state = AppState {
        store,
        coordinator,
        bookings,
        tokens,
        clock,
        policy,
        admin_api_key: config.auth.admin_api_key.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
