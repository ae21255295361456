use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use kennel_capacity::AvailabilityCoordinator;
use kennel_core::{
    Clock, ManualClock, Notifier, NotifyError, PaymentError, PaymentGateway, ReservationStore,
    StoreError, TemplateKind,
};
use kennel_domain::{Booking, BookingStatus, CancellationPolicy, CancelledBy, DateRange, Hold};
use kennel_reservation::{BookingService, NewBooking, ReservationError};
use kennel_store::MemoryStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const MAX_CAPACITY: u32 = 5;

/// Gateway that counts calls and can be told how to fail.
#[derive(Default)]
struct ScriptedGateway {
    captures: AtomicUsize,
    refunds: AtomicUsize,
    decline: bool,
    /// Widens race windows by pausing inside every gateway call.
    slow: bool,
    transient_first_capture: AtomicBool,
}

impl ScriptedGateway {
    fn declining() -> Self {
        Self {
            decline: true,
            ..Default::default()
        }
    }

    fn flaky() -> Self {
        let gw = Self::default();
        gw.transient_first_capture.store(true, Ordering::SeqCst);
        gw
    }

    fn slow() -> Self {
        Self {
            slow: true,
            ..Default::default()
        }
    }

    async fn stall(&self) {
        if self.slow {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn capture(
        &self,
        _amount_cents: i64,
        _customer_ref: &str,
        _method_ref: &str,
    ) -> Result<String, PaymentError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        if self.decline {
            return Err(PaymentError::Declined("insufficient funds".into()));
        }
        if self.transient_first_capture.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::Transient("connection reset".into()));
        }
        Ok("pi_scripted".to_string())
    }

    async fn refund(&self, payment_ref: &str, _amount_cents: i64) -> Result<String, PaymentError> {
        self.refunds.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        Ok(format!("re_{payment_ref}"))
    }
}

struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn send(
        &self,
        _template: TemplateKind,
        _recipient: &str,
        _data: serde_json::Value,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Store wrapper whose `update_booking` fails transiently exactly once.
struct FailOnceStore {
    inner: MemoryStore,
    fail_next_update: AtomicBool,
}

#[async_trait]
impl ReservationStore for FailOnceStore {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.inner.get_booking(id).await
    }

    async fn bookings_by_email(&self, email: &str) -> Result<Vec<Booking>, StoreError> {
        self.inner.bookings_by_email(email).await
    }

    async fn bookings_overlapping(
        &self,
        range: &DateRange,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        self.inner.bookings_overlapping(range, statuses).await
    }

    async fn holds_overlapping(
        &self,
        range: &DateRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, StoreError> {
        self.inner.holds_overlapping(range, now).await
    }

    async fn insert_hold_checked(
        &self,
        hold: Hold,
        max_capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<Hold, StoreError> {
        self.inner.insert_hold_checked(hold, max_capacity, now).await
    }

    async fn insert_booking_checked(
        &self,
        booking: Booking,
        max_capacity: u32,
        release_hold: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Booking, StoreError> {
        self.inner
            .insert_booking_checked(booking, max_capacity, release_hold, now)
            .await
    }

    async fn lock_booking(&self, id: Uuid) -> tokio::sync::OwnedMutexGuard<()> {
        self.inner.lock_booking(id).await
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Transient("simulated write failure".into()));
        }
        self.inner.update_booking(booking).await
    }

    async fn delete_hold(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_hold(id).await
    }

    async fn delete_expired_holds(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.inner.delete_expired_holds(now).await
    }
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
}

fn request(method_ref: Option<&str>) -> NewBooking {
    NewBooking {
        email: "Owner@Example.com".into(),
        pet_name: "Koda".into(),
        pet_type: "dog".into(),
        quantity: 1,
        range: range("2024-06-10", "2024-06-14"),
        total_price_cents: 48000,
        customer_ref: Some("cus_1".into()),
        method_ref: method_ref.map(String::from),
        hold_id: None,
    }
}

fn service_with(
    store: Arc<dyn ReservationStore>,
    gateway: Arc<ScriptedGateway>,
    clock: Arc<ManualClock>,
) -> BookingService {
    let coordinator = Arc::new(AvailabilityCoordinator::new(
        store.clone(),
        clock.clone(),
        Duration::minutes(15),
        MAX_CAPACITY,
    ));
    BookingService::new(
        coordinator,
        store,
        gateway,
        Arc::new(SilentNotifier),
        clock,
        CancellationPolicy::default(),
        "EUR".into(),
    )
}

fn days_before_arrival(days: i64) -> DateTime<Utc> {
    let arrival = "2024-06-10"
        .parse::<chrono::NaiveDate>()
        .unwrap()
        .and_time(NaiveTime::MIN)
        .and_utc();
    arrival - Duration::days(days)
}

fn setup(gateway: ScriptedGateway) -> (Arc<ScriptedGateway>, Arc<ManualClock>, BookingService) {
    let store: Arc<dyn ReservationStore> = Arc::new(MemoryStore::new());
    let gateway = Arc::new(gateway);
    let clock = Arc::new(ManualClock::new(days_before_arrival(10)));
    let service = service_with(store, gateway.clone(), clock.clone());
    (gateway, clock, service)
}

#[tokio::test]
async fn intake_then_confirm_captures_and_stamps() {
    let (gateway, _, service) = setup(ScriptedGateway::default());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.email, "owner@example.com");

    let confirmed = service.confirm(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.payment.intent_ref.as_deref(), Some("pi_scripted"));
    assert!(confirmed.confirmed_at.is_some());
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn confirm_without_payment_method_is_a_precondition_failure() {
    let (gateway, _, service) = setup(ScriptedGateway::default());

    let booking = service.intake(request(None)).await.unwrap();
    let err = service.confirm(booking.id).await.unwrap_err();

    assert!(matches!(err, ReservationError::Validation(_)));
    // The processor was never contacted
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn declined_capture_leaves_booking_pending_with_reason() {
    let (gateway, _, service) = setup(ScriptedGateway::declining());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    let err = service.confirm(booking.id).await.unwrap_err();

    assert!(matches!(err, ReservationError::PaymentDeclined(_)));
    // No automatic retry on a decline
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 1);

    let stored = service.confirm(booking.id).await.unwrap_err();
    // Still pending, so a second confirm attempt reaches the processor again
    assert!(matches!(stored, ReservationError::PaymentDeclined(_)));
}

#[tokio::test]
async fn transient_capture_failure_is_retried_once() {
    let (gateway, _, service) = setup(ScriptedGateway::flaky());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    let confirmed = service.confirm(booking.id).await.unwrap();

    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancel_in_free_window_refunds_everything() {
    let (gateway, clock, service) = setup(ScriptedGateway::default());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    service.confirm(booking.id).await.unwrap();

    clock.set(days_before_arrival(4));
    let cancelled = service
        .cancel(booking.id, CancelledBy::Customer)
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    let refund = cancelled.refund.unwrap();
    assert_eq!(refund.percentage, 100);
    assert_eq!(refund.amount_cents, 48000);
    assert!(refund.refund_ref.is_some());
    assert_eq!(gateway.refunds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_inside_no_refund_window_skips_the_gateway() {
    let (gateway, clock, service) = setup(ScriptedGateway::default());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    service.confirm(booking.id).await.unwrap();

    clock.set(days_before_arrival(0) - Duration::hours(10));
    let cancelled = service
        .cancel(booking.id, CancelledBy::Customer)
        .await
        .unwrap();

    let refund = cancelled.refund.unwrap();
    assert_eq!(refund.percentage, 0);
    assert_eq!(refund.amount_cents, 0);
    assert!(refund.refund_ref.is_none());
    assert_eq!(gateway.refunds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelling_twice_conflicts_and_keeps_the_record() {
    let (gateway, clock, service) = setup(ScriptedGateway::default());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    service.confirm(booking.id).await.unwrap();

    clock.set(days_before_arrival(5));
    service
        .cancel(booking.id, CancelledBy::Customer)
        .await
        .unwrap();

    let err = service
        .cancel(booking.id, CancelledBy::Customer)
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::Transition(_)));
    // Refund issued exactly once across both attempts
    assert_eq!(gateway.refunds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_cancels_refund_exactly_once() {
    let (gateway, clock, service) = setup(ScriptedGateway::slow());
    let service = Arc::new(service);

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    let id = booking.id;
    service.confirm(id).await.unwrap();

    clock.set(days_before_arrival(5));
    let mut tasks = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.cancel(id, CancelledBy::Customer).await
        }));
    }

    let mut cancelled = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(b) => {
                assert_eq!(b.status, BookingStatus::Cancelled);
                cancelled += 1;
            }
            Err(ReservationError::Transition(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(cancelled, 1);
    assert_eq!(conflicts, 1);
    // The loser waited on the transition lock and failed the status
    // guard without ever reaching the processor
    assert_eq!(gateway.refunds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_confirms_capture_exactly_once() {
    let (gateway, _, service) = setup(ScriptedGateway::slow());
    let service = Arc::new(service);

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    let id = booking.id;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move { service.confirm(id).await }));
    }

    let mut confirmed = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(b) => {
                assert_eq!(b.status, BookingStatus::Confirmed);
                confirmed += 1;
            }
            Err(ReservationError::Transition(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(gateway.captures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_status_write_retries_without_reissuing_refund() {
    let store = Arc::new(FailOnceStore {
        inner: MemoryStore::new(),
        fail_next_update: AtomicBool::new(false),
    });
    let gateway = Arc::new(ScriptedGateway::default());
    let clock = Arc::new(ManualClock::new(days_before_arrival(10)));
    let service = service_with(store.clone(), gateway.clone(), clock.clone());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    service.confirm(booking.id).await.unwrap();

    clock.set(days_before_arrival(5));
    store.fail_next_update.store(true, Ordering::SeqCst);

    let cancelled = service
        .cancel(booking.id, CancelledBy::Admin)
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(gateway.refunds.load(Ordering::SeqCst), 1);

    let stored = store.get_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn reject_and_complete_paths() {
    let (_, _, service) = setup(ScriptedGateway::default());

    let booking = service.intake(request(Some("pm_1"))).await.unwrap();
    let rejected = service
        .reject(booking.id, Some("fully booked week".into()))
        .await
        .unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("fully booked week"));

    let other = service.intake(request(Some("pm_1"))).await.unwrap();
    service.confirm(other.id).await.unwrap();
    let completed = service.complete(other.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);

    // Completing a rejected booking is a conflict
    assert!(matches!(
        service.complete(booking.id).await.unwrap_err(),
        ReservationError::Transition(_)
    ));
}

#[tokio::test]
async fn intake_consumes_checkout_hold() {
    let store: Arc<dyn ReservationStore> = Arc::new(MemoryStore::new());
    let gateway = Arc::new(ScriptedGateway::default());
    let clock = Arc::new(ManualClock::new(days_before_arrival(10)));
    let coordinator = Arc::new(AvailabilityCoordinator::new(
        store.clone(),
        clock.clone(),
        Duration::minutes(15),
        MAX_CAPACITY,
    ));
    let service = BookingService::new(
        coordinator.clone(),
        store.clone(),
        gateway,
        Arc::new(SilentNotifier),
        clock.clone(),
        CancellationPolicy::default(),
        "EUR".into(),
    );

    // Hold the entire pool, then convert it into a booking for the pool
    let hold = coordinator
        .admit_hold(range("2024-06-10", "2024-06-14"), MAX_CAPACITY, None)
        .await
        .unwrap();

    let mut req = request(Some("pm_1"));
    req.quantity = MAX_CAPACITY;
    req.hold_id = Some(hold.id);

    let booking = service.intake(req).await.unwrap();
    assert_eq!(booking.quantity, MAX_CAPACITY);

    let holds = store
        .holds_overlapping(&range("2024-06-10", "2024-06-14"), clock.now())
        .await
        .unwrap();
    assert!(holds.is_empty());
}
