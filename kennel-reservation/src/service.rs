use kennel_capacity::{AvailabilityCoordinator, CapacityError};
use kennel_core::{
    Clock, Notifier, PaymentError, PaymentGateway, ReservationStore, StoreError, TemplateKind,
};
use kennel_domain::{
    lifecycle, policy, Booking, BookingStatus, CancellationPolicy, CancelledBy, DateRange,
    RangeError, RefundRecord, TransitionError,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("No capacity for the requested dates: {spots_available} spots available")]
    CapacityExceeded { spots_available: u32 },

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Temporary infrastructure failure: {0}")]
    Transient(String),
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded { spots_available } => {
                ReservationError::CapacityExceeded { spots_available }
            }
            StoreError::NotFound(what) => ReservationError::Transient(format!("missing: {what}")),
            StoreError::Transient(msg) => ReservationError::Transient(msg),
        }
    }
}

impl From<CapacityError> for ReservationError {
    fn from(err: CapacityError) -> Self {
        match err {
            CapacityError::CapacityExceeded { spots_available } => {
                ReservationError::CapacityExceeded { spots_available }
            }
            CapacityError::InvalidRange(e) => ReservationError::InvalidRange(e),
            CapacityError::InvalidQuantity => {
                ReservationError::Validation("quantity must be at least 1".into())
            }
            CapacityError::InvalidMonth(m) => {
                ReservationError::Validation(format!("invalid month: {m}"))
            }
            CapacityError::Store(e) => e.into(),
        }
    }
}

/// Intake request for a new stay.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub email: String,
    pub pet_name: String,
    pub pet_type: String,
    pub quantity: u32,
    pub range: DateRange,
    pub total_price_cents: i64,
    pub customer_ref: Option<String>,
    pub method_ref: Option<String>,
    /// Checkout hold to consume atomically with the admission.
    pub hold_id: Option<Uuid>,
}

/// Drives the booking lifecycle: intake, confirm (capture), reject,
/// cancel (refund) and complete. All admissions go through the
/// availability coordinator; all status writes go through the store.
pub struct BookingService {
    coordinator: Arc<AvailabilityCoordinator>,
    store: Arc<dyn ReservationStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: CancellationPolicy,
    currency: String,
    gateway_timeout: Duration,
}

impl BookingService {
    pub fn new(
        coordinator: Arc<AvailabilityCoordinator>,
        store: Arc<dyn ReservationStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: CancellationPolicy,
        currency: String,
    ) -> Self {
        Self {
            coordinator,
            store,
            gateway,
            notifier,
            clock,
            policy,
            currency,
            gateway_timeout: Duration::from_secs(10),
        }
    }

    pub fn policy(&self) -> &CancellationPolicy {
        &self.policy
    }

    /// Admits a new pending booking, consuming the checkout hold if one
    /// was taken.
    pub async fn intake(&self, request: NewBooking) -> Result<Booking, ReservationError> {
        if request.email.trim().is_empty() {
            return Err(ReservationError::Validation("email is required".into()));
        }
        if request.quantity < 1 {
            return Err(ReservationError::Validation(
                "quantity must be at least 1".into(),
            ));
        }
        if request.total_price_cents < 0 {
            return Err(ReservationError::Validation(
                "total price cannot be negative".into(),
            ));
        }

        let mut booking = Booking::new(
            request.email.trim().to_lowercase(),
            request.pet_name,
            request.pet_type,
            request.quantity,
            request.range,
            request.total_price_cents,
            self.currency.clone(),
            self.clock.now(),
        );
        booking.payment.customer_ref = request.customer_ref;
        booking.payment.method_ref = request.method_ref;

        let admitted = self
            .coordinator
            .admit_booking(booking, request.hold_id)
            .await?;
        info!(booking_id = %admitted.id, quantity = admitted.quantity, "booking admitted");
        Ok(admitted)
    }

    /// Pending -> Confirmed: captures the stored payment method, then
    /// records the transition. A decline leaves the booking pending with
    /// the failure reason on record.
    pub async fn confirm(&self, booking_id: Uuid) -> Result<Booking, ReservationError> {
        let _transition = self.store.lock_booking(booking_id).await;
        let mut booking = self.load(booking_id).await?;
        ensure_transition(&booking, BookingStatus::Confirmed, "confirm")?;

        let method_ref = booking
            .payment
            .method_ref
            .clone()
            .ok_or_else(|| ReservationError::Validation("no payment method on file".into()))?;
        let customer_ref = booking.payment.customer_ref.clone().unwrap_or_default();

        let payment_ref = match self
            .capture_with_retry(booking.total_price_cents, &customer_ref, &method_ref)
            .await
        {
            Ok(reference) => reference,
            Err(ReservationError::PaymentDeclined(reason)) => {
                booking.payment.failure_reason = Some(reason.clone());
                self.persist_with_retry(&booking).await?;
                return Err(ReservationError::PaymentDeclined(reason));
            }
            Err(other) => return Err(other),
        };

        lifecycle::confirm(&mut booking, payment_ref, self.clock.now())?;
        self.persist_with_retry(&booking).await?;
        info!(booking_id = %booking.id, "booking confirmed");

        self.notify(
            TemplateKind::BookingConfirmed,
            &booking,
            serde_json::json!({ "booking_id": booking.id }),
        )
        .await;
        Ok(booking)
    }

    /// Pending -> Rejected. No payment was taken for a pending booking,
    /// so there is nothing to refund.
    pub async fn reject(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, ReservationError> {
        let _transition = self.store.lock_booking(booking_id).await;
        let mut booking = self.load(booking_id).await?;
        lifecycle::reject(&mut booking, reason, self.clock.now())?;
        self.persist_with_retry(&booking).await?;
        info!(booking_id = %booking.id, "booking rejected");

        self.notify(
            TemplateKind::BookingRejected,
            &booking,
            serde_json::json!({
                "booking_id": booking.id,
                "reason": booking.rejection_reason,
            }),
        )
        .await;
        Ok(booking)
    }

    /// Pending/Confirmed -> Cancelled. Refund is issued before the status
    /// write; a transient write failure retries the write, never the
    /// refund.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        by: CancelledBy,
    ) -> Result<Booking, ReservationError> {
        // Held across guard, refund and write: a racing cancel waits here
        // and then fails the status guard instead of refunding again.
        let _transition = self.store.lock_booking(booking_id).await;
        let mut booking = self.load(booking_id).await?;
        ensure_transition(&booking, BookingStatus::Cancelled, "cancel")?;

        let now = self.clock.now();
        let quote = policy::refund_quote(booking.range.start, now, &self.policy);
        let amount_cents = policy::refund_amount_cents(booking.total_price_cents, quote.percentage);

        let refund_ref = match (&booking.payment.intent_ref, quote.percentage) {
            (Some(intent_ref), pct) if pct > 0 => {
                Some(self.refund_with_retry(intent_ref, amount_cents).await?)
            }
            _ => None,
        };

        let record = RefundRecord {
            percentage: quote.percentage,
            reason: quote.reason,
            amount_cents: if refund_ref.is_some() { amount_cents } else { 0 },
            refund_ref,
        };
        lifecycle::cancel(&mut booking, record, by, now)?;
        self.persist_with_retry(&booking).await?;
        info!(
            booking_id = %booking.id,
            refund_percentage = quote.percentage,
            "booking cancelled"
        );

        self.notify(
            TemplateKind::BookingCancelled,
            &booking,
            serde_json::json!({
                "booking_id": booking.id,
                "refund": booking.refund,
            }),
        )
        .await;
        Ok(booking)
    }

    /// Confirmed -> Completed once the stay has ended.
    pub async fn complete(&self, booking_id: Uuid) -> Result<Booking, ReservationError> {
        let _transition = self.store.lock_booking(booking_id).await;
        let mut booking = self.load(booking_id).await?;
        lifecycle::complete(&mut booking, self.clock.now())?;
        self.persist_with_retry(&booking).await?;
        info!(booking_id = %booking.id, "booking completed");
        Ok(booking)
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, ReservationError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or(ReservationError::NotFound(booking_id))
    }

    /// One bounded retry for transient capture failures; declines are
    /// final.
    async fn capture_with_retry(
        &self,
        amount_cents: i64,
        customer_ref: &str,
        method_ref: &str,
    ) -> Result<String, ReservationError> {
        for attempt in 0..2 {
            let capture = self.gateway.capture(amount_cents, customer_ref, method_ref);
            match timeout(self.gateway_timeout, capture).await {
                Ok(Ok(reference)) => return Ok(reference),
                Ok(Err(PaymentError::Declined(reason))) => {
                    return Err(ReservationError::PaymentDeclined(reason));
                }
                Ok(Err(PaymentError::Transient(msg))) if attempt == 0 => {
                    warn!(%msg, "payment capture failed, retrying once");
                }
                Ok(Err(PaymentError::Transient(msg))) => {
                    return Err(ReservationError::Transient(msg));
                }
                Err(_) if attempt == 0 => {
                    warn!("payment capture timed out, retrying once");
                }
                Err(_) => {
                    return Err(ReservationError::Transient("payment capture timed out".into()));
                }
            }
        }
        unreachable!("capture retry loop always returns")
    }

    async fn refund_with_retry(
        &self,
        payment_ref: &str,
        amount_cents: i64,
    ) -> Result<String, ReservationError> {
        for attempt in 0..2 {
            let refund = self.gateway.refund(payment_ref, amount_cents);
            match timeout(self.gateway_timeout, refund).await {
                Ok(Ok(reference)) => return Ok(reference),
                Ok(Err(PaymentError::Declined(reason))) => {
                    return Err(ReservationError::PaymentDeclined(reason));
                }
                Ok(Err(PaymentError::Transient(msg))) if attempt == 0 => {
                    warn!(%msg, "refund failed, retrying once");
                }
                Ok(Err(PaymentError::Transient(msg))) => {
                    return Err(ReservationError::Transient(msg));
                }
                Err(_) if attempt == 0 => {
                    warn!("refund timed out, retrying once");
                }
                Err(_) => return Err(ReservationError::Transient("refund timed out".into())),
            }
        }
        unreachable!("refund retry loop always returns")
    }

    /// Status writes are idempotent, so a transient store failure gets one
    /// retry. Used after refund issuance to avoid ever re-issuing money.
    async fn persist_with_retry(&self, booking: &Booking) -> Result<(), ReservationError> {
        match self.store.update_booking(booking).await {
            Ok(()) => Ok(()),
            Err(StoreError::Transient(msg)) => {
                warn!(%msg, booking_id = %booking.id, "status write failed, retrying once");
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.store.update_booking(booking).await.map_err(Into::into)
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn notify(&self, template: TemplateKind, booking: &Booking, data: serde_json::Value) {
        if let Err(err) = self.notifier.send(template, &booking.email, data).await {
            warn!(%err, booking_id = %booking.id, "notification failed");
        }
    }
}

fn ensure_transition(
    booking: &Booking,
    to: BookingStatus,
    attempted: &'static str,
) -> Result<(), TransitionError> {
    if lifecycle::can_transition(booking.status, to) {
        Ok(())
    } else {
        Err(TransitionError {
            current: booking.status,
            attempted,
        })
    }
}
