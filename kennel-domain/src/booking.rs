use crate::range::DateRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Pending and confirmed stays block capacity; terminal states free it.
    pub fn counts_toward_capacity(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Who initiated a cancellation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelledBy {
    Customer,
    Admin,
}

/// Payment references stored alongside the booking; the processor itself
/// is an external collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub customer_ref: Option<String>,
    pub method_ref: Option<String>,
    pub intent_ref: Option<String>,
    pub failure_reason: Option<String>,
}

/// Outcome of the refund policy, recorded once at cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub percentage: u32,
    pub reason: crate::policy::RefundReason,
    pub amount_cents: i64,
    pub refund_ref: Option<String>,
}

/// A stay reservation for the shared capacity pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub email: String,
    pub pet_name: String,
    pub pet_type: String,
    pub quantity: u32,
    pub range: DateRange,
    pub status: BookingStatus,
    pub total_price_cents: i64,
    pub currency: String,
    pub payment: PaymentDetails,
    pub refund: Option<RefundRecord>,
    pub rejection_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        email: String,
        pet_name: String,
        pet_type: String,
        quantity: u32,
        range: DateRange,
        total_price_cents: i64,
        currency: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            pet_name,
            pet_type,
            quantity,
            range,
            status: BookingStatus::Pending,
            total_price_cents,
            currency,
            payment: PaymentDetails::default(),
            refund: None,
            rejection_reason: None,
            cancelled_by: None,
            created_at,
            confirmed_at: None,
            rejected_at: None,
            cancelled_at: None,
            completed_at: None,
        }
    }
}
