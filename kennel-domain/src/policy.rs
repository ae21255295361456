use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Time-based cancellation terms, fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub free_cancellation_days: i64,
    pub partial_refund_percentage: u32,
    pub no_refund_hours: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            free_cancellation_days: 3,
            partial_refund_percentage: 50,
            no_refund_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    FreeCancellation,
    PartialRefund,
    NoRefund,
}

impl std::fmt::Display for RefundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefundReason::FreeCancellation => "Free cancellation",
            RefundReason::PartialRefund => "Partial refund",
            RefundReason::NoRefund => "No refund",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundQuote {
    pub percentage: u32,
    pub reason: RefundReason,
}

/// Refund percentage from time-to-arrival at cancellation time. Pure
/// function of the clock and the policy; arrival is the start day at
/// midnight UTC.
pub fn refund_quote(
    start: NaiveDate,
    now: DateTime<Utc>,
    policy: &CancellationPolicy,
) -> RefundQuote {
    let arrival = start.and_time(NaiveTime::MIN).and_utc();
    let hours_until_start = (arrival - now).num_seconds() as f64 / 3600.0;
    let days_until_start = hours_until_start / 24.0;

    if days_until_start >= policy.free_cancellation_days as f64 {
        RefundQuote {
            percentage: 100,
            reason: RefundReason::FreeCancellation,
        }
    } else if hours_until_start >= policy.no_refund_hours as f64 {
        RefundQuote {
            percentage: policy.partial_refund_percentage,
            reason: RefundReason::PartialRefund,
        }
    } else {
        RefundQuote {
            percentage: 0,
            reason: RefundReason::NoRefund,
        }
    }
}

/// Refund amount in minor currency units, half-up rounding.
pub fn refund_amount_cents(total_price_cents: i64, percentage: u32) -> i64 {
    (total_price_cents * percentage as i64 + 50) / 100
}
