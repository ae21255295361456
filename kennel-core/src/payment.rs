use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The processor rejected the charge. Never retried.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// Network/processor hiccup. One bounded retry is acceptable.
    #[error("Payment provider unavailable: {0}")]
    Transient(String),
}

/// External payment processor. Amounts are integer minor currency units.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge a stored payment method, returning the processor's payment
    /// reference.
    async fn capture(
        &self,
        amount_cents: i64,
        customer_ref: &str,
        method_ref: &str,
    ) -> Result<String, PaymentError>;

    /// Refund part of a previous capture, returning the refund reference.
    async fn refund(&self, payment_ref: &str, amount_cents: i64) -> Result<String, PaymentError>;
}

/// In-memory gateway for local runs and tests.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn capture(
        &self,
        _amount_cents: i64,
        customer_ref: &str,
        method_ref: &str,
    ) -> Result<String, PaymentError> {
        // Trigger for exercising the decline path end to end
        if method_ref == "pm_declined" {
            return Err(PaymentError::Declined("card declined".to_string()));
        }
        Ok(format!("mock_pi_{}", customer_ref))
    }

    async fn refund(&self, payment_ref: &str, _amount_cents: i64) -> Result<String, PaymentError> {
        Ok(format!("mock_re_{}", payment_ref))
    }
}
