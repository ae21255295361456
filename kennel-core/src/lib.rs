pub mod clock;
pub mod notify;
pub mod payment;
pub mod repository;
pub mod tokens;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{Notifier, NotifyError, TemplateKind, TracingNotifier};
pub use payment::{MockPaymentGateway, PaymentError, PaymentGateway};
pub use repository::{ReservationStore, StoreError};
pub use tokens::{CancellationClaims, CancellationTokens, TokenError};
