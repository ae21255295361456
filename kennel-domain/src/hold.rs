use crate::range::DateRange;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-boxed capacity reservation taken during checkout. Not linked to a
/// booking until checkout completes; self-expires if it never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub id: Uuid,
    pub range: DateRange,
    pub quantity: u32,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn new(
        range: DateRange,
        quantity: u32,
        session_id: Option<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            range,
            quantity,
            session_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// A hold stops counting the instant `now` reaches `expires_at`, even
    /// before the sweeper deletes it.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
