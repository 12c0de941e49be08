use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-bounded exclusive claim by one customer on one ticket.
///
/// A Hold exists exactly while the owning ticket's status is `Held`;
/// the pair is one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub ticket_id: Uuid,
    pub customer_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// Whether the hold has lapsed. Readers must treat a lapsed hold as
    /// released even if the sweeper has not reclaimed it yet.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
