use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purchase status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

/// The record of one attempt to buy a set of held tickets.
///
/// Immutable once `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub customer_id: String,
    pub ticket_ids: Vec<Uuid>,
    pub total_cents: i64,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    pub fn new(
        customer_id: String,
        ticket_ids: Vec<Uuid>,
        total_cents: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            ticket_ids,
            total_cents,
            status: PurchaseStatus::Pending,
            created_at: now,
        }
    }

    pub fn complete(&mut self) {
        self.status = PurchaseStatus::Completed;
    }

    pub fn fail(&mut self) {
        self.status = PurchaseStatus::Failed;
    }
}
