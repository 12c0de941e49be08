use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast to live seat-map viewers when a hold is granted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TicketHeldEvent {
    pub showtime_id: Uuid,
    pub ticket_ids: Vec<Uuid>,
    pub customer_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Domain events handed to the external event sink (fire-and-forget,
/// consumers assume at-least-once delivery).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseEvent {
    TicketPurchased {
        customer_id: String,
        ticket_ids: Vec<Uuid>,
    },
    TicketPurchaseCanceled {
        customer_id: String,
        ticket_ids: Vec<Uuid>,
    },
}
