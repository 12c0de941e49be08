use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Available,
    Held,
    Sold,
}

/// A single sellable seat for one showtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub showtime_id: Uuid,
    pub seat: String,
    pub status: TicketStatus,
}

impl Ticket {
    pub fn new(showtime_id: Uuid, seat: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            showtime_id,
            seat,
            status: TicketStatus::Available,
        }
    }
}
