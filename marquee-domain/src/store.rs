use crate::hold::Hold;
use crate::ticket::{Ticket, TicketStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Snapshot of one ticket's current state.
///
/// `status` is already normalized for read-time staleness: a held ticket
/// whose expiry has lapsed reports `Available` even before the sweeper
/// reclaims it.
#[derive(Debug, Clone)]
pub struct TicketState {
    pub ticket_id: Uuid,
    pub showtime_id: Uuid,
    pub seat: String,
    pub status: TicketStatus,
    pub holder: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Single source of truth for ticket state transitions.
///
/// All multi-ticket operations are all-or-nothing: either every id in the
/// set transitions, or none does and the blocking subset is reported.
/// Implementations must serialize transitions per ticket id so that two
/// concurrent attempts on the same id resolve deterministically, and must
/// acquire multi-ticket exclusivity as a single atomic step, never
/// ticket-by-ticket.
#[async_trait]
pub trait TicketStateStore: Send + Sync {
    /// Registers tickets for sale. Ids already present are rejected.
    async fn insert_tickets(&self, tickets: Vec<Ticket>) -> Result<(), StoreError>;

    /// Places a hold on every ticket in the set, or on none of them.
    ///
    /// Fails with [`StoreError::Conflict`] listing the ids that are held
    /// (unexpired) or sold; no state changes on failure.
    async fn compare_and_set_hold(
        &self,
        ticket_ids: &[Uuid],
        customer_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Releases this customer's holds on the given ids. Idempotent per id:
    /// an id that is not held by this customer (already released, held by
    /// someone else, or sold) is skipped, never an error. Returns the
    /// number of tickets that actually transitioned back to available.
    async fn release(&self, ticket_ids: &[Uuid], customer_id: &str) -> Result<usize, StoreError>;

    /// Converts every ticket in the set to sold, conditioned on the caller
    /// still holding each one with an unexpired hold.
    ///
    /// Fails with [`StoreError::Conflict`] listing the ids not currently
    /// held by this customer; no state changes on failure. Sold is terminal.
    async fn compare_and_set_sold(
        &self,
        ticket_ids: &[Uuid],
        customer_id: &str,
    ) -> Result<(), StoreError>;

    /// Conditional release used by the expiration sweeper: succeeds only if
    /// the ticket is still held by `expected_holder` with this exact
    /// `expected_expiry`, so a stale scan can neither undo a sale nor
    /// release a hold the same customer re-acquired in the meantime.
    /// Returns whether the ticket transitioned.
    async fn compare_and_set_available(
        &self,
        ticket_id: Uuid,
        expected_holder: &str,
        expected_expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Current state of one ticket.
    async fn get(&self, ticket_id: Uuid) -> Result<TicketState, StoreError>;

    /// Holds whose expiry has lapsed as of `now`, for the sweeper.
    async fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError>;

    /// Ids this customer currently holds (unexpired) for one showtime.
    async fn held_ticket_ids(
        &self,
        showtime_id: Uuid,
        customer_id: &str,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Count of effectively available tickets for one showtime.
    async fn availability(&self, showtime_id: Uuid) -> Result<usize, StoreError>;
}

/// Structural store failures. Business-rule violations are never raised
/// here; those belong to the purchase validator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tickets unavailable: {conflicting:?}")]
    Conflict { conflicting: Vec<Uuid> },

    #[error("unknown ticket: {0}")]
    UnknownTicket(Uuid),

    #[error("ticket already registered: {0}")]
    DuplicateTicket(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
