use chrono::{DateTime, Duration, Utc};
use marquee_catalog::Showtime;
use uuid::Uuid;

/// Static purchase policy, injected from configuration.
#[derive(Debug, Clone)]
pub struct PurchasePolicy {
    pub max_tickets_per_purchase: usize,
    /// Purchases close this long before the showtime starts.
    pub purchase_deadline: Duration,
}

/// Business-rule failures. Each carries the data the caller needs to act;
/// none is retryable without changing the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("purchase of {requested} tickets exceeds the maximum of {max}")]
    MaxTicketsExceeded { requested: usize, max: usize },

    #[error("purchases for the showtime starting at {starts_at} closed at {purchase_by}")]
    DeadlineExceeded {
        starts_at: DateTime<Utc>,
        purchase_by: DateTime<Utc>,
    },

    #[error("tickets not held by this customer: {ticket_ids:?}")]
    TicketNotHeld { ticket_ids: Vec<Uuid> },
}

/// Stateless rule checks run before finalizing a sale. Rules are evaluated
/// in a fixed order; the first failing rule is the reported violation.
/// Nothing here mutates state.
pub fn validate(
    policy: &PurchasePolicy,
    ticket_ids: &[Uuid],
    showtime: &Showtime,
    held_ticket_ids: &[Uuid],
    now: DateTime<Utc>,
) -> Result<(), Violation> {
    if exceeds_max_tickets(policy, ticket_ids.len()) {
        return Err(Violation::MaxTicketsExceeded {
            requested: ticket_ids.len(),
            max: policy.max_tickets_per_purchase,
        });
    }

    if misses_deadline(policy, showtime, now) {
        return Err(Violation::DeadlineExceeded {
            starts_at: showtime.starts_at,
            purchase_by: showtime.starts_at - policy.purchase_deadline,
        });
    }

    let missing = missing_held_ids(ticket_ids, held_ticket_ids);
    if !missing.is_empty() {
        return Err(Violation::TicketNotHeld {
            ticket_ids: missing,
        });
    }

    Ok(())
}

/// Rule 1: the request names more tickets than policy allows.
pub fn exceeds_max_tickets(policy: &PurchasePolicy, requested: usize) -> bool {
    requested > policy.max_tickets_per_purchase
}

/// Rule 2: the showtime starts too soon for a purchase to be accepted.
pub fn misses_deadline(policy: &PurchasePolicy, showtime: &Showtime, now: DateTime<Utc>) -> bool {
    showtime.starts_at < now + policy.purchase_deadline
}

/// Rule 3: every ticket being purchased must currently be held by this
/// same customer. Returns the ids that are not.
pub fn missing_held_ids(ticket_ids: &[Uuid], held_ticket_ids: &[Uuid]) -> Vec<Uuid> {
    ticket_ids
        .iter()
        .filter(|id| !held_ticket_ids.contains(id))
        .copied()
        .collect()
}
