use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::{
    Clock, Hold, StoreError, Ticket, TicketState, TicketStateStore, TicketStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

/// Internal per-ticket record. `status` is the raw stored status; lapsed
/// holds are normalized at read time, not here.
#[derive(Debug, Clone)]
struct TicketRecord {
    showtime_id: Uuid,
    seat: String,
    status: TicketStatus,
    holder: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TicketRecord {
    /// Status as observers must see it: a held ticket whose expiry has
    /// lapsed counts as available even before the sweeper runs.
    fn effective_status(&self, now: DateTime<Utc>) -> TicketStatus {
        match (self.status, self.expires_at) {
            (TicketStatus::Held, Some(expires_at)) if now >= expires_at => TicketStatus::Available,
            (status, _) => status,
        }
    }

    fn held_by(&self, customer_id: &str) -> bool {
        self.status == TicketStatus::Held && self.holder.as_deref() == Some(customer_id)
    }
}

/// In-memory [`TicketStateStore`].
///
/// A single async mutex over the ticket map gives every operation the
/// single-writer transaction the contract requires: multi-ticket checks and
/// updates happen under one guard, so exclusivity covers the whole set as
/// one atomic step and per-ticket transitions observe a total order.
/// The lock is acquired with a bounded timeout; on timeout the caller gets
/// a retryable `Unavailable` error instead of blocking indefinitely.
pub struct InMemoryTicketStore {
    tickets: Mutex<HashMap<Uuid, TicketRecord>>,
    clock: Arc<dyn Clock>,
    lock_timeout: Duration,
}

impl InMemoryTicketStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_lock_timeout(clock, Duration::from_millis(500))
    }

    pub fn with_lock_timeout(clock: Arc<dyn Clock>, lock_timeout: Duration) -> Self {
        Self {
            tickets: Mutex::new(HashMap::new()),
            clock,
            lock_timeout,
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, TicketRecord>>, StoreError> {
        tokio::time::timeout(self.lock_timeout, self.tickets.lock())
            .await
            .map_err(|_| StoreError::Unavailable("ticket map lock timed out".to_string()))
    }
}

#[async_trait]
impl TicketStateStore for InMemoryTicketStore {
    async fn insert_tickets(&self, tickets: Vec<Ticket>) -> Result<(), StoreError> {
        let mut map = self.lock().await?;

        for ticket in &tickets {
            if map.contains_key(&ticket.id) {
                return Err(StoreError::DuplicateTicket(ticket.id));
            }
        }

        let count = tickets.len();
        for ticket in tickets {
            map.insert(
                ticket.id,
                TicketRecord {
                    showtime_id: ticket.showtime_id,
                    seat: ticket.seat,
                    status: ticket.status,
                    holder: None,
                    expires_at: None,
                },
            );
        }

        info!("Registered {} tickets", count);
        Ok(())
    }

    async fn compare_and_set_hold(
        &self,
        ticket_ids: &[Uuid],
        customer_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut map = self.lock().await?;
        let now = self.clock.now();

        // Check the whole set before touching anything.
        let mut conflicting = Vec::new();
        for id in ticket_ids {
            let record = map.get(id).ok_or(StoreError::UnknownTicket(*id))?;
            if record.effective_status(now) != TicketStatus::Available {
                conflicting.push(*id);
            }
        }
        if !conflicting.is_empty() {
            return Err(StoreError::Conflict { conflicting });
        }

        for id in ticket_ids {
            let record = map.get_mut(id).ok_or(StoreError::UnknownTicket(*id))?;
            record.status = TicketStatus::Held;
            record.holder = Some(customer_id.to_string());
            record.expires_at = Some(expires_at);
        }

        Ok(())
    }

    async fn release(&self, ticket_ids: &[Uuid], customer_id: &str) -> Result<usize, StoreError> {
        let mut map = self.lock().await?;

        let mut released = 0;
        for id in ticket_ids {
            // Idempotent: ids already released, held by someone else, or
            // sold are skipped. Sold never transitions away.
            if let Some(record) = map.get_mut(id) {
                if record.held_by(customer_id) {
                    record.status = TicketStatus::Available;
                    record.holder = None;
                    record.expires_at = None;
                    released += 1;
                }
            }
        }

        Ok(released)
    }

    async fn compare_and_set_sold(
        &self,
        ticket_ids: &[Uuid],
        customer_id: &str,
    ) -> Result<(), StoreError> {
        let mut map = self.lock().await?;
        let now = self.clock.now();

        // The caller must still hold every id with an unexpired hold; a
        // hold that lapsed microseconds ago no longer qualifies.
        let mut conflicting = Vec::new();
        for id in ticket_ids {
            let record = map.get(id).ok_or(StoreError::UnknownTicket(*id))?;
            let still_held =
                record.held_by(customer_id) && record.effective_status(now) == TicketStatus::Held;
            if !still_held {
                conflicting.push(*id);
            }
        }
        if !conflicting.is_empty() {
            return Err(StoreError::Conflict { conflicting });
        }

        for id in ticket_ids {
            let record = map.get_mut(id).ok_or(StoreError::UnknownTicket(*id))?;
            record.status = TicketStatus::Sold;
            record.holder = Some(customer_id.to_string());
            record.expires_at = None;
        }

        Ok(())
    }

    async fn compare_and_set_available(
        &self,
        ticket_id: Uuid,
        expected_holder: &str,
        expected_expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut map = self.lock().await?;

        let record = map
            .get_mut(&ticket_id)
            .ok_or(StoreError::UnknownTicket(ticket_id))?;

        // Only reclaim the exact hold that was scanned: a ticket finalized
        // into Sold stays Sold, and a fresh re-hold by the same customer
        // (different expiry) is left alone.
        if !record.held_by(expected_holder) || record.expires_at != Some(expected_expiry) {
            return Ok(false);
        }

        record.status = TicketStatus::Available;
        record.holder = None;
        record.expires_at = None;
        Ok(true)
    }

    async fn get(&self, ticket_id: Uuid) -> Result<TicketState, StoreError> {
        let map = self.lock().await?;
        let now = self.clock.now();

        let record = map
            .get(&ticket_id)
            .ok_or(StoreError::UnknownTicket(ticket_id))?;

        let status = record.effective_status(now);
        let lapsed = status != record.status;
        Ok(TicketState {
            ticket_id,
            showtime_id: record.showtime_id,
            seat: record.seat.clone(),
            status,
            holder: if lapsed { None } else { record.holder.clone() },
            expires_at: if lapsed { None } else { record.expires_at },
        })
    }

    async fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError> {
        let map = self.lock().await?;

        let expired = map
            .iter()
            .filter_map(|(id, record)| match (&record.holder, record.expires_at) {
                (Some(holder), Some(expires_at))
                    if record.status == TicketStatus::Held && now >= expires_at =>
                {
                    Some(Hold {
                        ticket_id: *id,
                        customer_id: holder.clone(),
                        expires_at,
                    })
                }
                _ => None,
            })
            .collect();

        Ok(expired)
    }

    async fn held_ticket_ids(
        &self,
        showtime_id: Uuid,
        customer_id: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let map = self.lock().await?;
        let now = self.clock.now();

        let mut ids: Vec<Uuid> = map
            .iter()
            .filter(|(_, record)| {
                record.showtime_id == showtime_id
                    && record.held_by(customer_id)
                    && record.effective_status(now) == TicketStatus::Held
            })
            .map(|(id, _)| *id)
            .collect();
        ids.sort();

        Ok(ids)
    }

    async fn availability(&self, showtime_id: Uuid) -> Result<usize, StoreError> {
        let map = self.lock().await?;
        let now = self.clock.now();

        let count = map
            .values()
            .filter(|record| {
                record.showtime_id == showtime_id
                    && record.effective_status(now) == TicketStatus::Available
            })
            .count();

        Ok(count)
    }
}
