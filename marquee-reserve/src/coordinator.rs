use chrono::{DateTime, Duration, Utc};
use marquee_domain::{Clock, StoreError, TicketHeldEvent, TicketStateStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

/// A granted hold: the claimed ids and the expiry the store recorded.
#[derive(Debug, Clone)]
pub struct HoldGrant {
    pub ticket_ids: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Runs the hold/release protocol against the ticket state store.
///
/// The coordinator delegates the all-or-nothing claim to the store and
/// layers preconditions, expiry arithmetic and event publication on top.
/// There is no built-in retry and no implicit renewal: a caller that wants
/// to keep a hold alive re-holds before expiry.
pub struct ReservationCoordinator {
    store: Arc<dyn TicketStateStore>,
    clock: Arc<dyn Clock>,
    held_tx: broadcast::Sender<TicketHeldEvent>,
}

impl ReservationCoordinator {
    pub fn new(
        store: Arc<dyn TicketStateStore>,
        clock: Arc<dyn Clock>,
        held_tx: broadcast::Sender<TicketHeldEvent>,
    ) -> Self {
        Self {
            store,
            clock,
            held_tx,
        }
    }

    /// Places an all-or-nothing hold on `ticket_ids` for `ttl`.
    ///
    /// On conflict the error lists exactly the ids that blocked the set;
    /// the caller decides whether to retry with a reduced set.
    pub async fn hold_tickets(
        &self,
        customer_id: &str,
        showtime_id: Uuid,
        ticket_ids: &[Uuid],
        ttl: Duration,
    ) -> Result<HoldGrant, ReserveError> {
        if ticket_ids.is_empty() {
            return Err(ReserveError::EmptyTicketSet);
        }
        if ttl <= Duration::zero() {
            return Err(ReserveError::InvalidTtl);
        }

        // Caller-supplied TTLs can be arbitrarily large; an expiry past the
        // representable range is a bad request, not a panic.
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(ReserveError::InvalidTtl)?;

        self.store
            .compare_and_set_hold(ticket_ids, customer_id, expires_at)
            .await
            .map_err(|err| match err {
                StoreError::Conflict { conflicting } => ReserveError::Conflict { conflicting },
                other => ReserveError::Store(other),
            })?;

        info!(
            "Held {} tickets for customer {} until {}",
            ticket_ids.len(),
            customer_id,
            expires_at
        );

        // Fire-and-forget; no live seat-map subscriber is fine.
        let _ = self.held_tx.send(TicketHeldEvent {
            showtime_id,
            ticket_ids: ticket_ids.to_vec(),
            customer_id: customer_id.to_string(),
            expires_at,
        });

        Ok(HoldGrant {
            ticket_ids: ticket_ids.to_vec(),
            expires_at,
        })
    }

    /// Releases this customer's holds. Idempotent: ids already released or
    /// sold are skipped. Returns how many tickets actually became available.
    pub async fn release_hold(
        &self,
        customer_id: &str,
        ticket_ids: &[Uuid],
    ) -> Result<usize, ReserveError> {
        let released = self.store.release(ticket_ids, customer_id).await?;
        if released > 0 {
            info!("Released {} holds for customer {}", released, customer_id);
        }
        Ok(released)
    }

    /// Ids this customer currently holds (unexpired) for one showtime.
    pub async fn find_held_ticket_ids(
        &self,
        showtime_id: Uuid,
        customer_id: &str,
    ) -> Result<Vec<Uuid>, ReserveError> {
        Ok(self
            .store
            .held_ticket_ids(showtime_id, customer_id)
            .await?)
    }

    pub fn subscribe_held_events(&self) -> broadcast::Receiver<TicketHeldEvent> {
        self.held_tx.subscribe()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReserveError {
    #[error("hold request must name at least one ticket")]
    EmptyTicketSet,

    #[error("hold ttl must be positive")]
    InvalidTtl,

    #[error("tickets unavailable: {conflicting:?}")]
    Conflict { conflicting: Vec<Uuid> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marquee_domain::{ManualClock, Ticket};
    use marquee_store::InMemoryTicketStore;

    fn coordinator() -> (ReservationCoordinator, Arc<InMemoryTicketStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(InMemoryTicketStore::new(clock.clone()));
        let (held_tx, _) = broadcast::channel(16);
        (
            ReservationCoordinator::new(store.clone(), clock.clone(), held_tx),
            store,
            clock,
        )
    }

    async fn seed(store: &InMemoryTicketStore, showtime_id: Uuid, seats: usize) -> Vec<Uuid> {
        let tickets: Vec<Ticket> = (0..seats)
            .map(|n| Ticket::new(showtime_id, format!("B{}", n + 1)))
            .collect();
        let ids = tickets.iter().map(|t| t.id).collect();
        store.insert_tickets(tickets).await.unwrap();
        ids
    }

    #[tokio::test]
    async fn test_preconditions_rejected() {
        let (coordinator, _store, _clock) = coordinator();
        let showtime_id = Uuid::new_v4();

        let err = coordinator
            .hold_tickets("buyer", showtime_id, &[], Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::EmptyTicketSet));

        let err = coordinator
            .hold_tickets("buyer", showtime_id, &[Uuid::new_v4()], Duration::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::InvalidTtl));
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_rejected_not_panic() {
        let (coordinator, store, _clock) = coordinator();
        let showtime_id = Uuid::new_v4();
        let ids = seed(&store, showtime_id, 1).await;

        // An expiry beyond the representable range must fail typed.
        let err = coordinator
            .hold_tickets(
                "buyer",
                showtime_id,
                &ids,
                Duration::milliseconds(i64::MAX),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::InvalidTtl));

        // The set stayed free.
        assert_eq!(
            coordinator
                .find_held_ticket_ids(showtime_id, "buyer")
                .await
                .unwrap(),
            Vec::<Uuid>::new()
        );
    }

    #[tokio::test]
    async fn test_conflict_reports_blocking_ids() {
        let (coordinator, store, _clock) = coordinator();
        let showtime_id = Uuid::new_v4();
        let ids = seed(&store, showtime_id, 2).await;

        coordinator
            .hold_tickets("rival", showtime_id, &ids[1..], Duration::minutes(5))
            .await
            .unwrap();

        let err = coordinator
            .hold_tickets("buyer", showtime_id, &ids, Duration::minutes(5))
            .await
            .unwrap_err();
        match err {
            ReserveError::Conflict { conflicting } => assert_eq!(conflicting, vec![ids[1]]),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hold_publishes_event_and_is_findable() {
        let (coordinator, store, _clock) = coordinator();
        let showtime_id = Uuid::new_v4();
        let ids = seed(&store, showtime_id, 2).await;
        let mut rx = coordinator.subscribe_held_events();

        let grant = coordinator
            .hold_tickets("buyer", showtime_id, &ids, Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(grant.ticket_ids, ids);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.customer_id, "buyer");
        assert_eq!(event.ticket_ids, ids);
        // The advertised expiry is the one the store recorded.
        assert_eq!(event.expires_at, grant.expires_at);

        let mut held = coordinator
            .find_held_ticket_ids(showtime_id, "buyer")
            .await
            .unwrap();
        held.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(held, expected);
    }

    #[tokio::test]
    async fn test_release_twice_is_noop() {
        let (coordinator, store, _clock) = coordinator();
        let showtime_id = Uuid::new_v4();
        let ids = seed(&store, showtime_id, 1).await;

        coordinator
            .hold_tickets("buyer", showtime_id, &ids, Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(coordinator.release_hold("buyer", &ids).await.unwrap(), 1);
        assert_eq!(coordinator.release_hold("buyer", &ids).await.unwrap(), 0);
    }
}
