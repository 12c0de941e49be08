use marquee_domain::{Clock, StoreError, TicketStateStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Background reclaimer for expired holds.
///
/// Runs on a fixed interval (keep it well under the shortest TTL, one
/// tenth is a good ratio) and releases each lapsed hold conditionally on
/// the holder being unchanged, so a hold finalized into a sale between the
/// scan and the release attempt is left alone. Safe to run concurrently
/// with holds, finalizes and itself.
pub struct ExpirationSweeper {
    store: Arc<dyn TicketStateStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<dyn TicketStateStore>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            store,
            clock,
            interval,
        }
    }

    /// Loops forever; spawn this on the runtime.
    pub async fn run(self) {
        info!("Expiration sweeper started, interval {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(reclaimed) => info!("Reclaimed {} expired holds", reclaimed),
                Err(e) => error!("Sweep pass failed: {}", e),
            }
        }
    }

    /// One sweep pass. Returns how many holds were reclaimed.
    pub async fn sweep_once(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let expired = self.store.expired_holds(now).await?;

        let mut reclaimed = 0;
        for hold in expired {
            match self
                .store
                .compare_and_set_available(hold.ticket_id, &hold.customer_id, hold.expires_at)
                .await
            {
                Ok(true) => reclaimed += 1,
                // Lost the race to a finalize or a concurrent sweep.
                Ok(false) => {}
                Err(e) => error!("Failed to reclaim ticket {}: {}", hold.ticket_id, e),
            }
        }

        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use marquee_domain::{ManualClock, Ticket, TicketStatus};
    use marquee_store::InMemoryTicketStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sweep_reclaims_only_expired_holds() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(InMemoryTicketStore::new(clock.clone()));
        let sweeper = ExpirationSweeper::new(store.clone(), clock.clone(), Duration::from_millis(20));

        let showtime_id = Uuid::new_v4();
        let tickets: Vec<Ticket> = (0..3)
            .map(|n| Ticket::new(showtime_id, format!("C{}", n + 1)))
            .collect();
        let ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
        store.insert_tickets(tickets).await.unwrap();

        // Two short holds, one long one.
        store
            .compare_and_set_hold(&ids[..2], "early", clock.now() + ChronoDuration::seconds(10))
            .await
            .unwrap();
        store
            .compare_and_set_hold(&ids[2..], "late", clock.now() + ChronoDuration::minutes(10))
            .await
            .unwrap();

        clock.advance(ChronoDuration::seconds(11));

        assert_eq!(sweeper.sweep_once().await.unwrap(), 2);
        assert_eq!(store.get(ids[0]).await.unwrap().status, TicketStatus::Available);
        assert_eq!(store.get(ids[2]).await.unwrap().status, TicketStatus::Held);

        // Nothing left to reclaim on the next pass.
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_never_reclaims_sold_tickets() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(InMemoryTicketStore::new(clock.clone()));
        let sweeper = ExpirationSweeper::new(store.clone(), clock.clone(), Duration::from_millis(20));

        let showtime_id = Uuid::new_v4();
        let ticket = Ticket::new(showtime_id, "D1".to_string());
        let ticket_id = ticket.id;
        store.insert_tickets(vec![ticket]).await.unwrap();

        store
            .compare_and_set_hold(&[ticket_id], "buyer", clock.now() + ChronoDuration::seconds(10))
            .await
            .unwrap();
        store
            .compare_and_set_sold(&[ticket_id], "buyer")
            .await
            .unwrap();

        clock.advance(ChronoDuration::minutes(1));

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
        assert_eq!(store.get(ticket_id).await.unwrap().status, TicketStatus::Sold);
    }
}
