use chrono::Duration;
use marquee_catalog::InMemoryShowtimeCatalog;
use marquee_domain::{Clock, TicketHeldEvent, TicketStateStore};
use marquee_purchase::{BroadcastSink, PurchaseFinalizer, PurchasePolicy};
use marquee_reserve::ReservationCoordinator;
use marquee_store::{BusinessRules, InMemoryTicketStore};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TicketStateStore>,
    pub catalog: Arc<InMemoryShowtimeCatalog>,
    pub clock: Arc<dyn Clock>,
    pub coordinator: Arc<ReservationCoordinator>,
    pub finalizer: Arc<PurchaseFinalizer>,
    pub events: Arc<BroadcastSink>,
    pub held_tx: broadcast::Sender<TicketHeldEvent>,
    pub business_rules: BusinessRules,
}

impl AppState {
    /// Wires the full in-memory stack. Used by `main` and by the
    /// integration tests, which differ only in the clock they pass.
    pub fn in_memory(clock: Arc<dyn Clock>, business_rules: BusinessRules) -> Self {
        let store: Arc<dyn TicketStateStore> = Arc::new(InMemoryTicketStore::with_lock_timeout(
            clock.clone(),
            std::time::Duration::from_millis(business_rules.store_lock_timeout_ms),
        ));
        let catalog = Arc::new(InMemoryShowtimeCatalog::new());

        let (held_tx, _) = broadcast::channel(100);
        let (event_tx, _) = broadcast::channel(100);
        let events = Arc::new(BroadcastSink::new(event_tx));

        let coordinator = Arc::new(ReservationCoordinator::new(
            store.clone(),
            clock.clone(),
            held_tx.clone(),
        ));
        let finalizer = Arc::new(PurchaseFinalizer::new(
            store.clone(),
            catalog.clone(),
            coordinator.clone(),
            clock.clone(),
            events.clone(),
            PurchasePolicy {
                max_tickets_per_purchase: business_rules.max_tickets_per_purchase,
                purchase_deadline: Duration::minutes(business_rules.purchase_deadline_minutes),
            },
        ));

        Self {
            store,
            catalog,
            clock,
            coordinator,
            finalizer,
            events,
            held_tx,
            business_rules,
        }
    }
}
