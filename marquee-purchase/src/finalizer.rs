use crate::events::EventSink;
use crate::validator::{self, PurchasePolicy, Violation};
use marquee_catalog::{CatalogError, ShowtimeCatalog};
use marquee_domain::{Clock, Purchase, PurchaseEvent, StoreError, TicketStateStore};
use marquee_reserve::{ReservationCoordinator, ReserveError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Atomically converts a customer's held tickets into sold ones.
///
/// Every finalize attempt is recorded as a [`Purchase`]: `Completed` on
/// success, `Failed` on any validation or conditional-sale failure. Failed
/// attempts never change ticket state, and finalization never sells a
/// subset of the requested tickets.
pub struct PurchaseFinalizer {
    store: Arc<dyn TicketStateStore>,
    catalog: Arc<dyn ShowtimeCatalog>,
    coordinator: Arc<ReservationCoordinator>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    policy: PurchasePolicy,
    purchases: Mutex<HashMap<Uuid, Purchase>>,
}

impl PurchaseFinalizer {
    pub fn new(
        store: Arc<dyn TicketStateStore>,
        catalog: Arc<dyn ShowtimeCatalog>,
        coordinator: Arc<ReservationCoordinator>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        policy: PurchasePolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            coordinator,
            clock,
            sink,
            policy,
            purchases: Mutex::new(HashMap::new()),
        }
    }

    /// Finalize a purchase: load holds, validate, conditionally sell.
    ///
    /// The sale is conditioned on the caller still holding every ticket
    /// with an unexpired hold, so a hold that lapsed microseconds earlier
    /// (or a concurrent duplicate finalize) fails with `TicketNotHeld`
    /// instead of double-selling.
    pub async fn finalize(
        &self,
        customer_id: &str,
        ticket_ids: &[Uuid],
        total_cents: i64,
    ) -> Result<Purchase, FinalizeError> {
        if ticket_ids.is_empty() {
            return Err(FinalizeError::EmptyTicketSet);
        }

        // Every ticket in a purchase belongs to one showtime; resolve it
        // from the first ticket.
        let first = self.store.get(ticket_ids[0]).await?;
        let showtime = self.catalog.get_showtime(first.showtime_id).await?;

        let held = self
            .store
            .held_ticket_ids(showtime.id, customer_id)
            .await?;

        let now = self.clock.now();
        if let Err(violation) =
            validator::validate(&self.policy, ticket_ids, &showtime, &held, now)
        {
            self.record_failure(customer_id, ticket_ids, total_cents).await;
            return Err(FinalizeError::Violation(violation));
        }

        // All-or-nothing, holder-conditioned. A conflict here means some
        // hold expired or was finalized between validation and now.
        match self.store.compare_and_set_sold(ticket_ids, customer_id).await {
            Ok(()) => {}
            Err(StoreError::Conflict { conflicting }) => {
                self.record_failure(customer_id, ticket_ids, total_cents).await;
                return Err(FinalizeError::Violation(Violation::TicketNotHeld {
                    ticket_ids: conflicting,
                }));
            }
            Err(other) => return Err(FinalizeError::Store(other)),
        }

        let mut purchase = Purchase::new(
            customer_id.to_string(),
            ticket_ids.to_vec(),
            total_cents,
            self.clock.now(),
        );
        purchase.complete();
        self.purchases
            .lock()
            .await
            .insert(purchase.id, purchase.clone());

        info!(
            "Purchase {} completed: {} tickets for customer {}",
            purchase.id,
            ticket_ids.len(),
            customer_id
        );

        self.sink
            .publish(PurchaseEvent::TicketPurchased {
                customer_id: customer_id.to_string(),
                ticket_ids: ticket_ids.to_vec(),
            })
            .await;

        Ok(purchase)
    }

    /// Cancel a pending reservation: release the customer's holds through
    /// the coordinator and, if anything was actually released, emit the
    /// cancellation event. Idempotent like the underlying release.
    pub async fn cancel(
        &self,
        customer_id: &str,
        ticket_ids: &[Uuid],
    ) -> Result<usize, FinalizeError> {
        let released = self
            .coordinator
            .release_hold(customer_id, ticket_ids)
            .await?;

        if released > 0 {
            self.sink
                .publish(PurchaseEvent::TicketPurchaseCanceled {
                    customer_id: customer_id.to_string(),
                    ticket_ids: ticket_ids.to_vec(),
                })
                .await;
        }

        Ok(released)
    }

    /// Look up a recorded purchase.
    pub async fn get_purchase(&self, purchase_id: Uuid) -> Option<Purchase> {
        self.purchases.lock().await.get(&purchase_id).cloned()
    }

    async fn record_failure(&self, customer_id: &str, ticket_ids: &[Uuid], total_cents: i64) {
        let mut purchase = Purchase::new(
            customer_id.to_string(),
            ticket_ids.to_vec(),
            total_cents,
            self.clock.now(),
        );
        purchase.fail();
        self.purchases.lock().await.insert(purchase.id, purchase);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("purchase must name at least one ticket")]
    EmptyTicketSet,

    #[error(transparent)]
    Violation(#[from] Violation),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Reserve(#[from] ReserveError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
