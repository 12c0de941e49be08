use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Read-only showtime reference consumed to compute the purchase deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showtime {
    pub id: Uuid,
    pub starts_at: DateTime<Utc>,
}

/// Catalog boundary: seat-map geometry, movies and theaters live behind it;
/// the reservation core only ever asks for a showtime's start time.
#[async_trait]
pub trait ShowtimeCatalog: Send + Sync {
    async fn get_showtime(&self, id: Uuid) -> Result<Showtime, CatalogError>;
}

/// In-memory catalog used in development and tests.
pub struct InMemoryShowtimeCatalog {
    showtimes: RwLock<HashMap<Uuid, Showtime>>,
}

impl InMemoryShowtimeCatalog {
    pub fn new() -> Self {
        Self {
            showtimes: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, showtime: Showtime) {
        self.showtimes.write().await.insert(showtime.id, showtime);
    }
}

impl Default for InMemoryShowtimeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShowtimeCatalog for InMemoryShowtimeCatalog {
    async fn get_showtime(&self, id: Uuid) -> Result<Showtime, CatalogError> {
        self.showtimes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Showtime not found: {0}")]
    NotFound(String),
}
