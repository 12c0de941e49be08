use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use marquee_catalog::Showtime;
use marquee_domain::Ticket;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SeedShowtimeRequest {
    starts_at: DateTime<Utc>,
    /// Seat identifiers, already resolved by the seat-map service.
    seats: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SeedShowtimeResponse {
    showtime_id: Uuid,
    tickets: Vec<SeededTicket>,
}

#[derive(Debug, Serialize)]
struct SeededTicket {
    id: Uuid,
    seat: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/admin/showtimes", post(seed_showtime))
}

/// Registers a showtime and its ticket inventory. Catalog CRUD proper
/// (movies, theaters, seat maps) lives in the catalog service; this only
/// seeds what the reservation core needs.
async fn seed_showtime(
    State(state): State<AppState>,
    Json(req): Json<SeedShowtimeRequest>,
) -> Result<Json<SeedShowtimeResponse>, AppError> {
    if req.seats.is_empty() {
        return Err(AppError::BadRequest(
            "showtime must have at least one seat".to_string(),
        ));
    }

    let showtime = Showtime {
        id: Uuid::new_v4(),
        starts_at: req.starts_at,
    };
    state.catalog.register(showtime.clone()).await;

    let tickets: Vec<Ticket> = req
        .seats
        .into_iter()
        .map(|seat| Ticket::new(showtime.id, seat))
        .collect();
    let seeded: Vec<SeededTicket> = tickets
        .iter()
        .map(|t| SeededTicket {
            id: t.id,
            seat: t.seat.clone(),
        })
        .collect();

    state.store.insert_tickets(tickets).await?;

    info!(
        "Seeded showtime {} with {} tickets",
        showtime.id,
        seeded.len()
    );

    Ok(Json(SeedShowtimeResponse {
        showtime_id: showtime.id,
        tickets: seeded,
    }))
}
