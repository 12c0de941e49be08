use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct HoldTicketsRequest {
    customer_id: String,
    showtime_id: Uuid,
    ticket_ids: Vec<Uuid>,
    /// Defaults to the configured hold TTL.
    ttl_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct HoldTicketsResponse {
    held_ticket_ids: Vec<Uuid>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CancelHoldRequest {
    customer_id: String,
    ticket_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct CancelHoldResponse {
    released: usize,
}

#[derive(Debug, Deserialize)]
struct HeldTicketsQuery {
    customer_id: String,
}

#[derive(Debug, Serialize)]
struct HeldTicketsResponse {
    ticket_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    showtime_id: Uuid,
    available: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(hold_tickets))
        .route("/v1/holds/cancel", post(cancel_hold))
        .route("/v1/showtimes/{id}/holds", get(find_held_tickets))
        .route("/v1/showtimes/{id}/availability", get(availability))
        .route("/v1/showtimes/{id}/stream", get(stream_holds))
}

async fn hold_tickets(
    State(state): State<AppState>,
    Json(req): Json<HoldTicketsRequest>,
) -> Result<Json<HoldTicketsResponse>, AppError> {
    let ttl = match req.ttl_ms {
        Some(ms) => Duration::milliseconds(ms as i64),
        None => Duration::seconds(state.business_rules.default_hold_ttl_seconds as i64),
    };

    let grant = state
        .coordinator
        .hold_tickets(&req.customer_id, req.showtime_id, &req.ticket_ids, ttl)
        .await?;

    Ok(Json(HoldTicketsResponse {
        held_ticket_ids: grant.ticket_ids,
        expires_at: grant.expires_at,
    }))
}

async fn cancel_hold(
    State(state): State<AppState>,
    Json(req): Json<CancelHoldRequest>,
) -> Result<Json<CancelHoldResponse>, AppError> {
    // Idempotent; cancelling released or sold tickets is a no-op.
    let released = state
        .finalizer
        .cancel(&req.customer_id, &req.ticket_ids)
        .await?;

    Ok(Json(CancelHoldResponse { released }))
}

async fn find_held_tickets(
    Path(showtime_id): Path<Uuid>,
    Query(query): Query<HeldTicketsQuery>,
    State(state): State<AppState>,
) -> Result<Json<HeldTicketsResponse>, AppError> {
    let ticket_ids = state
        .coordinator
        .find_held_ticket_ids(showtime_id, &query.customer_id)
        .await?;

    Ok(Json(HeldTicketsResponse { ticket_ids }))
}

async fn availability(
    Path(showtime_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let available = state.store.availability(showtime_id).await?;

    Ok(Json(AvailabilityResponse {
        showtime_id,
        available,
    }))
}

/// Live feed of holds for one showtime, for seat-map viewers.
async fn stream_holds(
    Path(showtime_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.held_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.showtime_id == showtime_id => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok::<_, Infallible>(
                    Event::default().event("ticket_held").data(data),
                ))
            }
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
