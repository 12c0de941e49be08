use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use marquee_domain::Purchase;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct FinalizePurchaseRequest {
    customer_id: String,
    ticket_ids: Vec<Uuid>,
    total_cents: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/purchases", post(finalize_purchase))
        .route("/v1/purchases/{id}", get(get_purchase))
}

async fn finalize_purchase(
    State(state): State<AppState>,
    Json(req): Json<FinalizePurchaseRequest>,
) -> Result<Json<Purchase>, AppError> {
    let purchase = state
        .finalizer
        .finalize(&req.customer_id, &req.ticket_ids, req.total_cents)
        .await?;

    Ok(Json(purchase))
}

async fn get_purchase(
    Path(purchase_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Purchase>, AppError> {
    state
        .finalizer
        .get_purchase(purchase_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("purchase not found: {}", purchase_id)))
}
