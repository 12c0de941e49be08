use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_catalog::CatalogError;
use marquee_domain::StoreError;
use marquee_purchase::{FinalizeError, Violation};
use marquee_reserve::ReserveError;
use serde_json::json;
use uuid::Uuid;

/// Gateway error surface. Every rejection carries the data the caller
/// needs to act on it, never a bare failure.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Hold conflict: retryable by the caller with an adjusted set.
    Conflict { conflicting: Vec<Uuid> },
    /// Business-rule violation: terminal for the request as issued.
    RuleViolation(Violation),
    /// Store timeout/outage: retryable with backoff.
    Unavailable(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict { conflicting } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "tickets unavailable",
                    "code": "CONFLICT",
                    "conflicting_ticket_ids": conflicting,
                }),
            ),
            AppError::RuleViolation(violation) => {
                let (code, details) = match &violation {
                    Violation::MaxTicketsExceeded { requested, max } => (
                        "MAX_TICKETS_EXCEEDED",
                        json!({ "requested": requested, "max": max }),
                    ),
                    Violation::DeadlineExceeded {
                        starts_at,
                        purchase_by,
                    } => (
                        "DEADLINE_EXCEEDED",
                        json!({ "starts_at": starts_at, "purchase_by": purchase_by }),
                    ),
                    Violation::TicketNotHeld { ticket_ids } => {
                        ("TICKET_NOT_HELD", json!({ "ticket_ids": ticket_ids }))
                    }
                };
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({
                        "error": violation.to_string(),
                        "code": code,
                        "details": details,
                    }),
                )
            }
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": msg, "retryable": true }),
            ),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { conflicting } => AppError::Conflict { conflicting },
            StoreError::UnknownTicket(id) => AppError::NotFound(format!("unknown ticket: {}", id)),
            StoreError::DuplicateTicket(id) => {
                AppError::BadRequest(format!("ticket already registered: {}", id))
            }
            StoreError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<ReserveError> for AppError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::EmptyTicketSet | ReserveError::InvalidTtl => {
                AppError::BadRequest(err.to_string())
            }
            ReserveError::Conflict { conflicting } => AppError::Conflict { conflicting },
            ReserveError::Store(store) => store.into(),
        }
    }
}

impl From<FinalizeError> for AppError {
    fn from(err: FinalizeError) -> Self {
        match err {
            FinalizeError::EmptyTicketSet => AppError::BadRequest(err.to_string()),
            FinalizeError::Violation(violation) => AppError::RuleViolation(violation),
            FinalizeError::Catalog(catalog) => catalog.into(),
            FinalizeError::Reserve(reserve) => reserve.into(),
            FinalizeError::Store(store) => store.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => AppError::NotFound(format!("showtime not found: {}", id)),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
