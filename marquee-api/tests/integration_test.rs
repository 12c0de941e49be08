use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use marquee_api::{app, AppState};
use marquee_domain::{ManualClock, SystemClock, TicketStatus};
use marquee_reserve::ExpirationSweeper;
use marquee_store::BusinessRules;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

fn rules() -> BusinessRules {
    BusinessRules {
        max_tickets_per_purchase: 10,
        purchase_deadline_minutes: 30,
        default_hold_ttl_seconds: 300,
        sweep_interval_ms: 50,
        store_lock_timeout_ms: 500,
    }
}

fn test_state() -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::in_memory(clock.clone(), rules());
    (state, clock)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Seeds a showtime starting two hours out; returns (showtime_id, ticket_ids).
async fn seed_showtime(app: &Router, state: &AppState, seats: usize) -> (Uuid, Vec<Uuid>) {
    let starts_at = state.clock.now() + ChronoDuration::hours(2);
    let seats: Vec<String> = (0..seats).map(|n| format!("F{}", n + 1)).collect();

    let (status, body) = send(
        app,
        Method::POST,
        "/v1/admin/showtimes",
        Some(json!({ "starts_at": starts_at, "seats": seats })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let showtime_id = body["showtime_id"].as_str().unwrap().parse().unwrap();
    let ticket_ids = body["tickets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().parse().unwrap())
        .collect();
    (showtime_id, ticket_ids)
}

#[tokio::test]
async fn test_hold_find_finalize_flow() {
    let (state, _clock) = test_state();
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 3).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "alice",
            "showtime_id": showtime_id,
            "ticket_ids": ticket_ids,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["held_ticket_ids"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/showtimes/{}/holds?customer_id=alice", showtime_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticket_ids"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/showtimes/{}/availability", showtime_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(0));

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/purchases",
        Some(json!({
            "customer_id": "alice",
            "ticket_ids": ticket_ids,
            "total_cents": 3600,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("COMPLETED"));

    let purchase_id = body["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/purchases/{}", purchase_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer_id"], json!("alice"));

    for id in ticket_ids {
        assert_eq!(
            state.store.get(id).await.unwrap().status,
            TicketStatus::Sold
        );
    }
}

#[tokio::test]
async fn test_conflicting_hold_returns_409_with_ids() {
    let (state, _clock) = test_state();
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 5).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "alice",
            "showtime_id": showtime_id,
            "ticket_ids": [ticket_ids[2]],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Bob wants all five; the whole request fails and names the blocker.
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "bob",
            "showtime_id": showtime_id,
            "ticket_ids": ticket_ids,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["conflicting_ticket_ids"],
        json!([ticket_ids[2].to_string()])
    );

    // None of the other four became held.
    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/v1/showtimes/{}/availability", showtime_id),
        None,
    )
    .await;
    assert_eq!(body["available"], json!(4));
}

#[tokio::test]
async fn test_purchase_violations_are_422_with_codes() {
    let (state, clock) = test_state();
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 2).await;

    // Not held at all.
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/purchases",
        Some(json!({
            "customer_id": "alice",
            "ticket_ids": ticket_ids,
            "total_cents": 2400,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("TICKET_NOT_HELD"));

    // Held, but the showtime is now inside the purchase deadline.
    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "alice",
            "showtime_id": showtime_id,
            "ticket_ids": ticket_ids,
            "ttl_ms": 7_200_000u64,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    clock.advance(ChronoDuration::minutes(95));

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/purchases",
        Some(json!({
            "customer_id": "alice",
            "ticket_ids": ticket_ids,
            "total_cents": 2400,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("DEADLINE_EXCEEDED"));
}

#[tokio::test]
async fn test_expired_hold_is_swept_and_not_purchasable() {
    let (state, clock) = test_state();
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 1).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "alice",
            "showtime_id": showtime_id,
            "ticket_ids": ticket_ids,
            "ttl_ms": 200u64,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    clock.advance(ChronoDuration::milliseconds(201));

    // Readers already see the seat as free before the sweeper runs.
    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/v1/showtimes/{}/availability", showtime_id),
        None,
    )
    .await;
    assert_eq!(body["available"], json!(1));

    // The sweep makes it durable.
    let sweeper = ExpirationSweeper::new(
        state.store.clone(),
        state.clock.clone(),
        Duration::from_millis(50),
    );
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

    // A purchase attempt against the lapsed hold is rejected.
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/purchases",
        Some(json!({
            "customer_id": "alice",
            "ticket_ids": ticket_ids,
            "total_cents": 1200,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("TICKET_NOT_HELD"));
}

#[tokio::test]
async fn test_sweeper_loop_reclaims_within_interval() {
    // Wall-clock variant of expiry: ttl 200ms, sweeping every 50ms.
    let clock = Arc::new(SystemClock);
    let state = AppState::in_memory(clock, rules());
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 1).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "alice",
            "showtime_id": showtime_id,
            "ticket_ids": ticket_ids,
            "ttl_ms": 200u64,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    marquee_api::worker::spawn_sweeper(&state);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let ticket = state.store.get(ticket_ids[0]).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Available);
    assert_eq!(ticket.holder, None);
}

#[tokio::test]
async fn test_concurrent_holds_never_double_allocate() {
    let (state, _clock) = test_state();
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 4).await;

    // Ten customers race for overlapping pairs of seats.
    let mut handles = Vec::new();
    for n in 0..10 {
        let coordinator = state.coordinator.clone();
        let pair = vec![ticket_ids[n % 4], ticket_ids[(n + 1) % 4]];
        handles.push(tokio::spawn(async move {
            coordinator
                .hold_tickets(
                    &format!("customer-{}", n),
                    showtime_id,
                    &pair,
                    ChronoDuration::minutes(5),
                )
                .await
        }));
    }

    let mut granted: Vec<Uuid> = Vec::new();
    for handle in handles {
        if let Ok(grant) = handle.await.unwrap() {
            granted.extend(grant.ticket_ids);
        }
    }

    // The union of all successful holds is disjoint.
    let mut deduped = granted.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), granted.len());
}

#[tokio::test]
async fn test_cancel_is_idempotent_over_http() {
    let (state, _clock) = test_state();
    let app = app(state.clone());
    let (showtime_id, ticket_ids) = seed_showtime(&app, &state, 2).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(json!({
            "customer_id": "alice",
            "showtime_id": showtime_id,
            "ticket_ids": ticket_ids,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let cancel = json!({ "customer_id": "alice", "ticket_ids": ticket_ids });
    let (status, body) = send(&app, Method::POST, "/v1/holds/cancel", Some(cancel.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["released"], json!(2));

    let (status, body) = send(&app, Method::POST, "/v1/holds/cancel", Some(cancel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["released"], json!(0));
}
