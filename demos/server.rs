// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Demo REST adapter over the circulation engine.
//!
//! The transport layer is an external collaborator; this example shows how
//! thin it stays. Run with: cargo run --example server
//!
//! ```bash
//! # Register an item with two copies
//! curl -X POST http://localhost:3000/items \
//!   -H "Content-Type: application/json" \
//!   -d '{"item_id": 1, "total_copies": 2}'
//!
//! # Check a copy out
//! curl -X POST http://localhost:3000/loans \
//!   -H "Content-Type: application/json" \
//!   -d '{"item_id": 1, "borrower_id": 7, "due_date": "2030-01-15T00:00:00Z"}'
//!
//! # Return it
//! curl -X POST http://localhost:3000/loans/1/return
//!
//! # Join the waiting list
//! curl -X POST http://localhost:3000/reservations \
//!   -H "Content-Type: application/json" \
//!   -d '{"item_id": 1, "borrower_id": 8}'
//!
//! # Run a sweep
//! curl -X POST http://localhost:3000/sweep
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use circulate_rs::{
    BorrowerId, CirculationError, Engine, ExpirySweeper, ItemId, Loan, LoanId, Reservation,
    ReservationId, SweepReport,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for registering an item.
#[derive(Debug, Deserialize)]
pub struct RegisterItemRequest {
    pub item_id: u32,
    pub total_copies: u32,
}

/// Request body for checking a copy out.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub item_id: u32,
    pub borrower_id: u32,
    pub due_date: DateTime<Utc>,
}

/// Request body for joining a waiting list.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub item_id: u32,
    pub borrower_id: u32,
}

/// Response body for item shelf state.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: u32,
    pub total: u32,
    pub available: u32,
    pub active: bool,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the circulation engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

// === Error Handling ===

/// Wrapper for converting `CirculationError` into HTTP responses.
pub struct AppError(CirculationError);

impl From<CirculationError> for AppError {
    fn from(err: CirculationError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            CirculationError::ItemNotFound => (StatusCode::NOT_FOUND, "ITEM_NOT_FOUND"),
            CirculationError::LoanNotFound => (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND"),
            CirculationError::ReservationNotFound => {
                (StatusCode::NOT_FOUND, "RESERVATION_NOT_FOUND")
            }
            CirculationError::OutOfStock => (StatusCode::UNPROCESSABLE_ENTITY, "OUT_OF_STOCK"),
            CirculationError::ItemInactive => (StatusCode::CONFLICT, "ITEM_INACTIVE"),
            CirculationError::LoanNotActive => (StatusCode::CONFLICT, "LOAN_NOT_ACTIVE"),
            CirculationError::LoanOverdue => (StatusCode::CONFLICT, "LOAN_OVERDUE"),
            CirculationError::RenewalLimitReached => {
                (StatusCode::CONFLICT, "RENEWAL_LIMIT_REACHED")
            }
            CirculationError::ReservationNotPending => {
                (StatusCode::CONFLICT, "RESERVATION_NOT_PENDING")
            }
            CirculationError::InvalidTransition => (StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
            CirculationError::InvalidDueDate => (StatusCode::BAD_REQUEST, "INVALID_DUE_DATE"),
            CirculationError::DuplicateItem => (StatusCode::CONFLICT, "DUPLICATE_ITEM"),
            CirculationError::NoCopies => (StatusCode::BAD_REQUEST, "NO_COPIES"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /items - Register an item.
async fn register_item(
    State(state): State<AppState>,
    Json(request): Json<RegisterItemRequest>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .add_item(ItemId(request.item_id), request.total_copies)?;
    Ok(StatusCode::CREATED)
}

/// GET /items - List all items.
async fn list_items(State(state): State<AppState>) -> Json<Vec<ItemResponse>> {
    let items: Vec<ItemResponse> = state
        .engine
        .items()
        .map(|ref_multi| {
            let item = ref_multi.value();
            ItemResponse {
                item: ref_multi.key().0,
                total: item.total_copies(),
                available: item.available_copies(),
                active: item.is_active(),
            }
        })
        .collect();

    Json(items)
}

/// GET /items/:id - Get item shelf state by ID.
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<ItemResponse>, AppError> {
    let item_id = ItemId(id);

    state
        .engine
        .get_item(&item_id)
        .map(|item| {
            Json(ItemResponse {
                item: item_id.0,
                total: item.total_copies(),
                available: item.available_copies(),
                active: item.is_active(),
            })
        })
        .ok_or(AppError(CirculationError::ItemNotFound))
}

/// POST /loans - Check a copy out.
async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Loan>), AppError> {
    let loan = state.engine.checkout(
        ItemId(request.item_id),
        BorrowerId(request.borrower_id),
        request.due_date,
    )?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// GET /loans/:id - Get loan by ID.
async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Loan>, AppError> {
    state
        .engine
        .get_loan(&LoanId(id))
        .map(Json)
        .ok_or(AppError(CirculationError::LoanNotFound))
}

/// POST /loans/:id/return - Return a borrowed copy.
async fn return_loan(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Loan>, AppError> {
    let loan = state.engine.return_item(LoanId(id))?;
    Ok(Json(loan))
}

/// POST /loans/:id/renew - Renew a loan.
async fn renew_loan(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Loan>, AppError> {
    let loan = state.engine.renew(LoanId(id))?;
    Ok(Json(loan))
}

/// POST /reservations - Join an item's waiting list.
async fn reserve(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state
        .engine
        .reserve(ItemId(request.item_id), BorrowerId(request.borrower_id))?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// POST /reservations/:id/cancel - Cancel a pending reservation.
async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state.engine.cancel_reservation(ReservationId(id))?;
    Ok(Json(reservation))
}

/// GET /items/:id/queue - Pending reservations for an item, FIFO order.
async fn item_queue(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Json<Vec<Reservation>> {
    Json(state.engine.pending_reservations(ItemId(id)))
}

/// POST /sweep - Run one expiry/fee sweep pass.
async fn sweep(State(state): State<AppState>) -> Json<SweepReport> {
    Json(ExpirySweeper::new(&state.engine).run())
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/items", post(register_item).get(list_items))
        .route("/items/{id}", get(get_item))
        .route("/items/{id}/queue", get(item_queue))
        .route("/loans", post(checkout))
        .route("/loans/{id}", get(get_loan))
        .route("/loans/{id}/return", post(return_loan))
        .route("/loans/{id}/renew", post(renew_loan))
        .route("/reservations", post(reserve))
        .route("/reservations/{id}/cancel", post(cancel_reservation))
        .route("/sweep", post(sweep))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state = AppState {
        engine: Arc::new(Engine::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Circulation API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /items                     - Register an item");
    println!("  GET  /items                     - List all items");
    println!("  GET  /items/:id                 - Get item by ID");
    println!("  GET  /items/:id/queue           - Pending reservations, FIFO");
    println!("  POST /loans                     - Check a copy out");
    println!("  GET  /loans/:id                 - Get loan by ID");
    println!("  POST /loans/:id/return          - Return a copy");
    println!("  POST /loans/:id/renew           - Renew a loan");
    println!("  POST /reservations              - Join a waiting list");
    println!("  POST /reservations/:id/cancel   - Cancel a reservation");
    println!("  POST /sweep                     - Recompute fees, expire stale holds");

    axum::serve(listener, app).await.unwrap();
}
