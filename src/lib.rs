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

//! # Circulate
//!
//! This library provides a lending and reservation lifecycle engine for
//! circulating inventory: checkouts, returns, renewals, late-fee accrual,
//! and fair per-item reservation queues.
//!
//! ## Core Components
//!
//! - [`Engine`]: Central lifecycle processor managing loans and reservations
//! - [`InventoryLedger`]: Sole owner of per-item copy counters
//! - [`ReservationQueue`]: Per-item waiting lists with gap-free positions
//! - [`FeeCalculator`]: Pure late-fee recomputation from `(due_date, now)`
//! - [`ExpirySweeper`]: Externally-triggered batch pass over fees and
//!   stale reservations
//! - [`CirculationError`]: Error types for lifecycle failures
//!
//! ## Example
//!
//! ```
//! use circulate_rs::{BorrowerId, Engine, ItemId};
//! use chrono::{Duration, Utc};
//!
//! let engine = Engine::new();
//! engine.add_item(ItemId(1), 2).unwrap();
//!
//! // Check a copy out, due back in two weeks
//! let loan = engine
//!     .checkout(ItemId(1), BorrowerId(7), Utc::now() + Duration::days(14))
//!     .unwrap();
//!
//! // One copy left on the shelf
//! let item = engine.get_item(&ItemId(1)).unwrap();
//! assert_eq!(item.available_copies(), 1);
//!
//! // Bring it back
//! engine.return_item(loan.loan_id).unwrap();
//! ```
//!
//! ## Thread Safety
//!
//! Operations on different items proceed fully in parallel; mutations to
//! one item's copy counters and insertions into one item's queue are
//! serialized, so the `0 <= available <= total` invariant holds under
//! concurrent checkouts and returns.

pub mod base;
pub mod engine;
pub mod error;
mod fee;
mod inventory;
pub mod item;
mod loan;
pub mod policy;
mod queue;
mod reservation;
mod sweeper;

pub use base::{BorrowerId, ItemId, LoanId, ReservationId};
pub use engine::Engine;
pub use error::CirculationError;
pub use fee::FeeCalculator;
pub use inventory::InventoryLedger;
pub use item::Item;
pub use loan::{Loan, LoanStatus};
pub use policy::CirculationPolicy;
pub use queue::ReservationQueue;
pub use reservation::{Reservation, ReservationStatus};
pub use sweeper::{ExpirySweeper, SweepReport};
