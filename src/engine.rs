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

//! Lending and reservation lifecycle engine.
//!
//! The [`Engine`] is the central component that lends copies, reclaims
//! them, and arbitrates demand when no copies are available. It owns the
//! loan records and their state machine and delegates copy accounting to
//! the [`InventoryLedger`] and waiting lists to the [`ReservationQueue`].
//!
//! # Operations
//!
//! - **Checkout**: Claim a copy and open a loan, as one atomic unit.
//! - **Return**: Close a loan, lock in its late fee, release the copy.
//! - **Renew**: Push the due date out, subject to the circulation policy.
//! - **Reserve**: Join an item's waiting list in FIFO order.
//! - **Sweep**: Recompute late-fee projections and expire stale
//!   reservations (driven externally, see [`ExpirySweeper`]).
//!
//! # Thread Safety
//!
//! Records live in [`DashMap`]s, so operations on different items and
//! loans run in parallel. Mutations to one item's copy counters serialize
//! on the item's mutex; a checkout racing a return on the same item can
//! never drive `available_copies` outside `0..=total_copies`.
//!
//! [`ExpirySweeper`]: crate::sweeper::ExpirySweeper

use crate::base::{BorrowerId, ItemId, LoanId, ReservationId};
use crate::error::CirculationError;
use crate::fee::FeeCalculator;
use crate::inventory::InventoryLedger;
use crate::item::Item;
use crate::loan::{Loan, LoanStatus};
use crate::policy::CirculationPolicy;
use crate::queue::ReservationQueue;
use crate::reservation::{Reservation, ReservationStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Lending and reservation lifecycle engine.
///
/// # Invariants
///
/// - `0 <= available_copies <= total_copies` for every item, after every
///   operation.
/// - An item's `available_copies` equals `total_copies` minus its count of
///   currently active loans.
/// - A loan's only transition is `Active` -> `Returned`; `Returned` is
///   terminal.
/// - Queue positions per item form the gap-free sequence 1, 2, 3, ...
/// - Stored fees on active loans are recomputable projections; the fee
///   locks in at return.
pub struct Engine {
    /// Copy counters, the only component allowed to mutate them.
    inventory: InventoryLedger,
    /// Loan records by ID. Closed loans are kept forever.
    loans: DashMap<LoanId, Loan>,
    /// Source of fresh loan IDs.
    next_loan_id: AtomicU64,
    /// Waiting lists and queue positions.
    queue: ReservationQueue,
    /// Immutable policy fixed at construction.
    policy: CirculationPolicy,
    /// Late-fee derivation, configured from the policy.
    fees: FeeCalculator,
}

impl Engine {
    /// Creates an engine with the default [`CirculationPolicy`].
    pub fn new() -> Self {
        Self::with_policy(CirculationPolicy::default())
    }

    /// Creates an engine with an explicit policy.
    pub fn with_policy(policy: CirculationPolicy) -> Self {
        let fees = FeeCalculator::new(policy.fee_per_day);
        Engine {
            inventory: InventoryLedger::new(),
            loans: DashMap::new(),
            next_loan_id: AtomicU64::new(1),
            queue: ReservationQueue::new(),
            policy,
            fees,
        }
    }

    pub fn policy(&self) -> &CirculationPolicy {
        &self.policy
    }

    // === Inventory ===

    /// Registers an item with a full shelf of copies.
    pub fn add_item(&self, item_id: ItemId, total_copies: u32) -> Result<(), CirculationError> {
        self.inventory.add_item(item_id, total_copies)?;
        info!(item = %item_id, copies = total_copies, "item registered");
        Ok(())
    }

    /// Takes an item out of circulation. Open loans keep running and may
    /// still be returned.
    pub fn retire_item(&self, item_id: ItemId) -> Result<(), CirculationError> {
        self.inventory.retire_item(item_id)?;
        info!(item = %item_id, "item retired");
        Ok(())
    }

    /// Puts a retired item back into circulation.
    pub fn reactivate_item(&self, item_id: ItemId) -> Result<(), CirculationError> {
        self.inventory.reactivate_item(item_id)?;
        info!(item = %item_id, "item reactivated");
        Ok(())
    }

    /// Retrieves an item by ID.
    pub fn get_item(&self, item_id: &ItemId) -> Option<dashmap::mapref::one::Ref<'_, ItemId, Item>> {
        self.inventory.get(item_id)
    }

    /// Returns an iterator over all registered items.
    ///
    /// Useful for generating output reports of shelf states.
    pub fn items(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, ItemId, Item>> {
        self.inventory.iter()
    }

    // === Loans ===

    /// Checks a copy out to a borrower, due back at `due_date`.
    pub fn checkout(
        &self,
        item_id: ItemId,
        borrower_id: BorrowerId,
        due_date: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        self.checkout_at(item_id, borrower_id, due_date, Utc::now())
    }

    /// Checkout with an explicit clock.
    ///
    /// The copy decrement and the loan-record creation commit together or
    /// not at all: the decrement happens under the item's mutex, and the
    /// subsequent insert of an engine-assigned loan ID cannot fail. When
    /// copy reservation fails, no loan record is created.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::InvalidDueDate`] - `due_date` is not after `now`.
    /// - [`CirculationError::ItemNotFound`] - unknown item.
    /// - [`CirculationError::ItemInactive`] - item retired.
    /// - [`CirculationError::OutOfStock`] - no copies available.
    pub fn checkout_at(
        &self,
        item_id: ItemId,
        borrower_id: BorrowerId,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        if due_date <= now {
            return Err(CirculationError::InvalidDueDate);
        }

        self.inventory.reserve_copy(item_id)?;

        let loan_id = LoanId(self.next_loan_id.fetch_add(1, Ordering::Relaxed));
        let loan = Loan::new(loan_id, item_id, borrower_id, now, due_date);
        self.loans.insert(loan_id, loan.clone());

        info!(loan = %loan_id, item = %item_id, borrower = %borrower_id, "copy checked out");
        Ok(loan)
    }

    /// Returns a borrowed copy.
    pub fn return_item(&self, loan_id: LoanId) -> Result<Loan, CirculationError> {
        self.return_item_at(loan_id, Utc::now())
    }

    /// Return with an explicit clock.
    ///
    /// Locks in the late fee from the actual return time (not the last
    /// sweep), then releases the copy back to the shelf.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::LoanNotFound`] - unknown loan.
    /// - [`CirculationError::LoanNotActive`] - already returned.
    pub fn return_item_at(
        &self,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> Result<Loan, CirculationError> {
        let closed = {
            let mut loan = self
                .loans
                .get_mut(&loan_id)
                .ok_or(CirculationError::LoanNotFound)?;
            if loan.status != LoanStatus::Active {
                return Err(CirculationError::LoanNotActive);
            }

            loan.return_date = Some(now);
            loan.status = LoanStatus::Returned;
            loan.late_fee = Some(self.fees.fee_at(loan.due_date, now));
            loan.clone()
            // Guard dropped here; release_copy takes the item mutex and
            // must not nest inside the loan shard lock.
        };

        self.inventory.release_copy(closed.item_id)?;

        info!(loan = %loan_id, item = %closed.item_id, fee = %closed.late_fee.unwrap_or_default(), "copy returned");
        Ok(closed)
    }

    /// Renews a loan, pushing the due date out by the policy's renewal
    /// period.
    pub fn renew(&self, loan_id: LoanId) -> Result<Loan, CirculationError> {
        self.renew_at(loan_id, Utc::now())
    }

    /// Renewal with an explicit clock.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::LoanNotFound`] - unknown loan.
    /// - [`CirculationError::LoanNotActive`] - already returned.
    /// - [`CirculationError::LoanOverdue`] - past due loans must be
    ///   returned, not renewed.
    /// - [`CirculationError::RenewalLimitReached`] - policy cap hit.
    pub fn renew_at(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<Loan, CirculationError> {
        let mut loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(CirculationError::LoanNotFound)?;
        if loan.status != LoanStatus::Active {
            return Err(CirculationError::LoanNotActive);
        }
        if loan.due_date < now {
            warn!(loan = %loan_id, "renewal refused for overdue loan");
            return Err(CirculationError::LoanOverdue);
        }
        if loan.renewal_count >= self.policy.max_renewals {
            return Err(CirculationError::RenewalLimitReached);
        }

        loan.due_date += self.policy.renewal_period;
        loan.renewal_count += 1;

        info!(loan = %loan_id, due = %loan.due_date, "loan renewed");
        Ok(loan.clone())
    }

    /// Retrieves a loan by ID.
    pub fn get_loan(&self, loan_id: &LoanId) -> Option<Loan> {
        self.loans.get(loan_id).map(|l| l.value().clone())
    }

    /// All loans, newest checkout first.
    pub fn loans(&self) -> Vec<Loan> {
        let mut all: Vec<Loan> = self.loans.iter().map(|l| l.value().clone()).collect();
        all.sort_by(|a, b| b.checkout_date.cmp(&a.checkout_date));
        all
    }

    /// Active loans past their due date at `now`, most overdue first.
    pub fn overdue_loans(&self, now: DateTime<Utc>) -> Vec<Loan> {
        let mut overdue: Vec<Loan> = self
            .loans
            .iter()
            .filter(|l| l.is_overdue(now))
            .map(|l| l.value().clone())
            .collect();
        overdue.sort_by_key(|l| l.due_date);
        overdue
    }

    /// A borrower's loans, open and closed, newest checkout first.
    pub fn loans_by_borrower(&self, borrower_id: BorrowerId) -> Vec<Loan> {
        let mut found: Vec<Loan> = self
            .loans
            .iter()
            .filter(|l| l.borrower_id == borrower_id)
            .map(|l| l.value().clone())
            .collect();
        found.sort_by(|a, b| b.checkout_date.cmp(&a.checkout_date));
        found
    }

    /// A borrower's active loans, soonest due first.
    pub fn active_loans_by_borrower(&self, borrower_id: BorrowerId) -> Vec<Loan> {
        let mut found: Vec<Loan> = self
            .loans
            .iter()
            .filter(|l| l.borrower_id == borrower_id && l.is_active())
            .map(|l| l.value().clone())
            .collect();
        found.sort_by_key(|l| l.due_date);
        found
    }

    // === Reservations ===

    /// Admits a borrower into an item's waiting list.
    pub fn reserve(
        &self,
        item_id: ItemId,
        borrower_id: BorrowerId,
    ) -> Result<Reservation, CirculationError> {
        self.reserve_at(item_id, borrower_id, Utc::now())
    }

    /// Reservation with an explicit clock.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::ItemNotFound`] - unknown item.
    /// - [`CirculationError::ItemInactive`] - item retired.
    pub fn reserve_at(
        &self,
        item_id: ItemId,
        borrower_id: BorrowerId,
        now: DateTime<Utc>,
    ) -> Result<Reservation, CirculationError> {
        {
            let item = self
                .inventory
                .get(&item_id)
                .ok_or(CirculationError::ItemNotFound)?;
            if !item.is_active() {
                return Err(CirculationError::ItemInactive);
            }
        }

        let reservation =
            self.queue
                .create_at(item_id, borrower_id, now, self.policy.reservation_window);
        info!(
            reservation = %reservation.reservation_id,
            item = %item_id,
            borrower = %borrower_id,
            position = reservation.queue_position,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Moves a pending reservation to a terminal status (e.g. `Fulfilled`
    /// once the external claim step completes).
    pub fn update_reservation_status(
        &self,
        reservation_id: ReservationId,
        new_status: ReservationStatus,
    ) -> Result<Reservation, CirculationError> {
        let updated = self.queue.update_status(reservation_id, new_status)?;
        info!(reservation = %reservation_id, status = ?new_status, "reservation status updated");
        Ok(updated)
    }

    /// Cancels a pending reservation.
    pub fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Reservation, CirculationError> {
        let cancelled = self.queue.cancel(reservation_id)?;
        info!(reservation = %reservation_id, "reservation cancelled");
        Ok(cancelled)
    }

    /// Retrieves a reservation by ID.
    pub fn get_reservation(&self, reservation_id: &ReservationId) -> Option<Reservation> {
        self.queue.get(reservation_id)
    }

    /// Pending reservations for an item in FIFO order; the head is the
    /// next claimant when a copy becomes available.
    pub fn pending_reservations(&self, item_id: ItemId) -> Vec<Reservation> {
        self.queue.pending_ordered(item_id)
    }

    /// All reservations for an item, by queue position.
    pub fn reservations_for_item(&self, item_id: ItemId) -> Vec<Reservation> {
        self.queue.for_item(item_id)
    }

    /// A borrower's reservations, newest first, excluding cancelled ones.
    pub fn reservations_by_borrower(&self, borrower_id: BorrowerId) -> Vec<Reservation> {
        self.queue.by_borrower(borrower_id)
    }

    // === Sweep primitives ===

    /// Overwrites the fee projection on every overdue active loan with the
    /// value freshly computed at `now`.
    ///
    /// Returns the number of loans touched. Recomputation (rather than
    /// additive accrual) makes this idempotent: any number of runs at the
    /// same instant store the same values.
    pub fn recompute_late_fees_at(&self, now: DateTime<Utc>) -> usize {
        let mut touched = 0;
        for mut loan in self.loans.iter_mut() {
            if loan.is_overdue(now) {
                let fee = self.fees.fee_at(loan.due_date, now);
                loan.late_fee = Some(fee);
                touched += 1;
            }
        }
        debug!(loans = touched, "late fees recomputed");
        touched
    }

    /// Expires pending reservations whose window elapsed before `now`.
    ///
    /// Returns the number expired. Idempotent.
    pub fn process_expired_reservations_at(&self, now: DateTime<Utc>) -> usize {
        let expired = self.queue.process_expired(now);
        debug!(reservations = expired, "expired reservations processed");
        expired
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
