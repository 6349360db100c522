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

//! Per-item reservation queues.
//!
//! The [`ReservationQueue`] owns every reservation record and the per-item
//! position counters. Position assignment uses the [`DashMap`] entry API:
//! the counter's shard guard is held across read-increment-write, so
//! concurrent admissions for the same item get distinct consecutive
//! positions with no duplicates and no gaps.

use crate::base::{BorrowerId, ItemId, ReservationId};
use crate::error::CirculationError;
use crate::reservation::{Reservation, ReservationStatus};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Owns per-item waiting lists, assigns queue positions, and expires stale
/// entries.
#[derive(Debug)]
pub struct ReservationQueue {
    /// All reservation records, open and closed, by ID.
    reservations: DashMap<ReservationId, Reservation>,
    /// Highest queue position handed out so far, per item.
    positions: DashMap<ItemId, u32>,
    /// Source of fresh reservation IDs.
    next_id: AtomicU64,
}

impl ReservationQueue {
    pub fn new() -> Self {
        Self {
            reservations: DashMap::new(),
            positions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Admits a borrower into an item's waiting list.
    ///
    /// The new reservation is `Pending`, expires at `now + window`, and
    /// takes the next queue position for the item.
    pub fn create_at(
        &self,
        item_id: ItemId,
        borrower_id: BorrowerId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Reservation {
        // Hold the counter's entry guard across the increment so racing
        // admissions for one item serialize here.
        let queue_position = {
            let mut slot = self.positions.entry(item_id).or_insert(0);
            *slot += 1;
            *slot
        };

        let reservation_id = ReservationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let reservation = Reservation::new(
            reservation_id,
            item_id,
            borrower_id,
            now,
            now + window,
            queue_position,
        );
        self.reservations
            .insert(reservation_id, reservation.clone());
        reservation
    }

    /// Moves a pending reservation to a terminal status.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::ReservationNotFound`] - unknown ID.
    /// - [`CirculationError::InvalidTransition`] - `new_status` is `Pending`.
    /// - [`CirculationError::ReservationNotPending`] - already terminal.
    pub fn update_status(
        &self,
        reservation_id: ReservationId,
        new_status: ReservationStatus,
    ) -> Result<Reservation, CirculationError> {
        if !new_status.is_terminal() {
            return Err(CirculationError::InvalidTransition);
        }

        let mut reservation = self
            .reservations
            .get_mut(&reservation_id)
            .ok_or(CirculationError::ReservationNotFound)?;
        if reservation.status.is_terminal() {
            return Err(CirculationError::ReservationNotPending);
        }

        reservation.status = new_status;
        Ok(reservation.clone())
    }

    /// Cancels a pending reservation.
    pub fn cancel(&self, reservation_id: ReservationId) -> Result<Reservation, CirculationError> {
        self.update_status(reservation_id, ReservationStatus::Cancelled)
    }

    /// Expires every pending reservation whose window has elapsed at `now`.
    ///
    /// Returns the number of reservations flipped. Idempotent: entries
    /// already terminal are untouched, so overlapping sweeps are safe.
    pub fn process_expired(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for mut reservation in self.reservations.iter_mut() {
            if reservation.is_stale(now) {
                reservation.status = ReservationStatus::Expired;
                expired += 1;
            }
        }
        expired
    }

    /// Retrieves a reservation by ID.
    pub fn get(&self, reservation_id: &ReservationId) -> Option<Reservation> {
        self.reservations
            .get(reservation_id)
            .map(|r| r.value().clone())
    }

    /// Pending reservations for an item in FIFO order by queue position.
    ///
    /// The head of the list is the contractual next claimant when a copy
    /// becomes available.
    pub fn pending_ordered(&self, item_id: ItemId) -> Vec<Reservation> {
        let mut pending: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.item_id == item_id && r.is_pending())
            .map(|r| r.value().clone())
            .collect();
        pending.sort_by_key(|r| r.queue_position);
        pending
    }

    /// All reservations for an item, open and closed, by queue position.
    pub fn for_item(&self, item_id: ItemId) -> Vec<Reservation> {
        let mut all: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| r.value().clone())
            .collect();
        all.sort_by_key(|r| r.queue_position);
        all
    }

    /// A borrower's reservations, newest first, excluding cancelled ones.
    pub fn by_borrower(&self, borrower_id: BorrowerId) -> Vec<Reservation> {
        let mut found: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| {
                r.borrower_id == borrower_id && r.status != ReservationStatus::Cancelled
            })
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| b.reservation_date.cmp(&a.reservation_date));
        found
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

impl Default for ReservationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0).unwrap()
    }

    fn week() -> Duration {
        Duration::days(7)
    }

    #[test]
    fn positions_count_up_from_one() {
        let queue = ReservationQueue::new();
        let first = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        let second = queue.create_at(ItemId(1), BorrowerId(2), at(1), week());
        assert_eq!(first.queue_position, 1);
        assert_eq!(second.queue_position, 2);
    }

    #[test]
    fn positions_are_independent_per_item() {
        let queue = ReservationQueue::new();
        queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        let other = queue.create_at(ItemId(2), BorrowerId(1), at(1), week());
        assert_eq!(other.queue_position, 1);
    }

    #[test]
    fn cancelled_position_is_not_reused() {
        let queue = ReservationQueue::new();
        let first = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        queue.cancel(first.reservation_id).unwrap();
        let second = queue.create_at(ItemId(1), BorrowerId(2), at(1), week());
        assert_eq!(second.queue_position, 2);
    }

    #[test]
    fn expiry_is_reservation_date_plus_window() {
        let queue = ReservationQueue::new();
        let r = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        assert_eq!(r.expiry_date, at(8));
    }

    #[test]
    fn update_status_rejects_pending_target() {
        let queue = ReservationQueue::new();
        let r = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        assert_eq!(
            queue.update_status(r.reservation_id, ReservationStatus::Pending),
            Err(CirculationError::InvalidTransition)
        );
    }

    #[test]
    fn update_status_rejects_second_transition() {
        let queue = ReservationQueue::new();
        let r = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        queue
            .update_status(r.reservation_id, ReservationStatus::Fulfilled)
            .unwrap();
        assert_eq!(
            queue.cancel(r.reservation_id),
            Err(CirculationError::ReservationNotPending)
        );

        // Still fulfilled.
        assert_eq!(
            queue.get(&r.reservation_id).unwrap().status,
            ReservationStatus::Fulfilled
        );
    }

    #[test]
    fn process_expired_flips_only_stale_pendings() {
        let queue = ReservationQueue::new();
        let stale = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        let fresh = queue.create_at(ItemId(1), BorrowerId(2), at(10), week());
        let cancelled = queue.create_at(ItemId(1), BorrowerId(3), at(1), week());
        queue.cancel(cancelled.reservation_id).unwrap();

        let flipped = queue.process_expired(at(12));
        assert_eq!(flipped, 1);
        assert_eq!(
            queue.get(&stale.reservation_id).unwrap().status,
            ReservationStatus::Expired
        );
        assert_eq!(
            queue.get(&fresh.reservation_id).unwrap().status,
            ReservationStatus::Pending
        );
        assert_eq!(
            queue.get(&cancelled.reservation_id).unwrap().status,
            ReservationStatus::Cancelled
        );

        // Re-running at the same instant changes nothing.
        assert_eq!(queue.process_expired(at(12)), 0);
    }

    #[test]
    fn pending_ordered_is_fifo_and_skips_closed() {
        let queue = ReservationQueue::new();
        let first = queue.create_at(ItemId(1), BorrowerId(1), at(1), week());
        let second = queue.create_at(ItemId(1), BorrowerId(2), at(1), week());
        let third = queue.create_at(ItemId(1), BorrowerId(3), at(1), week());
        queue.cancel(second.reservation_id).unwrap();

        let pending = queue.pending_ordered(ItemId(1));
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].reservation_id, first.reservation_id);
        assert_eq!(pending[1].reservation_id, third.reservation_id);
    }

    #[test]
    fn by_borrower_excludes_cancelled() {
        let queue = ReservationQueue::new();
        let kept = queue.create_at(ItemId(1), BorrowerId(7), at(1), week());
        let dropped = queue.create_at(ItemId(2), BorrowerId(7), at(2), week());
        queue.cancel(dropped.reservation_id).unwrap();
        queue.create_at(ItemId(1), BorrowerId(8), at(1), week());

        let found = queue.by_borrower(BorrowerId(7));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reservation_id, kept.reservation_id);
    }
}
