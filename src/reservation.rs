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

//! Reservation records.
//!
//! A reservation follows the state machine:
//! - [`Pending`] → [`Fulfilled`] (copy claimed)
//! - [`Pending`] → [`Cancelled`] (borrower backed out)
//! - [`Pending`] → [`Expired`] (window elapsed, via sweep)
//!
//! All three targets are terminal.
//!
//! [`Pending`]: ReservationStatus::Pending
//! [`Fulfilled`]: ReservationStatus::Fulfilled
//! [`Cancelled`]: ReservationStatus::Cancelled
//! [`Expired`]: ReservationStatus::Expired

use crate::base::{BorrowerId, ItemId, ReservationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a reservation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReservationStatus {
    Pending,
    Fulfilled,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    /// Every status except `Pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }
}

/// A borrower's place in line for an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub item_id: ItemId,
    pub borrower_id: BorrowerId,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Rank among reservations for this item, 1 = next. Unique and
    /// gap-free per item in creation order.
    pub queue_position: u32,
}

impl Reservation {
    pub fn new(
        reservation_id: ReservationId,
        item_id: ItemId,
        borrower_id: BorrowerId,
        reservation_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
        queue_position: u32,
    ) -> Self {
        Self {
            reservation_id,
            item_id,
            borrower_id,
            reservation_date,
            expiry_date,
            status: ReservationStatus::Pending,
            queue_position,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    /// Whether the reservation is pending and past its expiry at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expiry_date < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn new_reservation_is_pending() {
        let r = Reservation::new(ReservationId(1), ItemId(1), BorrowerId(1), at(1), at(8), 1);
        assert!(r.is_pending());
        assert_eq!(r.queue_position, 1);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(ReservationStatus::Fulfilled.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
    }

    #[test]
    fn stale_only_past_expiry() {
        let r = Reservation::new(ReservationId(1), ItemId(1), BorrowerId(1), at(1), at(8), 1);
        assert!(!r.is_stale(at(5)));
        assert!(!r.is_stale(at(8)));
        assert!(r.is_stale(at(9)));
    }

    #[test]
    fn terminal_reservation_is_never_stale() {
        let mut r = Reservation::new(ReservationId(1), ItemId(1), BorrowerId(1), at(1), at(8), 1);
        r.status = ReservationStatus::Cancelled;
        assert!(!r.is_stale(at(20)));
    }
}
