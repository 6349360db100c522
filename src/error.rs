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

//! Error types for lending and reservation operations.
//!
//! "No data" is never conflated with "operation failed": lookups that may
//! legitimately find nothing return `Option`, while operations that require
//! a record to exist fail with an explicit not-found variant.

use thiserror::Error;

/// Lending and reservation processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CirculationError {
    /// Referenced item does not exist
    #[error("item not found")]
    ItemNotFound,

    /// Referenced loan does not exist
    #[error("loan not found")]
    LoanNotFound,

    /// Referenced reservation does not exist
    #[error("reservation not found")]
    ReservationNotFound,

    /// No available copies at checkout
    #[error("no available copies")]
    OutOfStock,

    /// Item has been retired from circulation
    #[error("item is not in circulation")]
    ItemInactive,

    /// Loan is already returned
    #[error("loan is not active")]
    LoanNotActive,

    /// Renewal refused because the loan is past its due date
    #[error("loan is overdue and cannot be renewed")]
    LoanOverdue,

    /// Renewal refused because the renewal cap has been reached
    #[error("renewal limit reached")]
    RenewalLimitReached,

    /// Reservation has already reached a terminal status
    #[error("reservation is not pending")]
    ReservationNotPending,

    /// Requested reservation status change is not a legal transition
    #[error("reservation status can only move from pending to a terminal status")]
    InvalidTransition,

    /// Due date is not after the checkout date
    #[error("due date must be after the checkout date")]
    InvalidDueDate,

    /// Item identifier is already registered
    #[error("duplicate item ID")]
    DuplicateItem,

    /// Item registered without any copies
    #[error("item must have at least one copy")]
    NoCopies,
}

#[cfg(test)]
mod tests {
    use super::CirculationError;

    #[test]
    fn error_display_messages() {
        assert_eq!(CirculationError::ItemNotFound.to_string(), "item not found");
        assert_eq!(CirculationError::LoanNotFound.to_string(), "loan not found");
        assert_eq!(
            CirculationError::ReservationNotFound.to_string(),
            "reservation not found"
        );
        assert_eq!(
            CirculationError::OutOfStock.to_string(),
            "no available copies"
        );
        assert_eq!(
            CirculationError::ItemInactive.to_string(),
            "item is not in circulation"
        );
        assert_eq!(
            CirculationError::LoanNotActive.to_string(),
            "loan is not active"
        );
        assert_eq!(
            CirculationError::LoanOverdue.to_string(),
            "loan is overdue and cannot be renewed"
        );
        assert_eq!(
            CirculationError::RenewalLimitReached.to_string(),
            "renewal limit reached"
        );
        assert_eq!(
            CirculationError::ReservationNotPending.to_string(),
            "reservation is not pending"
        );
        assert_eq!(
            CirculationError::InvalidTransition.to_string(),
            "reservation status can only move from pending to a terminal status"
        );
        assert_eq!(
            CirculationError::InvalidDueDate.to_string(),
            "due date must be after the checkout date"
        );
        assert_eq!(
            CirculationError::DuplicateItem.to_string(),
            "duplicate item ID"
        );
        assert_eq!(
            CirculationError::NoCopies.to_string(),
            "item must have at least one copy"
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = CirculationError::OutOfStock;
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
