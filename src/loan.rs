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

//! Loan records.
//!
//! A loan follows a two-state machine:
//! - [`Active`] → [`Returned`] (via return)
//!
//! [`Returned`] is terminal. Loans are never deleted; a closed loan is a
//! permanent historical record.
//!
//! [`Active`]: LoanStatus::Active
//! [`Returned`]: LoanStatus::Returned

use crate::base::{BorrowerId, ItemId, LoanId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a loan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Returned,
}

/// One copy lent to one borrower for a bounded period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Loan {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub borrower_id: BorrowerId,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub renewal_count: u32,
    /// `None` until the first fee accrual. While the loan is active the
    /// stored fee is a projection, freely recomputable; it locks in at
    /// return time.
    pub late_fee: Option<Decimal>,
}

impl Loan {
    pub fn new(
        loan_id: LoanId,
        item_id: ItemId,
        borrower_id: BorrowerId,
        checkout_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            loan_id,
            item_id,
            borrower_id,
            checkout_date,
            due_date,
            return_date: None,
            status: LoanStatus::Active,
            renewal_count: 0,
            late_fee: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// Whether the loan is active and past its due date at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date < now
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
    fn new_loan_is_active_with_no_fee() {
        let loan = Loan::new(LoanId(1), ItemId(1), BorrowerId(1), at(1), at(15));
        assert!(loan.is_active());
        assert_eq!(loan.renewal_count, 0);
        assert_eq!(loan.late_fee, None);
        assert_eq!(loan.return_date, None);
    }

    #[test]
    fn overdue_only_after_due_date() {
        let loan = Loan::new(LoanId(1), ItemId(1), BorrowerId(1), at(1), at(15));
        assert!(!loan.is_overdue(at(10)));
        assert!(!loan.is_overdue(at(15)));
        assert!(loan.is_overdue(at(16)));
    }

    #[test]
    fn returned_loan_is_never_overdue() {
        let mut loan = Loan::new(LoanId(1), ItemId(1), BorrowerId(1), at(1), at(15));
        loan.status = LoanStatus::Returned;
        loan.return_date = Some(at(20));
        assert!(!loan.is_overdue(at(25)));
    }
}
