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

//! Late-fee computation.
//!
//! The fee for an overdue loan is a pure function of `(due_date, now)`:
//!
//! ```text
//! fee = fee_per_day * max(0, whole days of (now - due_date))
//! ```
//!
//! Callers overwrite the stored fee with this value instead of adding to
//! it, so recomputing any number of times at the same instant stores the
//! same amount. An accrual that adds on every sweep is not idempotent and
//! double-counts across repeated sweeps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Derives late fees for overdue loans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeCalculator {
    fee_per_day: Decimal,
}

impl FeeCalculator {
    pub fn new(fee_per_day: Decimal) -> Self {
        Self { fee_per_day }
    }

    pub fn fee_per_day(&self) -> Decimal {
        self.fee_per_day
    }

    /// Whole days the loan is past due at `now`. Never negative.
    pub fn days_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (now - due_date).num_days().max(0)
    }

    /// The full late fee owed at `now` for a loan due at `due_date`.
    ///
    /// Loans returned on time (or not yet due) owe zero.
    pub fn fee_at(&self, due_date: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
        Decimal::from(Self::days_overdue(due_date, now)) * self.fee_per_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn fee_is_zero_before_due_date() {
        let fees = FeeCalculator::new(dec!(1.00));
        assert_eq!(fees.fee_at(at(10), at(5)), Decimal::ZERO);
    }

    #[test]
    fn fee_is_zero_on_due_date() {
        let fees = FeeCalculator::new(dec!(1.00));
        assert_eq!(fees.fee_at(at(10), at(10)), Decimal::ZERO);
    }

    #[test]
    fn fee_counts_whole_days_only() {
        let fees = FeeCalculator::new(dec!(1.00));
        // 23 hours past due is still zero whole days
        let due = at(10);
        let now = due + Duration::hours(23);
        assert_eq!(fees.fee_at(due, now), Decimal::ZERO);

        let now = due + Duration::hours(25);
        assert_eq!(fees.fee_at(due, now), dec!(1.00));
    }

    #[test]
    fn ten_days_overdue_at_one_per_day() {
        let fees = FeeCalculator::new(dec!(1.00));
        assert_eq!(fees.fee_at(at(10), at(20)), dec!(10.00));
    }

    #[test]
    fn fractional_daily_rate() {
        let fees = FeeCalculator::new(dec!(0.50));
        assert_eq!(fees.fee_at(at(10), at(17)), dec!(3.50));
    }

    #[test]
    fn recomputation_is_idempotent() {
        let fees = FeeCalculator::new(dec!(1.00));
        let first = fees.fee_at(at(1), at(11));
        let second = fees.fee_at(at(1), at(11));
        assert_eq!(first, second);
        assert_eq!(first, dec!(10.00));
    }
}
