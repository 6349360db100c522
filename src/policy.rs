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

//! Circulation policy configuration.
//!
//! A single immutable value passed at engine construction. There is no
//! module-level mutable state; every lifecycle decision that is a policy
//! rather than an invariant (fee rate, renewal period and cap, reservation
//! window) lives here.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Lending and reservation policy knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CirculationPolicy {
    /// Fee charged per whole day a loan is overdue.
    pub fee_per_day: Decimal,
    /// How far a renewal pushes the due date out.
    pub renewal_period: Duration,
    /// Maximum number of renewals per loan.
    pub max_renewals: u32,
    /// How long a reservation stays claimable before it expires.
    pub reservation_window: Duration,
}

impl CirculationPolicy {
    /// Default daily late fee.
    pub const DEFAULT_FEE_PER_DAY: Decimal = dec!(1.00);

    /// Default renewal period in days.
    pub const DEFAULT_RENEWAL_DAYS: i64 = 14;

    /// Default renewal cap per loan.
    pub const DEFAULT_MAX_RENEWALS: u32 = 2;

    /// Default reservation window in days.
    pub const DEFAULT_RESERVATION_DAYS: i64 = 7;
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            fee_per_day: Self::DEFAULT_FEE_PER_DAY,
            renewal_period: Duration::days(Self::DEFAULT_RENEWAL_DAYS),
            max_renewals: Self::DEFAULT_MAX_RENEWALS,
            reservation_window: Duration::days(Self::DEFAULT_RESERVATION_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_values() {
        let policy = CirculationPolicy::default();
        assert_eq!(policy.fee_per_day, dec!(1.00));
        assert_eq!(policy.renewal_period, Duration::days(14));
        assert_eq!(policy.max_renewals, 2);
        assert_eq!(policy.reservation_window, Duration::days(7));
    }
}
