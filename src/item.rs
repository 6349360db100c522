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

//! Per-item copy accounting.
//!
//! An [`Item`] owns the copy counters for one circulating title. The
//! counters are guarded by a mutex so that check-and-decrement at checkout
//! is indivisible with respect to concurrent callers: two checkouts racing
//! for the last copy can never both succeed.

use crate::base::ItemId;
use crate::error::CirculationError;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeStruct, Serializer};

#[derive(Debug)]
struct ItemData {
    item_id: ItemId,
    total_copies: u32,
    available_copies: u32,
    active: bool,
}

impl ItemData {
    fn new(item_id: ItemId, total_copies: u32) -> Self {
        Self {
            item_id,
            total_copies,
            available_copies: total_copies,
            active: true,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.available_copies <= self.total_copies,
            "Invariant violated: available copies {} exceed total {}",
            self.available_copies,
            self.total_copies
        );
    }

    /// Claims one copy for a checkout.
    fn reserve_copy(&mut self) -> Result<(), CirculationError> {
        if !self.active {
            return Err(CirculationError::ItemInactive);
        }
        if self.available_copies == 0 {
            return Err(CirculationError::OutOfStock);
        }
        self.available_copies -= 1;
        self.assert_invariants();
        Ok(())
    }

    /// Returns one copy to the shelf, clamped to the total.
    ///
    /// The clamp protects against a duplicate release call; retired items
    /// still accept returns.
    fn release_copy(&mut self) {
        if self.available_copies < self.total_copies {
            self.available_copies += 1;
        }
        self.assert_invariants();
    }

    fn retire(&mut self) {
        self.active = false;
    }

    fn reactivate(&mut self) {
        self.active = true;
    }
}

/// A circulating item with a finite copy count.
#[derive(Debug)]
pub struct Item {
    inner: Mutex<ItemData>,
}

impl Item {
    pub fn new(item_id: ItemId, total_copies: u32) -> Self {
        Self {
            inner: Mutex::new(ItemData::new(item_id, total_copies)),
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.inner.lock().item_id
    }

    pub fn total_copies(&self) -> u32 {
        self.inner.lock().total_copies
    }

    pub fn available_copies(&self) -> u32 {
        self.inner.lock().available_copies
    }

    /// Returns `total - available`, the count of copies currently on loan.
    pub fn copies_on_loan(&self) -> u32 {
        let data = self.inner.lock();
        data.total_copies - data.available_copies
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    pub fn reserve_copy(&self) -> Result<(), CirculationError> {
        self.inner.lock().reserve_copy()
    }

    pub fn release_copy(&self) {
        self.inner.lock().release_copy()
    }

    pub fn retire(&self) {
        self.inner.lock().retire()
    }

    pub fn reactivate(&self) {
        self.inner.lock().reactivate()
    }
}

impl Serialize for Item {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Item", 4)?;
        state.serialize_field("item", &data.item_id)?;
        state.serialize_field("total", &data.total_copies)?;
        state.serialize_field("available", &data.available_copies)?;
        state.serialize_field("active", &data.active)?;
        state.end()
    }
}
