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

//! Inventory ledger.
//!
//! The [`InventoryLedger`] is the only component permitted to mutate an
//! item's copy counters. Items are held in a [`DashMap`] so operations on
//! different items proceed fully in parallel; mutations to a single item's
//! counters are serialized by the item's own mutex (see [`Item`]).

use crate::base::ItemId;
use crate::error::CirculationError;
use crate::item::Item;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Owns the total/available-copy counters for every registered item.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    items: DashMap<ItemId, Item>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Registers an item with a full shelf of copies.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::NoCopies`] - `total_copies` is zero.
    /// - [`CirculationError::DuplicateItem`] - the ID is already registered.
    pub fn add_item(&self, item_id: ItemId, total_copies: u32) -> Result<(), CirculationError> {
        if total_copies == 0 {
            return Err(CirculationError::NoCopies);
        }

        // Entry API for atomic check-and-insert, so two concurrent
        // registrations of the same ID cannot both succeed.
        match self.items.entry(item_id) {
            Entry::Occupied(_) => Err(CirculationError::DuplicateItem),
            Entry::Vacant(entry) => {
                entry.insert(Item::new(item_id, total_copies));
                Ok(())
            }
        }
    }

    /// Atomically claims one copy of an item for a checkout.
    ///
    /// # Errors
    ///
    /// - [`CirculationError::ItemNotFound`] - unknown item ID.
    /// - [`CirculationError::ItemInactive`] - item retired from circulation.
    /// - [`CirculationError::OutOfStock`] - no copies on the shelf.
    pub fn reserve_copy(&self, item_id: ItemId) -> Result<(), CirculationError> {
        let item = self
            .items
            .get(&item_id)
            .ok_or(CirculationError::ItemNotFound)?;
        item.reserve_copy()
    }

    /// Puts one copy of an item back on the shelf.
    ///
    /// Never fails for a registered item; a duplicate release is absorbed
    /// by the clamp in [`Item::release_copy`].
    pub fn release_copy(&self, item_id: ItemId) -> Result<(), CirculationError> {
        let item = self
            .items
            .get(&item_id)
            .ok_or(CirculationError::ItemNotFound)?;
        item.release_copy();
        Ok(())
    }

    /// Takes an item out of circulation. Existing loans are unaffected.
    pub fn retire_item(&self, item_id: ItemId) -> Result<(), CirculationError> {
        let item = self
            .items
            .get(&item_id)
            .ok_or(CirculationError::ItemNotFound)?;
        item.retire();
        Ok(())
    }

    /// Puts a retired item back into circulation.
    pub fn reactivate_item(&self, item_id: ItemId) -> Result<(), CirculationError> {
        let item = self
            .items
            .get(&item_id)
            .ok_or(CirculationError::ItemNotFound)?;
        item.reactivate();
        Ok(())
    }

    /// Retrieves an item by ID.
    pub fn get(&self, item_id: &ItemId) -> Option<dashmap::mapref::one::Ref<'_, ItemId, Item>> {
        self.items.get(item_id)
    }

    /// Returns an iterator over all registered items.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, ItemId, Item>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_item_registers_full_stock() {
        let ledger = InventoryLedger::new();
        ledger.add_item(ItemId(1), 3).unwrap();

        let item = ledger.get(&ItemId(1)).unwrap();
        assert_eq!(item.total_copies(), 3);
        assert_eq!(item.available_copies(), 3);
    }

    #[test]
    fn add_item_rejects_zero_copies() {
        let ledger = InventoryLedger::new();
        assert_eq!(
            ledger.add_item(ItemId(1), 0),
            Err(CirculationError::NoCopies)
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn add_item_rejects_duplicate_id() {
        let ledger = InventoryLedger::new();
        ledger.add_item(ItemId(1), 3).unwrap();
        assert_eq!(
            ledger.add_item(ItemId(1), 5),
            Err(CirculationError::DuplicateItem)
        );

        // The original registration is untouched.
        assert_eq!(ledger.get(&ItemId(1)).unwrap().total_copies(), 3);
    }

    #[test]
    fn reserve_on_unknown_item_fails() {
        let ledger = InventoryLedger::new();
        assert_eq!(
            ledger.reserve_copy(ItemId(9)),
            Err(CirculationError::ItemNotFound)
        );
    }

    #[test]
    fn release_on_unknown_item_fails() {
        let ledger = InventoryLedger::new();
        assert_eq!(
            ledger.release_copy(ItemId(9)),
            Err(CirculationError::ItemNotFound)
        );
    }

    #[test]
    fn retire_blocks_reserve_but_not_release() {
        let ledger = InventoryLedger::new();
        ledger.add_item(ItemId(1), 2).unwrap();
        ledger.reserve_copy(ItemId(1)).unwrap();
        ledger.retire_item(ItemId(1)).unwrap();

        assert_eq!(
            ledger.reserve_copy(ItemId(1)),
            Err(CirculationError::ItemInactive)
        );
        ledger.release_copy(ItemId(1)).unwrap();
        assert_eq!(ledger.get(&ItemId(1)).unwrap().available_copies(), 2);
    }
}
