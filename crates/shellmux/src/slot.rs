//! ID tables with tombstones
//!
//! IDs come from a wrapping counter and get recycled, so a table has to
//! tell three cases apart: an ID it never handed out, an ID that is live,
//! and an ID that was live once and has since expired.

use std::collections::HashMap;
use std::hash::Hash;

/// Integer ID with a wrapping successor
pub trait SlotId: Copy + Eq + Hash + std::fmt::Debug {
    /// Next ID after `self`, wrapping at the end of the range
    fn successor(self) -> Self;
}

impl SlotId for u32 {
    fn successor(self) -> Self {
        self.wrapping_add(1)
    }
}

impl SlotId for u64 {
    fn successor(self) -> Self {
        self.wrapping_add(1)
    }
}

/// Stored state of an ID that has been handed out
#[derive(Debug)]
enum Slot<T> {
    Live(T),
    Expired,
}

/// Result of looking an ID up
#[derive(Debug, PartialEq, Eq)]
pub enum SlotState<T> {
    /// Never allocated by this table
    Unused,
    /// Allocated and still live
    Live(T),
    /// Allocated once, now tombstoned
    Expired,
}

/// Table of IDs with their own allocation counter
#[derive(Debug)]
pub struct SlotTable<K, T> {
    next_id: K,
    slots: HashMap<K, Slot<T>>,
}

impl<K: SlotId, T> SlotTable<K, T> {
    /// Create an empty table whose first allocation is `first`
    pub fn starting_at(first: K) -> Self {
        Self {
            next_id: first,
            slots: HashMap::new(),
        }
    }

    /// Allocate the next ID not held by a live entry and store `make(id)` under it
    pub fn allocate(&mut self, make: impl FnOnce(K) -> T) -> K {
        self.allocate_with(|id| (make(id), ())).0
    }

    /// Like [`allocate`](Self::allocate), also passing a side value out of `make`
    pub fn allocate_with<R>(&mut self, make: impl FnOnce(K) -> (T, R)) -> (K, R) {
        let id = loop {
            let candidate = self.next_id;
            self.next_id = candidate.successor();
            if !matches!(self.slots.get(&candidate), Some(Slot::Live(_))) {
                break candidate;
            }
        };
        let (value, extra) = make(id);
        self.slots.insert(id, Slot::Live(value));
        (id, extra)
    }

    /// Look an ID up
    pub fn lookup(&self, id: K) -> SlotState<&T> {
        match self.slots.get(&id) {
            None => SlotState::Unused,
            Some(Slot::Expired) => SlotState::Expired,
            Some(Slot::Live(value)) => SlotState::Live(value),
        }
    }

    /// Tombstone a live entry, returning its value
    pub fn expire(&mut self, id: K) -> Option<T> {
        self.expire_if(id, |_| true)
    }

    /// Tombstone a live entry only if `pred` accepts it
    ///
    /// Used by owners of one generation of an ID so they never expire a
    /// newer entry that recycled it.
    pub fn expire_if(&mut self, id: K, pred: impl FnOnce(&T) -> bool) -> Option<T> {
        match self.slots.get(&id) {
            Some(Slot::Live(value)) if pred(value) => {}
            _ => return None,
        }
        match self.slots.insert(id, Slot::Expired) {
            Some(Slot::Live(value)) => Some(value),
            _ => None,
        }
    }

    /// Tombstone every live entry and return them
    pub fn take_live(&mut self) -> Vec<(K, T)> {
        let ids = self.live_ids();
        ids.into_iter()
            .filter_map(|id| self.expire(id).map(|value| (id, value)))
            .collect()
    }

    /// Forget every entry, live or expired
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// IDs of all live entries
    pub fn live_ids(&self) -> Vec<K> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Live(_)))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of live entries
    pub fn live_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn rewind(&mut self, next_id: K) {
        self.next_id = next_id;
    }
}

impl<K: SlotId + Default, T> Default for SlotTable<K, T> {
    fn default() -> Self {
        Self::starting_at(K::default())
    }
}
