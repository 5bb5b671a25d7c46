//! Generational arena backing the binding service's handle tables.
//!
//! A [`HandleVec`] hands out `u32` handles that pack a slot index and a
//! generation counter. Removing an entry bumps the slot's generation, so any
//! handle issued before the removal fails lookup afterwards instead of
//! aliasing whatever reuses the slot. This is the arena+index pattern the
//! whole binding graph is built on: edges are handles, never owning
//! references, which is what makes cyclic two-way bindings safe to express.
//!
//! # Invariants
//!
//! 1. A valid handle is never `0` (generations start at 1).
//! 2. A handle stays valid until its entry is removed, and never again after.
//! 3. Lookup with a stale or foreign handle returns `None`; it never panics.
//! 4. While no entries have been removed, `iter_handles` yields entries in
//!    insertion order.

use core::fmt;

/// Number of low bits used for the slot index (~1M live entries).
const INDEX_BITS: u32 = 20;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const MAX_GENERATION: u32 = (1 << (32 - INDEX_BITS)) - 1;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<T>,
}

/// A generational arena issuing `u32` handles.
pub struct HandleVec<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> HandleVec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Insert an entry and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if the arena exceeds the index capacity (2^20 live slots).
    pub fn insert(&mut self, value: T) -> u32 {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.entry.is_none());
            slot.entry = Some(value);
            return pack(slot.generation, index);
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        assert!(index <= INDEX_MASK, "HandleVec capacity exceeded");
        self.slots.push(Slot {
            generation: 1,
            entry: Some(value),
        });
        pack(1, index)
    }

    /// Look up an entry; `None` for stale or invalid handles.
    #[must_use]
    pub fn try_get(&self, handle: u32) -> Option<&T> {
        let (generation, index) = unpack(handle);
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Mutable lookup; `None` for stale or invalid handles.
    #[must_use]
    pub fn try_get_mut(&mut self, handle: u32) -> Option<&mut T> {
        let (generation, index) = unpack(handle);
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Whether the handle currently designates a live entry.
    #[must_use]
    pub fn contains(&self, handle: u32) -> bool {
        self.try_get(handle).is_some()
    }

    /// Remove an entry, invalidating its handle.
    pub fn remove(&mut self, handle: u32) -> Option<T> {
        let (generation, index) = unpack(handle);
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = next_generation(slot.generation);
        self.free.push(index);
        self.len -= 1;
        Some(entry)
    }

    /// Remove every entry, invalidating all outstanding handles.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = next_generation(slot.generation);
                self.free.push(index as u32);
            }
        }
        self.len = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over `(handle, entry)` pairs in slot order.
    pub fn iter_handles(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .map(|entry| (pack(slot.generation, index as u32), entry))
        })
    }

    /// Collect the handles of all live entries in slot order.
    #[must_use]
    pub fn handles(&self) -> Vec<u32> {
        self.iter_handles().map(|(handle, _)| handle).collect()
    }
}

impl<T> Default for HandleVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for HandleVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter_handles().map(|(h, e)| (h, e)))
            .finish()
    }
}

const fn pack(generation: u32, index: u32) -> u32 {
    (generation << INDEX_BITS) | index
}

const fn unpack(handle: u32) -> (u32, u32) {
    (handle >> INDEX_BITS, handle & INDEX_MASK)
}

/// Generations cycle through 1..=MAX_GENERATION, skipping 0 so that no valid
/// handle can ever be 0.
const fn next_generation(generation: u32) -> u32 {
    if generation >= MAX_GENERATION {
        1
    } else {
        generation + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_then_get() {
        let mut v = HandleVec::new();
        let h = v.insert(42u32);
        assert_ne!(h, 0);
        assert_eq!(v.try_get(h), Some(&42));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn stale_handle_misses_after_remove() {
        let mut v = HandleVec::new();
        let h = v.insert("a");
        assert_eq!(v.remove(h), Some("a"));
        assert_eq!(v.try_get(h), None);
        assert_eq!(v.remove(h), None);
        assert!(v.is_empty());
    }

    #[test]
    fn reused_slot_gets_fresh_handle() {
        let mut v = HandleVec::new();
        let h0 = v.insert(1);
        v.remove(h0);
        let h1 = v.insert(2);
        assert_ne!(h0, h1);
        assert_eq!(v.try_get(h0), None);
        assert_eq!(v.try_get(h1), Some(&2));
    }

    #[test]
    fn invalid_handle_never_resolves() {
        let v: HandleVec<u32> = HandleVec::new();
        assert_eq!(v.try_get(0), None);
        assert_eq!(v.try_get(0xFFFF_FFFF), None);
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut v = HandleVec::new();
        let h0 = v.insert(0x42);
        let h1 = v.insert(0x43);
        let extracted: Vec<u32> = v.iter_handles().map(|(_, e)| *e).collect();
        assert_eq!(extracted, vec![0x42, 0x43]);

        v.clear();
        assert!(v.is_empty());
        assert_eq!(v.try_get(h0), None);
        assert_eq!(v.try_get(h1), None);
        assert_eq!(v.iter_handles().count(), 0);
    }

    #[test]
    fn try_get_mut_updates_in_place() {
        let mut v = HandleVec::new();
        let h = v.insert(1);
        *v.try_get_mut(h).unwrap() = 9;
        assert_eq!(v.try_get(h), Some(&9));
    }

    proptest! {
        #[test]
        fn insertion_order_preserved(values in proptest::collection::vec(any::<u16>(), 0..64)) {
            let mut v = HandleVec::new();
            for value in &values {
                v.insert(*value);
            }
            let extracted: Vec<u16> = v.iter_handles().map(|(_, e)| *e).collect();
            prop_assert_eq!(extracted, values);
        }

        #[test]
        fn handles_stay_unique(count in 1usize..64, remove_at in 0usize..32) {
            let mut v = HandleVec::new();
            let mut issued = Vec::new();
            for i in 0..count {
                issued.push(v.insert(i));
            }
            if remove_at < issued.len() {
                v.remove(issued[remove_at]);
                let fresh = v.insert(usize::MAX);
                prop_assert!(!issued.contains(&fresh));
            }
            let mut sorted = issued.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), issued.len());
        }
    }
}
