//! Fixed-capacity generational pool
//!
//! Slots are allocated once up front. Spawning into a full pool recycles
//! the oldest live entry instead of growing. Handles carry a generation so
//! a handle to a recycled slot is detectably stale.

use serde::{Deserialize, Serialize};

/// Reference to a live pool entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    /// Spawn order, for oldest-first recycling
    sequence: u64,
    value: Option<T>,
}

/// Result of a spawn: the new handle, plus whatever was evicted to make room
#[derive(Debug)]
pub struct Spawned<T> {
    pub handle: Handle,
    pub evicted: Option<(Handle, T)>,
}

#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    next_sequence: u64,
    live: usize,
    recycled: u64,
}

impl<T> Pool<T> {
    /// A pool holding at most `capacity` (minimum 1) live entries
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                sequence: 0,
                value: None,
            })
            .collect();
        // Pop from the back, so reverse to hand out slot 0 first
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            next_sequence: 0,
            live: 0,
            recycled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Times a live entry was evicted to make room
    pub fn recycled_count(&self) -> u64 {
        self.recycled
    }

    /// Insert `value`, evicting the oldest live entry if full
    pub fn spawn(&mut self, value: T) -> Spawned<T> {
        let (index, evicted) = match self.free.pop() {
            Some(index) => (index, None),
            None => self.evict_oldest(),
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let slot = &mut self.slots[index as usize];
        slot.sequence = sequence;
        slot.value = Some(value);
        self.live += 1;

        Spawned {
            handle: Handle {
                index,
                generation: slot.generation,
            },
            evicted,
        }
    }

    /// Empty the oldest slot in a full pool and hand back its index
    fn evict_oldest(&mut self) -> (u32, Option<(Handle, T)>) {
        let index = (0..self.slots.len())
            .min_by_key(|&i| self.slots[i].sequence)
            .unwrap_or(0);
        let slot = &mut self.slots[index];
        let handle = Handle {
            index: index as u32,
            generation: slot.generation,
        };
        let evicted = slot.value.take().map(|value| (handle, value));
        slot.generation = slot.generation.wrapping_add(1);
        if evicted.is_some() {
            self.live -= 1;
            self.recycled += 1;
            tracing::debug!(slot = index, "Pool full, recycled oldest entry");
        }
        (index as u32, evicted)
    }

    /// Handle of the longest-lived entry
    pub fn oldest(&self) -> Option<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.value.is_some())
            .min_by_key(|(_, s)| s.sequence)
            .map(|(i, s)| Handle {
                index: i as u32,
                generation: s.generation,
            })
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Return an entry to the pool; stale handles are a no-op
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    /// Live entries in spawn order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        let mut live: Vec<(u64, Handle, &T)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                s.value.as_ref().map(|v| {
                    (
                        s.sequence,
                        Handle {
                            index: i as u32,
                            generation: s.generation,
                        },
                        v,
                    )
                })
            })
            .collect();
        live.sort_by_key(|(seq, _, _)| *seq);
        live.into_iter().map(|(_, h, v)| (h, v))
    }

    /// Handles of live entries in spawn order
    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(h, _)| h).collect()
    }

    /// Release every live entry, returning them in spawn order
    pub fn drain(&mut self) -> Vec<(Handle, T)> {
        self.handles()
            .into_iter()
            .filter_map(|h| self.release(h).map(|v| (h, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_release() {
        let mut pool = Pool::with_capacity(2);
        let a = pool.spawn("a").handle;
        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.len(), 1);

        assert_eq!(pool.release(a), Some("a"));
        assert!(pool.is_empty());
        assert_eq!(pool.get(a), None);
    }

    #[test]
    fn test_full_pool_recycles_oldest() {
        let mut pool = Pool::with_capacity(3);
        let first = pool.spawn(1).handle;
        pool.spawn(2);
        pool.spawn(3);

        let spawned = pool.spawn(4);

        assert_eq!(pool.len(), 3);
        assert_eq!(spawned.evicted, Some((first, 1)));
        assert_eq!(pool.recycled_count(), 1);
        assert!(!pool.contains(first));
        let values: Vec<_> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2, 3, 4]);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut pool = Pool::with_capacity(1);
        let old = pool.spawn('x').handle;
        let new = pool.spawn('y').handle;

        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert_eq!(pool.get(old), None);
        assert_eq!(pool.release(old), None);
        assert_eq!(pool.get(new), Some(&'y'));
    }

    #[test]
    fn test_burst_never_exceeds_capacity() {
        let mut pool = Pool::with_capacity(16);
        for i in 0..1000 {
            pool.spawn(i);
            assert!(pool.len() <= 16);
        }
        assert_eq!(pool.len(), 16);
        assert_eq!(pool.recycled_count(), 1000 - 16);
    }

    #[test]
    fn test_drain_empties_pool() {
        let mut pool = Pool::with_capacity(4);
        let a = pool.spawn(1).handle;
        pool.spawn(2);

        let drained = pool.drain();

        assert_eq!(drained.len(), 2);
        assert!(pool.is_empty());
        assert!(!pool.contains(a));
    }

    #[test]
    fn test_zero_capacity_rounds_up() {
        let mut pool = Pool::with_capacity(0);
        assert_eq!(pool.capacity(), 1);
        pool.spawn(());
        assert_eq!(pool.len(), 1);
    }
}
