//! Version-stamped lazy caching of derived values.
//!
//! Every mutable child collection in the graph carries a [`Version`] that is bumped
//! once per successful append. A [`CacheSlot`] remembers the value it last computed
//! together with the versions of every collection that value was derived from; a
//! read with unchanged versions returns the stored value, anything else recomputes.
//!
//! Once the graph is frozen no version moves again, so each slot computes at most
//! once more and is then permanently valid.

use crate::config::CacheMode;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing counter for one child collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(u64);

impl Version {
    /// Current counter value.
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn bump(&mut self) {
        self.0 += 1;
    }
}

/// Hit and recomputation counters shared by every slot of one graph.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    recomputations: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheCounters {
    /// Reads answered from a cached value.
    pub hits: u64,
    /// Reads that had to compute.
    pub recomputations: u64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_recompute(&self) {
        self.recomputations.fetch_add(1, Ordering::Relaxed);
    }

    /// Read both counters.
    pub fn counters(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
        }
    }
}

struct Entry<T> {
    stamps: Box<[u64]>,
    value: Arc<T>,
}

/// Lazily computed value tagged with the versions it was computed from.
pub struct CacheSlot<T> {
    entry: RwLock<Option<Entry<T>>>,
}

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self {
            entry: RwLock::new(None),
        }
    }
}

impl<T> std::fmt::Debug for CacheSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stamps = self.entry.read().as_ref().map(|e| e.stamps.to_vec());
        f.debug_struct("CacheSlot").field("stamps", &stamps).finish()
    }
}

impl<T> CacheSlot<T> {
    /// Return the cached value if `stamps` match the stored ones, otherwise run
    /// `compute`, store its result under `stamps` and return it.
    ///
    /// `compute` runs without the slot lock held, so it may read other slots.
    pub fn get_or_refresh<F>(
        &self,
        mode: CacheMode,
        stamps: &[u64],
        stats: &CacheStats,
        compute: F,
    ) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if mode == CacheMode::Disabled {
            stats.record_recompute();
            return Arc::new(compute());
        }

        if let Some(entry) = self.entry.read().as_ref() {
            if *entry.stamps == *stamps {
                stats.record_hit();
                return Arc::clone(&entry.value);
            }
        }

        stats.record_recompute();
        let value = Arc::new(compute());

        let mut guard = self.entry.write();
        // Another reader may have filled the slot for the same stamps meanwhile.
        if let Some(entry) = guard.as_ref() {
            if *entry.stamps == *stamps {
                return Arc::clone(&entry.value);
            }
        }
        *guard = Some(Entry {
            stamps: stamps.into(),
            value: Arc::clone(&value),
        });
        value
    }

    /// Whether the slot currently holds a value.
    pub fn is_filled(&self) -> bool {
        self.entry.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_version_bump() {
        let mut version = Version::default();
        assert_eq!(version.get(), 0);
        version.bump();
        version.bump();
        assert_eq!(version.get(), 2);
    }

    #[test]
    fn test_hit_when_stamps_unchanged() {
        let slot = CacheSlot::default();
        let stats = CacheStats::default();
        let calls = Cell::new(0);

        let first = slot.get_or_refresh(CacheMode::Enabled, &[1, 4], &stats, || {
            calls.set(calls.get() + 1);
            vec!["a"]
        });
        let second = slot.get_or_refresh(CacheMode::Enabled, &[1, 4], &stats, || {
            calls.set(calls.get() + 1);
            vec!["b"]
        });

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            stats.counters(),
            CacheCounters {
                hits: 1,
                recomputations: 1
            }
        );
    }

    #[test]
    fn test_recompute_when_stamp_moves() {
        let slot = CacheSlot::default();
        let stats = CacheStats::default();

        let first = slot.get_or_refresh(CacheMode::Enabled, &[1], &stats, || 10);
        let second = slot.get_or_refresh(CacheMode::Enabled, &[2], &stats, || 20);
        let third = slot.get_or_refresh(CacheMode::Enabled, &[2], &stats, || 30);

        assert_eq!(*first, 10);
        assert_eq!(*second, 20);
        assert_eq!(*third, 20);
        assert_eq!(stats.counters().recomputations, 2);
    }

    #[test]
    fn test_disabled_always_recomputes() {
        let slot = CacheSlot::default();
        let stats = CacheStats::default();

        let a = slot.get_or_refresh(CacheMode::Disabled, &[1], &stats, || 5);
        let b = slot.get_or_refresh(CacheMode::Disabled, &[1], &stats, || 5);

        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!slot.is_filled());
        assert_eq!(stats.counters().recomputations, 2);
        assert_eq!(stats.counters().hits, 0);
    }
}
