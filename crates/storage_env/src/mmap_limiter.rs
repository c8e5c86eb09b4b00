// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Admission control for memory-mapped files.
///
/// Each memory-mapped file occupies a share of the process address space, so only a
/// bounded number of files may be mapped at once. The limiter hands out up to
/// `total_slots` slots; once they are exhausted, [`acquire`](Self::acquire) fails
/// immediately instead of blocking, and callers fall back to reads that need no mapping.
///
/// The limiter is an ordinary value, typically shared through an `Arc` by every
/// [`Env`](crate::Env) that should draw from the same budget. Independent limiters
/// never interfere with each other.
pub struct MmapLimiter {
    total_slots: usize,
    available: Mutex<usize>,
}

impl MmapLimiter {
    /// Creates a limiter that admits at most `total_slots` simultaneous mappings.
    #[must_use]
    pub const fn new(total_slots: usize) -> Self {
        Self {
            total_slots,
            available: Mutex::new(total_slots),
        }
    }

    /// The capacity this limiter was constructed with.
    #[must_use]
    pub const fn total_slots(&self) -> usize {
        self.total_slots
    }

    /// The number of slots not currently held by anyone.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Attempts to take one slot.
    ///
    /// Returns `true` if a slot was taken, in which case the caller must eventually
    /// call [`release`](Self::release) exactly once. Returns `false` without blocking
    /// if no slot is available.
    #[must_use]
    pub fn acquire(&self) -> bool {
        let mut available = self.available.lock();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Returns one slot previously taken with [`acquire`](Self::acquire).
    ///
    /// # Panics
    ///
    /// In debug builds, panics if every slot is already available, which means the
    /// caller released a slot it never acquired. Release builds log the misuse and leave
    /// the count unchanged.
    pub fn release(&self) {
        let mut available = self.available.lock();
        debug_assert!(
            *available < self.total_slots,
            "mmap slot released without a matching acquire"
        );
        if *available < self.total_slots {
            *available += 1;
        } else {
            tracing::error!(total_slots = self.total_slots, "mmap slot released without a matching acquire");
        }
    }

    /// Attempts to take one slot, returning a guard that releases it when dropped.
    #[must_use]
    pub fn try_acquire_slot(self: &Arc<Self>) -> Option<MmapSlot> {
        self.acquire().then(|| MmapSlot {
            limiter: Arc::clone(self),
        })
    }
}

impl fmt::Debug for MmapLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmapLimiter")
            .field("total_slots", &self.total_slots)
            .field("available", &self.available())
            .finish()
    }
}

/// One slot held from an [`MmapLimiter`]; returned to the limiter on drop.
pub struct MmapSlot {
    limiter: Arc<MmapLimiter>,
}

impl Drop for MmapSlot {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

impl fmt::Debug for MmapSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmapSlot").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(MmapLimiter: Send, Sync);
        assert_impl_all!(MmapSlot: Send, Sync);
    }

    #[test]
    fn acquire_until_exhausted() {
        let limiter = MmapLimiter::new(2);

        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire());
        assert_eq!(limiter.available(), 0);

        limiter.release();
        assert_eq!(limiter.available(), 1);
        assert!(limiter.acquire());
    }

    #[test]
    fn zero_capacity_never_admits() {
        let limiter = MmapLimiter::new(0);

        assert!(!limiter.acquire());
        assert_eq!(limiter.total_slots(), 0);
    }

    #[test]
    fn slot_guard_releases_on_drop() {
        let limiter = Arc::new(MmapLimiter::new(1));

        let slot = limiter.try_acquire_slot().unwrap();
        assert_eq!(limiter.available(), 0);
        assert!(limiter.try_acquire_slot().is_none());

        drop(slot);
        assert_eq!(limiter.available(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn unmatched_release_panics_in_debug() {
        let limiter = MmapLimiter::new(3);
        limiter.release();
    }

    #[test]
    fn concurrent_acquire_release_stays_in_bounds() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 1_000;

        let limiter = Arc::new(MmapLimiter::new(4));

        thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..ITERATIONS {
                        if let Some(slot) = limiter.try_acquire_slot() {
                            let available = limiter.available();
                            assert!(available < limiter.total_slots());
                            drop(slot);
                        }
                        assert!(limiter.available() <= limiter.total_slots());
                    }
                });
            }
        });

        assert_eq!(limiter.available(), 4);
    }
}
