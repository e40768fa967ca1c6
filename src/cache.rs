//! Single-slot cache of the most recently formatted timestamp.
//!
//! Bursts of log events usually carry the same millisecond, so the last
//! `(millis, text)` pair is kept in one atomically swapped slot. Readers pin
//! an epoch guard, compare the timestamp and copy the text out. A miss
//! formats the new timestamp and tries one compare-and-swap; replaced
//! entries are reclaimed once no pinned reader can still see them.

use crossbeam::epoch::{self, Atomic, Owned};
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};

use crate::formatter::Formatter;

/// An immutable `(millis, text)` pair. Only built by formatting, so the
/// text always belongs to the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    timestamp_millis: i64,
    formatted: String,
}

impl CacheEntry {
    fn new(formatter: &Formatter, timestamp_millis: i64) -> Self {
        Self {
            timestamp_millis,
            formatted: formatter.format(timestamp_millis),
        }
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn formatted(&self) -> &str {
        &self.formatted
    }
}

/// What a caller does after losing the compare-and-swap to another thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwapPolicy {
    /// Use the entry this call just formatted. Every call gets the text of
    /// its own timestamp.
    #[default]
    KeepOwn,
    /// Re-read the slot and use whatever another thread installed, which
    /// may belong to a different timestamp.
    AdoptInstalled,
}

pub struct TimestampCache {
    formatter: Formatter,
    policy: SwapPolicy,
    slot: Atomic<CacheEntry>,
}

impl TimestampCache {
    /// Seeds the slot with the current wall-clock millisecond.
    pub fn new(formatter: Formatter, policy: SwapPolicy) -> Self {
        let seed = CacheEntry::new(&formatter, now_millis());
        Self {
            formatter,
            policy,
            slot: Atomic::new(seed),
        }
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn policy(&self) -> SwapPolicy {
        self.policy
    }

    pub fn get_or_compute(&self, timestamp_millis: i64) -> String {
        let mut out = String::new();
        self.append_to(timestamp_millis, &mut out);
        out
    }

    /// Appends the text for `timestamp_millis`. Never blocks and never
    /// loops: at most one format call and one swap attempt.
    pub fn append_to(&self, timestamp_millis: i64, out: &mut String) {
        let guard = &epoch::pin();
        let current = self.slot.load(Ordering::Acquire, guard);

        // SAFETY: the slot is never null while `self` is alive, and entries
        // are only destroyed after every guard that could observe them is gone.
        let entry = unsafe { current.deref() };
        if entry.timestamp_millis == timestamp_millis {
            out.push_str(&entry.formatted);
            return;
        }

        let fresh = Owned::new(CacheEntry::new(&self.formatter, timestamp_millis));
        match self
            .slot
            .compare_exchange(current, fresh, Ordering::AcqRel, Ordering::Acquire, guard)
        {
            Ok(installed) => {
                // SAFETY: `current` is now unreachable from the slot.
                unsafe { guard.defer_destroy(current) };
                // SAFETY: just installed, protected by `guard`.
                out.push_str(&unsafe { installed.deref() }.formatted);
            }
            Err(lost) => match self.policy {
                SwapPolicy::KeepOwn => out.push_str(&lost.new.formatted),
                SwapPolicy::AdoptInstalled => {
                    let now = self.slot.load(Ordering::Acquire, guard);
                    // SAFETY: non-null and protected by `guard`, as above.
                    out.push_str(&unsafe { now.deref() }.formatted);
                }
            },
        }
    }

    /// A copy of the entry currently in the slot.
    pub fn cached(&self) -> CacheEntry {
        let guard = &epoch::pin();
        // SAFETY: non-null and protected by `guard`.
        unsafe { self.slot.load(Ordering::Acquire, guard).deref() }.clone()
    }
}

impl Drop for TimestampCache {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread holds a reference to the
        // slot, so the remaining entry can be freed right away.
        unsafe {
            let guard = epoch::unprotected();
            let current = self.slot.load(Ordering::Relaxed, guard);
            if !current.is_null() {
                drop(current.into_owned());
            }
        }
    }
}

impl std::fmt::Debug for TimestampCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampCache")
            .field("formatter", &self.formatter)
            .field("policy", &self.policy)
            .field("cached", &self.cached())
            .finish()
    }
}

fn now_millis() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn repeated_lookups_return_identical_text() {
        let cache = TimestampCache::new(Formatter::UnixMillis, SwapPolicy::KeepOwn);
        let first = cache.get_or_compute(1_700_000_000_000);
        for _ in 0..10 {
            assert_eq!(cache.get_or_compute(1_700_000_000_000), first);
        }
        assert_eq!(first, "1700000000000");
    }

    #[test]
    fn miss_replaces_the_slot() {
        let cache = TimestampCache::new(Formatter::UnixSeconds, SwapPolicy::default());
        assert_eq!(cache.get_or_compute(5_000), "5");
        assert_eq!(cache.cached().timestamp_millis(), 5_000);

        assert_eq!(cache.get_or_compute(7_999), "7");
        let entry = cache.cached();
        assert_eq!(entry.timestamp_millis(), 7_999);
        assert_eq!(entry.formatted(), "7");
    }

    #[test]
    fn slot_is_seeded_with_current_time() {
        let before = now_millis();
        let cache = TimestampCache::new(Formatter::UnixMillis, SwapPolicy::KeepOwn);
        let seeded = cache.cached();
        assert!(seeded.timestamp_millis() >= before);
        assert_eq!(seeded.formatted(), seeded.timestamp_millis().to_string());
    }

    #[test]
    fn append_keeps_existing_output() {
        let cache = TimestampCache::new(Formatter::UnixMillis, SwapPolicy::KeepOwn);
        let mut out = String::from("[");
        cache.append_to(42, &mut out);
        cache.append_to(42, &mut out);
        out.push(']');
        assert_eq!(out, "[4242]");
    }

    #[test]
    fn concurrent_same_timestamp_agrees() {
        for policy in [SwapPolicy::KeepOwn, SwapPolicy::AdoptInstalled] {
            let cache = TimestampCache::new(Formatter::UnixMillis, policy);
            let cache = &cache;
            let results: Vec<String> = thread::scope(|s| {
                let handles: Vec<_> = (0..8)
                    .map(|_| s.spawn(move || cache.get_or_compute(123_456)))
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert!(results.iter().all(|r| r == "123456"), "{policy:?}: {results:?}");
        }
    }

    #[test]
    fn keep_own_is_exact_under_contention() {
        let cache = TimestampCache::new(Formatter::UnixMillis, SwapPolicy::KeepOwn);
        thread::scope(|s| {
            for worker in 0..8i64 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..2_000i64 {
                        let t = worker * 1_000_000 + i % 7;
                        assert_eq!(cache.get_or_compute(t), t.to_string());
                    }
                });
            }
        });
    }

    #[test]
    fn adopt_installed_returns_some_formatted_timestamp() {
        let cache = TimestampCache::new(Formatter::UnixMillis, SwapPolicy::AdoptInstalled);
        thread::scope(|s| {
            for worker in 0..8i64 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..2_000i64 {
                        let text = cache.get_or_compute(worker * 10 + i % 3);
                        let parsed: i64 = text.parse().unwrap();
                        assert!((0..80).contains(&parsed), "unexpected entry {text}");
                    }
                });
            }
        });
        let entry = cache.cached();
        assert_eq!(entry.formatted(), entry.timestamp_millis().to_string());
    }
}
