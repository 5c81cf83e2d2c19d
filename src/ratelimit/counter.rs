//! The per-key counter backing the limiter.
//!
//! # Responsibilities
//! - Answer "is this key allowed right now" in O(1) under a single mutex
//! - Track at most `capacity` keys, evicting the least recently seen
//! - Recycle evicted entries through a free pool
//!
//! # Design Decisions
//! - Quota is a fixed window anchored to the first request that opens it,
//!   renewed lazily on the next check after the window elapses. A burst
//!   straddling a window boundary can admit up to 2x the quota; that is
//!   acceptable for abuse prevention and kept for its simplicity.
//! - The LRU list is embedded in the entries themselves: `prev`/`next` are
//!   keys into the same map, with 0 standing for "no neighbor". Relinking is
//!   pointer-free and never allocates.
//! - One mutex per counter. Low-to-moderate contention is the target; the
//!   critical section does no I/O and no allocation beyond pool misses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch. Entries store this instead of a full
/// `SystemTime` to stay compact; 0 means "never".
pub(super) type Nanos = i64;

pub(super) fn now_nanos() -> Nanos {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as Nanos
}

/// State for one tracked key.
#[derive(Debug, Default)]
pub(super) struct Entry {
    /// When the current window was opened; 0 if no request was admitted yet.
    pub(super) last_allowed: Nanos,

    /// Requests left in the current window.
    pub(super) requests_left: u64,

    /// Neighboring keys in the LRU list; 0 means none.
    prev: u64,
    next: u64,
}

impl Entry {
    fn reset(&mut self) {
        self.last_allowed = 0;
        self.requests_left = 0;
        self.prev = 0;
        self.next = 0;
    }
}

/// The map, the LRU list threaded through it, and the free-entry pool.
/// Only accessed with the counter's mutex held; an entry is reachable from
/// `head` exactly when it is present in `entries`.
pub(super) struct Tracked {
    pub(super) entries: HashMap<u64, Box<Entry>>,

    /// Most recently seen key, or 0 when empty.
    head: u64,

    /// Least recently seen key (next eviction candidate), or 0 when empty.
    tail: u64,

    /// Evicted entries, kept for reuse.
    pool: Vec<Box<Entry>>,
}

impl Tracked {
    /// Move `key` to the front of the LRU list. The key must be tracked.
    fn bump(&mut self, key: u64) {
        if self.head == key {
            return;
        }

        let (prev, next) = {
            let e = self.entries.get(&key).expect("bump of untracked key");
            (e.prev, e.next)
        };

        if self.tail == key {
            self.tail = prev;
        }

        // Take the key out of the chain.
        if prev != 0 {
            self.entries.get_mut(&prev).expect("dangling lru link").next = next;
        }
        if next != 0 {
            self.entries.get_mut(&next).expect("dangling lru link").prev = prev;
        }

        // Relink at the front.
        let old_head = self.head;
        if old_head != 0 {
            self.entries
                .get_mut(&old_head)
                .expect("dangling lru head")
                .prev = key;
        }
        let e = self.entries.get_mut(&key).expect("bump of untracked key");
        e.prev = 0;
        e.next = old_head;
        self.head = key;
    }

    /// Insert `key` at the front of the list. If that pushes the map over
    /// `capacity`, the tail entry is dropped from the map and pooled. The
    /// just-inserted entry is never the one evicted.
    fn prepend(&mut self, key: u64, mut e: Box<Entry>, capacity: usize) {
        if self.head == 0 {
            self.entries.insert(key, e);
            self.head = key;
            self.tail = key;
            return;
        }

        e.next = self.head;
        self.entries
            .get_mut(&self.head)
            .expect("dangling lru head")
            .prev = key;
        self.entries.insert(key, e);
        self.head = key;

        if self.entries.len() > capacity {
            let last = self.tail;
            let evicted = self.entries.remove(&last).expect("lru tail not tracked");
            self.tail = evicted.prev;
            self.entries
                .get_mut(&self.tail)
                .expect("dangling lru link")
                .next = 0;
            self.pool.push(evicted);
        }
    }

    /// A pooled entry if one is available, freshly allocated otherwise.
    /// Either way it comes back zeroed.
    fn acquire(&mut self) -> Box<Entry> {
        let mut e = self.pool.pop().unwrap_or_default();
        e.reset();
        e
    }

    /// Entries from most to least recently seen.
    pub(super) fn iter_lru(&self) -> impl Iterator<Item = (u64, &Entry)> + '_ {
        let mut k = self.head;
        std::iter::from_fn(move || {
            if k == 0 {
                return None;
            }
            let key = k;
            let e: &Entry = &self.entries[&key];
            k = e.next;
            Some((key, e))
        })
    }
}

/// A windowed quota counter over u64 keys with bounded tracking.
pub(super) struct Counter {
    /// Requests admitted per window.
    pub(super) requests: u64,

    /// Window length. A zero period renews the window on every check,
    /// turning the counter into pure size-bounded tracking.
    pub(super) period: Duration,

    /// Maximum number of keys tracked at once.
    pub(super) capacity: usize,

    pub(super) tracked: Mutex<Tracked>,
}

impl Counter {
    pub(super) fn new(requests: u64, period: Duration, capacity: usize) -> Self {
        Counter {
            requests,
            period,
            capacity,
            tracked: Mutex::new(Tracked {
                entries: HashMap::with_capacity(capacity),
                head: 0,
                tail: 0,
                pool: Vec::new(),
            }),
        }
    }

    /// Replace the rate. Takes `&mut self` on purpose: rates may only change
    /// while the counter is exclusively owned, before it takes traffic.
    pub(super) fn set_rate(&mut self, requests: u64, period: Duration) {
        self.requests = requests;
        self.period = period;
    }

    pub(super) fn allow(&self, key: u64) -> bool {
        self.allow_at(key, now_nanos())
    }

    /// The admission decision, with the clock passed in so tests can drive
    /// it deterministically.
    pub(super) fn allow_at(&self, key: u64, now: Nanos) -> bool {
        // 0 doubles as the list sentinel, so it cannot be a real key. The
        // zero address is not a meaningful limiting target anyway (for IPv6
        // it shows up when ::1 gets masked); account it as key 1.
        let key = if key == 0 { 1 } else { key };

        if self.requests == 0 {
            // Always denying, nothing to track.
            return false;
        }

        let mut tracked = self.tracked.lock().expect("counter mutex poisoned");

        if tracked.entries.contains_key(&key) {
            tracked.bump(key);
        } else {
            let e = tracked.acquire();
            tracked.prepend(key, e, self.capacity);
        }

        let period = self.period.as_nanos() as Nanos;
        let e = tracked
            .entries
            .get_mut(&key)
            .expect("entry tracked above");
        if now - e.last_allowed >= period {
            // A fresh window. Always taken on a brand-new entry, whose zero
            // last_allowed is infinitely far in the past.
            e.last_allowed = now;
            e.requests_left = self.requests - 1;
            true
        } else if e.requests_left > 0 {
            e.requests_left -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `yes` trues followed by `no` falses.
    fn verdicts(yes: usize, no: usize) -> Vec<bool> {
        let mut v = vec![true; yes];
        v.extend(vec![false; no]);
        v
    }

    /// Keys from front to back of the LRU list.
    fn lru_keys(c: &Counter) -> Vec<u64> {
        let tracked = c.tracked.lock().unwrap();
        tracked.iter_lru().map(|(k, _)| k).collect()
    }

    #[test]
    fn quota_per_window() {
        let cases: &[(u64, u64, Vec<bool>)] = &[
            (0, 3, verdicts(0, 3)),
            (1, 1, verdicts(1, 0)),
            (1, 2, verdicts(1, 1)),
            (2, 2, verdicts(2, 0)),
            (2, 3, verdicts(2, 1)),
            (10, 20, verdicts(10, 10)),
        ];
        for (requests, calls, expected) in cases {
            let c = Counter::new(*requests, Duration::from_secs(1), 256);
            let got: Vec<bool> = (0..*calls).map(|_| c.allow(0x01020304)).collect();
            assert_eq!(&got, expected, "requests={requests} calls={calls}");
        }
    }

    #[test]
    fn deny_all_touches_nothing() {
        let c = Counter::new(0, Duration::from_secs(1), 4);
        for key in 1..10 {
            assert!(!c.allow(key));
        }
        assert_eq!(c.tracked.lock().unwrap().entries.len(), 0);
    }

    #[test]
    fn tracking_stays_bounded() {
        for capacity in [1usize, 2, 3, 5, 8, 10, 100, 256] {
            // Zero period isolates the LRU bookkeeping from timing: every
            // check is a fresh window and admits.
            let c = Counter::new(1, Duration::ZERO, capacity);

            // Skip key 0, which would be folded into key 1.
            for key in 1..=capacity as u64 {
                assert!(c.allow(key), "capacity={capacity} key={key}");
                assert_eq!(c.tracked.lock().unwrap().entries.len(), key as usize);
            }
            for key in capacity as u64 + 1..=(capacity as u64 + 1) * 2 {
                assert!(c.allow(key), "capacity={capacity} key={key}");
                assert_eq!(c.tracked.lock().unwrap().entries.len(), capacity);
            }
        }
    }

    #[test]
    fn lru_order() {
        // Each step: the key checked, then the expected front-to-back order.
        let steps: &[(u64, &[u64])] = &[
            (1, &[1]),
            // Bumping the only element is a no-op.
            (1, &[1]),
            (2, &[2, 1]),
            (3, &[3, 2, 1]),
            // Over capacity: 1 is the oldest, out it goes.
            (4, &[4, 3, 2]),
            (1, &[1, 4, 3]),
            // Bump the tail, twice in a row.
            (3, &[3, 1, 4]),
            (3, &[3, 1, 4]),
            // Bump the middle element.
            (1, &[1, 3, 4]),
        ];

        let c = Counter::new(1, Duration::ZERO, 3);
        for (i, (key, expected)) in steps.iter().enumerate() {
            c.allow(*key);
            assert_eq!(&lru_keys(&c), expected, "step {i}: allow({key})");
        }
    }

    #[test]
    fn zero_key_folds_to_one() {
        let c = Counter::new(1, Duration::ZERO, 3);
        assert!(c.allow(0));
        assert_eq!(lru_keys(&c), vec![1]);

        // A later check of the explicit key shares the same entry.
        assert!(c.allow(1));
        assert_eq!(c.tracked.lock().unwrap().entries.len(), 1);
    }

    #[test]
    fn window_renewal() {
        let c = Counter::new(2, Duration::from_secs(1), 3);
        let base: Nanos = 500_000_000_000 + 1000;

        assert!(c.allow_at(22, base)); // Opens the window.
        assert!(c.allow_at(22, base + 1)); // Last of the quota.
        assert!(!c.allow_at(22, base + 2)); // Exhausted.

        assert!(!c.allow_at(22, base + 999_999_999)); // Not yet a second.
        assert!(c.allow_at(22, base + 1_000_000_000)); // Exactly one: renews.
        assert!(c.allow_at(22, base + 1_000_000_001));
        assert!(!c.allow_at(22, base + 1_000_000_003));
    }

    #[test]
    fn evicted_entries_are_pooled_and_reset() {
        let c = Counter::new(5, Duration::from_secs(1), 1);
        assert!(c.allow(1));
        assert!(c.allow(1));
        assert!(c.allow(2)); // Evicts key 1.
        {
            let tracked = c.tracked.lock().unwrap();
            assert_eq!(tracked.pool.len(), 1);
            assert_eq!(tracked.entries.len(), 1);
        }

        // Key 1 comes back through the pool with full quota again.
        assert!(c.allow(1));
        let tracked = c.tracked.lock().unwrap();
        assert_eq!(tracked.pool.len(), 1);
        assert_eq!(tracked.entries[&1].requests_left, 4);
    }
}
