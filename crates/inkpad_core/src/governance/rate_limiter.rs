//! Per-key token-bucket admission control.
//!
//! # Responsibility
//! - Decide whether one more call for a key fits in its current budget.
//! - Own the bucket store explicitly so callers can isolate instances and
//!   inject a clock.
//!
//! # Invariants
//! - A bucket starts full and never holds more than `capacity` tokens.
//! - Refill happens in whole-window jumps of `capacity` tokens, evaluated
//!   against a monotonic `window_start`.
//! - A rejected call consumes nothing.
//! - The map lock only guards bucket lookup/insert; each read-modify-write
//!   runs under that bucket's own mutex, so distinct keys never contend.
//! - Buckets are never evicted; growth is bounded by key cardinality.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond time source for admission decisions.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic admission tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Remaining credits for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    pub tokens: u32,
    /// Timestamp of the last refill evaluation that crossed a window.
    pub window_start_ms: u64,
}

impl RateBucket {
    fn full(capacity: u32, now_ms: u64) -> Self {
        Self {
            tokens: capacity,
            window_start_ms: now_ms,
        }
    }

    fn refill(&mut self, capacity: u32, window_ms: u64, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.window_start_ms);
        if elapsed >= window_ms {
            let windows = elapsed / window_ms;
            let credit = windows.saturating_mul(u64::from(capacity));
            let refilled = u64::from(self.tokens).saturating_add(credit);
            self.tokens = u32::try_from(refilled.min(u64::from(capacity))).unwrap_or(capacity);
            self.window_start_ms = now_ms;
        }
        self.tokens = self.tokens.min(capacity);
    }

    fn try_take(&mut self) -> bool {
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }
}

/// Token-bucket limiter keyed by arbitrary strings.
pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    buckets: RwLock<HashMap<String, Arc<Mutex<RateBucket>>>>,
}

impl RateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Consumes one credit for `key` when available.
    ///
    /// Returns `false` without consuming anything when the bucket is empty
    /// after refill. `capacity` and `window_ms` must both be > 0; a zero
    /// value rejects every call.
    pub fn admit(&self, key: &str, capacity: u32, window_ms: u64) -> bool {
        if capacity == 0 || window_ms == 0 {
            return false;
        }

        let now_ms = self.clock.now_ms();
        let bucket = self.bucket_for(key, capacity, now_ms);
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.refill(capacity, window_ms, now_ms);
        bucket.try_take()
    }

    /// Snapshot of a key's bucket, if it has been seen.
    pub fn bucket(&self, key: &str) -> Option<RateBucket> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets
            .get(key)
            .map(|bucket| *bucket.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of keys currently tracked.
    pub fn bucket_count(&self) -> usize {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn bucket_for(&self, key: &str, capacity: u32, now_ms: u64) -> Arc<Mutex<RateBucket>> {
        {
            let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bucket) = buckets.get(key) {
                return Arc::clone(bucket);
            }
        }

        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            buckets
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(RateBucket::full(capacity, now_ms)))),
        )
    }
}
