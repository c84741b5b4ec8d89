//! TTL result cache.
//!
//! Finished [`AggregatedResult`]s are memoized under `(sequence_id, pattern)`.
//! Entries expire after their TTL and are never refreshed in place; a query
//! after expiry recomputes. Writes are last-writer-wins per key.
//!
//! The cache is injected as `Arc<dyn ResultCache>` and reads time from a
//! [`Clock`], so tests can drive expiry with a [`ManualClock`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::models::AggregatedResult;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed.lock().map(|e| *e).unwrap_or_default();
        self.start + elapsed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sequence_id: String,
    pub pattern: String,
}

impl CacheKey {
    pub fn new(sequence_id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match:{}:{}", self.sequence_id, self.pattern)
    }
}

pub trait ResultCache: Send + Sync {
    /// The cached result, or `None` if absent or expired.
    fn get(&self, key: &CacheKey) -> Option<AggregatedResult>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    fn set(&self, key: CacheKey, value: AggregatedResult, ttl: Duration);

    /// Free entries whose TTL has passed. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}

struct CacheEntry {
    value: AggregatedResult,
    /// `None` when `now + ttl` is past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-wide in-memory cache.
pub struct MemoryResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache for MemoryResultCache {
    fn get(&self, key: &CacheKey) -> Option<AggregatedResult> {
        let now = self.clock.now();
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    fn set(&self, key: CacheKey, value: AggregatedResult, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, CacheEntry { value, expires_at });
        }
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, e| e.is_live(now));
                before - entries.len()
            }
            Err(_) => 0,
        }
    }
}
