use super::bucket::Bucket;
use std::time::{Duration, SystemTime};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;
const DEFAULT_RATE: f64 = 1.0;
const DEFAULT_BURST: u32 = 1;
const DEFAULT_STALENESS_SECS: u64 = 180;

/// Per-client token bucket registry
///
/// Owns the mapping from client identity to throttle state. Buckets are
/// created at full capacity on an identity's first request, refilled lazily
/// on every access, and evicted by [`sweep`](Registry::sweep) once they have
/// been idle longer than the staleness window.
///
/// The rate, burst, and enabled flag are fixed at construction time.
///
/// # Example
///
/// ```
/// use floodgate::Registry;
/// use std::time::SystemTime;
///
/// let mut registry = Registry::builder().rate(2.0).burst(4).build();
///
/// let now = SystemTime::now();
/// for _ in 0..4 {
///     assert!(registry.allow("10.0.0.1", now));
/// }
/// assert!(!registry.allow("10.0.0.1", now));
/// ```
pub struct Registry {
    buckets: HashMap<String, Bucket>,
    rate: f64,
    burst: f64,
    enabled: bool,
    staleness: Duration,
}

/// Builder for configuring a [`Registry`]
///
/// # Example
///
/// ```
/// use floodgate::Registry;
/// use std::time::Duration;
///
/// let registry = Registry::builder()
///     .rate(2.0)
///     .burst(4)
///     .staleness(Duration::from_secs(180))
///     .capacity(10_000)
///     .build();
/// ```
pub struct RegistryBuilder {
    rate: f64,
    burst: u32,
    enabled: bool,
    staleness: Duration,
    capacity: usize,
}

impl Registry {
    /// Create a new builder with default settings
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Decide whether one request from `identity` may proceed.
    ///
    /// Never blocks and never errors: every identity string is valid,
    /// including the empty string. When the registry is disabled this is an
    /// allocation-free fast path that approves everything without touching
    /// the map.
    ///
    /// An unknown identity gets a bucket at full capacity first, so a burst
    /// of `burst` requests arriving together all succeed and the next one
    /// before any refill fails.
    pub fn allow(&mut self, identity: &str, now: SystemTime) -> bool {
        if !self.enabled {
            return true;
        }

        let burst = self.burst;
        let bucket = self
            .buckets
            .entry(identity.to_string())
            .or_insert_with(|| Bucket::full(burst, now));

        bucket.refill(self.rate, burst, now);
        bucket.touch(now);
        bucket.try_consume()
    }

    /// Remove entries that have been idle longer than the staleness window.
    ///
    /// Returns the number of evicted entries. Runs under the same exclusive
    /// access as [`allow`](Registry::allow) (`&mut self`), so a sweep can
    /// never race a concurrent decision.
    pub fn sweep(&mut self, now: SystemTime) -> usize {
        let staleness = self.staleness;
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.idle_for(now) <= staleness);
        before - self.buckets.len()
    }

    /// Number of identities currently tracked
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refill rate in tokens per second
    ///
    /// Rates below one token per second are honored exactly; fractional
    /// accumulation is never truncated away.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Maximum number of tokens an identity can hold (burst size)
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    /// Enable or disable the registry
    ///
    /// A disabled registry approves every request without tracking anything.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// How long an identity may go unseen before a sweep evicts it
    pub fn staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    /// Expected number of distinct identities
    ///
    /// The map allocates 30% more space to reduce hash collisions.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the [`Registry`] with the configured settings
    pub fn build(self) -> Registry {
        Registry {
            buckets: HashMap::with_capacity(
                (self.capacity as f64 * CAPACITY_OVERHEAD_FACTOR) as usize,
            ),
            rate: self.rate,
            burst: f64::from(self.burst),
            enabled: self.enabled,
            staleness: self.staleness,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            burst: DEFAULT_BURST,
            enabled: true,
            staleness: Duration::from_secs(DEFAULT_STALENESS_SECS),
            capacity: DEFAULT_CAPACITY,
        }
    }
}
