use std::time::{Duration, SystemTime};

/// Per-identity token bucket state.
///
/// Tokens are stored as an `f64` so fractional accumulation from low refill
/// rates (e.g. 0.2 tokens per second) is preserved instead of truncated away.
/// The level always stays within `[0, burst]`.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    tokens: f64,
    last_refill: SystemTime,
    last_seen: SystemTime,
}

impl Bucket {
    /// Create a bucket at full capacity, as an identity's first request sees it.
    pub(crate) fn full(burst: f64, now: SystemTime) -> Self {
        Bucket {
            tokens: burst,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Lazily add `elapsed * rate` tokens, capped at `burst`.
    ///
    /// A clock that moved backwards counts as zero elapsed time.
    pub(crate) fn refill(&mut self, rate: f64, burst: f64, now: SystemTime) {
        let elapsed = now
            .duration_since(self.last_refill)
            .unwrap_or(Duration::ZERO);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(burst);
        self.last_refill = now;
    }

    /// Take one token if at least one is available.
    pub(crate) fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Record that the identity was seen, whether or not it was allowed.
    pub(crate) fn touch(&mut self, now: SystemTime) {
        self.last_seen = now;
    }

    pub(crate) fn idle_for(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_seen).unwrap_or(Duration::ZERO)
    }

    #[cfg(test)]
    pub(crate) fn tokens(&self) -> f64 {
        self.tokens
    }
}
