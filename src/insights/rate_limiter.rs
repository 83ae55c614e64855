//! Rate Limiter
//!
//! Caps how often the paid text-generation service is called.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Kinds of third-party insight calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Analysis,
    Recommendations,
    Assistant,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightKind::Analysis => write!(f, "analysis"),
            InsightKind::Recommendations => write!(f, "recommendations"),
            InsightKind::Assistant => write!(f, "assistant"),
        }
    }
}

/// Simple rate limiter using token bucket algorithm
pub struct RateLimiter {
    buckets: HashMap<InsightKind, TokenBucket>,
}

struct TokenBucket {
    tokens: u32,
    max_tokens: u32,
    last_refill: Instant,
    refill_rate: Duration,
}

impl TokenBucket {
    fn new(max_tokens: u32, refill_rate_secs: u64) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            last_refill: Instant::now(),
            refill_rate: Duration::from_secs(refill_rate_secs),
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let refills = (elapsed.as_secs_f64() / self.refill_rate.as_secs_f64()) as u32;

        if refills > 0 {
            self.tokens = (self.tokens + refills).min(self.max_tokens);
            self.last_refill = Instant::now();
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        let mut buckets = HashMap::new();

        // One token regained every `refill` seconds
        buckets.insert(InsightKind::Analysis, TokenBucket::new(5, 12));
        buckets.insert(InsightKind::Recommendations, TokenBucket::new(5, 12));
        buckets.insert(InsightKind::Assistant, TokenBucket::new(30, 2));

        Self { buckets }
    }

    /// Consumes a token for `kind`; `false` when the bucket is empty
    pub fn check(&mut self, kind: InsightKind) -> bool {
        match self.buckets.get_mut(&kind) {
            Some(bucket) => bucket.try_consume(),
            None => true,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
