//! Per-adapter token buckets.
//!
//! External adapters rate-limit us; we enforce the limit on our side so
//! a burst of games never trips a provider ban. A bucket refills at a
//! fixed rate up to its capacity. When empty, [`TokenBucket::acquire`]
//! *pauses* the caller until a token accrues -- callers are never failed
//! for hitting the limit.
//!
//! The arithmetic core ([`TokenBucket::try_take_at`]) is synchronous and
//! driven directly by tests; the async wrapper adds the sleep.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// A token bucket limiting one adapter's request rate.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket holding `capacity` tokens, refilling at
    /// `refill_per_sec` tokens per second. Starts full.
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
            capacity: f64::from(capacity),
            refill_per_sec: refill_per_sec.max(0.01),
        }
    }

    /// Take one token, pausing until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                match Self::try_take_inner(
                    &mut state,
                    now,
                    self.capacity,
                    self.refill_per_sec,
                ) {
                    Some(()) => None,
                    // Sleep long enough for one token to accrue.
                    None => Some(Duration::from_secs_f64(
                        (1.0 - state.tokens).max(0.0) / self.refill_per_sec,
                    )),
                }
            };
            match wait {
                None => return,
                Some(duration) => {
                    let wait_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                    tracing::debug!(wait_ms, "rate limit pause");
                    tokio::time::sleep(duration).await;
                }
            }
        }
    }

    /// Synchronous take for tests: refill to `now`, then take one token
    /// if available.
    pub async fn try_take_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().await;
        Self::try_take_inner(&mut state, now, self.capacity, self.refill_per_sec).is_some()
    }

    fn try_take_inner(
        state: &mut BucketState,
        now: Instant,
        capacity: f64,
        refill_per_sec: f64,
    ) -> Option<()> {
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * refill_per_sec).min(capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Some(())
        } else {
            None
        }
    }
}
