//! warden-ratelimiter - token bucket rate limiting keyed by access token
//!
//! Every credential gets its own bucket, created lazily on first sight.
//! Keying on the raw token rather than a user id limits a session, not an
//! account with several concurrent sessions. Buckets refill continuously at
//! `rate` tokens per second up to `capacity`; a background task sweeps
//! buckets that have been idle for longer than the cleanup interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tokens added per second, per credential.
    pub rate: u32,
    /// Maximum accumulated tokens (burst ceiling).
    pub capacity: u32,
    /// Buckets idle for longer than this are removed.
    pub cleanup_interval: Duration,
}

impl Default for Config {
    /// 10 requests per second with bursts up to 20.
    fn default() -> Self {
        Self {
            rate: 10,
            capacity: 20,
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    /// Replaces unusable zero values with the defaults. Applied by
    /// [`TokenBucket::new`], exposed so callers can log effective values.
    pub fn normalized(mut self) -> Self {
        if self.rate == 0 {
            self.rate = 10;
        }
        if self.capacity == 0 {
            self.capacity = self.rate * 2;
        }
        if self.cleanup_interval.is_zero() {
            self.cleanup_interval = Duration::from_secs(5 * 60);
        }
        self
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter.
///
/// `allow` is a short in-memory critical section and never blocks on I/O.
/// Dropping the limiter aborts the cleanup task.
#[derive(Debug)]
pub struct TokenBucket {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    rate: f64,
    capacity: f64,
    sweeper: JoinHandle<()>,
}

impl TokenBucket {
    /// Creates a limiter and spawns its background cleanup task. Must be
    /// called from within a tokio runtime.
    pub fn new(config: Config) -> Self {
        let config = config.normalized();
        let buckets: Arc<Mutex<HashMap<String, Bucket>>> = Arc::default();
        let sweeper = tokio::spawn(sweep(Arc::clone(&buckets), config.cleanup_interval));

        Self {
            buckets,
            rate: f64::from(config.rate),
            capacity: f64::from(config.capacity),
            sweeper,
        }
    }

    /// Checks whether a call is admitted for the given credential.
    ///
    /// Returns the admission decision and the remaining token count. The
    /// remaining count is truncated for reporting; internally the balance
    /// stays fractional so rapid calls do not lose accumulated refill.
    pub fn allow(&self, credential: &str) -> (bool, u64) {
        let mut buckets = self.lock();
        let now = Instant::now();

        let Some(bucket) = buckets.get_mut(credential) else {
            // First sight: the current call consumes one token immediately.
            buckets.insert(
                credential.to_owned(),
                Bucket {
                    tokens: self.capacity - 1.0,
                    last_refill: now,
                },
            );
            return (true, (self.capacity - 1.0) as u64);
        };

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            (true, bucket.tokens as u64)
        } else {
            (false, 0)
        }
    }

    /// Discards the credential's bucket; the next call starts fresh.
    pub fn reset(&self, credential: &str) {
        self.lock().remove(credential);
    }

    /// Number of tracked buckets, for monitoring.
    pub fn stats(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn backdate(&self, credential: &str, by: Duration) {
        if let Some(bucket) = self.lock().get_mut(credential) {
            bucket.last_refill -= by;
        }
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Periodically removes buckets whose last refill is older than the cleanup
/// interval, bounding memory growth from one-shot credentials.
async fn sweep(buckets: Arc<Mutex<HashMap<String, Bucket>>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let removed = {
            let mut buckets = buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.last_refill.elapsed() <= interval);
            before - buckets.len()
        };
        if removed > 0 {
            debug!(removed, "swept idle rate limit buckets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_sight_admits_and_consumes_one_token() {
        let limiter = TokenBucket::new(Config::default());

        let (allowed, remaining) = limiter.allow("tok1");
        assert!(allowed);
        assert_eq!(remaining, 19);
        assert_eq!(limiter.stats(), 1);
    }

    #[tokio::test]
    async fn zero_config_falls_back_to_defaults() {
        let limiter = TokenBucket::new(Config {
            rate: 0,
            capacity: 0,
            cleanup_interval: Duration::ZERO,
        });

        // rate defaults to 10, capacity to 2 * rate
        let (allowed, remaining) = limiter.allow("tok1");
        assert!(allowed);
        assert_eq!(remaining, 19);
    }

    #[tokio::test]
    async fn burst_exhaustion_and_recovery() {
        let limiter = TokenBucket::new(Config {
            rate: 10,
            capacity: 20,
            ..Config::default()
        });

        for call in 0..25 {
            let (allowed, remaining) = limiter.allow("tok1");
            if call < 20 {
                assert!(allowed, "call {call} should be admitted");
                assert_eq!(remaining, 19 - call as u64);
            } else {
                assert!(!allowed, "call {call} should be rejected");
                assert_eq!(remaining, 0);
            }
        }

        // one second of idle time refills ~10 tokens
        tokio::time::sleep(Duration::from_secs(1)).await;
        let (allowed, remaining) = limiter.allow("tok1");
        assert!(allowed);
        assert!((9..=11).contains(&remaining), "remaining = {remaining}");
    }

    #[tokio::test]
    async fn refill_is_capped_at_capacity() {
        let limiter = TokenBucket::new(Config {
            rate: 10,
            capacity: 20,
            ..Config::default()
        });

        for _ in 0..25 {
            limiter.allow("tok1");
        }

        // long idle accrues far more than capacity; the balance is capped
        limiter.backdate("tok1", Duration::from_secs(60));
        let (allowed, remaining) = limiter.allow("tok1");
        assert!(allowed);
        assert_eq!(remaining, 19);
    }

    #[tokio::test]
    async fn reset_behaves_like_first_sight() {
        let limiter = TokenBucket::new(Config {
            rate: 1,
            capacity: 1,
            ..Config::default()
        });

        let (allowed, _) = limiter.allow("tok1");
        assert!(allowed);
        let (allowed, _) = limiter.allow("tok1");
        assert!(!allowed);

        limiter.reset("tok1");
        let (allowed, remaining) = limiter.allow("tok1");
        assert!(allowed);
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn credentials_do_not_share_buckets() {
        let limiter = TokenBucket::new(Config {
            rate: 1,
            capacity: 1,
            ..Config::default()
        });

        let (allowed, _) = limiter.allow("tok1");
        assert!(allowed);
        let (allowed, _) = limiter.allow("tok1");
        assert!(!allowed);

        let (allowed, _) = limiter.allow("tok2");
        assert!(allowed);
        assert_eq!(limiter.stats(), 2);
    }

    #[tokio::test]
    async fn sweeper_removes_idle_buckets() {
        let limiter = TokenBucket::new(Config {
            rate: 10,
            capacity: 20,
            cleanup_interval: Duration::from_millis(50),
        });

        limiter.allow("tok1");
        assert_eq!(limiter.stats(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(limiter.stats(), 0);
    }

    #[tokio::test]
    async fn concurrent_allows_are_serialized_per_bucket() {
        let limiter = Arc::new(TokenBucket::new(Config {
            rate: 10,
            capacity: 20,
            ..Config::default()
        }));

        let mut handles = Vec::new();
        for _ in 0..40 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.allow("tok1").0 }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.expect("task should not panic") {
                admitted += 1;
            }
        }

        // no lost updates: exactly the burst capacity is admitted (the tiny
        // refill accrued while the tasks run cannot reach a whole token)
        assert_eq!(admitted, 20);
    }
}
