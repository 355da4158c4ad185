//! Sliding-window request limiter keyed by user.
//!
//! This limiter is advisory. It lives in the caller's process, forgets
//! everything on restart and does not coordinate across instances, so it
//! only curbs accidental bursts from the UI. Real enforcement belongs on
//! the server.
//!
//! # Example
//!
//! ```
//! use trust_boundary::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::with_defaults();
//! assert!(limiter.check_with("u1", 3, 60_000));
//! assert!(limiter.check_with("u1", 3, 60_000));
//! assert!(limiter.check_with("u1", 3, 60_000));
//! assert!(!limiter.check_with("u1", 3, 60_000));
//!
//! limiter.reset();
//! assert!(limiter.check_with("u1", 3, 60_000));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::{RealTimeProvider, TimeProvider};

/// Default requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 10;

/// Default window length in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Configuration for the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed inside one window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

impl RateLimitConfig {
    /// Window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Snapshot of one user's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Requests counted inside the window.
    pub used: u32,
    /// Requests still allowed inside the window.
    pub remaining: u32,
    /// Milliseconds until the oldest counted request leaves the window.
    pub reset_after_ms: u64,
}

type Windows = HashMap<String, VecDeque<DateTime<Utc>>>;

/// Sliding-window rate limiter.
///
/// Each user owns a queue of request timestamps. A timestamp counts while
/// `now - timestamp < window`. The read-filter-append sequence runs under a
/// single lock, so two concurrent calls for the same user cannot both be
/// admitted on a stale count.
#[derive(Debug)]
pub struct RateLimiter<T: TimeProvider = RealTimeProvider> {
    config: RateLimitConfig,
    clock: T,
    windows: Mutex<Windows>,
}

impl RateLimiter<RealTimeProvider> {
    /// Create a limiter on the system clock.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, RealTimeProvider)
    }

    /// Create a limiter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl Default for RateLimiter<RealTimeProvider> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<T: TimeProvider> RateLimiter<T> {
    /// Create a limiter on a custom clock.
    #[must_use]
    pub fn with_clock(config: RateLimitConfig, clock: T) -> Self {
        Self {
            config,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Configured limits.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or deny one request for `user_id` under the configured limits.
    #[must_use]
    pub fn check(&self, user_id: &str) -> bool {
        self.check_with(user_id, self.config.max_requests, self.config.window_ms)
    }

    /// Admit or deny one request for `user_id` under explicit limits.
    ///
    /// Returns `false` without recording anything when `max_requests`
    /// requests already fall inside the last `window_ms` milliseconds;
    /// otherwise records the request and returns `true`. A `max_requests`
    /// of zero denies everything.
    #[must_use]
    pub fn check_with(&self, user_id: &str, max_requests: u32, window_ms: u64) -> bool {
        let now = self.clock.now();
        let mut windows = self.lock();
        let timestamps = windows.entry(user_id.to_string()).or_default();
        evict_expired(timestamps, now, window_ms);

        let used = timestamps.len();
        if used >= max_requests as usize {
            tracing::warn!(
                user_id,
                used,
                max_requests,
                window_ms,
                "Rate limit exceeded"
            );
            if timestamps.is_empty() {
                windows.remove(user_id);
            }
            return false;
        }

        timestamps.push_back(now);
        tracing::debug!(user_id, used = used + 1, max_requests, "Request admitted");
        true
    }

    /// Requests still allowed for `user_id` under the configured limits.
    ///
    /// Does not record a request.
    #[must_use]
    pub fn remaining(&self, user_id: &str) -> u32 {
        self.status(user_id).remaining
    }

    /// Window snapshot for `user_id` under the configured limits.
    #[must_use]
    pub fn status(&self, user_id: &str) -> RateLimitStatus {
        let now = self.clock.now();
        let window_ms = self.config.window_ms;
        let windows = self.lock();
        let live: Vec<DateTime<Utc>> = windows
            .get(user_id)
            .map(|ts| {
                ts.iter()
                    .copied()
                    .filter(|&t| is_live(t, now, window_ms))
                    .collect()
            })
            .unwrap_or_default();

        let used = u32::try_from(live.len()).unwrap_or(u32::MAX);
        let reset_after_ms = live.first().map_or(0, |&oldest| {
            let elapsed = elapsed_ms(oldest, now);
            window_ms.saturating_sub(elapsed)
        });
        RateLimitStatus {
            used,
            remaining: self.config.max_requests.saturating_sub(used),
            reset_after_ms,
        }
    }

    /// Forget every user's history.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Forget one user's history.
    pub fn reset_user(&self, user_id: &str) {
        self.lock().remove(user_id);
    }

    /// Drop users whose every request left the configured window.
    ///
    /// Returns the number of users dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let window_ms = self.config.window_ms;
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, timestamps| {
            evict_expired(timestamps, now, window_ms);
            !timestamps.is_empty()
        });
        let purged = before - windows.len();
        if purged > 0 {
            tracing::debug!(purged, "Purged idle rate limit windows");
        }
        purged
    }

    /// Number of users with stored history.
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        match self.windows.lock() {
            Ok(guard) => guard,
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Rate limit state lock poisoned, using recovered data"
                );
                poison_error.into_inner()
            }
        }
    }
}

fn elapsed_ms(then: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - then).num_milliseconds()).unwrap_or(0)
}

fn is_live(timestamp: DateTime<Utc>, now: DateTime<Utc>, window_ms: u64) -> bool {
    let elapsed = (now - timestamp).num_milliseconds();
    elapsed < i64::try_from(window_ms).unwrap_or(i64::MAX)
}

fn evict_expired(timestamps: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window_ms: u64) {
    timestamps.retain(|&t| is_live(t, now, window_ms));
}
