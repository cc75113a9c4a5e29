//! Per-client fixed-window rate limiting.
//!
//! Counters live in one process-wide table guarded by a single mutex. Both
//! the request path and the background sweep take that lock, so a sweep can
//! never evict an entry a concurrent request has just reset.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use onboard_models::{ErrorBody, ErrorKind};
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::RateLimitConfig;
use crate::metrics;

/// Bucket shared by every client without forwarding headers.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Message returned with a 429.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Counter state for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: Instant,
}

impl RateLimitEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.window_reset_at
    }
}

/// Outcome of [`RateLimiter::check_and_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
    },
    Rejected {
        /// Whole seconds until the window resets, rounded up.
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Fixed-window rate limiter keyed by client identity.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Count one request from `key` against its current window.
    pub fn check_and_consume(&self, key: &str) -> RateLimitDecision {
        self.check_and_consume_at(key, Instant::now())
    }

    /// [`check_and_consume`](Self::check_and_consume) at an explicit instant.
    pub fn check_and_consume_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let max = self.config.max_requests;
        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired(now) {
                if entry.count >= max {
                    return RateLimitDecision::Rejected {
                        retry_after_secs: ceil_secs(entry.window_reset_at - now),
                    };
                }
                entry.count += 1;
                return RateLimitDecision::Allowed {
                    remaining: max - entry.count,
                };
            }
        }

        // New key, or the previous window is over.
        entries.insert(
            key.to_string(),
            RateLimitEntry {
                count: 1,
                window_reset_at: now + self.config.window,
            },
        );
        RateLimitDecision::Allowed {
            remaining: max.saturating_sub(1),
        }
    }

    /// Snapshot of the entry for `key`.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.lock().get(key).copied()
    }

    /// Number of tracked client keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry whose window has passed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// [`sweep_expired`](Self::sweep_expired) at an explicit instant.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        metrics::set_rate_limit_entries(entries.len());
        removed
    }

    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The sweep stops when [`SweeperHandle::stop`] is called or the handle
    /// is dropped.
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        let limiter = self.clone();
        let every = self.config.sweep_interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("Starting rate limit sweeper (interval: {:?})", every);

            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = limiter.sweep_expired();
                        if removed > 0 {
                            debug!(removed, remaining = limiter.len(), "Evicted expired rate limit entries");
                        }
                    }
                }
            }

            info!("Rate limit sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Whole seconds in `remaining`, rounded up from nanosecond precision.
fn ceil_secs(remaining: Duration) -> u64 {
    remaining.as_nanos().div_ceil(1_000_000_000) as u64
}

/// Derive the rate-limit key for a request.
///
/// Prefers the first address of `X-Forwarded-For`, then `X-Real-IP`, then
/// the shared [`UNKNOWN_CLIENT`] bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// 429 response for a rejected client.
pub fn rate_limited_response(retry_after_secs: u64) -> Response {
    let body = ErrorBody::for_kind(ErrorKind::RateLimit, RATE_LIMIT_MESSAGE)
        .with_details(json!({ "retryAfter": retry_after_secs }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert("retry-after", HeaderValue::from(retry_after_secs));
    response
}
