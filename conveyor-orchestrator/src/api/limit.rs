//! Per-client request rate limits
//!
//! Each route group gets its own limiter. A limiter keeps one token bucket
//! per client address, refilled continuously over the configured window.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;

use crate::api::error::ApiError;

/// Buckets kept before idle ones are pruned
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// `requests` allowed per `window`, as a burst that refills continuously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub requests: u32,
    pub window: Duration,
}

impl Rate {
    pub fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            window: Duration::from_secs(60),
        }
    }

    pub fn per_hour(requests: u32) -> Self {
        Self {
            requests,
            window: Duration::from_secs(3600),
        }
    }
}

/// Budgets of the control API route groups; `None` leaves a group unlimited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimits {
    /// `GET /api/pipeline/status`
    pub status: Option<Rate>,

    /// start, stop and reset
    pub control: Option<Rate>,

    /// results, stats and logs
    pub listing: Option<Rate>,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            status: Some(Rate::per_minute(10)),
            control: Some(Rate::per_hour(5)),
            listing: Some(Rate::per_minute(20)),
        }
    }
}

impl RateLimits {
    pub fn unlimited() -> Self {
        Self {
            status: None,
            control: None,
            listing: None,
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    tokens_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(rate: Rate, now: Instant) -> Self {
        let capacity = f64::from(rate.requests);
        Self {
            capacity,
            tokens: capacity,
            tokens_per_sec: capacity / rate.window.as_secs_f64(),
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.tokens_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Takes one token, or returns how long until one is available
    fn try_consume(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(missing / self.tokens_per_sec))
        }
    }

    fn is_full(&self) -> bool {
        self.tokens >= self.capacity
    }
}

/// Limiter shared by every route of one group
#[derive(Clone)]
pub struct RateLimiter {
    rate: Rate,
    buckets: Arc<Mutex<HashMap<Option<IpAddr>, TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Charges one request to `client`; `Err` carries the retry delay
    pub fn check(&self, client: Option<IpAddr>) -> Result<(), Duration> {
        if self.rate.requests == 0 {
            return Err(self.rate.window);
        }

        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        if buckets.len() >= MAX_TRACKED_CLIENTS && !buckets.contains_key(&client) {
            buckets.retain(|_, bucket| {
                bucket.refill(now);
                !bucket.is_full()
            });
        }

        buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.rate, now))
            .try_consume(now)
    }
}

/// Middleware rejecting requests over the group's budget with 429
pub async fn enforce(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match limiter.check(client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(
                "Rate limit exceeded for {} on {}",
                client.map_or_else(|| "unknown client".to_string(), |ip| ip.to_string()),
                request.uri().path()
            );
            ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bucket_refills_over_window() {
        let limiter = RateLimiter::new(Rate::per_minute(2));

        assert!(limiter.check(None).is_ok());
        assert!(limiter.check(None).is_ok());
        let retry = limiter.check(None).unwrap_err();
        assert!(retry > Duration::from_secs(29) && retry <= Duration::from_secs(31));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.check(None).is_ok());
        assert!(limiter.check(None).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_have_separate_budgets() {
        let limiter = RateLimiter::new(Rate::per_hour(1));
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(Some(a)).is_ok());
        assert!(limiter.check(Some(a)).is_err());
        assert!(limiter.check(Some(b)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_rejects_everything() {
        let limiter = RateLimiter::new(Rate::per_minute(0));
        assert_eq!(limiter.check(None), Err(Duration::from_secs(60)));
    }
}
