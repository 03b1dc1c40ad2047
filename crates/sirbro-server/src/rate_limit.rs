//! Per-client token buckets for the `/api/auth/*` endpoints.
//!
//! Each magic-link request sends an email, so these routes get a much
//! tighter budget than page loads (which are not limited at all).

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::ServerError;
use crate::pages::header_str;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn try_take(&mut self, per_sec: f64, capacity: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * per_sec).min(capacity);

        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, TokenBucket>>>,
    per_sec: f64,
    capacity: f64,
}

impl RateLimiter {
    /// `per_minute` requests refill continuously; `burst` may be spent at once.
    pub fn per_minute(per_minute: u32, burst: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            per_sec: f64::from(per_minute) / 60.0,
            capacity: f64::from(burst.max(1)),
        }
    }

    pub async fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(self.capacity, now))
            .try_take(self.per_sec, self.capacity, now)
    }

    /// Forget clients that have been quiet for longer than `max_idle`.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < max_idle);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(6, 5)
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0.ip());

    if let Some(ip) = client_ip(peer, req.headers()) {
        if !limiter.check(ip).await {
            warn!(ip = %ip, path = %req.uri().path(), "Rate limit exceeded");
            return Err(ServerError::RateLimited);
        }
    }

    Ok(next.run(req).await)
}

/// The socket peer if known, else the first `X-Forwarded-For` hop, else
/// `X-Real-IP`.
fn client_ip(peer: Option<IpAddr>, headers: &HeaderMap) -> Option<IpAddr> {
    peer.or_else(|| {
        header_str(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok())
    })
    .or_else(|| {
        header_str(headers, "x-real-ip").and_then(|v| v.trim().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_burst_then_refill() {
        let limiter = RateLimiter::per_minute(60, 3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(ip, start).await);
        }
        assert!(!limiter.check_at(ip, start).await);

        // One request per second refills.
        assert!(limiter.check_at(ip, start + Duration::from_millis(1100)).await);
        assert!(!limiter.check_at(ip, start + Duration::from_millis(1200)).await);
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::per_minute(6, 1);
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(ip1).await);
        assert!(!limiter.check(ip1).await);
        assert!(limiter.check(ip2).await);
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let limiter = RateLimiter::default();
        assert!(limiter.check("192.168.1.1".parse().unwrap()).await);

        limiter.purge_stale(Duration::from_secs(600)).await;
        assert_eq!(limiter.buckets.lock().await.len(), 1);

        limiter.purge_stale(Duration::ZERO).await;
        assert!(limiter.buckets.lock().await.is_empty());
    }

    #[test]
    fn test_client_ip_sources() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(client_ip(Some(peer), &headers), Some(peer));
        assert_eq!(client_ip(None, &headers), "203.0.113.7".parse().ok());

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(None, &headers), "198.51.100.2".parse().ok());

        assert_eq!(client_ip(None, &HeaderMap::new()), None);
    }
}
