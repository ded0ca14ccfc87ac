//! Rate limiting middleware using a token bucket per IP (§7: `overloaded`).
//!
//! GET requests (state reads) and everything else (message submission,
//! checkpoints, closes) draw from separate buckets, since writes are the
//! ones that cost a signature-verification pass and a store transaction.

use crate::domain::config::RateLimitConfig;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    response::Response,
};
use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

struct TokenBucket {
    read_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    write_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    last_access: Instant,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        let read_quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::new(100).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(200).unwrap()));

        let write_quota = Quota::per_second(
            NonZeroU32::new(config.writes_per_second).unwrap_or(NonZeroU32::new(10).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size / 10).unwrap_or(NonZeroU32::new(20).unwrap()));

        Self {
            read_limiter: RateLimiter::direct(read_quota),
            write_limiter: RateLimiter::direct(write_quota),
            last_access: Instant::now(),
        }
    }

    fn check_read(&mut self) -> Result<(), Duration> {
        self.last_access = Instant::now();
        self.read_limiter.check().map_err(|not_until| {
            not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
        })
    }

    fn check_write(&mut self) -> Result<(), Duration> {
        self.last_access = Instant::now();
        self.write_limiter.check().map_err(|not_until| {
            not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
        })
    }
}

/// Rate limiter state shared across requests.
pub struct RateLimitState {
    buckets: DashMap<IpAddr, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { buckets: DashMap::new(), config }
    }

    pub fn check(&self, ip: IpAddr, is_write: bool) -> Result<(), Duration> {
        if self.config.whitelist.contains(&ip) {
            return Ok(());
        }

        if !self.config.enabled {
            return Ok(());
        }

        let mut bucket = self.buckets.entry(ip).or_insert_with(|| {
            debug!(ip = %ip, "creating new rate limit bucket");
            TokenBucket::new(&self.config)
        });

        if is_write {
            bucket.check_write()
        } else {
            bucket.check_read()
        }
    }

    /// Drop buckets untouched for longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets.retain(|ip, bucket| {
            let age = now.duration_since(bucket.last_access);
            if age > max_age {
                debug!(ip = %ip, age_secs = age.as_secs(), "removing stale rate limit bucket");
                false
            } else {
                true
            }
        });
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { state: Arc::new(RateLimitState::new(config)) }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService { inner, state: Arc::clone(&self.state) }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);
            let is_write = req.method() != Method::GET;

            match state.check(ip, is_write) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    let retry_ms = retry_after.as_millis() as u64;
                    warn!(ip = %ip, retry_after_ms = retry_ms, is_write, "rate limit exceeded");
                    Ok(rate_limit_response(retry_ms))
                }
            }
        })
    }
}

fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            if let Ok(ip) = real_ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn rate_limit_response(retry_after_ms: u64) -> Response {
    let body = serde_json::json!({
        "error": {
            "kind": "Overloaded",
            "message": "rate limit exceeded",
            "retry_after_ms": retry_after_ms,
        }
    });

    let mut response = Response::new(Body::from(serde_json::to_vec(&body).unwrap_or_default()));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response.headers_mut().insert("Content-Type", "application/json".parse().unwrap());
    response
        .headers_mut()
        .insert("Retry-After", ((retry_after_ms + 999) / 1000).to_string().parse().unwrap());

    response
}

/// Background task to drop stale rate limit buckets.
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration, max_age: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup(max_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: 10,
            writes_per_second: 2,
            burst_size: 20,
            enabled: true,
            whitelist: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))],
        }
    }

    #[test]
    fn allows_within_limit() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        for _ in 0..10 {
            assert!(state.check(ip, false).is_ok());
        }
    }

    #[test]
    fn blocks_over_limit() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        for _ in 0..25 {
            let _ = state.check(ip, false);
        }

        assert!(state.check(ip, false).is_err());
    }

    #[test]
    fn whitelist_bypasses_limit() {
        let state = RateLimitState::new(test_config());
        let whitelisted_ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));

        for _ in 0..100 {
            assert!(state.check(whitelisted_ip, false).is_ok());
        }
    }

    #[test]
    fn disabled_rate_limiting_always_allows() {
        let mut config = test_config();
        config.enabled = false;
        let state = RateLimitState::new(config);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3));

        for _ in 0..100 {
            assert!(state.check(ip, false).is_ok());
        }
    }

    #[test]
    fn writes_are_limited_tighter_than_reads() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 4));

        for _ in 0..5 {
            let _ = state.check(ip, true);
        }

        assert!(state.check(ip, true).is_err());
    }

    #[test]
    fn cleanup_removes_stale_buckets() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

        let _ = state.check(ip, false);
        assert_eq!(state.bucket_count(), 1);

        state.cleanup(Duration::ZERO);
        assert_eq!(state.bucket_count(), 0);
    }
}
