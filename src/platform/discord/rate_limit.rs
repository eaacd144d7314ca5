//! Client-side pacing for Discord REST rate limits.
//!
//! Discord reports limits per route bucket and, rarely, globally. The limiter
//! only tracks routes whose bucket is exhausted; every other route is free to
//! go until the server says otherwise.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Wait applied when a 429 arrives without a usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// The rate-limit headers of one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct LimitHeaders {
    pub remaining: Option<u32>,
    pub reset_after: Option<Duration>,
    pub retry_after: Option<Duration>,
    pub global: bool,
}

impl LimitHeaders {
    pub fn read(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_str(headers, "X-RateLimit-Remaining").and_then(|v| v.parse().ok()),
            reset_after: header_str(headers, "X-RateLimit-Reset-After").and_then(seconds),
            retry_after: header_str(headers, "Retry-After").and_then(seconds),
            global: header_str(headers, "X-RateLimit-Global")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Fractional seconds; negative values count as zero.
fn seconds(raw: &str) -> Option<Duration> {
    let secs = raw.trim().parse::<f64>().ok()?;
    if !secs.is_finite() {
        return None;
    }
    Some(Duration::from_secs_f64(secs.max(0.0)))
}

#[derive(Debug, Default)]
struct Blocks {
    global: Option<Instant>,
    routes: HashMap<String, Instant>,
}

#[derive(Debug, Default)]
pub(super) struct RateLimiter {
    blocks: Mutex<Blocks>,
}

impl RateLimiter {
    /// Sleep until neither the global limit nor the route's bucket blocks.
    pub async fn acquire(&self, route: &str) {
        if let Some(until) = self.blocked_until(route, Instant::now()).await {
            sleep_until(until).await;
        }
    }

    async fn blocked_until(&self, route: &str, now: Instant) -> Option<Instant> {
        let blocks = self.blocks.lock().await;
        let global = blocks.global.filter(|until| *until > now);
        let route = blocks.routes.get(route).copied().filter(|until| *until > now);
        global.max(route)
    }

    /// Track the bucket state a successful or failed response reported.
    pub async fn observe(&self, route: &str, limits: &LimitHeaders) {
        let mut blocks = self.blocks.lock().await;
        match (limits.remaining, limits.reset_after) {
            (Some(0), Some(reset_after)) => {
                blocks
                    .routes
                    .insert(route.to_string(), Instant::now() + reset_after);
            }
            (Some(_), _) => {
                blocks.routes.remove(route);
            }
            _ => {}
        }
    }

    /// Record a 429 so the next `acquire` waits it out. Returns the wait.
    pub async fn back_off(&self, route: &str, limits: &LimitHeaders) -> Duration {
        let wait = limits.retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
        let until = Instant::now() + wait;
        let mut blocks = self.blocks.lock().await;
        if limits.global {
            blocks.global = Some(until);
        } else {
            blocks.routes.insert(route.to_string(), until);
        }
        wait
    }
}

/// Route key with ids collapsed, e.g. `/channels/{id}/messages`.
pub(super) fn route_key(url: &str) -> String {
    let path = reqwest::Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    let path = path.strip_prefix("/api/v10").unwrap_or(&path);

    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}
