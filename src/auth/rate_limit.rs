use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

/// Contact form: 5 submissions per client per 10 minutes.
const CONTACT_MAX_REQUESTS: u32 = 5;
const CONTACT_WINDOW_SECS: u64 = 600;

const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Fixed-window counters keyed by client, held in process memory.
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(remaining)` if the call is admitted, otherwise `Err(retry_after)`.
    pub async fn check(&self, key: &str, max_requests: u32, window_secs: u64) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
            window,
        });

        if now.duration_since(entry.window_start) > entry.window {
            entry.count = 0;
            entry.window_start = now;
            entry.window = window;
        }

        if entry.count >= max_requests {
            return Err(entry.window.saturating_sub(now.duration_since(entry.window_start)));
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Drop counters whose window ended. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.window_start) <= entry.window);
        before - entries.len()
    }
}

pub fn spawn_rate_limit_cleanup(limiter: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let purged = limiter.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired rate limit entries");
            }
        }
    });
}

pub async fn rate_limit_contact(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());
    let key = format!("contact:{ip}");

    match state
        .rate_limiter
        .check(&key, CONTACT_MAX_REQUESTS, CONTACT_WINDOW_SECS)
        .await
    {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, remaining, "Contact rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %ip,
                retry_after_secs = retry_after.as_secs(),
                "Contact rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}
