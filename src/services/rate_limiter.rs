//! Rate limiter for login attempts
//!
//! - failed logins per account: 5 per 15 minutes
//! - login requests per IP address: 10 per minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Timestamps of recent events per key, pruned to a fixed window
struct SlidingWindow<K> {
    window: Duration,
    limit: usize,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit,
            events: RwLock::new(HashMap::new()),
        }
    }

    async fn is_limited(&self, key: K) -> bool {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        let times = events.entry(key).or_default();
        times.retain(|t| *t > cutoff);
        times.len() >= self.limit
    }

    async fn record(&self, key: K) {
        self.events.write().await.entry(key).or_default().push(Utc::now());
    }

    async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    async fn prune(&self) {
        let cutoff = Utc::now() - self.window;
        self.events.write().await.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }
}

/// Login rate limiter
pub struct LoginRateLimiter {
    accounts: SlidingWindow<String>,
    ips: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            accounts: SlidingWindow::new(Duration::minutes(15), 5),
            ips: SlidingWindow::new(Duration::minutes(1), 10),
        }
    }

    /// Whether the account has too many recent failed logins
    pub async fn is_account_limited(&self, email: &str) -> bool {
        self.accounts.is_limited(email.trim().to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        self.accounts.record(email.trim().to_lowercase()).await;
    }

    /// Forget failed attempts after a successful login
    pub async fn clear_account(&self, email: &str) {
        self.accounts.clear(&email.trim().to_lowercase()).await;
    }

    /// Whether the IP sent too many login requests in the last minute
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ips.is_limited(ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ips.record(ip).await;
    }

    /// Drop expired entries; run periodically
    pub async fn cleanup(&self) {
        self.accounts.prune().await;
        self.ips.prune().await;
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
