//! Proxy pool configuration and per-attempt selection.
//!
//! The pool is loaded once at startup from one of two supported shapes (a
//! single static proxy, or a single rotating-endpoint proxy with bundled
//! credentials) and is read-only afterwards. Selection is uniform-random
//! sampling with no memory between calls: no stickiness per host, no health
//! tracking, and no back-off on a bad proxy. That mirrors the routing policy
//! this pipeline was built around; a smarter pool would change observable
//! behavior and belongs behind this same interface if it ever lands.

use rand::{Rng, rng};
use tracing::info;

/// One proxy endpoint with optional credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEntry {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// True when the endpoint itself rotates exit IPs per request.
    pub rotating: bool,
}

/// The configured pool plus the enabled/disabled mode flag.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    enabled: bool,
    entries: Vec<ProxyEntry>,
}

impl ProxyPool {
    /// A pool that never returns a proxy.
    pub fn disabled() -> Self {
        ProxyPool::default()
    }

    /// Enabled pool with a single static proxy.
    pub fn single(url: String, username: Option<String>, password: Option<String>) -> Self {
        info!(%url, "Loaded single proxy");
        ProxyPool {
            enabled: true,
            entries: vec![ProxyEntry {
                url,
                username,
                password,
                rotating: false,
            }],
        }
    }

    /// Enabled pool with a single rotating endpoint.
    pub fn rotating(url: String, username: Option<String>, password: Option<String>) -> Self {
        info!(%url, "Loaded rotating proxy");
        ProxyPool {
            enabled: true,
            entries: vec![ProxyEntry {
                url,
                username,
                password,
                rotating: true,
            }],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.entries.is_empty()
    }

    /// Pick one entry uniformly at random, or `None` when disabled or empty.
    ///
    /// Stateless sampling per call, not round-robin.
    pub fn select(&self) -> Option<&ProxyEntry> {
        if !self.is_enabled() {
            return None;
        }
        let idx = rng().random_range(0..self.entries.len());
        self.entries.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_pool_selects_nothing() {
        assert!(ProxyPool::disabled().select().is_none());
        assert!(!ProxyPool::disabled().is_enabled());
    }

    #[test]
    fn test_single_pool_always_returns_the_entry() {
        let pool = ProxyPool::single(
            "http://proxy.example:8080".to_string(),
            Some("user".to_string()),
            Some("pass".to_string()),
        );
        for _ in 0..10 {
            let entry = pool.select().unwrap();
            assert_eq!(entry.url, "http://proxy.example:8080");
            assert!(!entry.rotating);
        }
    }

    #[test]
    fn test_rotating_pool_marks_entry_rotating() {
        let pool = ProxyPool::rotating("http://rotate.example:9000".to_string(), None, None);
        assert!(pool.select().unwrap().rotating);
    }
}
