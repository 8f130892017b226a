use std::{env, time::Duration};

/// Configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Radical prefixed to every cache key (default: "arepo")
    pub cache_radical_key: String,
    /// Per-operation store deadline in milliseconds (default: none)
    pub store_timeout_ms: Option<u64>,
    /// Path to SQLite database file (default: "arepo.db")
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `CACHE_RADICAL_KEY` - Cache key radical (default: "arepo")
    /// - `STORE_TIMEOUT_MS` - Store deadline in milliseconds (default: unset)
    /// - `SQLITE_PATH` - SQLite database path (default: "arepo.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            cache_ttl_seconds: lookup("CACHE_TTL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cache_max_entries: lookup("CACHE_MAX_ENTRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            cache_radical_key: lookup("CACHE_RADICAL_KEY").unwrap_or_else(|| "arepo".to_string()),
            store_timeout_ms: lookup("STORE_TIMEOUT_MS").and_then(|v| v.parse().ok()),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "arepo.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Get the store deadline as a Duration, if one is configured.
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
