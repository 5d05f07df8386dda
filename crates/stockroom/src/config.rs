use std::{env, str::FromStr, time::Duration};

use stockroom_core::service::{parse_workers, UpsertConfig, DEFAULT_REFRESH_MAX_INFLIGHT};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine settings for channels (`UPDATE_CHANNEL_WORKER`)
    pub channel: UpsertConfig,
    /// Engine settings for locations (`UPDATE_LOCATION_WORKER`)
    pub location: UpsertConfig,
    /// Cache TTL in seconds (default: 30 days)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    /// Note: Only used when the `memory` feature is enabled.
    #[allow(dead_code)]
    pub cache_max_entries: usize,
    /// Maximum number of in-flight background cache refreshes (default: 64)
    pub cache_refresh_max_inflight: usize,
    /// Postgres connection URL (default: "postgres://localhost/stockroom")
    /// Note: Only used when the `postgres` feature is enabled.
    #[allow(dead_code)]
    pub database_url: String,
    /// Postgres pool size (default: 100)
    #[allow(dead_code)]
    pub database_max_connections: u32,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPDATE_CHANNEL_WORKER` - Channel worker ceiling (default: 5)
    /// - `UPDATE_LOCATION_WORKER` - Location worker ceiling (default: 5)
    /// - `UPSERT_LOCK_DELAY_MS` - Delay per unit of the locked upsert (default: 5000)
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 2,592,000)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `CACHE_REFRESH_MAX_INFLIGHT` - Background cache refresh bound (default: 64)
    /// - `DATABASE_URL` - Postgres URL (default: "postgres://localhost/stockroom")
    /// - `DATABASE_MAX_CONNECTIONS` - Postgres pool size (default: 100)
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lock_delay = Duration::from_millis(parse_or(lookup("UPSERT_LOCK_DELAY_MS"), 5_000));
        let upsert = |key: &str| {
            UpsertConfig::default()
                .with_workers(parse_workers(lookup(key).as_deref()))
                .with_lock_delay(lock_delay)
        };

        Self {
            channel: upsert("UPDATE_CHANNEL_WORKER"),
            location: upsert("UPDATE_LOCATION_WORKER"),
            cache_ttl_seconds: parse_or(lookup("CACHE_TTL_SECONDS"), 30 * 24 * 60 * 60),
            cache_max_entries: parse_or(lookup("CACHE_MAX_ENTRIES"), 10_000),
            cache_refresh_max_inflight: parse_or(
                lookup("CACHE_REFRESH_MAX_INFLIGHT"),
                DEFAULT_REFRESH_MAX_INFLIGHT,
            ),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/stockroom".to_string()),
            database_max_connections: parse_or(lookup("DATABASE_MAX_CONNECTIONS"), 100),
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
