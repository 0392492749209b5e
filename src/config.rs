//! Configuration Module
//!
//! Handles loading cache and sidecar configuration from environment variables.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default cache schema tag for persisted snapshots.
pub const DEFAULT_CACHE_VERSION: &str = "v1";

/// Default group layout: `name:prefix|prefix;name:prefix`.
pub const DEFAULT_GROUPS: &str = "blog:api/blog|api/blog/all;media:api/media;user:api/user";

// == Cache Config ==
/// Options recognized by the cache core.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL used when nothing more specific applies
    pub default_ttl: Duration,
    /// TTL per key prefix; the longest matching prefix wins
    pub prefix_ttl: HashMap<String, Duration>,
    /// Default TTL per group name
    pub group_ttl: HashMap<String, Duration>,
    /// Maximum number of live entries
    pub max_items: usize,
    /// Maximum summed entry size in bytes
    pub max_size: usize,
    /// Whether snapshots are written to durable storage
    pub persistence_enabled: bool,
    /// Interval between snapshot flushes
    pub sync_interval: Duration,
    /// Schema tag stored alongside snapshots
    pub cache_version: String,
    /// Group name to key prefixes
    pub groups: HashMap<String, Vec<String>>,
    /// Interval between background expiry sweeps
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Set the global default TTL.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set a TTL for every key under `prefix`.
    #[must_use]
    pub fn with_prefix_ttl(mut self, prefix: impl Into<String>, ttl: Duration) -> Self {
        self.prefix_ttl.insert(prefix.into(), ttl);
        self
    }

    /// Set the default TTL for a group.
    #[must_use]
    pub fn with_group_ttl(mut self, group: impl Into<String>, ttl: Duration) -> Self {
        self.group_ttl.insert(group.into(), ttl);
        self
    }

    /// Set the maximum number of entries.
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Set the maximum summed size in bytes.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Register (or replace) a group and its prefixes.
    #[must_use]
    pub fn with_group<I, S>(mut self, name: impl Into<String>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .insert(name.into(), prefixes.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable snapshot persistence.
    #[must_use]
    pub fn with_persistence(mut self, enabled: bool) -> Self {
        self.persistence_enabled = enabled;
        self
    }

    /// Set the snapshot schema tag.
    #[must_use]
    pub fn with_cache_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    /// Loads cache options from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_ITEMS` - Maximum entries (default: 1000)
    /// - `CACHE_MAX_SIZE` - Maximum summed size in bytes (default: 5 MiB)
    /// - `CACHE_PERSISTENCE_ENABLED` - Snapshot persistence (default: true)
    /// - `CACHE_SYNC_INTERVAL_MS` - Snapshot flush interval (default: 30000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Expiry sweep interval (default: 1000)
    /// - `CACHE_VERSION` - Snapshot schema tag (default: "v1")
    /// - `CACHE_GROUPS` - `name:prefix|prefix;name:prefix`
    /// - `CACHE_PREFIX_TTLS` - `prefix=ms,prefix=ms`
    /// - `CACHE_GROUP_TTLS` - `group=ms,group=ms`
    ///
    /// Unparseable values and zero durations fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_millis("CACHE_DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl),
            prefix_ttl: env::var("CACHE_PREFIX_TTLS")
                .map(|raw| parse_ttl_map(&raw))
                .unwrap_or_default(),
            group_ttl: env::var("CACHE_GROUP_TTLS")
                .map(|raw| parse_ttl_map(&raw))
                .unwrap_or_default(),
            max_items: env_parse("CACHE_MAX_ITEMS").unwrap_or(defaults.max_items),
            max_size: env_parse("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            persistence_enabled: env_parse("CACHE_PERSISTENCE_ENABLED")
                .unwrap_or(defaults.persistence_enabled),
            sync_interval: env_millis("CACHE_SYNC_INTERVAL_MS").unwrap_or(defaults.sync_interval),
            cache_version: env::var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            groups: env::var("CACHE_GROUPS")
                .map(|raw| parse_groups(&raw))
                .unwrap_or(defaults.groups),
            sweep_interval: env_millis("CACHE_SWEEP_INTERVAL_MS")
                .unwrap_or(defaults.sweep_interval),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            prefix_ttl: HashMap::new(),
            group_ttl: HashMap::new(),
            max_items: 1000,
            max_size: 5 * 1024 * 1024,
            persistence_enabled: true,
            sync_interval: Duration::from_secs(30),
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            groups: parse_groups(DEFAULT_GROUPS),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

// == Sidecar Config ==
/// Configuration of the caching sidecar binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the API the cache fronts
    pub upstream_url: String,
    /// Timeout applied by the upstream fetcher
    pub upstream_timeout: Duration,
    /// Directory holding persisted snapshots
    pub storage_dir: PathBuf,
    /// Apply pushed `updated` payloads directly instead of invalidating
    pub optimistic_updates: bool,
    /// Cache core options
    pub cache: CacheConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Upstream API base URL (default: http://127.0.0.1:8080)
    /// - `UPSTREAM_TIMEOUT_MS` - Upstream request timeout (default: 10000)
    /// - `STORAGE_DIR` - Snapshot directory (default: .synced_cache)
    /// - `OPTIMISTIC_UPDATES` - Optimistic push updates (default: false)
    /// - plus every `CACHE_*` variable read by [`CacheConfig::from_env`]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            upstream_timeout: env_millis("UPSTREAM_TIMEOUT_MS").unwrap_or(defaults.upstream_timeout),
            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            optimistic_updates: env_parse("OPTIMISTIC_UPDATES")
                .unwrap_or(defaults.optimistic_updates),
            cache: CacheConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_url: "http://127.0.0.1:8080".to_string(),
            upstream_timeout: Duration::from_secs(10),
            storage_dir: PathBuf::from(".synced_cache"),
            optimistic_updates: false,
            cache: CacheConfig::default(),
        }
    }
}

// == Parsing Helpers ==
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Millisecond duration; zero counts as unparseable.
fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name)
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Parses `name:prefix|prefix;name:prefix` into a group map.
///
/// Malformed segments are skipped.
pub fn parse_groups(raw: &str) -> HashMap<String, Vec<String>> {
    raw.split(';')
        .filter_map(|segment| {
            let (name, prefixes) = segment.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let prefixes: Vec<String> = prefixes
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            Some((name.to_string(), prefixes))
        })
        .collect()
}

/// Parses `name=ms,name=ms` into a TTL map.
///
/// Malformed pairs are skipped.
pub fn parse_ttl_map(raw: &str) -> HashMap<String, Duration> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, ms) = pair.split_once('=')?;
            let ms: u64 = ms.trim().parse().ok()?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), Duration::from_millis(ms)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_millis_falls_back() {
        env::set_var("SYNCED_CACHE_TEST_ZERO_MS", "0");
        env::set_var("SYNCED_CACHE_TEST_SOME_MS", "250");
        env::set_var("SYNCED_CACHE_TEST_BAD_MS", "soon");

        assert_eq!(env_millis("SYNCED_CACHE_TEST_ZERO_MS"), None);
        assert_eq!(env_millis("SYNCED_CACHE_TEST_SOME_MS"), Some(Duration::from_millis(250)));
        assert_eq!(env_millis("SYNCED_CACHE_TEST_BAD_MS"), None);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert!(!config.optimistic_updates);
        assert_eq!(config.cache.max_items, 1000);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.cache.cache_version, "v1");
        assert!(config.cache.persistence_enabled);
    }

    #[test]
    fn test_default_groups() {
        let config = CacheConfig::default();
        assert_eq!(
            config.groups.get("blog"),
            Some(&vec!["api/blog".to_string(), "api/blog/all".to_string()])
        );
        assert_eq!(config.groups.get("media"), Some(&vec!["api/media".to_string()]));
        assert_eq!(config.groups.get("user"), Some(&vec!["api/user".to_string()]));
    }

    #[test]
    fn test_parse_groups_skips_malformed_segments() {
        let groups = parse_groups("blog:api/blog;nonsense;:api/x;media: api/media | ");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["media"], vec!["api/media".to_string()]);
    }

    #[test]
    fn test_parse_ttl_map() {
        let ttls = parse_ttl_map("api/blog=60000, api/media = 1000,broken,x=abc");
        assert_eq!(ttls.len(), 2);
        assert_eq!(ttls["api/blog"], Duration::from_millis(60_000));
        assert_eq!(ttls["api/media"], Duration::from_millis(1_000));
    }

    #[test]
    fn test_builder_methods() {
        let config = CacheConfig::default()
            .with_max_items(2)
            .with_max_size(128)
            .with_prefix_ttl("api/blog/post", Duration::from_secs(5))
            .with_group("docs", ["api/docs"])
            .with_persistence(false);
        assert_eq!(config.max_items, 2);
        assert_eq!(config.max_size, 128);
        assert_eq!(config.prefix_ttl["api/blog/post"], Duration::from_secs(5));
        assert_eq!(config.groups["docs"], vec!["api/docs".to_string()]);
        assert!(!config.persistence_enabled);
    }
}
