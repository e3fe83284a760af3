//! Cache configuration types and builder patterns

use std::time::Duration;

/// Configuration for cache behavior
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (None = unlimited)
    pub max_entries: Option<usize>,

    /// Default time-to-live for entries without an explicit TTL
    /// (None = no expiration)
    pub default_ttl: Option<Duration>,

    /// Whether to collect detailed access metrics
    pub track_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: None, default_ttl: None, track_metrics: false }
    }
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Quick preset for TTL-based cache
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use courier_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::ttl(Duration::from_secs(3600));
    /// ```
    pub fn ttl(duration: Duration) -> Self {
        Self { max_entries: None, default_ttl: Some(duration), track_metrics: false }
    }

    /// Quick preset for LRU cache
    ///
    /// # Example
    /// ```
    /// use courier_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::lru(1000);
    /// ```
    pub fn lru(max_entries: usize) -> Self {
        Self { max_entries: Some(max_entries), default_ttl: None, track_metrics: false }
    }

    /// Combined TTL + LRU cache
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use courier_common::cache::CacheConfig;
    ///
    /// let config = CacheConfig::ttl_lru(Duration::from_secs(3600), 1000);
    /// ```
    pub fn ttl_lru(ttl: Duration, max_entries: usize) -> Self {
        Self { max_entries: Some(max_entries), default_ttl: Some(ttl), track_metrics: false }
    }
}

/// Builder for CacheConfig with fluent API
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of entries
    pub fn max_entries(mut self, count: usize) -> Self {
        self.config.max_entries = Some(count);
        self
    }

    /// Set default time-to-live for entries
    pub fn default_ttl(mut self, duration: Duration) -> Self {
        self.config.default_ttl = Some(duration);
        self
    }

    /// Enable or disable metrics tracking
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::config.
    use super::*;

    /// Validates `CacheConfig::default` behavior for the cache config default
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `config.max_entries.is_none()` evaluates to true.
    /// - Ensures `config.default_ttl.is_none()` evaluates to true.
    /// - Ensures `!config.track_metrics` evaluates to true.
    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert!(config.max_entries.is_none());
        assert!(config.default_ttl.is_none());
        assert!(!config.track_metrics);
    }

    /// Validates `Duration::from_secs` behavior for the cache config ttl preset
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `config.max_entries.is_none()` evaluates to true.
    /// - Confirms `config.default_ttl` equals `Some(ttl)`.
    #[test]
    fn test_cache_config_ttl_preset() {
        let ttl = Duration::from_secs(3600);
        let config = CacheConfig::ttl(ttl);

        assert!(config.max_entries.is_none());
        assert_eq!(config.default_ttl, Some(ttl));
    }

    /// Validates `CacheConfig::lru` behavior for the cache config lru preset
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `config.max_entries` equals `Some(1000)`.
    /// - Ensures `config.default_ttl.is_none()` evaluates to true.
    #[test]
    fn test_cache_config_lru_preset() {
        let config = CacheConfig::lru(1000);

        assert_eq!(config.max_entries, Some(1000));
        assert!(config.default_ttl.is_none());
    }

    /// Validates `Duration::from_secs` behavior for the cache config ttl lru
    /// preset scenario.
    ///
    /// Assertions:
    /// - Confirms `config.max_entries` equals `Some(1000)`.
    /// - Confirms `config.default_ttl` equals `Some(ttl)`.
    #[test]
    fn test_cache_config_ttl_lru_preset() {
        let ttl = Duration::from_secs(3600);
        let config = CacheConfig::ttl_lru(ttl, 1000);

        assert_eq!(config.max_entries, Some(1000));
        assert_eq!(config.default_ttl, Some(ttl));
    }

    /// Validates `CacheConfig::builder` behavior for the builder scenario.
    ///
    /// Assertions:
    /// - Confirms `config.max_entries` equals `Some(500)`.
    /// - Confirms `config.default_ttl` equals
    ///   `Some(Duration::from_secs(1800))`.
    /// - Ensures `config.track_metrics` evaluates to true.
    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::builder()
            .max_entries(500)
            .default_ttl(Duration::from_secs(1800))
            .track_metrics(true)
            .build();

        assert_eq!(config.max_entries, Some(500));
        assert_eq!(config.default_ttl, Some(Duration::from_secs(1800)));
        assert!(config.track_metrics);
    }
}
