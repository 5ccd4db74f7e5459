// Global configuration constants - single source of truth

use std::time::Duration;

pub struct Config;

impl Config {
    // Key space
    pub const DEFAULT_PREFIX: &'static str = "colly";
    pub const DEFAULT_REDIS_URL: &'static str = "redis://127.0.0.1:6379";

    // Visited markers never expire unless configured
    pub const DEFAULT_EXPIRATION_SECS: u64 = 0;

    // Shared deadline for every store call, 0 = unbounded
    pub const DEFAULT_TIMEOUT_SECS: u64 = 0;
}

/// Settings the admin binary (or an embedding crawler) resolves before
/// building a [`Storage`](crate::storage::Storage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub redis_url: String,
    pub prefix: String,
    pub expiration_secs: u64,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_url: Config::DEFAULT_REDIS_URL.to_string(),
            prefix: Config::DEFAULT_PREFIX.to_string(),
            expiration_secs: Config::DEFAULT_EXPIRATION_SECS,
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl StorageConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.prefix, "colly");
        assert_eq!(config.expiration(), Duration::ZERO);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_timeout() {
        let config = StorageConfig {
            timeout_secs: 5,
            ..StorageConfig::default()
        };
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }
}
