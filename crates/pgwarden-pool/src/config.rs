//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Configuration for the connection pool.
///
/// A zero [`Duration`] disables the corresponding limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections the reaper never closes below.
    pub min_connections: u32,

    /// Maximum number of connections allowed.
    pub max_connections: u32,

    /// Time to wait for a connection (queueing plus connecting) before
    /// timing out. Zero waits forever.
    pub connection_timeout: Duration,

    /// Time a connection can be idle before being closed. Zero never
    /// closes idle connections.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection. Zero is unlimited.
    pub max_lifetime: Duration,

    /// Whether to test connections on checkout.
    pub test_on_checkout: bool,

    /// Connections idle for less than this are handed out without a
    /// health check.
    pub health_check_interval: Duration,

    /// How often the background reaper runs. Zero disables it.
    pub reaper_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 0,
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10),
            max_lifetime: Duration::ZERO,
            test_on_checkout: true,
            health_check_interval: Duration::from_secs(30),
            reaper_interval: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = count;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Enable or disable testing connections on checkout.
    #[must_use]
    pub fn test_on_checkout(mut self, enabled: bool) -> Self {
        self.test_on_checkout = enabled;
        self
    }

    /// Set the health check interval.
    #[must_use]
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Set the reaper interval.
    #[must_use]
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::Configuration(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(PoolError::Configuration(
                "min_connections cannot be greater than max_connections".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.max_lifetime, Duration::ZERO);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        assert!(matches!(
            PoolConfig::new().max_connections(0).validate(),
            Err(PoolError::Configuration(_))
        ));
        assert!(matches!(
            PoolConfig::new().min_connections(5).max_connections(2).validate(),
            Err(PoolError::Configuration(_))
        ));
    }
}
