//! Saga configuration loaded from environment variables.

use std::time::Duration;

/// Default bound on a single port call.
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Saga runtime settings.
///
/// Reads from environment variables:
/// - `SAGA_PORT_TIMEOUT_MS`: bound on every payment/delivery call (default: `5000`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaConfig {
    pub port_timeout: Duration,
}

impl SagaConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            port_timeout: std::env::var("SAGA_PORT_TIMEOUT_MS")
                .ok()
                .and_then(|ms| ms.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PORT_TIMEOUT),
        }
    }

    pub fn with_port_timeout(port_timeout: Duration) -> Self {
        Self { port_timeout }
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            port_timeout: DEFAULT_PORT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(SagaConfig::default().port_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_custom_timeout() {
        let config = SagaConfig::with_port_timeout(Duration::from_millis(20));
        assert_eq!(config.port_timeout.as_millis(), 20);
    }
}
