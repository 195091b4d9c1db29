//! Settings of the built-in network transport.

use std::time::Duration;

use crate::{Error, Result};

/// Settings of [`crate::HyperTransport`].
///
/// Start from [`TransportConfig::default`] and adjust with the `with_*`
/// methods:
///
/// ```
/// use std::time::Duration;
/// use tether::TransportConfig;
///
/// let config = TransportConfig::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_connect_timeout(Duration::from_secs(2));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Deadline for a whole exchange, from connecting to the last body byte.
    pub timeout: Duration,
    /// Deadline for establishing a connection, TLS handshake excluded.
    pub connect_timeout: Duration,
    /// Idle connections kept per host; `0` disables connection reuse.
    pub max_idle_per_host: usize,
    /// How long an idle connection is kept; `None` keeps it until the
    /// service closes it.
    pub idle_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_idle_per_host: 32,
            idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

impl TransportConfig {
    /// Replace the exchange deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the connect deadline.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Keep up to `max_idle_per_host` idle connections for `idle_timeout`.
    #[must_use]
    pub const fn with_pool(mut self, max_idle_per_host: usize, idle_timeout: Option<Duration>) -> Self {
        self.max_idle_per_host = max_idle_per_host;
        self.idle_timeout = idle_timeout;
        self
    }

    /// Open a fresh connection for every request.
    #[must_use]
    pub const fn without_pool(self) -> Self {
        self.with_pool(0, None)
    }

    /// Check that the deadlines can be met.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if a deadline is zero or if
    /// connecting may take longer than the whole exchange.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::invalid_configuration("request timeout must not be zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::invalid_configuration("connect timeout must not be zero"));
        }
        if self.connect_timeout > self.timeout {
            return Err(Error::invalid_configuration(format!(
                "connect timeout ({:?}) exceeds request timeout ({:?})",
                self.connect_timeout, self.timeout
            )));
        }
        Ok(())
    }

    /// Connect deadline actually applied: never past the exchange deadline.
    pub(crate) fn effective_connect_timeout(&self) -> Duration {
        self.connect_timeout.min(self.timeout)
    }
}
