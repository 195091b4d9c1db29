//! Invocation logging filter.
//!
//! Logs requests and responses passing through the chain using `tracing`.

use std::time::Instant;

use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Filter, Next, Request, ResponseFuture};

/// Log level for [`LoggingFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log request headers as well.
    Debug,
    /// Log a summary only.
    #[default]
    Info,
}

/// Filter that logs each request and its result.
///
/// Header values are only logged at [`LogLevel::Debug`]; they may contain
/// the user's authentication token.
///
/// # Example
///
/// ```ignore
/// use tether::filters::LoggingFilter;
///
/// let client = client.with_filter(LoggingFilter::debug());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFilter {
    level: LogLevel,
}

impl LoggingFilter {
    /// Log at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Filter for LoggingFilter {
    fn handle(&self, request: Request, next: Next) -> ResponseFuture {
        let method = request.method().clone();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "tether_request", api = %request.api_name(), %method, %url);

        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(
                            method = %method,
                            url = %url,
                            headers = ?request.headers(),
                            "sending request"
                        );
                    }
                    LogLevel::Info => {
                        info!(method = %method, url = %url, "sending request");
                    }
                }

                let result = next.run(request).await;

                // Saturating conversion to u64
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) if response.is_success() => {
                        info!(status = response.status(), elapsed_ms, "request completed");
                    }
                    Ok(response) => {
                        warn!(
                            status = response.status(),
                            elapsed_ms, "request failed with HTTP error"
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }

    fn name(&self) -> &str {
        "logging"
    }
}
