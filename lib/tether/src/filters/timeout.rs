//! Deadline filter.

use std::time::Duration;

use tracing::warn;

use crate::{Error, Filter, Next, Request, ResponseFuture};

/// Fails the invocation with [`Error::Timeout`] if the rest of the chain does
/// not answer within `timeout`.
///
/// The time counts everything after this filter, so place it first to bound
/// the whole chain or last to bound the transport only.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tether::filters::TimeoutFilter;
///
/// let client = client.with_filter(TimeoutFilter::new(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TimeoutFilter {
    timeout: Duration,
}

impl TimeoutFilter {
    /// Deadline of `timeout` for each invocation.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Filter for TimeoutFilter {
    fn handle(&self, request: Request, next: Next) -> ResponseFuture {
        let timeout = self.timeout;
        Box::pin(async move {
            if let Ok(result) = tokio::time::timeout(timeout, next.run(request)).await {
                result
            } else {
                warn!(?timeout, "invocation timed out");
                Err(Error::Timeout)
            }
        })
    }

    fn name(&self) -> &str {
        "timeout"
    }
}
