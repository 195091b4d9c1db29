//! Bundled filters.
//!
//! None of these is installed implicitly; add them with
//! [`Client::with_filter`](crate::Client::with_filter) or
//! [`ClientBuilder::filter`](crate::ClientBuilder::filter).
//!
//! - [`LoggingFilter`] - logs each invocation with `tracing`
//! - [`TimeoutFilter`] - fails the invocation after a deadline

mod logging;
mod timeout;

pub use self::logging::{LogLevel, LoggingFilter};
pub use self::timeout::TimeoutFilter;
