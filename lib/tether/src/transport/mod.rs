//! Built-in transports.
//!
//! - [`HyperTransport`] - pooled HTTP/1.1 + HTTP/2 client over rustls
//! - [`ServiceTransport`] - any Tower service used as a transport
//! - [`TransportService`] - any transport used as a Tower service, so that
//!   Tower layers can be stacked under the filter chain

mod hyper;
mod service;

pub use self::hyper::HyperTransport;
pub use self::service::{BoxedService, ServiceTransport, TransportService};
