//! Core types and traits for the tether client pipeline.
//!
//! This crate provides the types shared by filters and transports:
//! - [`Request`], [`RequestBuilder`] and [`Payload`] - the request descriptor
//!   that travels through the filter chain
//! - [`Response`] and [`ResponseMeta`] - HTTP response types
//! - [`Headers`] - case-insensitive, order-preserving header map
//! - [`Error`] and [`Result`] - Error handling
//! - [`Transport`] - the terminal network adapter contract
//! - [`Method`], [`StatusCode`] - re-exported from the `http` crate

mod body;
mod error;
mod headers;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{ContentType, from_json, to_json};
pub use error::{Error, Result};
pub use headers::Headers;
pub use request::{Payload, Request, RequestBuilder};
pub use response::{Response, ResponseMeta};
pub use transport::{ResponseFuture, Transport, TransportFn, transport_fn};

// Re-export http crate types for methods and status codes
pub use http::{Method, StatusCode};
