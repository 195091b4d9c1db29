//! Backend-as-a-service client with a composable filter pipeline.
//!
//! A [`Client`] is bound to a service [`Endpoint`], carries an ordered list of
//! [`Filter`]s and a shared current-user cell, and invokes custom APIs through
//! a chain of those filters terminated by a [`Transport`].
//!
//! # Example
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let client = Client::with_application_key("https://svc.example.net", "secret")?
//!     .with_filter(LoggingFilter::new());
//!
//! let outcome = client
//!     .invoke_json::<serde_json::Value>(ApiCall::new("ping", "GET"), None)
//!     .await;
//! let value = outcome.into_result()?;
//! ```
//!
//! Adding a filter never changes the client it was added to:
//! [`Client::with_filter`] returns a new client that shares the endpoint,
//! the transport and the current-user cell with its parent.

mod chain;
mod client;
mod config;
mod connector;
mod endpoint;
mod filter;
pub mod filters;
mod invoke;
mod login;
pub mod prelude;
mod session;
pub mod transport;

pub use chain::Chain;
pub use client::{Client, ClientBuilder};
pub use config::TransportConfig;
pub use endpoint::Endpoint;
pub use filter::{Filter, FilterFn, Next, filter_fn};
pub use invoke::{APPLICATION_KEY_HEADER, AUTH_TOKEN_HEADER, ApiCall, Outcome};
pub use login::{LoginFuture, LoginProvider, ServiceLogin};
pub use session::{Session, User};
pub use transport::{HyperTransport, ServiceTransport};

// Re-export tower for transport layering
pub use tower;

// Re-export core types
pub use tether_core::{
    ContentType, Error, Headers, Method, Payload, Request, RequestBuilder, Response,
    ResponseFuture, ResponseMeta, Result, StatusCode, Transport, TransportFn, from_json, to_json,
    transport_fn,
};
