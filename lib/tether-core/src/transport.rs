//! Transport contract.
//!
//! A [`Transport`] is the innermost continuation of every filter chain: it
//! takes the final [`Request`] and performs the network call. Connection
//! pooling, TLS and redirects are entirely its concern.

use std::future::Future;
use std::pin::Pin;

use crate::{Request, Response, Result};

/// Boxed future resolving to a buffered response.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Terminal network adapter.
///
/// Implementations report network failures with the network error kinds
/// ([`crate::Error::Connection`], [`crate::Error::Tls`],
/// [`crate::Error::Timeout`], [`crate::Error::Cancelled`]); the pipeline
/// passes them through unchanged. Non-2xx statuses are *not* errors at this
/// level.
pub trait Transport: Send + Sync + 'static {
    /// Send the request and resolve to the response.
    fn send(&self, request: Request) -> ResponseFuture;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: Request) -> ResponseFuture {
        (**self).send(request)
    }
}

/// Transport built from an async closure, see [`transport_fn`].
#[derive(Clone)]
pub struct TransportFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for TransportFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportFn").finish_non_exhaustive()
    }
}

/// Create a [`Transport`] from an async closure.
///
/// Mostly useful for stubbing the network in tests.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use tether_core::{Headers, Request, Response, transport_fn};
///
/// let echo = transport_fn(|request: Request| async move {
///     let (_, _, _, body) = request.into_parts();
///     let body = body.map(|payload| payload.into_bytes()).transpose()?;
///     Ok(Response::new(200, Headers::new(), body.unwrap_or_default()))
/// });
/// ```
pub fn transport_fn<F, Fut>(f: F) -> TransportFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    TransportFn { f }
}

impl<F, Fut> Transport for TransportFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn send(&self, request: Request) -> ResponseFuture {
        Box::pin((self.f)(request))
    }
}
