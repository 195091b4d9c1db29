//! Filters and their continuation.
//!
//! A [`Filter`] sees every request before it reaches the transport and every
//! response (or error) on its way back. It receives a [`Next`] handle that
//! runs the remainder of the chain.
//!
//! # Example
//!
//! ```ignore
//! use tether::{Filter, Next, Request, ResponseFuture};
//!
//! struct Tag(&'static str);
//!
//! impl Filter for Tag {
//!     fn handle(&self, mut request: Request, next: Next) -> ResponseFuture {
//!         request.headers_mut().insert("X-Tag", self.0);
//!         next.run(request)
//!     }
//! }
//! ```

use std::any::Any;
use std::future::{self, Future};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures_util::FutureExt;
use tracing::{trace, warn};

use crate::{Error, Request, Response, ResponseFuture, Result, Transport};

/// Interceptor over the request pipeline.
///
/// A filter may:
/// - inspect or rewrite the request before calling `next`;
/// - inspect or rewrite the response or error after `next` resolves;
/// - short-circuit by returning a response or error without calling `next`.
///
/// `next` must be run at most once. Running it again resolves to
/// [`Error::FilterProtocolViolation`] and fails the whole invocation, as does
/// panicking inside `handle` or inside the returned future.
///
/// Filters are shared by every invocation of the clients they are installed
/// on, so they must tolerate concurrent calls.
pub trait Filter: Send + Sync + 'static {
    /// Handle a request, delegating to `next` for the rest of the chain.
    fn handle(&self, request: Request, next: Next) -> ResponseFuture;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F: Filter + ?Sized> Filter for Arc<F> {
    fn handle(&self, request: Request, next: Next) -> ResponseFuture {
        (**self).handle(request, next)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Filter built from an async closure, see [`filter_fn`].
#[derive(Clone)]
pub struct FilterFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for FilterFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterFn").finish_non_exhaustive()
    }
}

/// Create a [`Filter`] from an async closure.
///
/// # Example
///
/// ```ignore
/// let add_version = filter_fn(|mut request: Request, next: Next| {
///     request.headers_mut().insert("X-Api-Version", "2");
///     next.run(request)
/// });
/// ```
pub fn filter_fn<F, Fut>(f: F) -> FilterFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FilterFn { f }
}

impl<F, Fut> Filter for FilterFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn handle(&self, request: Request, next: Next) -> ResponseFuture {
        Box::pin((self.f)(request, next))
    }

    fn name(&self) -> &str {
        "filter_fn"
    }
}

/// Continuation running the remainder of the chain.
///
/// Cloning a `Next` does not make it reusable: all clones share one
/// single-use token.
#[derive(Clone)]
pub struct Next {
    link: Arc<Link>,
}

struct Link {
    layers: Arc<[Arc<dyn Filter>]>,
    transport: Arc<dyn Transport>,
    position: usize,
    used: AtomicBool,
    violation: Arc<OnceLock<String>>,
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.link.position)
            .field("layers", &self.link.layers.len())
            .field("used", &self.link.used.load(Ordering::Acquire))
            .finish()
    }
}

impl Next {
    /// Continuation for the outermost layer of an invocation.
    pub(crate) fn start(
        layers: Arc<[Arc<dyn Filter>]>,
        transport: Arc<dyn Transport>,
        violation: Arc<OnceLock<String>>,
    ) -> Self {
        Self {
            link: Arc::new(Link {
                layers,
                transport,
                position: 0,
                used: AtomicBool::new(false),
                violation,
            }),
        }
    }

    fn successor(&self) -> Self {
        Self {
            link: Arc::new(Link {
                layers: Arc::clone(&self.link.layers),
                transport: Arc::clone(&self.link.transport),
                position: self.link.position + 1,
                used: AtomicBool::new(false),
                violation: Arc::clone(&self.link.violation),
            }),
        }
    }

    /// Run the rest of the chain with `request`.
    ///
    /// The first call hands the request to the next filter, or to the
    /// transport once all filters have run. Any later call on this handle or
    /// one of its clones resolves to [`Error::FilterProtocolViolation`]
    /// without running anything.
    #[must_use = "the continuation does nothing unless its future is awaited"]
    pub fn run(self, request: Request) -> ResponseFuture {
        let position = self.link.position;

        if self.link.used.swap(true, Ordering::AcqRel) {
            let message = format!(
                "filter at position {} called next more than once",
                position.saturating_sub(1)
            );
            warn!(position, "{message}");
            let _ = self.link.violation.set(message.clone());
            return Box::pin(future::ready(Err(Error::filter_protocol_violation(message))));
        }

        match self.link.layers.get(position) {
            None => {
                trace!(position, "entering transport");
                let transport = Arc::clone(&self.link.transport);
                guard(
                    move || transport.send(request),
                    |message| Error::connection(format!("transport panicked: {message}")),
                )
            }
            Some(filter) => {
                let filter = Arc::clone(filter);
                trace!(position, filter = filter.name(), "entering filter");
                let next = self.successor();
                let violation = Arc::clone(&self.link.violation);
                guard(
                    move || filter.handle(request, next),
                    move |message| {
                        let message = format!("filter at position {position} panicked: {message}");
                        warn!(position, "{message}");
                        let _ = violation.set(message.clone());
                        Error::filter_protocol_violation(message)
                    },
                )
            }
        }
    }

    /// Number of layers (filters) still ahead of this continuation.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.link.layers.len().saturating_sub(self.link.position)
    }
}

/// Run `call`, turning a panic (while building or while polling the future)
/// into the error produced by `on_panic`.
fn guard<C, P>(call: C, on_panic: P) -> ResponseFuture
where
    C: FnOnce() -> ResponseFuture,
    P: FnOnce(String) -> Error + Send + 'static,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(future) => Box::pin(AssertUnwindSafe(future).catch_unwind().map(
            move |outcome| match outcome {
                Ok(result) => result,
                Err(payload) => Err(on_panic(panic_message(payload.as_ref()))),
            },
        )),
        Err(payload) => Box::pin(future::ready(Err(on_panic(panic_message(
            payload.as_ref(),
        ))))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
