//! Bridges between [`Transport`] and Tower services.

use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::{Service, ServiceExt};

use crate::{Error, Request, Response, ResponseFuture, Result, Transport};

/// Type-erased Tower service carrying tether requests.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// A Tower service used as a [`Transport`].
///
/// `BoxCloneService` is not `Sync`, so the service sits behind a mutex that is
/// held only long enough to clone it; each request then drives its own clone
/// through `poll_ready` and `call`.
///
/// # Example
///
/// ```ignore
/// use tether::{HyperTransport, ServiceTransport};
/// use tower::ServiceBuilder;
/// use tower::limit::ConcurrencyLimitLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(ConcurrencyLimitLayer::new(8))
///     .service(HyperTransport::new());
/// let transport = ServiceTransport::new(service);
/// ```
#[derive(Clone)]
pub struct ServiceTransport {
    inner: Arc<Mutex<BoxedService>>,
}

impl std::fmt::Debug for ServiceTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTransport").finish_non_exhaustive()
    }
}

impl ServiceTransport {
    /// Wrap a Tower service.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        Self::from_boxed(BoxCloneService::new(service))
    }

    /// Wrap an already boxed service.
    #[must_use]
    pub fn from_boxed(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }
}

impl Transport for ServiceTransport {
    fn send(&self, request: Request) -> ResponseFuture {
        // Lock, clone the service, and release the lock immediately
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(service.oneshot(request))
    }
}

/// A [`Transport`] exposed as a Tower service.
#[derive(Clone)]
pub struct TransportService {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for TransportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportService").finish_non_exhaustive()
    }
}

impl TransportService {
    /// Wrap a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Service<Request> for TransportService {
    type Response = Response;
    type Error = Error;
    type Future = ResponseFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.transport.send(request)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tower::ServiceBuilder;
    use tower::limit::ConcurrencyLimitLayer;

    use super::*;
    use crate::{Headers, Method, transport_fn};

    fn request() -> Request {
        let url = url::Url::parse("https://svc.example.net/api/ping").expect("url");
        Request::builder(Method::GET, url).build()
    }

    #[tokio::test]
    async fn round_trips_through_tower() {
        let stub: Arc<dyn Transport> = Arc::new(transport_fn(|request: Request| async move {
            Ok(Response::new(
                200,
                Headers::new(),
                Bytes::from(request.url().path().to_string()),
            ))
        }));

        let service = ServiceBuilder::new()
            .layer(ConcurrencyLimitLayer::new(1))
            .service(TransportService::new(stub));
        let transport = ServiceTransport::new(service);

        let first = transport.send(request()).await.expect("first");
        let second = transport.send(request()).await.expect("second");

        assert_eq!(first.body().as_ref(), b"/api/ping");
        assert_eq!(second.status(), 200);
    }
}
