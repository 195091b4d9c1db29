//! Filter chain builder.

use std::sync::{Arc, OnceLock};

use crate::{Error, Filter, Next, Request, ResponseFuture, Transport};

/// Filters wired around a terminal transport.
///
/// The first filter is the outermost layer: it sees the caller's request
/// first and the final response last. The last filter sits right next to the
/// transport. A filter present twice runs twice, once per position. With no
/// filters the chain is the transport.
#[derive(Clone)]
pub struct Chain {
    layers: Arc<[Arc<dyn Filter>]>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field(
                "layers",
                &self.layers.iter().map(|layer| layer.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Wire `filters` (outermost first) around `transport`.
    pub fn new(filters: impl Into<Arc<[Arc<dyn Filter>]>>, transport: Arc<dyn Transport>) -> Self {
        Self {
            layers: filters.into(),
            transport,
        }
    }

    /// Number of filters in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the chain holds no filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run one request through every layer.
    ///
    /// If any filter broke the continuation contract during this run, the
    /// result is [`Error::FilterProtocolViolation`] whatever the outer
    /// filters made of it.
    pub fn call(&self, request: Request) -> ResponseFuture {
        let violation = Arc::new(OnceLock::new());
        let next = Next::start(
            Arc::clone(&self.layers),
            Arc::clone(&self.transport),
            Arc::clone(&violation),
        );
        let response = next.run(request);

        Box::pin(async move {
            let result = response.await;
            match violation.get() {
                Some(message) => Err(Error::filter_protocol_violation(message.clone())),
                None => result,
            }
        })
    }
}

impl Transport for Chain {
    fn send(&self, request: Request) -> ResponseFuture {
        self.call(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::*;
    use crate::{Headers, Method, Response, filter_fn, transport_fn};

    type Trace = Arc<Mutex<Vec<String>>>;

    fn request() -> Request {
        let url = url::Url::parse("https://svc.example.net/api/ping").expect("url");
        Request::builder(Method::GET, url).build()
    }

    fn recording_filter(name: &'static str, trace: &Trace) -> Arc<dyn Filter> {
        let trace = Arc::clone(trace);
        Arc::new(filter_fn(move |request: Request, next: Next| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().expect("lock").push(format!("{name}-enter"));
                let result = next.run(request).await;
                trace.lock().expect("lock").push(format!("{name}-exit"));
                result
            }
        }))
    }

    fn recording_transport(trace: &Trace) -> Arc<dyn Transport> {
        let trace = Arc::clone(trace);
        Arc::new(transport_fn(move |_request: Request| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().expect("lock").push("T".to_string());
                Ok(Response::new(200, Headers::new(), Bytes::new()))
            }
        }))
    }

    #[tokio::test]
    async fn first_installed_is_outermost() {
        let trace = Trace::default();
        let chain = Chain::new(
            vec![recording_filter("A", &trace), recording_filter("B", &trace)],
            recording_transport(&trace),
        );

        chain.call(request()).await.expect("response");

        assert_eq!(
            *trace.lock().expect("lock"),
            vec!["A-enter", "B-enter", "T", "B-exit", "A-exit"]
        );
    }

    #[tokio::test]
    async fn same_filter_twice_runs_twice() {
        let trace = Trace::default();
        let filter = recording_filter("A", &trace);
        let chain = Chain::new(
            vec![Arc::clone(&filter), filter],
            recording_transport(&trace),
        );

        chain.call(request()).await.expect("response");

        assert_eq!(
            *trace.lock().expect("lock"),
            vec!["A-enter", "A-enter", "T", "A-exit", "A-exit"]
        );
    }

    #[tokio::test]
    async fn suppressed_violation_still_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let transport: Arc<dyn Transport> = Arc::new(transport_fn(move |_request: Request| {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Ok(Response::new(200, Headers::new(), Bytes::new())) }
        }));

        // Calls next twice, then returns the first (successful) response.
        let greedy: Arc<dyn Filter> = Arc::new(filter_fn(|request: Request, next: Next| async move {
            let first = next.clone().run(request.clone()).await;
            let _ = next.run(request).await;
            first
        }));

        let chain = Chain::new(vec![greedy], transport);
        let err = chain.call(request()).await.expect_err("violation");

        assert!(err.is_protocol_violation());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_lists_layers() {
        let trace = Trace::default();
        let chain = Chain::new(vec![recording_filter("A", &trace)], recording_transport(&trace));
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        assert!(format!("{chain:?}").contains("filter_fn"));
    }
}
