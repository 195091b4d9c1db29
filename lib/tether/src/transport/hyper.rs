//! HTTP transport using hyper-util.

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::Service;
use tracing::debug;

use crate::{
    Error, Headers, Request, Response, ResponseFuture, Result, Transport, config::TransportConfig,
    connector::https_connector,
};

/// Network transport with connection pooling, TLS and a per-request timeout.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tether::{HyperTransport, TransportConfig};
///
/// let transport = HyperTransport::with_config(
///     TransportConfig::default().with_timeout(Duration::from_secs(5)),
/// );
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration.
    ///
    /// The connect deadline is capped at the request deadline.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let connector = https_connector(config.effective_connect_timeout());

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.idle_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build(connector);

        Self { inner, config }
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method(), url = %request.url(), "sending request");
        let http_request = into_http_request(request)?;

        let exchange = async {
            let response = self
                .inner
                .request(http_request)
                .await
                .map_err(|err| classify(&err).unwrap_or_else(|| Error::connection(err.to_string())))?;

            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|err| classify(&err).unwrap_or_else(|| Error::connection(err.to_string())))?
                .to_bytes();

            Ok::<_, Error>(Response::new(status, headers, body))
        };

        // The deadline covers the body as well as the head.
        let response = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout)??;

        debug!(
            status = response.status(),
            bytes = response.body().len(),
            "received response"
        );
        Ok(response)
    }
}

/// Convert a tether request into an `http` request.
///
/// Header names and values are checked one by one so that the error names
/// the offending header.
fn into_http_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
    let (method, url, headers, body) = request.into_parts();

    let mut http_request = http::Request::builder()
        .method(method)
        .uri(url.as_str())
        .body(match body {
            Some(payload) => Full::new(payload.into_bytes()?),
            None => Full::default(),
        })
        .map_err(|err| Error::invalid_request(err.to_string()))?;

    let target = http_request.headers_mut();
    for (name, value) in &headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::invalid_request(format!("invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| Error::invalid_request(format!("invalid value for header '{name}'")))?;
        target.append(header_name, header_value);
    }

    Ok(http_request)
}

/// Response headers as [`Headers`]; values that are not valid UTF-8 are skipped.
fn collect_headers(headers: &http::HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
        .collect()
}

/// Find a known cause in an error chain: a rustls failure is [`Error::Tls`],
/// an I/O timeout is [`Error::Timeout`].
///
/// `io::Error` hides its payload from `source()`, so its inner error is
/// inspected explicitly.
fn classify(err: &(dyn StdError + 'static)) -> Option<Error> {
    let mut cause = Some(err);
    while let Some(current) = cause {
        if let Some(tls) = current.downcast_ref::<rustls::Error>() {
            return Some(Error::tls(tls.to_string()));
        }
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if let Some(tls) = io_err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<rustls::Error>())
            {
                return Some(Error::tls(tls.to_string()));
            }
            if io_err.kind() == io::ErrorKind::TimedOut {
                return Some(Error::Timeout);
            }
        }
        cause = current.source();
    }
    None
}

impl Transport for HyperTransport {
    fn send(&self, request: Request) -> ResponseFuture {
        let transport = self.clone();
        Box::pin(async move { transport.execute(request).await })
    }
}

impl Service<Request> for HyperTransport {
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.send(request)
    }
}
