//! Custom API invocation.
//!
//! Two surfaces share one pipeline:
//! - [`Client::invoke_json`] sends an optional JSON body and decodes the
//!   response body as JSON;
//! - [`Client::invoke_data`] sends optional raw bytes and returns the response
//!   bytes untouched.
//!
//! Both resolve to exactly one [`Outcome`]. Argument errors are reported in
//! that outcome before anything enters the filter chain; nothing is raised
//! across the call boundary.

use std::collections::BTreeMap;
use std::future::Future;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use crate::{
    Client, ContentType, Error, Headers, Method, Payload, Request, Response, ResponseMeta, Result,
};

/// Header carrying the application key.
pub const APPLICATION_KEY_HEADER: &str = "X-ZUMO-APPLICATION";

/// Header carrying the current user's authentication token.
pub const AUTH_TOKEN_HEADER: &str = "X-ZUMO-AUTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Api,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Json,
    Data,
}

/// Target and options of a custom API call.
///
/// # Example
///
/// ```
/// use tether::ApiCall;
///
/// let call = ApiCall::new("orders/recent", "GET")
///     .parameter("limit", "10")
///     .header("X-Trace", "abc");
///
/// assert_eq!(call.api_name(), "orders/recent");
/// ```
#[derive(Debug, Clone)]
pub struct ApiCall {
    route: Route,
    api_name: String,
    method: String,
    parameters: BTreeMap<String, String>,
    headers: Headers,
}

impl ApiCall {
    /// Call the API `api_name` with the HTTP verb `method`.
    ///
    /// A name containing `/` targets nested paths below `api/`.
    #[must_use]
    pub fn new(api_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            route: Route::Api,
            api_name: api_name.into(),
            method: method.into(),
            parameters: BTreeMap::new(),
            headers: Headers::new(),
        }
    }

    /// Login route for an identity provider.
    pub(crate) fn login(provider: impl Into<String>) -> Self {
        Self {
            route: Route::Login,
            ..Self::new(provider, "POST")
        }
    }

    /// Add a query parameter, replacing one with the same name.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Add several query parameters.
    #[must_use]
    pub fn parameters<K, V>(mut self, parameters: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters.extend(
            parameters
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    /// Add a header. Caller headers win over every header the client adds.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add several headers.
    #[must_use]
    pub fn headers(mut self, headers: &Headers) -> Self {
        self.headers.merge(headers);
        self
    }

    /// Name of the targeted API.
    #[must_use]
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// HTTP verb as given by the caller.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Result of an invocation together with the response metadata.
///
/// `response` is present whenever the service answered, including when the
/// answer was an HTTP error or could not be decoded.
#[derive(Debug)]
pub struct Outcome<T> {
    result: Result<T>,
    response: Option<ResponseMeta>,
}

impl<T> Outcome<T> {
    fn success(value: T, response: ResponseMeta) -> Self {
        Self {
            result: Ok(value),
            response: Some(response),
        }
    }

    fn failure(error: Error, response: Option<ResponseMeta>) -> Self {
        Self {
            result: Err(error),
            response,
        }
    }

    /// The decoded value or the error.
    #[must_use]
    pub const fn result(&self) -> &Result<T> {
        &self.result
    }

    /// The decoded value, if the invocation succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// The error, if the invocation failed.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Status and headers of the response, if one was received.
    #[must_use]
    pub const fn response(&self) -> Option<&ResponseMeta> {
        self.response.as_ref()
    }

    /// Returns `true` if the invocation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Drop the metadata and keep the result.
    pub fn into_result(self) -> Result<T> {
        self.result
    }

    /// Split into `(value, response metadata, error)`.
    #[must_use]
    pub fn into_parts(self) -> (Option<T>, Option<ResponseMeta>, Option<Error>) {
        match self.result {
            Ok(value) => (Some(value), self.response, None),
            Err(error) => (None, self.response, Some(error)),
        }
    }
}

impl Client {
    /// Invoke a custom API with a JSON body and decode the JSON response.
    ///
    /// Sets `Content-Type: application/json` when a body is sent and
    /// `Accept: application/json`, unless the caller supplied them. An empty
    /// response body decodes as JSON `null`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let outcome = client
    ///     .invoke_json::<serde_json::Value>(ApiCall::new("ping", "GET"), None)
    ///     .await;
    /// assert_eq!(outcome.value(), Some(&serde_json::json!({"ok": true})));
    /// ```
    pub async fn invoke_json<T: DeserializeOwned>(
        &self,
        call: ApiCall,
        body: Option<Value>,
    ) -> Outcome<T> {
        let span = info_span!("invoke", api = %call.api_name, method = %call.method, surface = "json");
        async move {
            let request = match self.build_request(call, body.map(Payload::Json), Surface::Json) {
                Ok(request) => request,
                Err(error) => {
                    warn!(%error, "invocation rejected");
                    return Outcome::failure(error, None);
                }
            };

            match self.dispatch(request).await {
                Ok(response) => {
                    let meta = response.meta();
                    match response.json::<T>() {
                        Ok(value) => Outcome::success(value, meta),
                        Err(error) => {
                            warn!(%error, status = meta.status(), "response body is not valid JSON");
                            Outcome::failure(error.with_body(response.into_body()), Some(meta))
                        }
                    }
                }
                Err((error, meta)) => Outcome::failure(error, meta),
            }
        }
        .instrument(span)
        .await
    }

    /// Invoke a custom API with raw bytes; the response body is returned as is.
    ///
    /// No content type is added; pass one in the call headers if the service
    /// needs it.
    pub async fn invoke_data(&self, call: ApiCall, data: Option<Bytes>) -> Outcome<Bytes> {
        let span = info_span!("invoke", api = %call.api_name, method = %call.method, surface = "data");
        async move {
            let request = match self.build_request(call, data.map(Payload::Data), Surface::Data) {
                Ok(request) => request,
                Err(error) => {
                    warn!(%error, "invocation rejected");
                    return Outcome::failure(error, None);
                }
            };

            match self.dispatch(request).await {
                Ok(response) => {
                    let meta = response.meta();
                    Outcome::success(response.into_body(), meta)
                }
                Err((error, meta)) => Outcome::failure(error, meta),
            }
        }
        .instrument(span)
        .await
    }

    /// Start [`Client::invoke_json`] on the current Tokio runtime and hand the
    /// outcome to `completion` once it is ready.
    ///
    /// Returns immediately. `completion` runs exactly once, on a runtime
    /// worker. Without a runtime nothing is sent: `completion` receives
    /// [`Error::InvalidConfiguration`] on the calling thread and `None` is
    /// returned.
    pub fn spawn_invoke_json<T, F>(
        &self,
        call: ApiCall,
        body: Option<Value>,
        completion: F,
    ) -> Option<JoinHandle<()>>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let client = self.clone();
        spawn_outcome(
            async move { client.invoke_json(call, body).await },
            completion,
        )
    }

    /// Start [`Client::invoke_data`] on the current Tokio runtime and hand the
    /// outcome to `completion` once it is ready.
    ///
    /// Same delivery rules as [`Client::spawn_invoke_json`].
    pub fn spawn_invoke_data<F>(
        &self,
        call: ApiCall,
        data: Option<Bytes>,
        completion: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Outcome<Bytes>) + Send + 'static,
    {
        let client = self.clone();
        spawn_outcome(
            async move { client.invoke_data(call, data).await },
            completion,
        )
    }

    /// Validate the call and assemble the request descriptor.
    fn build_request(
        &self,
        call: ApiCall,
        body: Option<Payload>,
        surface: Surface,
    ) -> Result<Request> {
        let ApiCall {
            route,
            api_name,
            method,
            parameters,
            headers: caller_headers,
        } = call;

        if api_name.trim().is_empty() {
            return Err(Error::invalid_argument(match route {
                Route::Api => "API name must not be empty",
                Route::Login => "identity provider must not be empty",
            }));
        }
        let method = parse_method(&method)?;

        let url = match route {
            Route::Api => {
                let segments = api_segments(&api_name)?;
                self.endpoint()
                    .route(std::iter::once("api").chain(segments))
            }
            Route::Login => {
                if api_name.contains('/') || is_dot_segment(&api_name) {
                    return Err(Error::invalid_argument(format!(
                        "invalid identity provider '{api_name}'"
                    )));
                }
                self.endpoint().route(["login", api_name.as_str()])
            }
        };

        let mut headers = self.default_headers().clone();
        if surface == Surface::Json {
            headers.insert_if_absent("Accept", ContentType::Json.as_str());
        }
        if let Some(key) = self.application_key() {
            headers.insert(APPLICATION_KEY_HEADER, key);
        }
        if let Some(token) = self.session().authentication_token() {
            headers.insert(AUTH_TOKEN_HEADER, token);
        }
        headers.merge(&caller_headers);
        if surface == Surface::Json && body.is_some() {
            headers.insert_if_absent("Content-Type", ContentType::Json.as_str());
        }

        let builder = Request::builder(method, url)
            .api_name(api_name)
            .headers(&headers)
            .query_pairs(parameters);

        Ok(match body {
            Some(payload) => builder.body(payload).build(),
            None => builder.build(),
        })
    }

    /// Run the request through the chain and map HTTP failures to errors.
    ///
    /// On failure the response metadata is returned when there was a response.
    async fn dispatch(
        &self,
        request: Request,
    ) -> std::result::Result<Response, (Error, Option<ResponseMeta>)> {
        debug!(url = %request.url(), "dispatching through filter chain");

        let response = self.chain().call(request).await.map_err(|error| {
            warn!(%error, "invocation failed");
            (error, None)
        })?;

        let meta = response.meta();
        if response.status() < 400 {
            debug!(status = response.status(), "invocation completed");
            return Ok(response);
        }

        let status = response.status();
        let message = error_message(&response);
        warn!(status, %message, "service returned an error");
        Err((
            Error::http_with_body(status, message, response.into_body()),
            Some(meta),
        ))
    }
}

/// Run `work` on the current runtime, or report the missing runtime to
/// `completion` right away.
fn spawn_outcome<T, W, F>(work: W, completion: F) -> Option<JoinHandle<()>>
where
    T: Send + 'static,
    W: Future<Output = Outcome<T>> + Send + 'static,
    F: FnOnce(Outcome<T>) + Send + 'static,
{
    if let Ok(runtime) = Handle::try_current() {
        Some(runtime.spawn(async move { completion(work.await) }))
    } else {
        let error = Error::invalid_configuration("no Tokio runtime to run the invocation on");
        warn!(%error, "invocation not started");
        completion(Outcome::failure(error, None));
        None
    }
}

/// Path segments of an API name, each one non-empty and neither `.` nor `..`.
fn api_segments(api_name: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = api_name.split('/').collect();
    if segments
        .iter()
        .any(|segment| segment.trim().is_empty() || is_dot_segment(segment))
    {
        return Err(Error::invalid_argument(format!(
            "invalid API name '{api_name}': empty, '.' or '..' path segment"
        )));
    }
    Ok(segments)
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

fn parse_method(method: &str) -> Result<Method> {
    let method = method.trim();
    if method.is_empty() {
        return Err(Error::invalid_argument("HTTP method must not be empty"));
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::invalid_argument(format!("invalid HTTP method '{method}'")))
}

/// Message for an error response: a JSON `error`/`message` field, the JSON
/// string or text body, or the canonical reason of the status.
fn error_message(response: &Response) -> String {
    let from_json = serde_json::from_slice::<Value>(response.body())
        .ok()
        .and_then(|value| match value {
            Value::String(text) => Some(text),
            Value::Object(map) => ["error", "message", "description"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string)),
            _ => None,
        });

    from_json
        .or_else(|| {
            std::str::from_utf8(response.body())
                .ok()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            http::StatusCode::from_u16(response.status())
                .ok()
                .and_then(|status| status.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "request failed".to_string())
}
