//! Request descriptor.
//!
//! A [`Request`] is built fresh for every invocation and handed by value
//! through the filter chain. Filters may read it or rebuild parts of it before
//! passing it on; the transport finally lowers it with [`Request::into_parts`].
//!
//! # Example
//!
//! ```
//! use tether_core::{Method, Request};
//!
//! let request = Request::builder(Method::GET, "https://svc.example.net/api/todo".parse().unwrap())
//!     .api_name("todo")
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//!
//! assert_eq!(request.url().as_str(), "https://svc.example.net/api/todo?page=1");
//! ```

use bytes::Bytes;
use http::Method;
use url::Url;

use crate::{Headers, Result};

/// Body of a request: a structured JSON value or raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured value, serialized as JSON when sent.
    Json(serde_json::Value),
    /// Raw bytes, sent unchanged.
    Data(Bytes),
}

impl Payload {
    /// The structured value, if this is a JSON payload.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Data(_) => None,
        }
    }

    /// The raw bytes, if this is a data payload.
    #[must_use]
    pub const fn as_data(&self) -> Option<&Bytes> {
        match self {
            Self::Json(_) => None,
            Self::Data(data) => Some(data),
        }
    }

    /// Encode the payload into the bytes put on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Json(value) => crate::to_json(&value),
            Self::Data(data) => Ok(data),
        }
    }
}

/// An outbound call: target API, method, URL, headers and optional payload.
#[derive(Debug, Clone)]
pub struct Request {
    api_name: String,
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Payload>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Name of the targeted custom API (empty for non-API routes).
    #[must_use]
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL, including query parameters.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Query parameters decoded from the URL.
    #[must_use]
    pub fn parameters(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect()
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Payload> {
        self.body.as_ref()
    }

    /// Replace the body, returning the updated request.
    #[must_use]
    pub fn with_body(mut self, body: Option<Payload>) -> Self {
        self.body = body;
        self
    }

    /// Replace the URL, returning the updated request.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, Headers, Option<Payload>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    api_name: String,
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Payload>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            api_name: String::new(),
            method,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets the API name.
    #[must_use]
    pub fn api_name(mut self, name: impl Into<String>) -> Self {
        self.api_name = name.into();
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: &Headers) -> Self {
        self.headers.merge(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends multiple query parameters to the URL.
    #[must_use]
    pub fn query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(name.as_ref(), value.as_ref());
            }
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a structured JSON body and the JSON content type.
    #[must_use]
    pub fn json(self, value: serde_json::Value) -> Self {
        self.header("Content-Type", crate::ContentType::Json.as_str())
            .body(Payload::Json(value))
    }

    /// Sets a raw body.
    #[must_use]
    pub fn data(self, data: impl Into<Bytes>) -> Self {
        self.body(Payload::Data(data.into()))
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            api_name: self.api_name,
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}
