//! HTTP response handling.
//!
//! [`Response`] provides access to status, headers, and body with JSON/text
//! deserialization. [`ResponseMeta`] is the body-less view handed back to
//! callers next to a decoded result or an error.

use bytes::Bytes;

use crate::Headers;

/// Status and headers of a response, without its body.
pub type ResponseMeta = Response<()>;

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: Headers,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub const fn new(status: u16, headers: Headers, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, Headers, B) {
        (self.status, self.headers, self.body)
    }

    /// Status and headers, detached from the body.
    #[must_use]
    pub fn meta(&self) -> ResponseMeta {
        Response::new(self.status, self.headers.clone(), ())
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Transform the body with a function.
    pub fn map_body<F, B2>(self, f: F) -> Response<B2>
    where
        F: FnOnce(B) -> B2,
    {
        Response {
            status: self.status,
            headers: self.headers,
            body: f(self.body),
        }
    }
}

impl Response<Bytes> {
    /// Deserialize the response body as JSON.
    ///
    /// An empty body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        if self.body.is_empty() {
            crate::from_json(b"null")
        } else {
            crate::from_json(&self.body)
        }
    }

    /// Get the response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_basic() {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        let response = Response::new(200, headers, Bytes::from(r#"{"id":1}"#));

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn response_status_checks() {
        assert!(Response::new(404, Headers::new(), Bytes::new()).is_client_error());
        assert!(Response::new(500, Headers::new(), Bytes::new()).is_server_error());
        assert!(!Response::new(302, Headers::new(), Bytes::new()).is_success());
    }

    #[test]
    fn response_json() {
        let response = Response::new(200, Headers::new(), Bytes::from(r#"{"ok":true}"#));
        let value: serde_json::Value = response.json().expect("deserialize");
        assert_eq!(value, serde_json::json!({"ok": true}));
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let response = Response::new(204, Headers::new(), Bytes::new());
        let value: serde_json::Value = response.json().expect("deserialize");
        assert!(value.is_null());

        let unit: Option<u32> = response.json().expect("deserialize");
        assert_eq!(unit, None);
    }

    #[test]
    fn meta_drops_body() {
        let headers: Headers = [("ETag", "\"1\"")].into_iter().collect();
        let response = Response::new(201, headers, Bytes::from("created"));
        let meta = response.meta();

        assert_eq!(meta.status(), 201);
        assert_eq!(meta.header("etag"), Some("\"1\""));
        assert_eq!(response.text().expect("utf-8"), "created");
    }
}
