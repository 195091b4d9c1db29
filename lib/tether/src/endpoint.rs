//! Service endpoint identity.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::{Error, Result};

/// Base address of a service plus its optional application key.
///
/// Immutable once constructed; clones share the same allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

#[derive(PartialEq, Eq)]
struct EndpointInner {
    base_url: Url,
    application_key: Option<String>,
}

impl Endpoint {
    /// Parse an endpoint from a URL string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the address is empty,
    /// cannot be parsed, is not `http`/`https`, or has no host.
    pub fn parse(address: impl AsRef<str>, application_key: Option<String>) -> Result<Self> {
        let address = address.as_ref().trim();
        if address.is_empty() {
            return Err(Error::invalid_configuration("service address is empty"));
        }
        let url = Url::parse(address).map_err(|e| {
            Error::invalid_configuration(format!("service address '{address}': {e}"))
        })?;
        Self::from_url(url, application_key)
    }

    /// Build an endpoint from a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the scheme is not
    /// `http`/`https` or the URL has no host.
    pub fn from_url(mut url: Url, application_key: Option<String>) -> Result<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_configuration(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_configuration("service address has no host"));
        }

        // Routes are appended as path segments; a trailing slash keeps them
        // under the service path instead of replacing its last segment.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            inner: Arc::new(EndpointInner {
                base_url: url,
                application_key: application_key.filter(|key| !key.is_empty()),
            }),
        })
    }

    /// Base URL of the service, always ending with `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Application key, if one was provided.
    #[must_use]
    pub fn application_key(&self) -> Option<&str> {
        self.inner.application_key.as_deref()
    }

    /// URL of a route below the base, one path segment per item.
    ///
    /// Segments are percent-encoded; empty segments are skipped.
    pub(crate) fn route<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments.into_iter().filter(|segment| !segment.is_empty()));
        }
        url
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.inner.base_url.as_str())
            .field(
                "application_key",
                &self.inner.application_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_endpoint() {
        let endpoint = Endpoint::parse("https://svc.example.net", None).expect("endpoint");
        assert_eq!(endpoint.base_url().as_str(), "https://svc.example.net/");
        assert_eq!(endpoint.application_key(), None);
    }

    #[test]
    fn keeps_service_path() {
        let endpoint =
            Endpoint::parse("https://example.net/mobile?x=1", Some("key".into())).expect("ok");
        assert_eq!(endpoint.base_url().as_str(), "https://example.net/mobile/");
        assert_eq!(endpoint.application_key(), Some("key"));
    }

    #[test]
    fn rejects_empty_address() {
        let err = Endpoint::parse("  ", None).expect_err("empty");
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_unparsable_address() {
        let err = Endpoint::parse("not a url", None).expect_err("unparsable");
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_disallowed_scheme() {
        let err = Endpoint::parse("ftp://svc.example.net", None).expect_err("scheme");
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let err = Endpoint::parse("mailto:someone@example.net", None).expect_err("scheme");
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn empty_key_is_no_key() {
        let endpoint = Endpoint::parse("https://svc.example.net", Some(String::new())).expect("ok");
        assert_eq!(endpoint.application_key(), None);
    }

    #[test]
    fn route_appends_segments() {
        let endpoint = Endpoint::parse("https://example.net/mobile", None).expect("endpoint");
        let url = endpoint.route(["api", "orders/", "/42", "a b"]);
        // segments themselves are passed whole, slashes are encoded
        assert_eq!(url.as_str(), "https://example.net/mobile/api/orders%2F/%2F42/a%20b");

        let url = endpoint.route("api/orders/42".split('/'));
        assert_eq!(url.as_str(), "https://example.net/mobile/api/orders/42");
    }

    #[test]
    fn debug_redacts_key() {
        let endpoint = Endpoint::parse("https://svc.example.net", Some("secret".into())).expect("ok");
        let debug = format!("{endpoint:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("svc.example.net"));
    }
}
