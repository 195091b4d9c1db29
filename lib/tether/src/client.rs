//! Client configuration.
//!
//! A [`Client`] is two pieces:
//! - an immutable configuration record (endpoint, filters, default headers,
//!   transport) shared through an `Arc` and replaced wholesale on change;
//! - a [`Session`] cell holding the current user, shared by every client
//!   derived from the same root.
//!
//! [`Client::with_filter`] copies the record with one more filter and keeps
//! the *same* session, so logging in on a derived client logs in its
//! ancestors and siblings too. Clients built from scratch get their own
//! session.

use std::sync::Arc;

use tower::Layer;
use tower::util::BoxCloneService;

use crate::transport::{BoxedService, ServiceTransport, TransportService};
use crate::{
    Chain, Endpoint, Error, Filter, Headers, HyperTransport, Request, Response, Result, Session,
    Transport, TransportConfig, User,
};

struct ClientConfig {
    endpoint: Endpoint,
    filters: Arc<[Arc<dyn Filter>]>,
    default_headers: Headers,
    transport: Arc<dyn Transport>,
}

/// Client bound to a service endpoint.
///
/// Cloning is cheap and shares everything, including the current user.
///
/// # Example
///
/// ```ignore
/// use tether::{Client, filters::LoggingFilter};
///
/// let client = Client::new("https://svc.example.net")?;
/// let logged = client.with_filter(LoggingFilter::new());
///
/// assert_eq!(client.filters().len(), 0);
/// assert_eq!(logged.filters().len(), 1);
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    session: Arc<Session>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.config.endpoint)
            .field(
                "filters",
                &self.config.filters.iter().map(|filter| filter.name()).collect::<Vec<_>>(),
            )
            .field("logged_in", &self.session.current_user().is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for the service at `address`, without application key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the address is invalid.
    pub fn new(address: impl AsRef<str>) -> Result<Self> {
        Self::builder(address.as_ref()).build()
    }

    /// Create a client that sends `key` as application key on every request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the address is invalid.
    pub fn with_application_key(address: impl AsRef<str>, key: impl Into<String>) -> Result<Self> {
        Self::builder(address.as_ref()).application_key(key).build()
    }

    /// Create a client for an already validated endpoint, using the default
    /// transport.
    #[must_use]
    pub fn from_endpoint(endpoint: Endpoint) -> Self {
        Self::assemble(
            endpoint,
            Vec::new(),
            Headers::new(),
            Arc::new(HyperTransport::new()),
        )
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder(address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(address)
    }

    fn assemble(
        endpoint: Endpoint,
        filters: Vec<Arc<dyn Filter>>,
        default_headers: Headers,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config: Arc::new(ClientConfig {
                endpoint,
                filters: filters.into(),
                default_headers,
                transport,
            }),
            session: Arc::new(Session::new()),
        }
    }

    /// Endpoint identity.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Application key, if any.
    #[must_use]
    pub fn application_key(&self) -> Option<&str> {
        self.config.endpoint.application_key()
    }

    /// Installed filters, outermost first.
    #[must_use]
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.config.filters
    }

    /// Headers added to every request unless the caller overrides them.
    #[must_use]
    pub fn default_headers(&self) -> &Headers {
        &self.config.default_headers
    }

    /// Terminal transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.config.transport
    }

    /// Return a new client with `filter` appended after the existing filters.
    ///
    /// `self` is left untouched. The new client shares the endpoint, the
    /// transport and the current-user cell with `self`.
    #[must_use]
    pub fn with_filter(&self, filter: impl Filter) -> Self {
        let filters = self
            .config
            .filters
            .iter()
            .cloned()
            .chain(std::iter::once(Arc::new(filter) as Arc<dyn Filter>))
            .collect::<Vec<_>>();

        Self {
            config: Arc::new(ClientConfig {
                endpoint: self.config.endpoint.clone(),
                filters: filters.into(),
                default_headers: self.config.default_headers.clone(),
                transport: Arc::clone(&self.config.transport),
            }),
            session: Arc::clone(&self.session),
        }
    }

    /// The current-user cell shared with related clients.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The currently logged in user.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Replace the current user, returning the previous one.
    ///
    /// Visible to every client sharing this client's session.
    pub fn set_current_user(&self, user: Option<User>) -> Option<User> {
        self.session.set_current_user(user)
    }

    /// Filter chain for one invocation.
    pub(crate) fn chain(&self) -> Chain {
        Chain::new(
            Arc::clone(&self.config.filters),
            Arc::clone(&self.config.transport),
        )
    }
}

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tether::{Client, TransportConfig};
/// use tower::limit::ConcurrencyLimitLayer;
///
/// let client = Client::builder("https://svc.example.net")
///     .application_key("secret")
///     .default_header("X-Client", "todo-app/1.0")
///     .transport_config(TransportConfig::default().with_timeout(Duration::from_secs(10)))
///     .transport_layer(ConcurrencyLimitLayer::new(4))
///     .build()?;
/// ```
pub struct ClientBuilder {
    address: String,
    application_key: Option<String>,
    default_headers: Headers,
    filters: Vec<Arc<dyn Filter>>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("address", &self.address)
            .field("has_application_key", &self.application_key.is_some())
            .field("default_headers", &self.default_headers)
            .field("filters_count", &self.filters.len())
            .field("custom_transport", &self.transport.is_some())
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl ClientBuilder {
    /// Start a builder for the service at `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            application_key: None,
            default_headers: Headers::new(),
            filters: Vec::new(),
            transport: None,
            transport_config: TransportConfig::default(),
            layers: Vec::new(),
        }
    }

    /// Set the application key.
    #[must_use]
    pub fn application_key(mut self, key: impl Into<String>) -> Self {
        self.application_key = Some(key.into());
        self
    }

    /// Add a header sent with every request unless the caller overrides it.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Install a filter. Filters run in the order they are added.
    #[must_use]
    pub fn filter(mut self, filter: impl Filter) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Use a custom transport instead of [`HyperTransport`].
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Configure the default [`HyperTransport`].
    ///
    /// Ignored when a custom transport is set.
    #[must_use]
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Set the request timeout of the default transport.
    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.transport_config.timeout = timeout;
        self
    }

    /// Stack a Tower layer between the filter chain and the transport.
    ///
    /// Layers are applied in order: first added = outermost.
    #[must_use]
    pub fn transport_layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: tower::Service<Request, Response = Response, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as tower::Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the address is invalid, or
    /// if the default transport is used with deadlines it cannot meet.
    pub fn build(self) -> Result<Client> {
        let endpoint = Endpoint::parse(&self.address, self.application_key)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                self.transport_config.validate()?;
                Arc::new(HyperTransport::with_config(self.transport_config))
            }
        };

        let transport = if self.layers.is_empty() {
            transport
        } else {
            let mut service: BoxedService = BoxCloneService::new(TransportService::new(transport));
            for layer_fn in self.layers.iter().rev() {
                service = layer_fn(service);
            }
            Arc::new(ServiceTransport::from_boxed(service))
        };

        Ok(Client::assemble(
            endpoint,
            self.filters,
            self.default_headers,
            transport,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::{Next, ResponseFuture, filter_fn, transport_fn};

    struct Passthrough;

    impl Filter for Passthrough {
        fn handle(&self, request: Request, next: Next) -> ResponseFuture {
            next.run(request)
        }
    }

    fn stub() -> impl Transport {
        transport_fn(|_request: Request| async {
            Ok(Response::new(200, Headers::new(), Bytes::new()))
        })
    }

    #[test]
    fn with_filter_does_not_mutate_parent() {
        let root = Client::builder("https://svc.example.net")
            .transport(stub())
            .build()
            .expect("client");
        let child = root.with_filter(Passthrough);
        let grandchild = child.with_filter(filter_fn(|request: Request, next: Next| {
            next.run(request)
        }));

        assert_eq!(root.filters().len(), 0);
        assert_eq!(child.filters().len(), 1);
        assert_eq!(grandchild.filters().len(), 2);
        assert_eq!(child.endpoint(), root.endpoint());
        assert!(Arc::ptr_eq(child.transport(), root.transport()));
    }

    #[test]
    fn derived_clients_share_current_user() {
        let root = Client::new("https://svc.example.net").expect("client");
        let child = root.with_filter(Passthrough);
        let sibling = root.with_filter(Passthrough);

        child.set_current_user(Some(User::new("Twitter:9")));

        assert_eq!(root.current_user(), Some(User::new("Twitter:9")));
        assert_eq!(sibling.current_user(), Some(User::new("Twitter:9")));
        assert!(Arc::ptr_eq(root.session(), child.session()));

        let cloned = child.clone();
        cloned.set_current_user(None);
        assert!(root.current_user().is_none());
    }

    #[test]
    fn fresh_clients_do_not_share_current_user() {
        let first = Client::new("https://svc.example.net").expect("client");
        let second = Client::new("https://svc.example.net").expect("client");

        first.set_current_user(Some(User::new("MicrosoftAccount:1")));

        assert!(second.current_user().is_none());
        assert!(!Arc::ptr_eq(first.session(), second.session()));
    }

    #[test]
    fn invalid_address_fails_construction() {
        let err = Client::new("").expect_err("empty");
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let err = Client::with_application_key("file:///tmp/x", "key").expect_err("scheme");
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn unusable_transport_deadlines_fail_construction() {
        let err = Client::builder("https://svc.example.net")
            .timeout(Duration::ZERO)
            .build()
            .expect_err("zero timeout");
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let err = Client::builder("https://svc.example.net")
            .transport_config(
                TransportConfig::default()
                    .with_timeout(Duration::from_secs(1))
                    .with_connect_timeout(Duration::from_secs(3)),
            )
            .build()
            .expect_err("connect longer than request");
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        // only the default transport reads the deadlines
        let client = Client::builder("https://svc.example.net")
            .timeout(Duration::ZERO)
            .transport(transport_fn(|_request: Request| async {
                Ok(Response::new(200, Headers::new(), Bytes::new()))
            }))
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn builder_collects_settings() {
        let client = Client::builder("https://svc.example.net")
            .application_key("secret")
            .default_header("X-Client", "tests")
            .filter(Passthrough)
            .filter(Passthrough)
            .build()
            .expect("client");

        assert_eq!(client.application_key(), Some("secret"));
        assert_eq!(client.default_headers().get("x-client"), Some("tests"));
        assert_eq!(client.filters().len(), 2);
    }

    #[test]
    fn debug_shows_filters() {
        let client = Client::new("https://svc.example.net")
            .expect("client")
            .with_filter(Passthrough);
        let debug = format!("{client:?}");
        assert!(debug.contains("Passthrough"));
    }
}
