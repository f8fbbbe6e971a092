//! CityGrid API client.
//!
//! The [`Client`] type owns the HTTP connection pool, the [`Settings`] and
//! the [`EndpointRegistry`]. Use [`ClientBuilder`] to configure and create
//! clients, and [`Client::endpoint`] to get a handle on one endpoint.

use crate::{
    classify::classify,
    config::{EndpointConfig, EndpointRegistry, Settings},
    params::Params,
    request::{Operation, RequestSpec},
    response::RawResponse,
    ApiResult, Error, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A client for the CityGrid API.
///
/// The client is designed to be reused across requests and is cheap to
/// clone. Its configuration is immutable once built.
///
/// # Examples
///
/// ```no_run
/// use citygrid::{Client, EndpointDefinition, EndpointRegistry, Params, ServerTarget, Settings};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), citygrid::Error> {
/// let settings = Settings::builder()
///     .server(ServerTarget::Default, "http://api.citygridmedia.com")?
///     .server(ServerTarget::Secure, "https://api.citygridmedia.com")?
///     .publisher("acme")
///     .build();
///
/// let registry = EndpointRegistry::builder()
///     .endpoint("places", EndpointDefinition::new().path("/content/places/v2/search/where"))
///     .endpoint(
///         "offers",
///         EndpointDefinition::new()
///             .server(ServerTarget::Secure)
///             .path("/content/offers/v2"),
///     )
///     .build()?;
///
/// let client = Client::builder()
///     .settings(settings)
///     .registry(registry)
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// // Query request with the configured publisher
/// let places = client
///     .endpoint("places")?
///     .request_with_publisher(Params::new().param("what", "pizza"))
///     .await?;
/// println!("Places: {}", places.data.len());
///
/// // Token-authenticated mutation
/// let updated = client
///     .endpoint("offers")?
///     .mutate(Params::new().token("user-token").param("offer_id", 42))
///     .await?;
/// println!("Updated: {:?}", updated.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    settings: Settings,
    registry: EndpointRegistry,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns a handle on a registered endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEndpoint`] if no endpoint with this name was
    /// registered.
    pub fn endpoint(&self, name: &str) -> Result<Endpoint<'_>> {
        let config = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownEndpoint(name.to_string()))?;

        Ok(Endpoint {
            client: self,
            name: name.to_string(),
            config,
        })
    }

    /// Returns the settings the client was built with.
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Returns the registered endpoints.
    pub fn registry(&self) -> &EndpointRegistry {
        &self.inner.registry
    }

    /// Sends a built request and classifies whatever comes back.
    pub async fn dispatch(&self, spec: RequestSpec) -> Result<ApiResult> {
        let start_time = Instant::now();
        let outcome = self.execute_request(spec).await;
        let latency = start_time.elapsed();

        if let Ok(raw) = &outcome {
            tracing::info!(
                status = raw.status.as_u16(),
                latency_ms = latency.as_millis(),
                "Received HTTP response"
            );
        }

        classify(outcome, latency)
    }

    /// Executes a single request and reads its body.
    async fn execute_request(
        &self,
        spec: RequestSpec,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        let url = spec.full_url();

        tracing::debug!(
            method = %spec.method,
            url = %url,
            "Executing HTTP request"
        );

        let mut request = self.inner.http_client.request(spec.method.as_method(), url);

        // Client-wide headers first so per-request headers replace them
        let mut headers = self.inner.default_headers.clone();
        for (name, value) in &spec.headers {
            headers.insert(name, value.clone());
        }
        request = request.headers(headers);

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = &spec.body {
            // Content-Type comes from the merged headers
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        Ok(RawResponse::new(status, headers, text))
    }
}

/// A handle on one registered endpoint, borrowed from a [`Client`].
pub struct Endpoint<'a> {
    client: &'a Client,
    name: String,
    config: &'a EndpointConfig,
}

impl<'a> Endpoint<'a> {
    /// Returns the registered endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resolved endpoint configuration.
    pub fn config(&self) -> &EndpointConfig {
        self.config
    }

    /// Issues a query request to the endpoint path.
    ///
    /// Uses `GET` unless the params select another verb. Params become query
    /// parameters, and `format=json` is always sent.
    pub async fn request(&self, params: Params) -> Result<ApiResult> {
        self.call(Operation::Request, params).await
    }

    /// Like [`Endpoint::request`], with the configured publisher attached.
    ///
    /// A `publisher` in `params` is replaced.
    pub async fn request_with_publisher(&self, params: Params) -> Result<ApiResult> {
        self.call(Operation::RequestWithPublisher, params).await
    }

    /// Posts params as a JSON body to `<path>/mutate`.
    ///
    /// Requires a token, sent in the `authToken` header.
    pub async fn mutate(&self, params: Params) -> Result<ApiResult> {
        self.call(Operation::Mutate, params).await
    }

    /// Queries `<path>/get` with params as query parameters.
    ///
    /// Requires a token, sent in the `authToken` header.
    pub async fn search(&self, params: Params) -> Result<ApiResult> {
        self.call(Operation::Search, params).await
    }

    async fn call(&self, operation: Operation, params: Params) -> Result<ApiResult> {
        let spec = RequestSpec::build(operation, self.config, &self.client.inner.settings, params)
            .inspect_err(|e| {
                tracing::warn!(
                    error = %e,
                    endpoint = %self.name,
                    operation = ?operation,
                    "Failed to build request"
                );
            })?;

        self.client.dispatch(spec).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use citygrid::{ClientBuilder, EndpointRegistry, Settings};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), citygrid::Error> {
/// let client = ClientBuilder::new()
///     .settings(Settings::from_env()?)
///     .registry(EndpointRegistry::default())
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    settings: Option<Settings>,
    registry: EndpointRegistry,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            settings: None,
            registry: EndpointRegistry::default(),
            default_headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Sets the server URLs and publisher.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the endpoints the client can call.
    pub fn registry(mut self, registry: EndpointRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a header that will be included in all requests.
    ///
    /// Per-request headers with the same name take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no settings were provided or the HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<Client> {
        let settings = self
            .settings
            .ok_or_else(|| Error::Configuration("Settings are required".to_string()))?;

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                settings,
                registry: self.registry,
                default_headers: self.default_headers,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
