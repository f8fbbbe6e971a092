//! Server settings and endpoint configuration.
//!
//! [`Settings`] maps each [`ServerTarget`] to a base URL and carries the
//! publisher identifier. [`EndpointRegistry`] is the flat table of resolved
//! [`EndpointConfig`]s, built once from a tree of [`EndpointDefinition`]s in
//! which `server` and `hostname` are inherited from parent definitions and
//! `path` never is.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Environment key holding the base URL of [`ServerTarget::Default`].
pub const DEFAULT_URL_KEY: &str = "CITYGRID_DEFAULT_URL";
/// Environment key holding the base URL of [`ServerTarget::Secure`].
pub const SECURE_URL_KEY: &str = "CITYGRID_SECURE_URL";
/// Environment key holding the publisher identifier.
pub const PUBLISHER_KEY: &str = "CITYGRID_PUBLISHER";

/// A logical API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTarget {
    /// The plain API server.
    #[default]
    Default,
    /// The TLS server used for authenticated operations.
    #[serde(alias = "ssl")]
    Secure,
}

impl ServerTarget {
    /// Returns the lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerTarget::Default => "default",
            ServerTarget::Secure => "secure",
        }
    }
}

impl fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(ServerTarget::Default),
            "secure" | "ssl" => Ok(ServerTarget::Secure),
            other => Err(Error::Configuration(format!("Unknown server target: {}", other))),
        }
    }
}

/// Process-wide settings: server base URLs and the publisher identifier.
///
/// Settings are established once before any request and shared read-only
/// by every client clone.
///
/// # Examples
///
/// ```
/// use citygrid::{ServerTarget, Settings};
///
/// let settings = Settings::builder()
///     .server(ServerTarget::Default, "http://api.citygridmedia.com")?
///     .server(ServerTarget::Secure, "https://api.citygridmedia.com")?
///     .publisher("acme")
///     .build();
///
/// assert_eq!(settings.publisher(), Some("acme"));
/// # Ok::<(), citygrid::Error>(())
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    servers: HashMap<ServerTarget, Url>,
    #[serde(default)]
    publisher: Option<String>,
}

impl Settings {
    /// Creates a new `SettingsBuilder`.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Loads settings from an external key-value lookup.
    ///
    /// Reads [`DEFAULT_URL_KEY`], [`SECURE_URL_KEY`] and [`PUBLISHER_KEY`].
    /// Missing keys are left unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a server URL is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Settings::builder();
        if let Some(url) = lookup(DEFAULT_URL_KEY) {
            builder = builder.server(ServerTarget::Default, url)?;
        }
        if let Some(url) = lookup(SECURE_URL_KEY) {
            builder = builder.server(ServerTarget::Secure, url)?;
        }
        if let Some(publisher) = lookup(PUBLISHER_KEY) {
            builder = builder.publisher(publisher);
        }
        Ok(builder.build())
    }

    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Returns the base URL configured for a server.
    pub fn server_url(&self, server: ServerTarget) -> Option<&Url> {
        self.servers.get(&server)
    }

    /// Returns the configured publisher identifier.
    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    servers: HashMap<ServerTarget, Url>,
    publisher: Option<String>,
}

impl SettingsBuilder {
    /// Sets the base URL of a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn server(mut self, server: ServerTarget, url: impl AsRef<str>) -> Result<Self> {
        self.servers.insert(server, Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the publisher identifier attached by publisher-scoped requests.
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Builds the `Settings`.
    pub fn build(self) -> Settings {
        Settings {
            servers: self.servers,
            publisher: self.publisher,
        }
    }
}

/// Attributes one endpoint type sets itself.
///
/// Unset `server` and `hostname` are taken from the parent definition at
/// registry build time. `path` is never inherited.
#[derive(Debug, Clone, Default)]
pub struct EndpointDefinition {
    parent: Option<String>,
    server: Option<ServerTarget>,
    hostname: Option<String>,
    path: Option<String>,
}

impl EndpointDefinition {
    /// Creates a definition that sets nothing itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the definition this one falls back to.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the server, overriding the parent's.
    pub fn server(mut self, server: ServerTarget) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the hostname, optionally with a `:port`, overriding the parent's.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Sets the endpoint path. Required for callable endpoints.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// The resolved, immutable configuration of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// The server whose base URL is used.
    pub server: ServerTarget,
    /// Host, with optional `:port`, replacing the base URL's.
    pub hostname: Option<String>,
    /// The endpoint's own path.
    pub path: String,
}

impl EndpointConfig {
    /// Computes the absolute URL of `suffix` under this endpoint.
    ///
    /// Starts from the server's base URL, swaps in the hostname when one is
    /// configured and appends the endpoint path to the base path.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured for the endpoint's server or
    /// the hostname is invalid.
    pub fn url(&self, settings: &Settings, suffix: &str) -> Result<Url> {
        let mut url = settings.server_url(self.server).cloned().ok_or_else(|| {
            Error::Configuration(format!("No URL configured for server `{}`", self.server))
        })?;

        if let Some(hostname) = &self.hostname {
            set_authority(&mut url, hostname)?;
        }

        let path = format!(
            "{}/{}{}",
            url.path().trim_end_matches('/'),
            self.path.trim_start_matches('/'),
            suffix
        );
        url.set_path(&path);
        Ok(url)
    }
}

/// Replaces the host of `url`, and its port when `hostname` carries one.
fn set_authority(url: &mut Url, hostname: &str) -> Result<()> {
    let (host, port) = match hostname.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (hostname, None),
        },
        _ => (hostname, None),
    };

    url.set_host(Some(host))?;
    if let Some(port) = port {
        url.set_port(Some(port)).map_err(|_| {
            Error::Configuration(format!("Cannot set port {} on `{}`", port, url))
        })?;
    }
    Ok(())
}

/// Flat lookup table of resolved endpoint configurations.
///
/// # Examples
///
/// ```
/// use citygrid::{EndpointDefinition, EndpointRegistry, ServerTarget};
///
/// let registry = EndpointRegistry::builder()
///     .group("api", EndpointDefinition::new().hostname("api.citygridmedia.com"))
///     .endpoint(
///         "places",
///         EndpointDefinition::new()
///             .parent("api")
///             .path("/content/places/v2/search/where"),
///     )
///     .endpoint(
///         "reviews",
///         EndpointDefinition::new()
///             .parent("api")
///             .server(ServerTarget::Secure)
///             .path("/content/reviews/v2/search/where"),
///     )
///     .build()?;
///
/// let places = registry.get("places").unwrap();
/// assert_eq!(places.hostname.as_deref(), Some("api.citygridmedia.com"));
/// assert_eq!(places.server, ServerTarget::Default);
/// # Ok::<(), citygrid::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, EndpointConfig>,
}

impl EndpointRegistry {
    /// Creates a new `EndpointRegistryBuilder`.
    pub fn builder() -> EndpointRegistryBuilder {
        EndpointRegistryBuilder::default()
    }

    /// Returns the configuration of a concrete endpoint.
    pub fn get(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoints.get(name)
    }

    /// Iterates over the registered endpoint names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Returns the number of callable endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Builder collecting endpoint definitions and resolving them eagerly.
#[derive(Debug, Default)]
pub struct EndpointRegistryBuilder {
    definitions: HashMap<String, EndpointDefinition>,
    concrete: Vec<String>,
    duplicates: Vec<String>,
}

impl EndpointRegistryBuilder {
    /// Adds a shared definition that endpoints can inherit from.
    ///
    /// Groups have no path of their own and cannot be called.
    pub fn group(mut self, name: impl Into<String>, definition: EndpointDefinition) -> Self {
        self.insert(name.into(), definition);
        self
    }

    /// Adds a callable endpoint. It must define its own path.
    pub fn endpoint(mut self, name: impl Into<String>, definition: EndpointDefinition) -> Self {
        let name = name.into();
        self.concrete.push(name.clone());
        self.insert(name, definition);
        self
    }

    fn insert(&mut self, name: String, definition: EndpointDefinition) {
        if self.definitions.insert(name.clone(), definition).is_some() {
            self.duplicates.push(name);
        }
    }

    /// Resolves every endpoint into a flat table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for duplicate names, unknown parents,
    /// parent cycles and endpoints without their own path.
    pub fn build(self) -> Result<EndpointRegistry> {
        if let Some(name) = self.duplicates.first() {
            return Err(Error::Configuration(format!(
                "Endpoint `{}` is defined more than once",
                name
            )));
        }

        let mut endpoints = HashMap::with_capacity(self.concrete.len());
        for name in &self.concrete {
            let config = EndpointConfig {
                server: self.resolve_server(name)?.unwrap_or_default(),
                hostname: self.resolve_hostname(name)?,
                path: self.resolve_path(name)?,
            };
            tracing::debug!(
                endpoint = %name,
                server = %config.server,
                hostname = ?config.hostname,
                path = %config.path,
                "Resolved endpoint configuration"
            );
            endpoints.insert(name.clone(), config);
        }

        Ok(EndpointRegistry { endpoints })
    }

    /// Returns the definition chain from `name` up to its root.
    fn ancestry(&self, name: &str) -> Result<Vec<&EndpointDefinition>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = name;

        loop {
            if !seen.insert(current) {
                return Err(Error::Configuration(format!(
                    "Endpoint `{}` has a cyclic parent chain",
                    name
                )));
            }
            let definition = self.definitions.get(current).ok_or_else(|| {
                Error::Configuration(format!("Endpoint `{}` refers to unknown parent `{}`", name, current))
            })?;
            chain.push(definition);
            match &definition.parent {
                Some(parent) => current = parent,
                None => return Ok(chain),
            }
        }
    }

    fn resolve_server(&self, name: &str) -> Result<Option<ServerTarget>> {
        Ok(self.ancestry(name)?.into_iter().find_map(|d| d.server))
    }

    fn resolve_hostname(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .ancestry(name)?
            .into_iter()
            .find_map(|d| d.hostname.clone()))
    }

    fn resolve_path(&self, name: &str) -> Result<String> {
        self.definitions
            .get(name)
            .and_then(|d| d.path.clone())
            .filter(|path| !path.trim_matches('/').is_empty())
            .ok_or_else(|| Error::Configuration(format!("Endpoint `{}` has no path", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::builder()
            .server(ServerTarget::Default, "http://api.example.com")
            .unwrap()
            .server(ServerTarget::Secure, "https://secure.example.com/v1/")
            .unwrap()
            .build()
    }

    #[test]
    fn test_hostname_falls_back_to_parent() {
        let registry = EndpointRegistry::builder()
            .group("api", EndpointDefinition::new().hostname("parent.example.com"))
            .endpoint("places", EndpointDefinition::new().parent("api").path("/places"))
            .endpoint(
                "offers",
                EndpointDefinition::new()
                    .parent("api")
                    .hostname("offers.example.com")
                    .path("/offers"),
            )
            .build()
            .unwrap();

        assert_eq!(
            registry.get("places").unwrap().hostname.as_deref(),
            Some("parent.example.com")
        );
        assert_eq!(
            registry.get("offers").unwrap().hostname.as_deref(),
            Some("offers.example.com")
        );
        assert!(registry.get("api").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_server_walks_multiple_levels() {
        let registry = EndpointRegistry::builder()
            .group("api", EndpointDefinition::new().server(ServerTarget::Secure))
            .group("content", EndpointDefinition::new().parent("api"))
            .endpoint("places", EndpointDefinition::new().parent("content").path("/p"))
            .endpoint("plain", EndpointDefinition::new().path("/plain"))
            .build()
            .unwrap();

        assert_eq!(registry.get("places").unwrap().server, ServerTarget::Secure);
        assert_eq!(registry.get("plain").unwrap().server, ServerTarget::Default);
        assert!(registry.get("plain").unwrap().hostname.is_none());
    }

    #[test]
    fn test_path_is_not_inherited() {
        let result = EndpointRegistry::builder()
            .endpoint("places", EndpointDefinition::new().path("/places"))
            .endpoint("child", EndpointDefinition::new().parent("places"))
            .build();

        match result {
            Err(Error::Configuration(msg)) => assert!(msg.contains("`child` has no path")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_parent_and_cycle() {
        let unknown = EndpointRegistry::builder()
            .endpoint("places", EndpointDefinition::new().parent("nope").path("/p"))
            .build();
        assert!(matches!(unknown, Err(Error::Configuration(msg)) if msg.contains("unknown parent")));

        let cyclic = EndpointRegistry::builder()
            .group("a", EndpointDefinition::new().parent("b"))
            .group("b", EndpointDefinition::new().parent("a"))
            .endpoint("places", EndpointDefinition::new().parent("a").path("/p"))
            .build();
        assert!(matches!(cyclic, Err(Error::Configuration(msg)) if msg.contains("cyclic")));
    }

    #[test]
    fn test_duplicate_definition() {
        let result = EndpointRegistry::builder()
            .endpoint("places", EndpointDefinition::new().path("/a"))
            .endpoint("places", EndpointDefinition::new().path("/b"))
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_endpoint_url() {
        let settings = settings();
        let config = EndpointConfig {
            server: ServerTarget::Secure,
            hostname: None,
            path: "/content/places".to_string(),
        };
        let url = config.url(&settings, "/mutate").unwrap();
        assert_eq!(url.as_str(), "https://secure.example.com/v1/content/places/mutate");

        let config = EndpointConfig {
            server: ServerTarget::Default,
            hostname: Some("other.example.com".to_string()),
            path: "content/places".to_string(),
        };
        let url = config.url(&settings, "").unwrap();
        assert_eq!(url.as_str(), "http://other.example.com/content/places");
    }

    #[test]
    fn test_endpoint_url_hostname_with_port() {
        let config = EndpointConfig {
            server: ServerTarget::Default,
            hostname: Some("b.example.com:8080".to_string()),
            path: "/p".to_string(),
        };
        let url = config.url(&settings(), "").unwrap();
        assert_eq!(url.as_str(), "http://b.example.com:8080/p");

        let config = EndpointConfig {
            hostname: Some("b.example.com:port".to_string()),
            ..config
        };
        assert!(config.url(&settings(), "").is_err());
    }

    #[test]
    fn test_empty_path_is_rejected() {
        for path in ["", "/"] {
            let result = EndpointRegistry::builder()
                .endpoint("places", EndpointDefinition::new().path(path))
                .build();
            assert!(
                matches!(result, Err(Error::Configuration(ref msg)) if msg.contains("has no path")),
                "path {:?} should be rejected, got {:?}",
                path,
                result
            );
        }
    }

    #[test]
    fn test_endpoint_url_without_server() {
        let config = EndpointConfig {
            server: ServerTarget::Secure,
            hostname: None,
            path: "/p".to_string(),
        };
        let result = config.url(&Settings::default(), "");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = Settings::from_lookup(|key| match key {
            DEFAULT_URL_KEY => Some("http://api.example.com".to_string()),
            PUBLISHER_KEY => Some("acme".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(
            settings.server_url(ServerTarget::Default).unwrap().as_str(),
            "http://api.example.com/"
        );
        assert!(settings.server_url(ServerTarget::Secure).is_none());
        assert_eq!(settings.publisher(), Some("acme"));

        let invalid = Settings::from_lookup(|key| {
            (key == SECURE_URL_KEY).then(|| "not a url".to_string())
        });
        assert!(matches!(invalid, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_settings_deserialize() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "servers": {
                "default": "http://api.example.com",
                "ssl": "https://api.example.com"
            },
            "publisher": "acme"
        }))
        .unwrap();

        assert!(settings.server_url(ServerTarget::Secure).is_some());
        assert_eq!(settings.publisher(), Some("acme"));
    }

    #[test]
    fn test_server_target_from_str() {
        assert_eq!("SSL".parse::<ServerTarget>().unwrap(), ServerTarget::Secure);
        assert_eq!("default".parse::<ServerTarget>().unwrap(), ServerTarget::Default);
        assert!("mirror".parse::<ServerTarget>().is_err());
    }
}
