//! # citygrid - a client for the CityGrid HTTP API
//!
//! Endpoints share a process-wide configuration (server URLs, hostname,
//! publisher) and issue `GET`/`POST` requests whose responses come back in
//! one of several shapes: a JSON object, a JSON error envelope, or an HTML
//! error page from the application server in front of the API. Every call
//! turns those into a single [`Result`] of [`ApiResult`] or [`Error`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use citygrid::{Client, EndpointDefinition, EndpointRegistry, Params, ServerTarget, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), citygrid::Error> {
//!     let settings = Settings::builder()
//!         .server(ServerTarget::Default, "http://api.citygridmedia.com")?
//!         .server(ServerTarget::Secure, "https://api.citygridmedia.com")?
//!         .publisher("acme")
//!         .build();
//!
//!     // Shared definitions are resolved once, here
//!     let registry = EndpointRegistry::builder()
//!         .group("content", EndpointDefinition::new().server(ServerTarget::Default))
//!         .endpoint(
//!             "places",
//!             EndpointDefinition::new()
//!                 .parent("content")
//!                 .path("/content/places/v2/search/where"),
//!         )
//!         .build()?;
//!
//!     let client = Client::builder()
//!         .settings(settings)
//!         .registry(registry)
//!         .build()?;
//!
//!     let places = client
//!         .endpoint("places")?
//!         .request_with_publisher(Params::new().param("what", "pizza").param("where", "90069"))
//!         .await?;
//!     println!("Took {:?}: {:?}", places.latency, places.get("results"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Callers branch on the error kind:
//!
//! ```no_run
//! use citygrid::{Client, Error, Params};
//!
//! # async fn example(client: Client) -> Result<(), Error> {
//! match client.endpoint("places")?.search(Params::new().token("t").param("id", 1)).await {
//!     Ok(result) => println!("Success: {:?}", result.data),
//!     Err(Error::Api { message, .. }) => eprintln!("Rejected by the API: {}", message),
//!     Err(Error::InvalidResponseFormat(info)) => {
//!         eprintln!("Unexpected body: {}", info.raw_body);
//!         if let Some(msg) = &info.server_message {
//!             eprintln!("  Server message: {}", msg);
//!         }
//!     }
//!     Err(Error::MissingAuthToken) => unreachable!("token supplied above"),
//!     Err(e) if e.is_retryable() => eprintln!("Transport failure: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod classify;
mod client;
pub mod config;
mod error;
pub mod format;
mod params;
pub mod request;
mod response;

pub use classify::classify;
pub use client::{Client, ClientBuilder, Endpoint};
pub use config::{EndpointConfig, EndpointDefinition, EndpointRegistry, ServerTarget, Settings};
pub use error::{ApiErrorInfo, Error, Result, MISSING_AUTH_TOKEN};
pub use format::FormatErrorInfo;
pub use params::{Params, Verb};
pub use response::{ApiResult, RawResponse};
