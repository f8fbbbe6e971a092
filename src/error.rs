//! Error types for CityGrid API calls.
//!
//! Every operation returns [`Result`]. The variants separate failures the
//! server reported ([`Error::Api`]), bodies that were not the expected JSON
//! object ([`Error::InvalidResponseFormat`]), caller mistakes
//! ([`Error::MissingAuthToken`]) and transport failures ([`Error::Internal`]).

use crate::format::FormatErrorInfo;
use crate::response::RawResponse;

/// Message carried by [`Error::MissingAuthToken`].
pub const MISSING_AUTH_TOKEN: &str = "Missing authToken - token is required";

/// One item of a JSON error envelope's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorInfo {
    /// The item's `error` text.
    pub message: String,
}

/// The main error type for CityGrid API calls.
///
/// # Examples
///
/// ```no_run
/// use citygrid::{Client, Error, Params};
///
/// # async fn example(client: Client) -> Result<(), Error> {
/// match client.endpoint("places")?.request(Params::new().param("what", "pizza")).await {
///     Ok(result) => println!("Success: {:?}", result.data),
///     Err(Error::Api { message, .. }) => eprintln!("Server said: {}", message),
///     Err(Error::InvalidResponseFormat(info)) => {
///         eprintln!("Unexpected body: {:?}", info.server_message);
///     }
///     Err(e) if e.is_retryable() => eprintln!("Transport failure, try again: {}", e),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The server answered with a JSON object carrying a non-empty `errors` array.
    ///
    /// `message` is the first item's `error` text. All items are kept in
    /// `errors`, and the response that carried them in `response`.
    #[error("{message}")]
    Api {
        /// The first reported error message.
        message: String,
        /// Every reported error item, in server order.
        errors: Vec<ApiErrorInfo>,
        /// The response that carried the envelope.
        response: Box<RawResponse>,
    },

    /// The response body was not a JSON object.
    ///
    /// Holds whatever diagnostic text could be recovered from the body,
    /// including the message and description of an application server error page.
    #[error("{}", .0.message)]
    InvalidResponseFormat(Box<FormatErrorInfo>),

    /// A token-authenticated operation was called without a `token`.
    #[error("Missing authToken - token is required")]
    MissingAuthToken,

    /// The request could not be sent or its body could not be read.
    ///
    /// The display text is generic; the transport error is
    /// available through [`std::error::Error::source`].
    #[error("Internal Error")]
    Internal(#[source] reqwest::Error),

    /// Invalid configuration was provided.
    ///
    /// Raised while building settings, endpoint registries or clients, and for
    /// invalid header names or values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No endpoint with this name is registered on the client.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// Caller parameters had an unusable shape.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if repeating the same call may succeed.
    ///
    /// Only transport failures qualify. Server-reported errors, format errors
    /// and caller mistakes will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    /// Returns the primary message of a server-reported or format error.
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::Api { message, .. } => Some(message.as_str()),
            Error::InvalidResponseFormat(info) => Some(info.message.as_str()),
            _ => None,
        }
    }

    /// Returns the raw text the server sent, when this error has one.
    ///
    /// For HTML error pages this is the extracted `<body>` text rather than
    /// the full document.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Api { response, .. } => Some(response.text.as_str()),
            Error::InvalidResponseFormat(info) => Some(info.raw_body.as_str()),
            _ => None,
        }
    }

    /// Returns the reported error items of an [`Error::Api`].
    pub fn api_errors(&self) -> Option<&[ApiErrorInfo]> {
        match self {
            Error::Api { errors, .. } => Some(errors.as_slice()),
            _ => None,
        }
    }

    /// Returns the format diagnostics of an [`Error::InvalidResponseFormat`].
    pub fn format_info(&self) -> Option<&FormatErrorInfo> {
        match self {
            Error::InvalidResponseFormat(info) => Some(&**info),
            _ => None,
        }
    }
}

/// A specialized `Result` type for CityGrid API calls.
pub type Result<T> = std::result::Result<T, Error>;
