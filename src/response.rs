//! Raw transport responses and the success wrapper returned to callers.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

/// A completed transport response, before classification.
///
/// `parsed` holds the body decoded as JSON, or `None` when the text is not
/// JSON at all (an HTML error page, for instance).
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub text: String,
    /// The body decoded as JSON, if it decoded.
    pub parsed: Option<Value>,
}

impl RawResponse {
    /// Creates a `RawResponse`, decoding `text` as JSON when possible.
    pub fn new(status: StatusCode, headers: HeaderMap, text: String) -> Self {
        let parsed = serde_json::from_str(&text).ok();
        Self {
            status,
            headers,
            text,
            parsed,
        }
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// A successful API response.
///
/// # Examples
///
/// ```no_run
/// use citygrid::{Client, Params};
///
/// # async fn example(client: Client) -> Result<(), citygrid::Error> {
/// let result = client
///     .endpoint("places")?
///     .request(Params::new().param("what", "pizza").param("where", "90069"))
///     .await?;
///
/// println!("Request took {:?}", result.latency);
/// if let Some(total) = result.get("results").and_then(|r| r.get("total_hits")) {
///     println!("Total hits: {}", total);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiResult {
    /// The response body, always a JSON object.
    pub data: Map<String, Value>,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from dispatch until the body was read.
    pub latency: Duration,
}

impl ApiResult {
    /// Creates a new `ApiResult`.
    ///
    /// This is typically called by the classifier after it has checked the
    /// body is an error-free JSON object.
    pub fn new(
        data: Map<String, Value>,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
        }
    }

    /// Deserializes the body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidResponseFormat`] when the body does not
    /// match `T`.
    pub fn json<T>(&self) -> crate::Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            let mut info = crate::FormatErrorInfo::from_text(&self.raw_body, None);
            info.message = format!("Failed to deserialize response: {}", e);
            crate::Error::InvalidResponseFormat(Box::new(info))
        })
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.data
    }
}

impl AsRef<Map<String, Value>> for ApiResult {
    fn as_ref(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl std::ops::Deref for ApiResult {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
