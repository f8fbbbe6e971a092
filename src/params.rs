//! Caller-supplied options for endpoint operations.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    #[default]
    Get,
    Post,
}

impl Verb {
    /// Returns the matching `http::Method`.
    pub fn as_method(&self) -> http::Method {
        match self {
            Verb::Get => http::Method::GET,
            Verb::Post => http::Method::POST,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Get => f.write_str("GET"),
            Verb::Post => f.write_str("POST"),
        }
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Verb::Get),
            "post" => Ok(Verb::Post),
            other => Err(Error::InvalidParams(format!("Unsupported method: {}", other))),
        }
    }
}

/// Options for a single endpoint operation.
///
/// `method`, `token` and `headers` steer the request itself; every other
/// value is sent to the API, as query parameters or as the JSON body
/// depending on the operation.
///
/// # Examples
///
/// ```
/// use citygrid::{Params, Verb};
///
/// let params = Params::new()
///     .method(Verb::Post)
///     .token("secret")
///     .header("Accept", "text/plain")
///     .param("what", "pizza")
///     .param("rpp", 20);
///
/// assert_eq!(params.values().len(), 2);
///
/// // The same options expressed as a JSON object.
/// let params = Params::try_from(serde_json::json!({
///     "method": "post",
///     "token": "secret",
///     "headers": { "Accept": "text/plain" },
///     "what": "pizza",
///     "rpp": 20
/// }))?;
/// assert_eq!(params.values().len(), 2);
/// # Ok::<(), citygrid::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    method: Option<Verb>,
    token: Option<String>,
    headers: BTreeMap<String, String>,
    values: Map<String, Value>,
}

impl Params {
    /// Creates empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the verb of a plain request. Defaults to `GET`.
    pub fn method(mut self, method: Verb) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the auth token sent as the `authToken` header.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Adds an explicit header. Explicit headers win over the defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds an API parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns the API parameters.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Returns the headers set with [`Params::header`].
    pub fn explicit_headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub(crate) fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub(crate) fn take_method(&mut self) -> Verb {
        self.method.take().unwrap_or_default()
    }

    /// Removes the token, failing when none was supplied.
    pub(crate) fn take_token(&mut self) -> Result<String> {
        self.token.take().ok_or(Error::MissingAuthToken)
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<String, String>, Map<String, Value>) {
        (self.headers, self.values)
    }
}

impl TryFrom<Map<String, Value>> for Params {
    type Error = Error;

    fn try_from(mut values: Map<String, Value>) -> Result<Self> {
        let method = match values.remove("method") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse()?),
            Some(other) => {
                return Err(Error::InvalidParams(format!("`method` must be a string, got {}", other)))
            }
        };

        let token = match values.remove("token") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        let headers = match values.remove("headers") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(name, value)| (name, query_value(&value)))
                .collect(),
            Some(other) => {
                return Err(Error::InvalidParams(format!("`headers` must be an object, got {}", other)))
            }
        };

        Ok(Self {
            method,
            token,
            headers,
            values,
        })
    }
}

impl TryFrom<Value> for Params {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Params::try_from(map),
            Value::Null => Ok(Params::new()),
            other => Err(Error::InvalidParams(format!("Expected an object, got {}", other))),
        }
    }
}

/// Renders a JSON value as a query string value.
///
/// Strings are sent verbatim and `null` as an empty value; anything else is
/// sent as its JSON text.
pub(crate) fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
