//! Request construction for the endpoint operations.

use crate::config::{EndpointConfig, Settings};
use crate::params::{query_value, Params, Verb};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Name of the header carrying the caller's auth token.
pub const AUTH_TOKEN_HEADER: &str = "authToken";

/// The kinds of request an endpoint can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Plain query request, `GET` unless the params say otherwise.
    Request,
    /// Plain query request carrying the configured publisher.
    RequestWithPublisher,
    /// Token-authenticated `POST` of a JSON body to `<path>/mutate`.
    Mutate,
    /// Token-authenticated `GET` to `<path>/get`.
    Search,
}

impl Operation {
    fn suffix(&self) -> &'static str {
        match self {
            Operation::Request | Operation::RequestWithPublisher => "",
            Operation::Mutate => "/mutate",
            Operation::Search => "/get",
        }
    }
}

/// A fully built request, ready to hand to the transport.
///
/// Built fresh for every call and consumed by dispatch.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// The HTTP verb.
    pub method: Verb,

    /// The absolute target URL, without query string.
    pub url: Url,

    /// Query parameters.
    pub query: BTreeMap<String, String>,

    /// JSON body, only set for mutations.
    pub body: Option<Value>,

    /// Headers sent with the request.
    pub headers: HeaderMap,
}

impl RequestSpec {
    /// Builds the request for `operation` against `endpoint`.
    ///
    /// Token-authenticated operations check for the token before anything
    /// else, so a missing token never reaches configuration lookup or the
    /// network.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingAuthToken`] when `mutate`/`search` params carry no token
    /// * [`Error::Configuration`] when the publisher or server URL is not
    ///   configured, or a header is invalid
    pub fn build(
        operation: Operation,
        endpoint: &EndpointConfig,
        settings: &Settings,
        mut params: Params,
    ) -> Result<Self> {
        match operation {
            Operation::Request => Self::plain(endpoint, settings, params),
            Operation::RequestWithPublisher => {
                let publisher = settings.publisher().ok_or_else(|| {
                    Error::Configuration("Publisher is not configured".to_string())
                })?;
                params.set("publisher", Value::String(publisher.to_string()));
                Self::plain(endpoint, settings, params)
            }
            Operation::Mutate | Operation::Search => {
                let token = params.take_token()?;
                let url = endpoint.url(settings, operation.suffix())?;
                let (explicit, values) = params.into_parts();
                let headers = merge_headers(&explicit, &token)?;

                if operation == Operation::Mutate {
                    Ok(Self {
                        method: Verb::Post,
                        url,
                        query: BTreeMap::new(),
                        body: Some(Value::Object(values)),
                        headers,
                    })
                } else {
                    Ok(Self {
                        method: Verb::Get,
                        url,
                        query: to_query(&values),
                        body: None,
                        headers,
                    })
                }
            }
        }
    }

    fn plain(endpoint: &EndpointConfig, settings: &Settings, mut params: Params) -> Result<Self> {
        let method = params.take_method();
        let url = endpoint.url(settings, Operation::Request.suffix())?;
        let (explicit, values) = params.into_parts();

        let mut query = to_query(&values);
        query.insert("format".to_string(), "json".to_string());

        let mut headers = HeaderMap::new();
        for (name, value) in &explicit {
            insert_header(&mut headers, name, value)?;
        }

        Ok(Self {
            method,
            url,
            query,
            body: None,
            headers,
        })
    }

    /// Returns the target URL with the query string applied.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        url
    }
}

fn to_query(values: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), query_value(value)))
        .collect()
}

/// Default headers for token-authenticated operations, overridden by
/// explicit ones, plus the auth token.
fn merge_headers(explicit: &BTreeMap<String, String>, token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    for (name, value) in explicit {
        insert_header(&mut headers, name, value)?;
    }
    insert_header(&mut headers, AUTH_TOKEN_HEADER, token)?;

    Ok(headers)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
    headers.insert(name, value);
    Ok(())
}
