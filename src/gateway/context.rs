//! Per-request context handed to exactly one route handler.

use std::collections::HashMap;

use axum::http::{header, HeaderMap, Method};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::auth::TokenClaims;
use crate::error::{AuthError, HandlerError};

/// Path parameters captured by `{name}` pattern segments.
pub type PathParams = HashMap<String, String>;

/// The authenticated caller of a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub identifier: String,

    /// Token issue time (epoch milliseconds)
    pub issued_at: u64,

    /// Token expiry (epoch milliseconds)
    pub expires_at: u64,
}

impl From<TokenClaims> for Subject {
    fn from(claims: TokenClaims) -> Self {
        Self {
            identifier: claims.sub,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// Everything a handler knows about the request it serves.
///
/// `subject` is set only on routes that require authentication, and only after
/// the bearer token passed both the signature and the expiry check.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub params: PathParams,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub subject: Option<Subject>,
}

impl RequestContext {
    /// A bodiless context, mostly useful in tests.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: PathParams::new(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            subject: None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The authenticated subject, or an auth failure if the route is public.
    pub fn subject(&self) -> Result<&Subject, HandlerError> {
        self.subject
            .as_ref()
            .ok_or(HandlerError::Unauthorized(AuthError::Missing))
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase()
            })
    }

    /// Deserialize a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        if self.body.is_empty() {
            return Err(HandlerError::BadRequest("request body is empty".to_string()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| HandlerError::BadRequest(format!("invalid JSON body: {}", e)))
    }

    /// Deserialize an `application/x-www-form-urlencoded` body.
    ///
    /// Every field arrives as a string; the first occurrence of a key wins.
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let mut fields = serde_json::Map::new();
        for (key, value) in form_urlencoded::parse(&self.body) {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| serde_json::Value::String(value.into_owned()));
        }
        serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| HandlerError::BadRequest(format!("invalid form body: {}", e)))
    }

    /// Deserialize the body as a form when declared so, as JSON otherwise.
    pub fn form_or_json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        match self.content_type().as_deref() {
            Some("application/x-www-form-urlencoded") => self.form(),
            _ => self.json(),
        }
    }
}
