//! Request and response models for the client core

use crate::error::{ClientError, Result};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Sentinel header asking the client not to attach credentials.
/// Stripped before the request reaches the transport.
pub const SKIP_AUTH_HEADER: &str = "skip-auth";

/// Logical description of one outgoing request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `reviews/course/3`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    pub skip_auth: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestDescriptor {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            skip_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(|e| {
            ClientError::request_construction(format!("failed to serialize body: {}", e))
        })?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send this request without credentials
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// True when the flag or the sentinel header is present
    pub fn wants_skip_auth(&self) -> bool {
        self.skip_auth || self.headers.contains_key(SKIP_AUTH_HEADER)
    }

    /// Whether the path targets the login endpoint
    pub fn is_login(&self, login_endpoint: &str) -> bool {
        self.path.contains(login_endpoint)
    }
}

/// Response as delivered by the transport
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        ApiResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<T>`
    /// targets work for 204 responses.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return serde_json::from_value(serde_json::Value::Null)
                .map_err(|e| ClientError::Decode(e.to_string()));
        }
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builders() {
        let desc = RequestDescriptor::get("reviews")
            .query("page", 2)
            .query("size", 20);
        assert_eq!(desc.method, Method::GET);
        assert_eq!(desc.query.len(), 2);
        assert!(!desc.wants_skip_auth());
        assert!(desc.skip_auth().wants_skip_auth());
    }

    #[test]
    fn test_sentinel_header_counts_as_skip() {
        let desc = RequestDescriptor::get("reviews/course/1").header(
            HeaderName::from_static(SKIP_AUTH_HEADER),
            HeaderValue::from_static("true"),
        );
        assert!(desc.wants_skip_auth());
    }

    #[test]
    fn test_is_login() {
        assert!(RequestDescriptor::post("auth/login").is_login("auth/login"));
        assert!(!RequestDescriptor::post("reviews").is_login("auth/login"));
    }

    #[test]
    fn test_response_json() {
        let resp = ApiResponse::new(200, r#"{"id":1}"#);
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["id"], 1);

        let empty = ApiResponse::new(204, Bytes::new());
        let unit: () = empty.json().unwrap();
        assert_eq!(unit, ());

        let bad = ApiResponse::new(200, "<html>");
        assert!(matches!(bad.json::<serde_json::Value>(), Err(ClientError::Decode(_))));
    }
}
