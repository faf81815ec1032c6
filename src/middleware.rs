//! Interceptor pipeline around the transport call
//!
//! # Data Flow
//! ```text
//! descriptor
//!     → request interceptors, in order (headers, auth)
//!     → transport (with retry on timeout)
//!     → response interceptors, in order (status classification, 401 handling)
//!     → caller
//! ```

use crate::error::{ClientError, Result};
use crate::models::{ApiResponse, RequestDescriptor, SKIP_AUTH_HEADER};
use crate::session::Session;
use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Facts about the request a response belongs to
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: http::Method,
    pub path: String,
    /// Request targets the login endpoint
    pub login: bool,
}

/// Transforms a request before it is sent
pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor>;
}

/// Transforms the outcome of a sent request
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, ctx: &RequestContext, outcome: Result<ApiResponse>) -> Result<ApiResponse>;
}

/// Ordered request and response interceptors
#[derive(Clone, Default)]
pub struct Pipeline {
    request: Vec<Arc<dyn RequestInterceptor>>,
    response: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard stack: JSON headers, bearer auth, status mapping, 401 logout
    pub fn standard(session: Arc<Session>, login_view: impl Into<String>) -> Self {
        Pipeline::new()
            .with_request(Arc::new(JsonHeaders))
            .with_request(Arc::new(AuthInterceptor::new(Arc::clone(&session))))
            .with_response(Arc::new(ErrorClassifier))
            .with_response(Arc::new(AuthFailureHandler::new(session, login_view)))
    }

    pub fn with_request(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request.push(interceptor);
        self
    }

    pub fn with_response(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response.push(interceptor);
        self
    }

    pub fn apply_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor> {
        for interceptor in &self.request {
            request = interceptor.on_request(request)?;
        }
        Ok(request)
    }

    pub fn apply_response(&self, ctx: &RequestContext, mut outcome: Result<ApiResponse>) -> Result<ApiResponse> {
        for interceptor in &self.response {
            outcome = interceptor.on_response(ctx, outcome);
        }
        outcome
    }
}

/// Sets `Content-Type: application/json` unless the caller chose one
pub struct JsonHeaders;

impl RequestInterceptor for JsonHeaders {
    fn on_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor> {
        if !request.headers.contains_key(CONTENT_TYPE) {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(request)
    }
}

/// Attaches the session's bearer token
///
/// Requests flagged skip-auth go out without credentials; the flag and the
/// sentinel header are removed here so the transport never sees them.
pub struct AuthInterceptor {
    session: Arc<Session>,
}

impl AuthInterceptor {
    pub fn new(session: Arc<Session>) -> Self {
        AuthInterceptor { session }
    }
}

impl RequestInterceptor for AuthInterceptor {
    fn on_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor> {
        if request.wants_skip_auth() {
            request.headers.remove(SKIP_AUTH_HEADER);
            request.skip_auth = false;
            debug!("skip-auth set, sending {} unauthenticated", request.path);
            return Ok(request);
        }

        if let Some(token) = self.session.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    request.headers.insert(AUTHORIZATION, value);
                }
                Err(e) => {
                    error!("stored token is not a valid header value: {}", e);
                }
            }
        }
        Ok(request)
    }
}

/// Turns non-success statuses into user-facing errors
pub struct ErrorClassifier;

impl ResponseInterceptor for ErrorClassifier {
    fn on_response(&self, ctx: &RequestContext, outcome: Result<ApiResponse>) -> Result<ApiResponse> {
        match outcome {
            Ok(response) if !response.is_success() => {
                warn!(
                    "{} {} returned status={} login={}",
                    ctx.method, ctx.path, response.status, ctx.login
                );
                Err(ClientError::from_status(response.status, ctx.login))
            }
            other => other,
        }
    }
}

/// On 401: clear the session and send the user to the login view
pub struct AuthFailureHandler {
    session: Arc<Session>,
    login_view: String,
}

impl AuthFailureHandler {
    pub fn new(session: Arc<Session>, login_view: impl Into<String>) -> Self {
        AuthFailureHandler {
            session,
            login_view: login_view.into(),
        }
    }
}

impl ResponseInterceptor for AuthFailureHandler {
    fn on_response(&self, ctx: &RequestContext, outcome: Result<ApiResponse>) -> Result<ApiResponse> {
        if let Err(err) = &outcome {
            if err.is_unauthorized() {
                warn!("{} {} unauthorized, clearing session", ctx.method, ctx.path);
                self.session.logout();
                self.session.redirect_to_login(&self.login_view);
            }
        }
        outcome
    }
}
