//! Error types for the course-evaluation client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

pub const MSG_LOGIN_BAD_CREDENTIALS: &str = "Wrong username or password, please try again";
pub const MSG_INVALID_SUBMISSION: &str = "The submitted information is invalid, please check and resubmit";
pub const MSG_SESSION_EXPIRED: &str = "Not logged in or session expired, please log in again";
pub const MSG_FORBIDDEN: &str = "You do not have permission to perform this operation";
pub const MSG_LOGIN_UNKNOWN_USER: &str = "User does not exist, please register an account first";
pub const MSG_NOT_FOUND: &str = "The requested resource does not exist";
pub const MSG_TOO_MANY_REQUESTS: &str = "Too many requests, please try again later";
pub const MSG_SERVER_ERROR: &str = "Internal server error, please try again later";
pub const MSG_NETWORK_ERROR: &str = "Network error, please try again later";
pub const MSG_NO_RESPONSE: &str = "The server is not responding, please check your network connection";
pub const MSG_REQUEST_ERROR: &str = "Request error, please try again later";
pub const MSG_BANNED: &str = "Your account has been muted and cannot post reviews";
pub const MSG_NOT_AUTHENTICATED: &str = "User is not logged in";

/// Errors surfaced by the client layer.
///
/// Every variant carries (or derives) a user-readable message; see
/// [`ClientError::message`].
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Transport timed out and all retries were exhausted
    #[error("{message}")]
    Timeout { message: String },

    /// Server responded with a non-success status
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// Request was sent but no response arrived
    #[error("{message}")]
    NoResponse { message: String, detail: String },

    /// Request could not be built or sent at all
    #[error("{message}")]
    RequestConstruction { message: String, detail: String },

    /// Content submission rejected because the user is banned
    #[error("{message}")]
    Banned { message: String },

    /// Operation needs a logged-in user but the session is empty
    #[error("{0}")]
    NotAuthenticated(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// The request task was cancelled before it produced a response
impl From<tokio::task::JoinError> for ClientError {
    fn from(err: tokio::task::JoinError) -> Self {
        ClientError::no_response(format!("request task failed: {}", err))
    }
}

impl ClientError {
    /// Map an HTTP status to an error with the matching user-facing message.
    ///
    /// `login` marks requests to the login endpoint, which get credential
    /// oriented wording for 400/403/404.
    pub fn from_status(status: u16, login: bool) -> Self {
        ClientError::Status {
            status,
            message: status_message(status, login).to_string(),
        }
    }

    pub fn timeout() -> Self {
        ClientError::Timeout {
            message: MSG_NO_RESPONSE.to_string(),
        }
    }

    pub fn no_response(detail: impl Into<String>) -> Self {
        ClientError::NoResponse {
            message: MSG_NO_RESPONSE.to_string(),
            detail: detail.into(),
        }
    }

    pub fn request_construction(detail: impl Into<String>) -> Self {
        ClientError::RequestConstruction {
            message: MSG_REQUEST_ERROR.to_string(),
            detail: detail.into(),
        }
    }

    pub fn banned() -> Self {
        ClientError::Banned {
            message: MSG_BANNED.to_string(),
        }
    }

    /// The user-readable message for this error
    pub fn message(&self) -> &str {
        match self {
            ClientError::Timeout { message }
            | ClientError::Status { message, .. }
            | ClientError::NoResponse { message, .. }
            | ClientError::RequestConstruction { message, .. }
            | ClientError::Banned { message } => message,
            ClientError::NotAuthenticated(message) => message,
            ClientError::Decode(_) | ClientError::Io(_) => MSG_REQUEST_ERROR,
            ClientError::Config(message) => message,
        }
    }

    /// HTTP status of the server response, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Banned { .. } => Some(403),
            _ => None,
        }
    }

    /// Only client-side timeouts are worth resending
    pub fn should_retry(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    pub fn is_banned(&self) -> bool {
        matches!(self, ClientError::Banned { .. })
    }

    /// True for a 401 from the server
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// User-facing message for a status code.
pub fn status_message(status: u16, login: bool) -> &'static str {
    match status {
        400 if login => MSG_LOGIN_BAD_CREDENTIALS,
        400 => MSG_INVALID_SUBMISSION,
        401 => MSG_SESSION_EXPIRED,
        403 if login => MSG_LOGIN_BAD_CREDENTIALS,
        403 => MSG_FORBIDDEN,
        404 if login => MSG_LOGIN_UNKNOWN_USER,
        404 => MSG_NOT_FOUND,
        429 => MSG_TOO_MANY_REQUESTS,
        500 => MSG_SERVER_ERROR,
        _ => MSG_NETWORK_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_wording_differs() {
        assert_eq!(status_message(400, true), MSG_LOGIN_BAD_CREDENTIALS);
        assert_eq!(status_message(400, false), MSG_INVALID_SUBMISSION);
        assert_eq!(status_message(403, true), MSG_LOGIN_BAD_CREDENTIALS);
        assert_eq!(status_message(403, false), MSG_FORBIDDEN);
        assert_eq!(status_message(404, true), MSG_LOGIN_UNKNOWN_USER);
        assert_eq!(status_message(404, false), MSG_NOT_FOUND);
    }

    #[test]
    fn test_status_independent_of_login() {
        for login in [true, false] {
            assert_eq!(status_message(401, login), MSG_SESSION_EXPIRED);
            assert_eq!(status_message(429, login), MSG_TOO_MANY_REQUESTS);
            assert_eq!(status_message(500, login), MSG_SERVER_ERROR);
            assert_eq!(status_message(502, login), MSG_NETWORK_ERROR);
            assert_eq!(status_message(418, login), MSG_NETWORK_ERROR);
        }
    }

    #[test]
    fn test_only_timeout_retries() {
        assert!(ClientError::timeout().should_retry());
        assert!(!ClientError::from_status(500, false).should_retry());
        assert!(!ClientError::no_response("refused").should_retry());
        assert!(!ClientError::request_construction("bad url").should_retry());
    }

    #[test]
    fn test_message_accessor() {
        let err = ClientError::from_status(404, false);
        assert_eq!(err.message(), MSG_NOT_FOUND);
        assert_eq!(err.status(), Some(404));

        let err = ClientError::banned();
        assert!(err.is_banned());
        assert_eq!(err.message(), MSG_BANNED);
        assert_eq!(err.status(), Some(403));

        assert!(ClientError::from_status(401, false).is_unauthorized());
        assert_eq!(ClientError::timeout().status(), None);
    }

    #[tokio::test]
    async fn test_cancelled_task_reads_as_no_response() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let err: ClientError = task.await.unwrap_err().into();
        assert!(matches!(err, ClientError::NoResponse { .. }));
        assert_eq!(err.message(), MSG_NO_RESPONSE);
        assert!(!err.should_retry());
    }
}
