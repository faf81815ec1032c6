// Unit tests for error classification

use course_eval_client::error::{status_message, ClientError, MSG_NETWORK_ERROR, MSG_NO_RESPONSE, MSG_REQUEST_ERROR};
use course_eval_client::TransportError;

#[test]
fn test_status_errors_not_retryable() {
    for status in [400, 401, 403, 404, 429, 500, 502, 503] {
        let error = ClientError::from_status(status, false);
        assert!(!error.should_retry(), "{} should not be retried", status);
        assert_eq!(error.status(), Some(status));
    }
}

#[test]
fn test_timeout_retryable() {
    let error: ClientError = TransportError::Timeout.into();
    assert!(error.should_retry(), "Timeout errors should be retried");
    assert_eq!(error.message(), MSG_NO_RESPONSE);
}

#[test]
fn test_no_response_and_construction_messages() {
    let error: ClientError = TransportError::NoResponse("connection refused".into()).into();
    assert_eq!(error.message(), MSG_NO_RESPONSE);
    assert_eq!(error.status(), None);

    let error: ClientError = TransportError::Construction("relative URL without a base".into()).into();
    assert_eq!(error.message(), MSG_REQUEST_ERROR);
    assert!(!error.should_retry());
}

#[test]
fn test_unmapped_status_falls_back_to_network_error() {
    for status in [402, 405, 409, 418, 501, 504] {
        assert_eq!(status_message(status, false), MSG_NETWORK_ERROR);
        assert_eq!(status_message(status, true), MSG_NETWORK_ERROR);
    }
}

#[test]
fn test_display_includes_status() {
    let error = ClientError::from_status(404, false);
    assert!(error.to_string().contains("404"));
}

#[test]
fn test_banned_flag() {
    let error = ClientError::banned();
    assert!(error.is_banned());
    assert!(!ClientError::from_status(403, false).is_banned());
}
