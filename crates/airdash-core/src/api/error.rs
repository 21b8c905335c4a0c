//! Error taxonomy for dashboard API calls.
//!
//! Raw HTTP statuses and transport errors are translated here, at the client
//! boundary. Everything above `SessionClient` matches on `ApiError` only.

use thiserror::Error;

use crate::models::StatusEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response (connection refused, DNS, timeout).
    #[error("Network failure: {0}")]
    Network(String),
    /// The credential is missing, expired or revoked.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Account not verified: {0}")]
    AccountNotVerified(String),
    #[error("Account suspended: {0}")]
    AccountSuspended(String),
    #[error("Account deleted: {0}")]
    AccountDeleted(String),
    /// Bad form input (duplicate email, weak password, expired reset link).
    #[error("{0}")]
    Validation(String),
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
    /// A 2xx response whose body does not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
    /// The credential was accepted but could not be written locally.
    #[error("Failed to persist credential: {0}")]
    Storage(String),
}

impl ApiError {
    /// Message suitable for inline display on the originating form.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::InvalidCredentials(msg)
            | ApiError::AccountNotVerified(msg)
            | ApiError::AccountSuspended(msg)
            | ApiError::AccountDeleted(msg)
            | ApiError::Validation(msg)
            | ApiError::Decode(msg)
            | ApiError::Storage(msg)
            | ApiError::Server { message: msg, .. } => msg,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Returns true if the local session must be dropped.
    pub fn forces_logout(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Account-level failures that end in the notification modal.
    pub fn status_event(&self) -> Option<StatusEvent> {
        match self {
            ApiError::AccountSuspended(_) => Some(StatusEvent::AccountSuspended),
            ApiError::AccountDeleted(_) => Some(StatusEvent::AccountDeleted),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("request timed out".to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// How a failed response should be read, depending on what was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    /// Login and OAuth callback: 401/403 describe the submitted credentials.
    SignIn,
    /// Calls made with the stored credential: 401 invalidates it.
    Authenticated,
    /// The account status check: 404 means the account is gone.
    Status,
    /// Anonymous form endpoints (register, password reset, verification).
    Public,
}

/// Translates a failed response into the taxonomy.
pub(crate) fn classify(status: u16, message: String, endpoint: Endpoint) -> ApiError {
    if status >= 500 {
        return ApiError::Server { status, message };
    }

    match endpoint {
        Endpoint::SignIn => match status {
            401 | 403 | 404 => classify_sign_in(message),
            _ if mentions_suspension(&message) || mentions_unverified(&message) => {
                classify_sign_in(message)
            }
            _ => ApiError::Validation(message),
        },
        Endpoint::Status if mentions_deletion(&message) => ApiError::AccountDeleted(message),
        Endpoint::Status if mentions_suspension(&message) => ApiError::AccountSuspended(message),
        Endpoint::Authenticated | Endpoint::Status => match status {
            401 => ApiError::Unauthorized(message),
            403 if mentions_suspension(&message) => ApiError::AccountSuspended(message),
            404 if endpoint == Endpoint::Status || mentions_deletion(&message) => {
                ApiError::AccountDeleted(message)
            }
            403 | 404 => ApiError::Server { status, message },
            _ => ApiError::Validation(message),
        },
        Endpoint::Public => ApiError::Validation(message),
    }
}

fn classify_sign_in(message: String) -> ApiError {
    if mentions_suspension(&message) {
        ApiError::AccountSuspended(message)
    } else if mentions_unverified(&message) {
        ApiError::AccountNotVerified(message)
    } else {
        ApiError::InvalidCredentials(message)
    }
}

fn contains_any(message: &str, needles: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}

pub(crate) fn mentions_suspension(message: &str) -> bool {
    contains_any(message, &["suspend", "khóa", "khoá", "banned"])
}

pub(crate) fn mentions_unverified(message: &str) -> bool {
    contains_any(
        message,
        &["verif", "xác minh", "chưa kích hoạt", "not activated"],
    )
}

pub(crate) fn mentions_deletion(message: &str) -> bool {
    contains_any(
        message,
        &["deleted", "đã bị xóa", "đã bị xoá", "không tồn tại"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_distinguishes_by_message() {
        assert_eq!(
            classify(401, "Email hoặc mật khẩu không đúng".into(), Endpoint::SignIn),
            ApiError::InvalidCredentials("Email hoặc mật khẩu không đúng".into())
        );
        assert!(matches!(
            classify(403, "Tài khoản của bạn đã bị khóa".into(), Endpoint::SignIn),
            ApiError::AccountSuspended(_)
        ));
        assert!(matches!(
            classify(403, "Please verify your email first".into(), Endpoint::SignIn),
            ApiError::AccountNotVerified(_)
        ));
        assert!(matches!(
            classify(400, "Email chưa được xác minh".into(), Endpoint::SignIn),
            ApiError::AccountNotVerified(_)
        ));
        assert!(matches!(
            classify(400, "Thiếu email".into(), Endpoint::SignIn),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn test_authenticated_401_is_unauthorized() {
        let err = classify(401, "Token hết hạn".into(), Endpoint::Authenticated);
        assert!(err.forces_logout());
        assert_eq!(err.status_event(), None);
    }

    #[test]
    fn test_status_check_maps_account_states() {
        assert_eq!(
            classify(404, "User missing".into(), Endpoint::Status).status_event(),
            Some(StatusEvent::AccountDeleted)
        );
        assert_eq!(
            classify(403, "Account suspended by admin".into(), Endpoint::Status).status_event(),
            Some(StatusEvent::AccountSuspended)
        );
        assert_eq!(
            classify(401, "User không tồn tại".into(), Endpoint::Status).status_event(),
            Some(StatusEvent::AccountDeleted)
        );
        assert!(matches!(
            classify(404, "No such city".into(), Endpoint::Authenticated),
            ApiError::Server { status: 404, .. }
        ));
    }

    #[test]
    fn test_server_errors_and_public_validation() {
        assert!(matches!(
            classify(502, "Bad gateway".into(), Endpoint::Authenticated),
            ApiError::Server { status: 502, .. }
        ));
        assert_eq!(
            classify(409, "Email đã tồn tại".into(), Endpoint::Public),
            ApiError::Validation("Email đã tồn tại".into())
        );
    }

    #[test]
    fn test_message_accessor() {
        let err = ApiError::Server {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.message(), "boom");
        assert!(ApiError::Network("down".into()).is_network());
    }
}
