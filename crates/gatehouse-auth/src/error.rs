use http::StatusCode;

use gatehouse_core::HttpError;

/// Authentication errors
///
/// Every variant maps to 401; the client message distinguishes a
/// missing credential from a rejected one but never says why a key
/// was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in either accepted header
    #[error("missing API key")]
    MissingToken,

    /// Token does not match any configured key
    #[error("unknown API key")]
    UnknownToken,

    /// Key exists but has been deactivated
    #[error("API key is inactive")]
    InactiveKey,

    /// Key exists but its expiry has passed
    #[error("API key has expired")]
    ExpiredKey,
}

impl HttpError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_type(&self) -> &str {
        "auth_error"
    }

    fn client_message(&self) -> String {
        match self {
            Self::MissingToken => "Authentication required".to_string(),
            Self::UnknownToken | Self::InactiveKey | Self::ExpiredKey => {
                "Invalid or expired API key".to_string()
            }
        }
    }
}
