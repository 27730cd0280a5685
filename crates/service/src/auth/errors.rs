use thiserror::Error;

/// Failures while authenticating a request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token subject is not a user id")]
    InvalidSubject,
    #[error("token error: {0}")]
    TokenError(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::MissingToken => 1001,
            AuthError::Expired => 1002,
            AuthError::InvalidToken(_) => 1003,
            AuthError::InvalidSubject => 1004,
            AuthError::TokenError(_) => 1102,
        }
    }
}
