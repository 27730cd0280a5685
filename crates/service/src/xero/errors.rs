use thiserror::Error;

use crate::errors::ServiceError;

#[derive(Debug, Error)]
pub enum XeroError {
    #[error("xero integration is not configured")]
    NotConfigured,
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for XeroError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() { XeroError::Decode(e.to_string()) } else { XeroError::Http(e.to_string()) }
    }
}

impl From<XeroError> for ServiceError {
    fn from(e: XeroError) -> Self {
        match e {
            XeroError::NotConfigured => ServiceError::Unavailable("xero_not_configured".into()),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}
