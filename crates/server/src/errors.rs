use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use service::auth::AuthError;
use service::errors::ServiceError;

/// JSON error body: `{ "status": 404, "error": "not_found", "message": "..." }`.
#[derive(Debug, Serialize)]
pub struct JsonApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &str, message: Option<String>) -> Self {
        Self { status, error: error.to_string(), message }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", Some(message.into()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": self.status.as_u16(),
            "error": self.error,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => JsonApiError::new(StatusCode::BAD_REQUEST, "validation_error", Some(m)),
            ServiceError::NotFound(m) => JsonApiError::new(StatusCode::NOT_FOUND, "not_found", Some(m)),
            ServiceError::Conflict(m) => JsonApiError::new(StatusCode::CONFLICT, "conflict", Some(m)),
            ServiceError::Upstream(m) => JsonApiError::new(StatusCode::BAD_GATEWAY, "upstream_error", Some(m)),
            // 错误码本身即原因，如 ai_not_configured
            ServiceError::Unavailable(code) => JsonApiError::new(StatusCode::SERVICE_UNAVAILABLE, &code, None),
            ServiceError::Db(m) => {
                error!(error = %m, "database error");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            ServiceError::Storage(m) => {
                error!(error = %m, "document storage error");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
        }
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        JsonApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", Some(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST, "validation_error"),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND, "not_found"),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT, "conflict"),
            (ServiceError::Upstream("x".into()), StatusCode::BAD_GATEWAY, "upstream_error"),
            (ServiceError::Unavailable("ai_not_configured".into()), StatusCode::SERVICE_UNAVAILABLE, "ai_not_configured"),
            (ServiceError::Db("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        ];
        for (err, status, code) in cases {
            let api: JsonApiError = err.into();
            assert_eq!(api.status, status);
            assert_eq!(api.error, code);
        }
        let db: JsonApiError = ServiceError::Db("password=secret".into()).into();
        assert!(db.message.is_none());
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        let api: JsonApiError = AuthError::MissingToken.into();
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
    }
}
