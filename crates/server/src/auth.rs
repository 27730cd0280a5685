use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use service::auth::{AuthError, AuthenticatedUser};

use crate::errors::JsonApiError;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

fn bearer(req: &Request) -> Result<Option<String>, AuthError> {
    let Some(h) = req.headers().get(header::AUTHORIZATION) else { return Ok(None) };
    let h = h.to_str().map_err(|_| AuthError::InvalidToken("authorization header is not ascii".into()))?;
    match h.strip_prefix("Bearer ") {
        Some(t) if !t.trim().is_empty() => Ok(Some(t.trim().to_string())),
        _ => Err(AuthError::InvalidToken("expected Bearer scheme".into())),
    }
}

/// Token from the `auth_token` cookie, used where the browser navigates directly.
pub fn cookie_token(jar: &CookieJar) -> Option<String> {
    jar.get(AUTH_COOKIE).map(|c| c.value().to_string()).filter(|v| !v.is_empty())
}

/// Verify the bearer token and attach the caller as an `AuthenticatedUser` extension.
/// Falls back to the `auth_token` cookie when no `Authorization` header is sent.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }
    let path = req.uri().path().to_string();

    let token = match bearer(&req) {
        Ok(Some(t)) => t,
        Ok(None) => cookie_token(&jar).ok_or(AuthError::MissingToken).map_err(|e| {
            tracing::warn!(path = %path, code = e.code(), "missing Authorization header and auth_token cookie");
            e
        })?,
        Err(e) => {
            tracing::warn!(path = %path, code = e.code(), "invalid Authorization format (expect Bearer)");
            return Err(e.into());
        }
    };

    match state.verifier.verify(&token) {
        Ok(user) => {
            req.extensions_mut().insert::<AuthenticatedUser>(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(path = %path, code = e.code(), err = %e, "token validation failed");
            Err(e.into())
        }
    }
}
