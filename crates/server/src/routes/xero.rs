use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use models::{xero_account_mapping, xero_connection};
use service::auth::{AuthError, AuthenticatedUser};
use service::xero::callback::{self, CallbackParams};
use service::xero::sync::{self, SyncReport};
use service::xero::{connection_service, oauth};

use crate::{auth::cookie_token, errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct MappingUpdate {
    /// `null` unlinks the Xero account.
    pub account_id: Option<Uuid>,
}

fn state_cookie(value: &str, max_age: i64, secure: bool) -> String {
    let mut c = format!("{}={value}; Max-Age={max_age}; Path=/api/xero; HttpOnly; SameSite=Lax", oauth::STATE_COOKIE);
    if secure {
        c.push_str("; Secure");
    }
    c
}

#[utoipa::path(get, path = "/api/xero/connect", tag = "xero",
    responses((status = 303, description = "Redirect to the Xero authorize page"), (status = 503, description = "Xero not configured")),
    security(("bearer_auth" = [])))]
pub async fn connect(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Response, JsonApiError> {
    state.xero_api()?;
    let cfg = &state.config.xero;
    let csrf = oauth::generate_state();
    let url = oauth::authorize_url(cfg, &csrf).map_err(service::errors::ServiceError::from)?;
    let secure = cfg.redirect_uri.starts_with("https://");
    info!(event = "xero_connect_started", user_id = %user.user_id);
    Ok((
        [(header::SET_COOKIE, state_cookie(&csrf, oauth::STATE_TTL_SECS, secure))],
        Redirect::to(&url),
    )
        .into_response())
}

/// Redirect target registered with Xero. Authenticates by the `auth_token` cookie.
#[utoipa::path(get, path = "/api/xero/callback", tag = "xero",
    params(("code" = Option<String>, Query,), ("state" = Option<String>, Query,), ("error" = Option<String>, Query,)),
    responses((status = 303, description = "Redirect to the integrations page with the outcome"), (status = 401, description = "No auth_token cookie")))]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, JsonApiError> {
    let token = cookie_token(&jar).ok_or(AuthError::MissingToken)?;
    let user = state.verifier.verify(&token).map_err(|e| {
        warn!(code = e.code(), err = %e, "xero callback token rejected");
        e
    })?;
    let cfg = &state.config.xero;
    let clear = state_cookie("", 0, cfg.redirect_uri.starts_with("https://"));

    let location = match state.xero.as_deref() {
        Some(api) => {
            let cookie_state = jar.get(oauth::STATE_COOKIE).map(|c| c.value().to_string());
            let outcome =
                callback::handle_callback(&state.db, api, user.user_id, params, cookie_state.as_deref(), cfg.match_threshold)
                    .await;
            outcome.redirect_url(&cfg.app_base_url)
        }
        None => oauth::integrations_redirect(&cfg.app_base_url, &[("xero_error", "xero_not_configured")]),
    };
    Ok(([(header::SET_COOKIE, clear)], Redirect::to(&location)).into_response())
}

#[utoipa::path(get, path = "/api/xero/connections", tag = "xero",
    responses((status = 200, description = "Connections, tokens omitted")),
    security(("bearer_auth" = [])))]
pub async fn list_connections(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<xero_connection::Model>>, JsonApiError> {
    Ok(Json(connection_service::list_connections(&state.db, user.user_id).await?))
}

#[utoipa::path(get, path = "/api/xero/connections/{id}/mappings", tag = "xero",
    params(("id" = Uuid, Path, description = "Connection ID")),
    responses((status = 200, description = "Bank account mappings"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn list_mappings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<xero_account_mapping::Model>>, JsonApiError> {
    Ok(Json(connection_service::list_mappings(&state.db, user.user_id, id).await?))
}

#[utoipa::path(post, path = "/api/xero/connections/{id}/sync", tag = "xero",
    params(("id" = Uuid, Path, description = "Connection ID")),
    responses((status = 200, description = "Import counts"), (status = 409, description = "Connection not active"), (status = 502, description = "Token refresh failed")),
    security(("bearer_auth" = [])))]
pub async fn sync(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SyncReport>, JsonApiError> {
    let api = state.xero_api()?;
    Ok(Json(sync::sync_connection(&state.db, api, user.user_id, id).await?))
}

#[utoipa::path(post, path = "/api/xero/connections/{id}/disconnect", tag = "xero",
    params(("id" = Uuid, Path, description = "Connection ID")),
    responses((status = 200, description = "Disconnected"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<xero_connection::Model>, JsonApiError> {
    Ok(Json(connection_service::disconnect(&state.db, user.user_id, id).await?))
}

#[utoipa::path(patch, path = "/api/xero/mappings/{id}", tag = "xero",
    params(("id" = Uuid, Path, description = "Mapping ID")),
    request_body = crate::openapi::MappingUpdateDoc,
    responses((status = 200, description = "Mapping updated, auto_matched cleared"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn update_mapping(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<MappingUpdate>,
) -> Result<Json<xero_account_mapping::Model>, JsonApiError> {
    Ok(Json(connection_service::update_mapping(&state.db, user.user_id, id, body.account_id).await?))
}

#[cfg(test)]
mod tests {
    use super::state_cookie;

    #[test]
    fn state_cookie_attributes() {
        let c = state_cookie("abc", 600, false);
        assert_eq!(c, "xero_oauth_state=abc; Max-Age=600; Path=/api/xero; HttpOnly; SameSite=Lax");
        assert!(state_cookie("", 0, true).ends_with("; Secure"));
    }
}
