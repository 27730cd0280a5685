use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::metrics::{XERO_ACCOUNT_MATCHES, XERO_CALLBACKS};

use crate::errors::ServiceError;
use super::client::XeroApi;
use super::connection_service::{self, MatchStats};
use super::domain::{TokenSet, XeroTenant};
use super::oauth;

/// Query string Xero appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackFailure {
    /// `error` parameter sent back by Xero, e.g. `access_denied`.
    Provider(String),
    MissingCode,
    InvalidState,
    TokenExchangeFailed,
    ConnectionsFailed,
    NoOrganisations,
}

impl CallbackFailure {
    pub fn code(&self) -> &str {
        match self {
            CallbackFailure::Provider(e) => e,
            CallbackFailure::MissingCode => "missing_code",
            CallbackFailure::InvalidState => "invalid_state",
            CallbackFailure::TokenExchangeFailed => "token_exchange_failed",
            CallbackFailure::ConnectionsFailed => "connections_failed",
            CallbackFailure::NoOrganisations => "no_organisations",
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            CallbackFailure::Provider(_) => "provider_error",
            CallbackFailure::MissingCode => "missing_code",
            CallbackFailure::InvalidState => "invalid_state",
            CallbackFailure::TokenExchangeFailed => "token_exchange_failed",
            CallbackFailure::ConnectionsFailed => "connections_failed",
            CallbackFailure::NoOrganisations => "no_organisations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Connected { organisations: usize },
    Failed(CallbackFailure),
}

impl CallbackOutcome {
    /// Where the browser lands after the callback.
    pub fn redirect_url(&self, app_base_url: &str) -> String {
        match self {
            CallbackOutcome::Connected { organisations } => {
                let n = organisations.to_string();
                oauth::integrations_redirect(app_base_url, &[("xero", "connected"), ("organisations", &n)])
            }
            CallbackOutcome::Failed(f) => oauth::integrations_redirect(app_base_url, &[("xero_error", f.code())]),
        }
    }
}

fn fail(f: CallbackFailure) -> CallbackOutcome {
    XERO_CALLBACKS.with_label_values(&[f.metric_label()]).inc();
    warn!(event = "xero_callback_failed", reason = f.metric_label());
    CallbackOutcome::Failed(f)
}

/// Complete the authorization code grant and link every organisation the
/// user granted access to. Failures are reported in the outcome, never as errors.
#[instrument(skip(db, api, params, cookie_state), fields(user_id = %user_id))]
pub async fn handle_callback(
    db: &DatabaseConnection,
    api: &dyn XeroApi,
    user_id: Uuid,
    params: CallbackParams,
    cookie_state: Option<&str>,
    threshold: f64,
) -> CallbackOutcome {
    if let Some(err) = params.error.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        return fail(CallbackFailure::Provider(err.to_string()));
    }
    let Some(code) = params.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        return fail(CallbackFailure::MissingCode);
    };
    if !oauth::states_match(cookie_state, params.state.as_deref()) {
        return fail(CallbackFailure::InvalidState);
    }

    let tokens = match api.exchange_code(code).await {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "token exchange failed");
            return fail(CallbackFailure::TokenExchangeFailed);
        }
    };
    let tenants = match api.connections(&tokens.access_token).await {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "listing xero connections failed");
            return fail(CallbackFailure::ConnectionsFailed);
        }
    };
    if tenants.is_empty() {
        return fail(CallbackFailure::NoOrganisations);
    }

    let mut connected = 0usize;
    for tenant in &tenants {
        match link_tenant(db, api, user_id, tenant, &tokens, threshold).await {
            Ok(stats) => {
                connected += 1;
                XERO_ACCOUNT_MATCHES.with_label_values(&["matched"]).inc_by(u64::from(stats.matched));
                XERO_ACCOUNT_MATCHES.with_label_values(&["unmatched"]).inc_by(u64::from(stats.unmatched));
            }
            Err(e) => {
                warn!(event = "xero_tenant_link_failed", tenant_id = %tenant.tenant_id, error = %e);
            }
        }
    }
    XERO_CALLBACKS.with_label_values(&["connected"]).inc();
    info!(event = "xero_connected", organisations = connected, granted = tenants.len());
    CallbackOutcome::Connected { organisations: connected }
}

async fn link_tenant(
    db: &DatabaseConnection,
    api: &dyn XeroApi,
    user_id: Uuid,
    tenant: &XeroTenant,
    tokens: &TokenSet,
    threshold: f64,
) -> Result<MatchStats, ServiceError> {
    let conn = connection_service::upsert_connection(db, user_id, tenant, tokens).await?;
    let accounts = api.bank_accounts(&tokens.access_token, &tenant.tenant_id).await?;
    connection_service::reconcile_mappings(db, user_id, conn.id, &accounts, threshold).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use crate::xero::client::mock::MockXeroApi;
    use crate::xero::domain::XeroBankAccount;
    use crate::xero::matching::AUTO_MATCH_THRESHOLD;

    fn params(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> CallbackParams {
        CallbackParams { code: code.map(Into::into), state: state.map(Into::into), error: error.map(Into::into) }
    }

    fn tokens() -> TokenSet {
        TokenSet { access_token: "at".into(), refresh_token: "rt".into(), expires_in: 1800, token_type: None }
    }

    fn tenant(id: &str) -> XeroTenant {
        XeroTenant { id: format!("c-{id}"), tenant_id: id.into(), tenant_type: None, tenant_name: Some(format!("Org {id}")) }
    }

    async fn run(api: &MockXeroApi, p: CallbackParams, cookie: Option<&str>) -> CallbackOutcome {
        let db = DatabaseConnection::Disconnected;
        handle_callback(&db, api, Uuid::new_v4(), p, cookie, AUTO_MATCH_THRESHOLD).await
    }

    #[tokio::test]
    async fn early_failures_never_reach_xero() {
        let api = MockXeroApi::default();
        let out = run(&api, params(Some("c"), Some("s"), Some("access_denied")), Some("s")).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::Provider("access_denied".into())));
        let out = run(&api, params(None, Some("s"), None), Some("s")).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::MissingCode));
        let out = run(&api, params(Some("c"), Some("s"), None), Some("other")).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::InvalidState));
        let out = run(&api, params(Some("c"), Some("s"), None), None).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::InvalidState));
        assert!(api.recorded().is_empty());
    }

    #[tokio::test]
    async fn remote_failures_map_to_codes() {
        let api = MockXeroApi::default();
        let out = run(&api, params(Some("c1"), Some("s"), None), Some("s")).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::TokenExchangeFailed));
        assert_eq!(api.recorded(), vec!["exchange_code:c1"]);

        let api = MockXeroApi { tokens: Some(tokens()), ..Default::default() };
        let out = run(&api, params(Some("c"), Some("s"), None), Some("s")).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::ConnectionsFailed));

        let api = MockXeroApi { tokens: Some(tokens()), tenants: Some(vec![]), ..Default::default() };
        let out = run(&api, params(Some("c"), Some("s"), None), Some("s")).await;
        assert_eq!(out, CallbackOutcome::Failed(CallbackFailure::NoOrganisations));
    }

    #[test]
    fn redirect_targets() {
        let ok = CallbackOutcome::Connected { organisations: 2 };
        assert_eq!(ok.redirect_url("http://app"), "http://app/settings/integrations?xero=connected&organisations=2");
        let bad = CallbackOutcome::Failed(CallbackFailure::InvalidState);
        assert_eq!(bad.redirect_url("http://app"), "http://app/settings/integrations?xero_error=invalid_state");
    }

    #[tokio::test]
    async fn one_failing_tenant_does_not_stop_the_rest() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let user = Uuid::new_v4();
        let t_ok = format!("ok-{}", Uuid::new_v4());
        let t_bad = format!("bad-{}", Uuid::new_v4());
        let mut api = MockXeroApi { tokens: Some(tokens()), tenants: Some(vec![tenant(&t_bad), tenant(&t_ok)]), ..Default::default() };
        api.accounts.insert(t_ok.clone(), vec![XeroBankAccount {
            account_id: "acc-1".into(),
            name: "Cheque".into(),
            bank_account_number: None,
            kind: Some("BANK".into()),
            status: None,
        }]);

        let out = handle_callback(&db, &api, user, params(Some("c"), Some("st"), None), Some("st"), AUTO_MATCH_THRESHOLD).await;
        assert_eq!(out, CallbackOutcome::Connected { organisations: 1 });

        let conns = connection_service::list_connections(&db, user).await?;
        assert_eq!(conns.len(), 2);
        let ok = conns.iter().find(|c| c.xero_tenant_id == t_ok).unwrap();
        let maps = connection_service::list_mappings(&db, user, ok.id).await?;
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].account_id, None);
        Ok(())
    }
}
