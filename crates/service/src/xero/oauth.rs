use rand::{distributions::Alphanumeric, Rng};
use url::Url;

use configs::XeroConfig;

use super::errors::XeroError;

pub const STATE_COOKIE: &str = "xero_oauth_state";
pub const STATE_TTL_SECS: i64 = 600;
const STATE_LEN: usize = 32;

pub fn generate_state() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(STATE_LEN).map(char::from).collect()
}

/// Login URL the browser is sent to for consent.
pub fn authorize_url(cfg: &XeroConfig, state: &str) -> Result<String, XeroError> {
    if !cfg.is_enabled() {
        return Err(XeroError::NotConfigured);
    }
    let mut url = Url::parse(&cfg.authorize_url)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &cfg.client_id)
        .append_pair("redirect_uri", &cfg.redirect_uri)
        .append_pair("scope", &cfg.scopes)
        .append_pair("state", state);
    Ok(url.into())
}

/// Compare the returned state with the cookie without short-circuiting on the first differing byte.
pub fn states_match(expected: Option<&str>, returned: Option<&str>) -> bool {
    match (expected, returned) {
        (Some(a), Some(b)) if !a.is_empty() && a.len() == b.len() => {
            a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
        }
        _ => false,
    }
}

/// Front-end integrations page with the given query pairs appended.
pub fn integrations_redirect(app_base_url: &str, pairs: &[(&str, &str)]) -> String {
    let base = format!("{}/settings/integrations", app_base_url.trim_end_matches('/'));
    let query: String = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();
    if query.is_empty() { base } else { format!("{base}?{query}") }
}
