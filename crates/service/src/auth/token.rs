use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The caller, as established by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// `audience` is checked only when non-empty.
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        if audience.trim().is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&[audience.trim()]);
        }
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation }
    }

    /// Verify a token and extract the user id.
    ///
    /// # Examples
    /// ```
    /// use service::auth::token::{issue_token, TokenVerifier};
    /// let uid = uuid::Uuid::new_v4();
    /// let token = issue_token("0123456789abcdef-secret", uid, 3600, None).unwrap();
    /// let user = TokenVerifier::new("0123456789abcdef-secret", "").verify(&token).unwrap();
    /// assert_eq!(user.user_id, uid);
    /// ```
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(AuthenticatedUser { user_id })
    }
}

/// Sign an HS256 token for `user_id`, valid for `ttl_secs`.
/// Used by tooling and tests; production tokens come from the identity provider.
pub fn issue_token(secret: &str, user_id: Uuid, ttl_secs: i64, audience: Option<&str>) -> Result<String, AuthError> {
    let exp = (chrono::Utc::now() + chrono::Duration::seconds(ttl_secs)).timestamp().max(0) as usize;
    let claims = Claims { sub: user_id.to_string(), exp, aud: audience.map(str::to_string), email: None };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-0123456789";

    #[test]
    fn valid_token_round_trip() {
        let uid = Uuid::new_v4();
        let token = issue_token(SECRET, uid, 600, None).unwrap();
        let user = TokenVerifier::new(SECRET, "").verify(&token).unwrap();
        assert_eq!(user.user_id, uid);
    }

    #[test]
    fn expired_and_forged_tokens_are_rejected() {
        let uid = Uuid::new_v4();
        let expired = issue_token(SECRET, uid, -3600, None).unwrap();
        assert_eq!(TokenVerifier::new(SECRET, "").verify(&expired), Err(AuthError::Expired));

        let forged = issue_token("another-secret-abcdefgh", uid, 600, None).unwrap();
        assert!(matches!(TokenVerifier::new(SECRET, "").verify(&forged), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn audience_is_enforced_when_configured() {
        let uid = Uuid::new_v4();
        let verifier = TokenVerifier::new(SECRET, "family-finance");
        let good = issue_token(SECRET, uid, 600, Some("family-finance")).unwrap();
        let bad = issue_token(SECRET, uid, 600, Some("other-app")).unwrap();
        assert!(verifier.verify(&good).is_ok());
        assert!(verifier.verify(&bad).is_err());
    }

    #[test]
    fn non_uuid_subject() {
        let claims = Claims { sub: "alice@example.com".into(), exp: (chrono::Utc::now().timestamp() + 600) as usize, aud: None, email: None };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert_eq!(TokenVerifier::new(SECRET, "").verify(&token), Err(AuthError::InvalidSubject));
    }
}
