use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use configs::XeroConfig;

use super::domain::{AccountsEnvelope, BankTransactionsEnvelope, TokenSet, XeroBankAccount, XeroBankTransaction, XeroTenant};
use super::errors::XeroError;

/// Xero returns at most this many bank transactions per page.
const PAGE_SIZE: usize = 100;
const MAX_PAGES: u32 = 50;

/// Remote calls made against Xero identity and accounting APIs.
#[async_trait]
pub trait XeroApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, XeroError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, XeroError>;
    async fn connections(&self, access_token: &str) -> Result<Vec<XeroTenant>, XeroError>;
    async fn bank_accounts(&self, access_token: &str, tenant_id: &str) -> Result<Vec<XeroBankAccount>, XeroError>;
    async fn bank_transactions(
        &self,
        access_token: &str,
        tenant_id: &str,
        xero_account_id: &str,
    ) -> Result<Vec<XeroBankTransaction>, XeroError>;
}

/// reqwest-backed client
pub struct HttpXeroClient {
    http: reqwest::Client,
    cfg: XeroConfig,
}

impl HttpXeroClient {
    pub fn new(cfg: XeroConfig) -> Result<Self, XeroError> {
        if !cfg.is_enabled() {
            return Err(XeroError::NotConfigured);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs.max(1)))
            .build()?;
        Ok(Self { http, cfg })
    }

    fn api_url(&self, path: &str) -> Result<Url, XeroError> {
        Ok(Url::parse(&format!("{}{}", self.cfg.api_base_url, path))?)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, XeroError> {
        let res = self
            .http
            .post(&self.cfg.token_url)
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;
        decode(res).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, access_token: &str, tenant_id: Option<&str>) -> Result<T, XeroError> {
        let mut req = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/json");
        if let Some(t) = tenant_id {
            req = req.header("xero-tenant-id", t);
        }
        decode(req.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, XeroError> {
    let status = res.status();
    if status == StatusCode::OK {
        return res.json::<T>().await.map_err(|e| {
            error!(error = ?e, "unable to decode xero response");
            XeroError::Decode(e.to_string())
        });
    }
    let body = res.text().await.unwrap_or_default();
    error!(status = status.as_u16(), body = %body, "unexpected response from xero");
    Err(XeroError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl XeroApi for HttpXeroClient {
    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, XeroError> {
        let tokens = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.cfg.redirect_uri.as_str()),
            ])
            .await?;
        debug!(expires_in = tokens.expires_in, "authorization code grant complete");
        Ok(tokens)
    }

    #[instrument(skip_all)]
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, XeroError> {
        self.token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)]).await
    }

    #[instrument(skip_all)]
    async fn connections(&self, access_token: &str) -> Result<Vec<XeroTenant>, XeroError> {
        let url = self.api_url("/connections")?;
        self.get_json(url, access_token, None).await
    }

    #[instrument(skip(self, access_token))]
    async fn bank_accounts(&self, access_token: &str, tenant_id: &str) -> Result<Vec<XeroBankAccount>, XeroError> {
        let mut url = self.api_url("/api.xro/2.0/Accounts")?;
        url.query_pairs_mut().append_pair("where", "Type==\"BANK\"");
        let env: AccountsEnvelope = self.get_json(url, access_token, Some(tenant_id)).await?;
        Ok(env.accounts)
    }

    #[instrument(skip(self, access_token))]
    async fn bank_transactions(
        &self,
        access_token: &str,
        tenant_id: &str,
        xero_account_id: &str,
    ) -> Result<Vec<XeroBankTransaction>, XeroError> {
        let filter = format!("BankAccount.AccountID==Guid(\"{xero_account_id}\")");
        let mut out = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut url = self.api_url("/api.xro/2.0/BankTransactions")?;
            url.query_pairs_mut()
                .append_pair("where", &filter)
                .append_pair("page", &page.to_string());
            let env: BankTransactionsEnvelope = self.get_json(url, access_token, Some(tenant_id)).await?;
            let n = env.bank_transactions.len();
            out.extend(env.bank_transactions);
            if n < PAGE_SIZE {
                break;
            }
        }
        debug!(count = out.len(), "bank transactions fetched");
        Ok(out)
    }
}

/// Scripted client for tests and local development.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockXeroApi {
        /// `None` makes the token exchange fail.
        pub tokens: Option<TokenSet>,
        /// `None` makes `/connections` fail.
        pub tenants: Option<Vec<XeroTenant>>,
        pub accounts: HashMap<String, Vec<XeroBankAccount>>,
        pub transactions: HashMap<String, Vec<XeroBankTransaction>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockXeroApi {
        fn record(&self, call: &str) {
            if let Ok(mut c) = self.calls.lock() {
                c.push(call.to_string());
            }
        }

        pub fn recorded(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    fn fail() -> XeroError {
        XeroError::Status { status: 400, body: "scripted failure".into() }
    }

    #[async_trait]
    impl XeroApi for MockXeroApi {
        async fn exchange_code(&self, code: &str) -> Result<TokenSet, XeroError> {
            self.record(&format!("exchange_code:{code}"));
            self.tokens.clone().ok_or_else(fail)
        }

        async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenSet, XeroError> {
            self.record("refresh_token");
            self.tokens.clone().ok_or_else(fail)
        }

        async fn connections(&self, _access_token: &str) -> Result<Vec<XeroTenant>, XeroError> {
            self.record("connections");
            self.tenants.clone().ok_or_else(fail)
        }

        async fn bank_accounts(&self, _access_token: &str, tenant_id: &str) -> Result<Vec<XeroBankAccount>, XeroError> {
            self.record(&format!("bank_accounts:{tenant_id}"));
            self.accounts.get(tenant_id).cloned().ok_or_else(fail)
        }

        async fn bank_transactions(&self, _access_token: &str, _tenant_id: &str, xero_account_id: &str) -> Result<Vec<XeroBankTransaction>, XeroError> {
            self.record(&format!("bank_transactions:{xero_account_id}"));
            self.transactions.get(xero_account_id).cloned().ok_or_else(fail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_client_is_rejected() {
        assert!(matches!(HttpXeroClient::new(XeroConfig::default()), Err(XeroError::NotConfigured)));
    }

    #[test]
    fn builds_api_urls() {
        let cfg = XeroConfig { client_id: "id".into(), client_secret: "s".into(), redirect_uri: "http://x/cb".into(), ..Default::default() };
        let c = HttpXeroClient::new(cfg).unwrap();
        assert_eq!(c.api_url("/connections").unwrap().as_str(), "https://api.xero.com/connections");
    }
}
