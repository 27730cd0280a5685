use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::info;

use configs::AppConfig;
use service::ai::{ChatProvider, HttpChatProvider};
use service::auth::TokenVerifier;
use service::documents::{DocumentStore, LocalDocumentStore};
use service::xero::{HttpXeroClient, XeroApi};

use crate::errors::StartupError;

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub verifier: Arc<TokenVerifier>,
    pub store: Arc<dyn DocumentStore>,
    /// `None` while Xero credentials are not configured.
    pub xero: Option<Arc<dyn XeroApi>>,
    /// `None` while no chat provider key is configured.
    pub chat: Option<Arc<dyn ChatProvider>>,
}

impl AppState {
    pub fn from_config(db: DatabaseConnection, cfg: AppConfig) -> Result<Self, StartupError> {
        let verifier = Arc::new(TokenVerifier::new(&cfg.auth.jwt_secret, &cfg.auth.audience));
        let store: Arc<dyn DocumentStore> = Arc::new(LocalDocumentStore::new(&cfg.storage.documents_dir));

        let xero: Option<Arc<dyn XeroApi>> = if cfg.xero.is_enabled() {
            let client = HttpXeroClient::new(cfg.xero.clone()).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
            Some(Arc::new(client))
        } else {
            None
        };
        let chat: Option<Arc<dyn ChatProvider>> = if cfg.ai.is_enabled() {
            let provider = HttpChatProvider::new(cfg.ai.clone()).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
            Some(Arc::new(provider))
        } else {
            None
        };
        info!(xero = xero.is_some(), ai = chat.is_some(), documents_dir = %cfg.storage.documents_dir, "integrations configured");

        Ok(Self { db, config: Arc::new(cfg), verifier, store, xero, chat })
    }

    pub fn xero_api(&self) -> Result<&dyn XeroApi, service::errors::ServiceError> {
        self.xero
            .as_deref()
            .ok_or_else(|| service::errors::ServiceError::Unavailable("xero_not_configured".into()))
    }
}
