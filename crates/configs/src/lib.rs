use anyhow::Result;
use serde::Deserialize;
use anyhow::{anyhow, Context};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub xero: XeroConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// `compact`（默认）或 `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4), log_format: default_log_format() }
    }
}

fn default_log_format() -> String { "compact".into() }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
    /// Run pending migrations at startup.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_true() -> bool { true }

/// Verification settings for bearer tokens issued by the external identity provider.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    /// Expected `aud` claim; unchecked when empty.
    #[serde(default)]
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XeroConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_xero_scopes")]
    pub scopes: String,
    #[serde(default = "default_xero_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_xero_token_url")]
    pub token_url: String,
    #[serde(default = "default_xero_api_base_url")]
    pub api_base_url: String,
    /// Front-end origin the OAuth callback redirects back to.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for XeroConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scopes: default_xero_scopes(),
            authorize_url: default_xero_authorize_url(),
            token_url: default_xero_token_url(),
            api_base_url: default_xero_api_base_url(),
            app_base_url: default_app_base_url(),
            match_threshold: default_match_threshold(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_xero_scopes() -> String {
    "openid profile email offline_access accounting.settings.read accounting.transactions.read".into()
}
fn default_xero_authorize_url() -> String { "https://login.xero.com/identity/connect/authorize".into() }
fn default_xero_token_url() -> String { "https://identity.xero.com/connect/token".into() }
fn default_xero_api_base_url() -> String { "https://api.xero.com".into() }
fn default_app_base_url() -> String { "http://localhost:3000".into() }
fn default_match_threshold() -> f64 { 0.6 }
fn default_http_timeout() -> u64 { 20 }

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { documents_dir: default_documents_dir(), max_upload_bytes: default_max_upload_bytes() }
    }
}

fn default_documents_dir() -> String { "data/documents".into() }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }

/// OpenAI-compatible chat completion endpoint. Chat is disabled while `api_key` is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self { base_url: default_ai_base_url(), api_key: String::new(), model: default_ai_model(), timeout_secs: default_ai_timeout() }
    }
}

fn default_ai_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_ai_model() -> String { "gpt-4o-mini".into() }
fn default_ai_timeout() -> u64 { 60 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

/// Like `load_from_file`, but a missing file yields `None`. A file that exists
/// and cannot be read or parsed is an error.
pub fn load_optional(path: &str) -> Result<Option<AppConfig>> {
    match std::fs::read_to_string(path) {
        Ok(content) => load_from_str(&content).map(Some).with_context(|| format!("invalid config file {path}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow!("cannot read config file {path}: {e}")),
    }
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn fill_from_env(target: &mut String, key: &str) {
    if target.trim().is_empty() {
        if let Some(v) = env_nonempty(key) {
            *target = v;
        }
    }
}

impl AppConfig {
    /// Load `config.toml` if present, otherwise start from defaults; then apply env fallbacks and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = load_optional(&path)?.unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        self.xero.normalize_from_env();
        self.xero.validate()?;
        self.storage.normalize_from_env();
        self.ai.normalize_from_env();
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = env_nonempty("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        }
        if let Some(p) = env_nonempty("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.port = p;
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        self.worker_threads = Some(resolve_worker_threads(self.worker_threads, env_nonempty("TOKIO_WORKER_THREADS")));
        Ok(())
    }
}

const DEFAULT_WORKER_THREADS: usize = 4;

/// `server.worker_threads` wins, then `TOKIO_WORKER_THREADS`, then 4. Zero counts as unset.
fn resolve_worker_threads(configured: Option<usize>, env: Option<String>) -> usize {
    configured
        .filter(|n| *n > 0)
        .or_else(|| env.and_then(|v| v.trim().parse::<usize>().ok()).filter(|n| *n > 0))
        .unwrap_or(DEFAULT_WORKER_THREADS)
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // 若 TOML 中未提供 URL，则尝试从环境变量填充
        fill_from_env(&mut self.url, "DATABASE_URL");
        if self.max_connections == 0 { self.max_connections = default_max_connections(); }
        if self.min_connections == 0 { self.min_connections = default_min_connections(); }
        if self.connect_timeout_secs == 0 { self.connect_timeout_secs = default_connect_timeout(); }
        if self.acquire_timeout_secs == 0 { self.acquire_timeout_secs = default_acquire_timeout(); }
        if self.idle_timeout_secs == 0 { self.idle_timeout_secs = default_idle_timeout(); }
        if self.max_lifetime_secs == 0 { self.max_lifetime_secs = default_max_lifetime(); }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        fill_from_env(&mut self.jwt_secret, "JWT_SECRET");
        fill_from_env(&mut self.audience, "JWT_AUDIENCE");
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            return Err(anyhow!("auth.jwt_secret must be at least 16 characters (or set JWT_SECRET)"));
        }
        Ok(())
    }
}

impl XeroConfig {
    pub fn normalize_from_env(&mut self) {
        fill_from_env(&mut self.client_id, "XERO_CLIENT_ID");
        fill_from_env(&mut self.client_secret, "XERO_CLIENT_SECRET");
        fill_from_env(&mut self.redirect_uri, "XERO_REDIRECT_URI");
        if let Some(v) = env_nonempty("APP_BASE_URL") {
            self.app_base_url = v;
        }
        while self.app_base_url.ends_with('/') {
            self.app_base_url.pop();
        }
        while self.api_base_url.ends_with('/') {
            self.api_base_url.pop();
        }
    }

    /// Integration is optional; only a half-configured client is rejected.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(anyhow!("xero.match_threshold must be within 0..=1"));
        }
        let provided = [&self.client_id, &self.client_secret, &self.redirect_uri]
            .iter()
            .filter(|v| !v.trim().is_empty())
            .count();
        if provided != 0 && provided != 3 {
            return Err(anyhow!("xero.client_id, client_secret and redirect_uri must be set together"));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Some(v) = env_nonempty("DOCUMENTS_DIR") {
            self.documents_dir = v;
        }
        if self.max_upload_bytes == 0 {
            self.max_upload_bytes = default_max_upload_bytes();
        }
    }
}

impl AiConfig {
    pub fn normalize_from_env(&mut self) {
        fill_from_env(&mut self.api_key, "AI_API_KEY");
        if let Some(v) = env_nonempty("AI_BASE_URL") { self.base_url = v; }
        if let Some(v) = env_nonempty("AI_MODEL") { self.model = v; }
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
