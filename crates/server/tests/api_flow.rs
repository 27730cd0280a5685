use std::net::SocketAddr;

use reqwest::{header, redirect::Policy, StatusCode};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use configs::AppConfig;
use server::{routes, state::AppState};
use service::auth::token::issue_token;

const SECRET: &str = "integration-test-secret-0123";

struct TestApp {
    base_url: String,
    client: reqwest::Client,
}

fn config(with_xero: bool) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = SECRET.into();
    cfg.storage.documents_dir = std::env::temp_dir().join("family-finance-api-tests").to_string_lossy().into_owned();
    if with_xero {
        cfg.xero.client_id = "client-123".into();
        cfg.xero.client_secret = "shh".into();
        cfg.xero.redirect_uri = "http://localhost:8080/api/xero/callback".into();
        cfg.xero.app_base_url = "http://app.local".into();
    }
    cfg
}

// 这些用例都在访问数据库之前返回，因此使用未连接的 DatabaseConnection
async fn start_server(cfg: AppConfig) -> anyhow::Result<TestApp> {
    let state = AppState::from_config(DatabaseConnection::Disconnected, cfg)?;
    let app = routes::build_router(state, CorsLayer::very_permissive());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
    Ok(TestApp { base_url: format!("http://{}", addr), client })
}

fn token() -> String {
    issue_token(SECRET, Uuid::new_v4(), 600, None).unwrap()
}

#[tokio::test]
async fn health_and_openapi_are_public() -> anyhow::Result<()> {
    let app = start_server(config(false)).await?;

    let res = app.client.get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");

    let res = app.client.get(format!("{}/api-docs/openapi.json", app.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let doc: Value = res.json().await?;
    assert!(doc["paths"]["/api/accounts"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    Ok(())
}

#[tokio::test]
async fn api_requires_bearer_token() -> anyhow::Result<()> {
    let app = start_server(config(false)).await?;

    let res = app.client.get(format!("{}/api/accounts", app.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "unauthorized");

    let res = app
        .client
        .get(format!("{}/api/accounts", app.base_url))
        .header(header::AUTHORIZATION, "Basic abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = issue_token(SECRET, Uuid::new_v4(), -3600, None)?;
    let res = app.client.get(format!("{}/api/accounts", app.base_url)).bearer_auth(expired).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tax_rates_served_from_tables() -> anyhow::Result<()> {
    let app = start_server(config(false)).await?;

    let res = app.client.get(format!("{}/api/tax/rates?fy=2025", app.base_url)).bearer_auth(token()).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["label"], "2024-25");
    assert!(body["income_tax_brackets"].is_array());

    let res = app.client.get(format!("{}/api/tax/rates?fy=2010", app.base_url)).bearer_auth(token()).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "validation_error");
    Ok(())
}

#[tokio::test]
async fn xero_connect_unconfigured_is_503() -> anyhow::Result<()> {
    let app = start_server(config(false)).await?;
    let res = app.client.get(format!("{}/api/xero/connect", app.base_url)).bearer_auth(token()).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "xero_not_configured");
    Ok(())
}

#[tokio::test]
async fn xero_connect_sets_state_cookie_and_redirects() -> anyhow::Result<()> {
    let app = start_server(config(true)).await?;
    let res = app.client.get(format!("{}/api/xero/connect", app.base_url)).bearer_auth(token()).send().await?;
    assert!(res.status().is_redirection());

    let cookie = res.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(cookie.starts_with("xero_oauth_state="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=600"));
    let state = cookie.trim_start_matches("xero_oauth_state=").split(';').next().unwrap_or_default().to_string();
    assert_eq!(state.len(), 32);

    let location = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(location.starts_with("https://login.xero.com/identity/connect/authorize?"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("client_id=client-123"));
    assert!(location.contains(&format!("state={state}")));
    Ok(())
}

#[tokio::test]
async fn xero_callback_needs_auth_cookie() -> anyhow::Result<()> {
    let app = start_server(config(true)).await?;
    let res = app.client.get(format!("{}/api/xero/callback?code=abc&state=xyz", app.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn xero_callback_rejects_state_mismatch() -> anyhow::Result<()> {
    let app = start_server(config(true)).await?;
    let res = app
        .client
        .get(format!("{}/api/xero/callback?code=abc&state=returned", app.base_url))
        .header(header::COOKIE, format!("auth_token={}; xero_oauth_state=expected", token()))
        .send()
        .await?;
    assert!(res.status().is_redirection());
    let location = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert_eq!(location, "http://app.local/settings/integrations?xero_error=invalid_state");
    let cookie = res.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("xero_oauth_state=; Max-Age=0"));

    let res = app
        .client
        .get(format!("{}/api/xero/callback?error=access_denied", app.base_url))
        .header(header::COOKIE, format!("auth_token={}", token()))
        .send()
        .await?;
    let location = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert_eq!(location, "http://app.local/settings/integrations?xero_error=access_denied");
    Ok(())
}

#[tokio::test]
async fn xero_callback_unconfigured_redirects_with_reason() -> anyhow::Result<()> {
    let mut cfg = config(false);
    cfg.xero.app_base_url = "http://app.local".into();
    let app = start_server(cfg).await?;
    let res = app
        .client
        .get(format!("{}/api/xero/callback?code=abc&state=s", app.base_url))
        .header(header::COOKIE, format!("auth_token={}", token()))
        .send()
        .await?;
    let location = res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert_eq!(location, "http://app.local/settings/integrations?xero_error=xero_not_configured");
    Ok(())
}

#[tokio::test]
async fn chat_without_provider_is_503() -> anyhow::Result<()> {
    let app = start_server(config(false)).await?;
    let res = app
        .client
        .post(format!("{}/api/ai/conversations/{}/messages", app.base_url, Uuid::new_v4()))
        .bearer_auth(token())
        .json(&serde_json::json!({ "content": "How much super can I still contribute?" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "ai_not_configured");
    Ok(())
}
