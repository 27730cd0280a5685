use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::pagination::Pagination;
use common::types::Health;

use crate::{auth, openapi::ApiDoc, state::AppState};

pub mod accounts;
pub mod transactions;
pub mod documents;
pub mod trust;
pub mod superannuation;
pub mod tax;
pub mod xero;
pub mod ai;

/// Multipart framing on top of the configured file size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Query strings carry `page`/`per_page` as plain fields; filling in defaults happens here.
pub fn paginate(page: Option<u32>, per_page: Option<u32>) -> Pagination {
    let d = Pagination::default();
    Pagination { page: page.unwrap_or(d.page), per_page: per_page.unwrap_or(d.per_page) }
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

pub async fn metrics() -> (axum::http::StatusCode, String) {
    common::metrics::render()
}

/// Build the application router: public probes and docs, the Xero callback,
/// and the bearer-protected `/api` surface.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let upload_limit = state.config.storage.max_upload_bytes + MULTIPART_OVERHEAD;

    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/xero/callback", get(xero::callback));

    let uploads = Router::new()
        .route("/api/documents", get(documents::list).post(documents::upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    let api = Router::new()
        .route("/api/accounts", get(accounts::list).post(accounts::create))
        .route("/api/accounts/:id", get(accounts::get).patch(accounts::update).delete(accounts::delete))
        .route("/api/accounts/:id/deactivate", post(accounts::deactivate))
        .route("/api/accounts/:id/balance", get(accounts::balance))
        .route("/api/reports/net-worth", get(accounts::net_worth))
        .route("/api/reports/category-spend", get(accounts::category_spend))
        .route("/api/accounts/:id/transactions", get(transactions::list).post(transactions::create))
        .route("/api/accounts/:id/transactions/import", post(transactions::import))
        .route("/api/transactions/:id", get(transactions::get).patch(transactions::update).delete(transactions::delete))
        .merge(uploads)
        .route("/api/documents/:id", get(documents::get).delete(documents::delete))
        .route("/api/documents/:id/download", get(documents::download))
        .route("/api/search/documents", get(documents::search))
        .route("/api/trust/income", get(trust::list_income).post(trust::record_income))
        .route("/api/trust/income/:id", axum::routing::delete(trust::delete_income))
        .route("/api/trust/summary", get(trust::summary))
        .route("/api/trust/distributions/plan", post(trust::plan))
        .route(
            "/api/trust/distributions",
            get(trust::list_distributions).post(trust::create_distributions).delete(trust::delete_drafts),
        )
        .route("/api/trust/distributions/resolve", post(trust::resolve))
        .route("/api/trust/distributions/pay", post(trust::pay))
        .route("/api/super/contributions", get(superannuation::list).post(superannuation::create))
        .route("/api/super/contributions/:id", axum::routing::delete(superannuation::delete))
        .route("/api/super/summary", get(superannuation::summary))
        .route("/api/tax/summary", get(tax::summary))
        .route("/api/tax/rates", get(tax::rates))
        .route("/api/xero/connect", get(xero::connect))
        .route("/api/xero/connections", get(xero::list_connections))
        .route("/api/xero/connections/:id/mappings", get(xero::list_mappings))
        .route("/api/xero/connections/:id/sync", post(xero::sync))
        .route("/api/xero/connections/:id/disconnect", post(xero::disconnect))
        .route("/api/xero/mappings/:id", patch(xero::update_mapping))
        .route("/api/ai/conversations", get(ai::list).post(ai::create))
        .route("/api/ai/conversations/:id", get(ai::get).patch(ai::rename).delete(ai::delete))
        .route("/api/ai/conversations/:id/messages", post(ai::send_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    public
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时记录状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
