use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::account;
use service::account_service::{self, AccountUpdate, CategorySpend, NetWorthSummary};
use service::auth::AuthenticatedUser;

use super::paginate;
use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct FyQuery {
    pub fy: i32,
}

#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    pub account_id: Uuid,
    pub as_of: Option<NaiveDate>,
    pub balance: Decimal,
}

#[utoipa::path(get, path = "/api/accounts", tag = "accounts",
    params(("active" = Option<bool>, Query, description = "Only active (true) or inactive (false) accounts"),
           ("page" = Option<u32>, Query,), ("per_page" = Option<u32>, Query,)),
    responses((status = 200, description = "Accounts ordered by name"), (status = 401, description = "Unauthorized")),
    security(("bearer_auth" = [])))]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<account::Model>>, JsonApiError> {
    let items = account_service::list_accounts(&state.db, user.user_id, q.active, paginate(q.page, q.per_page)).await?;
    Ok(Json(items))
}

#[utoipa::path(post, path = "/api/accounts", tag = "accounts", request_body = crate::openapi::NewAccountDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error")),
    security(("bearer_auth" = [])))]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<account::NewAccount>,
) -> Result<(StatusCode, Json<account::Model>), JsonApiError> {
    let created = account_service::create_account(&state.db, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/api/accounts/{id}", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<account::Model>, JsonApiError> {
    Ok(Json(account_service::get_account(&state.db, user.user_id, id).await?))
}

#[utoipa::path(patch, path = "/api/accounts/{id}", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = crate::openapi::AccountUpdateDoc,
    responses((status = 200, description = "Updated"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AccountUpdate>,
) -> Result<Json<account::Model>, JsonApiError> {
    Ok(Json(account_service::update_account(&state.db, user.user_id, id, patch).await?))
}

#[utoipa::path(post, path = "/api/accounts/{id}/deactivate", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses((status = 200, description = "Deactivated"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<account::Model>, JsonApiError> {
    Ok(Json(account_service::deactivate_account(&state.db, user.user_id, id).await?))
}

#[utoipa::path(delete, path = "/api/accounts/{id}", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses((status = 204, description = "Deleted with its transactions"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    account_service::delete_account(&state.db, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/accounts/{id}/balance", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account ID"), ("as_of" = Option<NaiveDate>, Query, description = "Inclusive cut-off date")),
    responses((status = 200, description = "Opening balance plus transactions"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Query(q): Query<BalanceQuery>,
) -> Result<Json<BalanceOutput>, JsonApiError> {
    let balance = account_service::account_balance(&state.db, user.user_id, id, q.as_of).await?;
    Ok(Json(BalanceOutput { account_id: id, as_of: q.as_of, balance }))
}

#[utoipa::path(get, path = "/api/reports/net-worth", tag = "reports",
    responses((status = 200, description = "Per-account balances, assets, liabilities and net worth")),
    security(("bearer_auth" = [])))]
pub async fn net_worth(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<NetWorthSummary>, JsonApiError> {
    Ok(Json(account_service::net_worth(&state.db, user.user_id).await?))
}

#[utoipa::path(get, path = "/api/reports/category-spend", tag = "reports",
    params(("fy" = i32, Query, description = "Financial year, e.g. 2025 for 2024-25")),
    responses((status = 200, description = "Outflows grouped by category"), (status = 400, description = "Unsupported year")),
    security(("bearer_auth" = [])))]
pub async fn category_spend(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<FyQuery>,
) -> Result<Json<Vec<CategorySpend>>, JsonApiError> {
    Ok(Json(account_service::category_spend(&state.db, user.user_id, q.fy).await?))
}
