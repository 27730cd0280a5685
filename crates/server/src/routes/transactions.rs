use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use models::account_transaction::{self, NewTransaction, TransactionSource};
use service::auth::AuthenticatedUser;
use service::transaction_service::{self, ImportLine, ImportReport, TransactionFilter, TransactionUpdate};

use super::paginate;
use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Body of a manual transaction; the account comes from the path.
#[derive(Debug, Deserialize)]
pub struct TransactionInput {
    pub txn_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[utoipa::path(get, path = "/api/accounts/{id}/transactions", tag = "transactions",
    params(("id" = Uuid, Path, description = "Account ID"),
           ("from" = Option<NaiveDate>, Query,), ("to" = Option<NaiveDate>, Query,),
           ("page" = Option<u32>, Query,), ("per_page" = Option<u32>, Query,)),
    responses((status = 200, description = "Newest first"), (status = 400, description = "from after to"), (status = 404, description = "Account not found")),
    security(("bearer_auth" = [])))]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(account_id): Path<Uuid>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<account_transaction::Model>>, JsonApiError> {
    let filter = TransactionFilter { from: q.from, to: q.to };
    let items = transaction_service::list_transactions(&state.db, user.user_id, account_id, filter, paginate(q.page, q.per_page)).await?;
    Ok(Json(items))
}

#[utoipa::path(post, path = "/api/accounts/{id}/transactions", tag = "transactions",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = crate::openapi::TransactionDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 409, description = "Duplicate external_id")),
    security(("bearer_auth" = [])))]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(account_id): Path<Uuid>,
    Json(input): Json<TransactionInput>,
) -> Result<(StatusCode, Json<account_transaction::Model>), JsonApiError> {
    let new = NewTransaction {
        account_id,
        txn_date: input.txn_date,
        description: input.description,
        amount: input.amount,
        category: input.category,
        external_id: input.external_id,
    };
    let created = transaction_service::create_transaction(&state.db, user.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(post, path = "/api/accounts/{id}/transactions/import", tag = "transactions",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = Vec<crate::openapi::ImportLineDoc>,
    responses((status = 200, description = "Imported / skipped / failed counts"), (status = 404, description = "Account not found")),
    security(("bearer_auth" = [])))]
pub async fn import(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(account_id): Path<Uuid>,
    Json(lines): Json<Vec<ImportLine>>,
) -> Result<Json<ImportReport>, JsonApiError> {
    let report = transaction_service::import_transactions(&state.db, user.user_id, account_id, lines, TransactionSource::Manual).await?;
    Ok(Json(report))
}

#[utoipa::path(get, path = "/api/transactions/{id}", tag = "transactions",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<account_transaction::Model>, JsonApiError> {
    Ok(Json(transaction_service::get_transaction(&state.db, user.user_id, id).await?))
}

#[utoipa::path(patch, path = "/api/transactions/{id}", tag = "transactions",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body = crate::openapi::TransactionUpdateDoc,
    responses((status = 200, description = "Updated"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TransactionUpdate>,
) -> Result<Json<account_transaction::Model>, JsonApiError> {
    Ok(Json(transaction_service::update_transaction(&state.db, user.user_id, id, patch).await?))
}

#[utoipa::path(delete, path = "/api/transactions/{id}", tag = "transactions",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    transaction_service::delete_transaction(&state.db, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
