use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::{trust_distribution, trust_income};
use service::auth::AuthenticatedUser;
use service::trust_service::{self, BeneficiaryShare, DistributionPlan, TrustIncomeSummary};

use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct FyQuery {
    pub fy: i32,
}

#[derive(Debug, Deserialize)]
pub struct PlanInput {
    pub financial_year: i32,
    pub beneficiaries: Vec<BeneficiaryShare>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveInput {
    pub financial_year: i32,
    pub resolution_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct PayInput {
    pub financial_year: i32,
}

#[derive(Debug, Serialize)]
pub struct DeletedOutput {
    pub deleted: u64,
}

#[utoipa::path(get, path = "/api/trust/income", tag = "trust",
    params(("fy" = i32, Query, description = "Financial year, e.g. 2025 for 2024-25")),
    responses((status = 200, description = "Income for the year")),
    security(("bearer_auth" = [])))]
pub async fn list_income(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<FyQuery>,
) -> Result<Json<Vec<trust_income::Model>>, JsonApiError> {
    Ok(Json(trust_service::list_income(&state.db, user.user_id, q.fy).await?))
}

#[utoipa::path(post, path = "/api/trust/income", tag = "trust",
    request_body = crate::openapi::TrustIncomeDoc,
    responses((status = 201, description = "Recorded"), (status = 400, description = "Validation Error")),
    security(("bearer_auth" = [])))]
pub async fn record_income(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<trust_income::NewTrustIncome>,
) -> Result<(StatusCode, Json<trust_income::Model>), JsonApiError> {
    let created = trust_service::record_income(&state.db, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(delete, path = "/api/trust/income/{id}", tag = "trust",
    params(("id" = Uuid, Path, description = "Income ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn delete_income(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    trust_service::delete_income(&state.db, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/trust/summary", tag = "trust",
    params(("fy" = i32, Query,)),
    responses((status = 200, description = "Income by type, franking credits and undistributed balance")),
    security(("bearer_auth" = [])))]
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<FyQuery>,
) -> Result<Json<TrustIncomeSummary>, JsonApiError> {
    Ok(Json(trust_service::income_summary(&state.db, user.user_id, q.fy).await?))
}

/// Preview an allocation without storing it.
#[utoipa::path(post, path = "/api/trust/distributions/plan", tag = "trust",
    request_body = crate::openapi::PlanDoc,
    responses((status = 200, description = "Pro-rata allocation"), (status = 400, description = "Percentages must total 100")),
    security(("bearer_auth" = [])))]
pub async fn plan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<PlanInput>,
) -> Result<Json<DistributionPlan>, JsonApiError> {
    let income = trust_service::list_income(&state.db, user.user_id, input.financial_year).await?;
    let plan = trust_service::plan_distribution(input.financial_year, &income, &input.beneficiaries)?;
    Ok(Json(plan))
}

#[utoipa::path(get, path = "/api/trust/distributions", tag = "trust",
    params(("fy" = i32, Query,)),
    responses((status = 200, description = "Distribution rows for the year")),
    security(("bearer_auth" = [])))]
pub async fn list_distributions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<FyQuery>,
) -> Result<Json<Vec<trust_distribution::Model>>, JsonApiError> {
    Ok(Json(trust_service::list_distributions(&state.db, user.user_id, q.fy).await?))
}

#[utoipa::path(post, path = "/api/trust/distributions", tag = "trust",
    request_body = crate::openapi::PlanDoc,
    responses((status = 201, description = "Drafts stored"), (status = 409, description = "Year already resolved")),
    security(("bearer_auth" = [])))]
pub async fn create_distributions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<PlanInput>,
) -> Result<(StatusCode, Json<Vec<trust_distribution::Model>>), JsonApiError> {
    let rows = trust_service::create_distributions(&state.db, user.user_id, input.financial_year, &input.beneficiaries).await?;
    Ok((StatusCode::CREATED, Json(rows)))
}

#[utoipa::path(delete, path = "/api/trust/distributions", tag = "trust",
    params(("fy" = i32, Query,)),
    responses((status = 200, description = "Number of drafts removed")),
    security(("bearer_auth" = [])))]
pub async fn delete_drafts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<FyQuery>,
) -> Result<Json<DeletedOutput>, JsonApiError> {
    let deleted = trust_service::delete_drafts(&state.db, user.user_id, q.fy).await?;
    Ok(Json(DeletedOutput { deleted }))
}

#[utoipa::path(post, path = "/api/trust/distributions/resolve", tag = "trust",
    request_body = crate::openapi::ResolveDoc,
    responses((status = 200, description = "Drafts resolved"), (status = 400, description = "Resolution date after 30 June"), (status = 409, description = "Nothing to resolve")),
    security(("bearer_auth" = [])))]
pub async fn resolve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<ResolveInput>,
) -> Result<Json<Vec<trust_distribution::Model>>, JsonApiError> {
    let rows = trust_service::resolve_distributions(&state.db, user.user_id, input.financial_year, input.resolution_date).await?;
    Ok(Json(rows))
}

#[utoipa::path(post, path = "/api/trust/distributions/pay", tag = "trust",
    request_body = crate::openapi::PayDoc,
    responses((status = 200, description = "Resolved rows marked paid"), (status = 409, description = "Nothing resolved")),
    security(("bearer_auth" = [])))]
pub async fn pay(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<PayInput>,
) -> Result<Json<Vec<trust_distribution::Model>>, JsonApiError> {
    Ok(Json(trust_service::mark_paid(&state.db, user.user_id, input.financial_year).await?))
}
