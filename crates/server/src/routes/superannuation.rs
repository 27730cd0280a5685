use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use models::super_contribution;
use service::auth::AuthenticatedUser;
use service::super_service;
use service::tax::super_rules::ContributionSummary;

use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub fy: i32,
    pub member: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub fy: i32,
    pub member: Option<String>,
    /// Adjusted taxable income, enables the Division 293 check.
    pub income: Option<Decimal>,
    /// Enables the carry-forward and bring-forward caps.
    pub total_super_balance: Option<Decimal>,
}

#[utoipa::path(get, path = "/api/super/contributions", tag = "superannuation",
    params(("fy" = i32, Query,), ("member" = Option<String>, Query,)),
    responses((status = 200, description = "Contributions by date")),
    security(("bearer_auth" = [])))]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<super_contribution::Model>>, JsonApiError> {
    let rows = super_service::list_contributions(&state.db, user.user_id, q.fy, q.member.as_deref()).await?;
    Ok(Json(rows))
}

#[utoipa::path(post, path = "/api/super/contributions", tag = "superannuation",
    request_body = crate::openapi::ContributionDoc,
    responses((status = 201, description = "Recorded"), (status = 400, description = "Validation Error")),
    security(("bearer_auth" = [])))]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(input): Json<super_contribution::NewContribution>,
) -> Result<(StatusCode, Json<super_contribution::Model>), JsonApiError> {
    let created = super_service::record_contribution(&state.db, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(delete, path = "/api/super/contributions/{id}", tag = "superannuation",
    params(("id" = Uuid, Path, description = "Contribution ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    super_service::delete_contribution(&state.db, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/super/summary", tag = "superannuation",
    params(("fy" = i32, Query,), ("member" = Option<String>, Query,),
           ("income" = Option<String>, Query,), ("total_super_balance" = Option<String>, Query,)),
    responses((status = 200, description = "Cap usage per member")),
    security(("bearer_auth" = [])))]
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<ContributionSummary>, JsonApiError> {
    let s = super_service::contribution_summary(
        &state.db,
        user.user_id,
        q.fy,
        q.member.as_deref(),
        q.income,
        q.total_super_balance,
    )
    .await?;
    Ok(Json(s))
}
