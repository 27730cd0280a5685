use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use service::auth::AuthenticatedUser;
use service::tax_service::{self, RatesRow, TaxOverview, TaxSummaryQuery};

use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    pub fy: i32,
}

#[utoipa::path(get, path = "/api/tax/summary", tag = "tax",
    params(("fy" = i32, Query,), ("taxable_income" = Option<String>, Query,),
           ("ordinary_time_earnings" = Option<String>, Query,), ("total_super_balance" = Option<String>, Query,),
           ("beneficiary" = Option<String>, Query,), ("member" = Option<String>, Query,)),
    responses((status = 200, description = "Income tax, super guarantee, contribution caps and trust share")),
    security(("bearer_auth" = [])))]
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<TaxSummaryQuery>,
) -> Result<Json<TaxOverview>, JsonApiError> {
    Ok(Json(tax_service::tax_summary(&state.db, user.user_id, q).await?))
}

#[utoipa::path(get, path = "/api/tax/rates", tag = "tax",
    params(("fy" = i32, Query,)),
    responses((status = 200, description = "Rates and caps for the year"), (status = 400, description = "Year not covered")),
    security(("bearer_auth" = [])))]
pub async fn rates(Query(q): Query<RatesQuery>) -> Result<Json<RatesRow>, JsonApiError> {
    Ok(Json(tax_service::rates(q.fy)?))
}
