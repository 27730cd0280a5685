use chrono::NaiveDate;
use rust_decimal::Decimal;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(ToSchema)]
pub struct ErrorDoc {
    pub status: u16,
    /// Machine readable code, e.g. `not_found` or `ai_not_configured`.
    pub error: String,
    pub message: Option<String>,
}

#[derive(ToSchema)]
pub struct NewAccountDoc {
    pub name: String,
    /// transaction | savings | credit_card | loan | mortgage | investment | super | other
    pub account_type: String,
    pub institution: Option<String>,
    pub account_number: Option<String>,
    /// ISO 4217, defaults to AUD.
    pub currency: Option<String>,
    pub opening_balance: Option<Decimal>,
}

#[derive(ToSchema)]
pub struct AccountUpdateDoc {
    pub name: Option<String>,
    pub account_type: Option<String>,
    pub institution: Option<String>,
    pub account_number: Option<String>,
    pub currency: Option<String>,
    pub opening_balance: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(ToSchema)]
pub struct TransactionDoc {
    pub txn_date: NaiveDate,
    pub description: String,
    /// Positive money in, negative money out.
    pub amount: Decimal,
    pub category: Option<String>,
    pub external_id: Option<String>,
}

#[derive(ToSchema)]
pub struct TransactionUpdateDoc {
    pub txn_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
}

#[derive(ToSchema)]
pub struct ImportLineDoc {
    /// Rows without one are counted as failed.
    pub external_id: Option<String>,
    pub txn_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub category: Option<String>,
}

#[derive(ToSchema)]
pub struct UploadDoc {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub financial_year: Option<i32>,
    /// Comma separated.
    pub tags: Option<String>,
}

#[derive(ToSchema)]
pub struct TrustIncomeDoc {
    pub financial_year: Option<i32>,
    pub source: String,
    /// interest | dividend | rent | capital_gain | other
    pub income_type: String,
    pub amount: Decimal,
    pub franking_credits: Option<Decimal>,
    pub received_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(ToSchema)]
pub struct BeneficiaryShareDoc {
    pub name: String,
    pub percentage: Decimal,
}

#[derive(ToSchema)]
pub struct PlanDoc {
    pub financial_year: i32,
    pub beneficiaries: Vec<BeneficiaryShareDoc>,
}

#[derive(ToSchema)]
pub struct ResolveDoc {
    pub financial_year: i32,
    pub resolution_date: NaiveDate,
}

#[derive(ToSchema)]
pub struct PayDoc {
    pub financial_year: i32,
}

#[derive(ToSchema)]
pub struct ContributionDoc {
    pub member_name: String,
    pub fund_name: String,
    /// concessional | non_concessional
    pub contribution_type: String,
    pub amount: Decimal,
    pub contribution_date: NaiveDate,
}

#[derive(ToSchema)]
pub struct MappingUpdateDoc {
    pub account_id: Option<Uuid>,
}

#[derive(ToSchema)]
pub struct TitleDoc {
    pub title: Option<String>,
}

#[derive(ToSchema)]
pub struct MessageDoc {
    pub content: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerAuth),
    paths(
        crate::routes::health,
        crate::routes::accounts::list,
        crate::routes::accounts::create,
        crate::routes::accounts::get,
        crate::routes::accounts::update,
        crate::routes::accounts::deactivate,
        crate::routes::accounts::delete,
        crate::routes::accounts::balance,
        crate::routes::accounts::net_worth,
        crate::routes::accounts::category_spend,
        crate::routes::transactions::list,
        crate::routes::transactions::create,
        crate::routes::transactions::import,
        crate::routes::transactions::get,
        crate::routes::transactions::update,
        crate::routes::transactions::delete,
        crate::routes::documents::upload,
        crate::routes::documents::list,
        crate::routes::documents::get,
        crate::routes::documents::download,
        crate::routes::documents::delete,
        crate::routes::documents::search,
        crate::routes::trust::list_income,
        crate::routes::trust::record_income,
        crate::routes::trust::delete_income,
        crate::routes::trust::summary,
        crate::routes::trust::plan,
        crate::routes::trust::list_distributions,
        crate::routes::trust::create_distributions,
        crate::routes::trust::delete_drafts,
        crate::routes::trust::resolve,
        crate::routes::trust::pay,
        crate::routes::superannuation::list,
        crate::routes::superannuation::create,
        crate::routes::superannuation::delete,
        crate::routes::superannuation::summary,
        crate::routes::tax::summary,
        crate::routes::tax::rates,
        crate::routes::xero::connect,
        crate::routes::xero::callback,
        crate::routes::xero::list_connections,
        crate::routes::xero::list_mappings,
        crate::routes::xero::sync,
        crate::routes::xero::disconnect,
        crate::routes::xero::update_mapping,
        crate::routes::ai::list,
        crate::routes::ai::create,
        crate::routes::ai::get,
        crate::routes::ai::rename,
        crate::routes::ai::delete,
        crate::routes::ai::send_message,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorDoc,
            NewAccountDoc,
            AccountUpdateDoc,
            TransactionDoc,
            TransactionUpdateDoc,
            ImportLineDoc,
            UploadDoc,
            TrustIncomeDoc,
            BeneficiaryShareDoc,
            PlanDoc,
            ResolveDoc,
            PayDoc,
            ContributionDoc,
            MappingUpdateDoc,
            TitleDoc,
            MessageDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "accounts"),
        (name = "reports"),
        (name = "transactions"),
        (name = "documents"),
        (name = "trust"),
        (name = "superannuation"),
        (name = "tax"),
        (name = "xero", description = "OAuth connection, account mapping and bank feed sync"),
        (name = "ai", description = "Finance assistant conversations")
    )
)]
pub struct ApiDoc;
