use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::tax::income_tax::{self, Bracket, TaxSummary};
use crate::tax::super_rules::{self, ContributionSummary, SuperRates};
use crate::{super_service, trust_service};

#[derive(Debug, Clone, Deserialize)]
pub struct TaxSummaryQuery {
    pub fy: i32,
    pub taxable_income: Option<Decimal>,
    pub ordinary_time_earnings: Option<Decimal>,
    pub total_super_balance: Option<Decimal>,
    /// Trust beneficiary whose distributed franking credits offset the tax.
    pub beneficiary: Option<String>,
    /// Limit the super summary to one member.
    pub member: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrustShare {
    pub beneficiary: String,
    pub amount: Decimal,
    pub franking_credits: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxOverview {
    pub financial_year: i32,
    pub label: String,
    pub income_tax: Option<TaxSummary>,
    pub super_guarantee: Option<Decimal>,
    pub contributions: ContributionSummary,
    pub trust: Option<TrustShare>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatesRow {
    pub financial_year: i32,
    pub label: String,
    #[serde(rename = "super")]
    pub super_rates: SuperRates,
    /// Missing for years before the income tax tables start.
    pub income_tax_brackets: Option<Vec<Bracket>>,
    pub medicare_levy_rate: Decimal,
}

pub fn rates(fy: i32) -> Result<RatesRow, ServiceError> {
    models::financial_year::validate_fy(fy)?;
    Ok(RatesRow {
        financial_year: fy,
        label: models::financial_year::fy_label(fy),
        super_rates: super_rules::rates_for(fy)?,
        income_tax_brackets: income_tax::brackets(fy).ok().map(<[Bracket]>::to_vec),
        medicare_levy_rate: income_tax::MEDICARE_LEVY_RATE,
    })
}

/// Sum a beneficiary's distributions for the year.
pub fn trust_share(rows: &[models::trust_distribution::Model], beneficiary: &str) -> TrustShare {
    let mut share = TrustShare { beneficiary: beneficiary.to_string(), amount: Decimal::ZERO, franking_credits: Decimal::ZERO };
    for r in rows.iter().filter(|r| r.beneficiary_name.eq_ignore_ascii_case(beneficiary.trim())) {
        share.amount += r.amount;
        share.franking_credits += r.franking_credits;
    }
    share
}

#[instrument(skip(db, q), fields(user_id = %user_id, fy = q.fy))]
pub async fn tax_summary(db: &DatabaseConnection, user_id: Uuid, q: TaxSummaryQuery) -> Result<TaxOverview, ServiceError> {
    models::financial_year::validate_fy(q.fy)?;

    let trust = match q.beneficiary.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        Some(b) => {
            let rows = trust_service::list_distributions(db, user_id, q.fy).await?;
            Some(trust_share(&rows, b))
        }
        None => None,
    };
    let franking = trust.as_ref().map(|t| t.franking_credits).unwrap_or_default();

    let income_tax = match q.taxable_income {
        Some(income) => Some(income_tax::tax_summary(q.fy, income, franking)?),
        None => None,
    };
    let super_guarantee = match q.ordinary_time_earnings {
        Some(ote) => Some(super_rules::super_guarantee(q.fy, ote)?),
        None => None,
    };
    let contributions = super_service::contribution_summary(
        db,
        user_id,
        q.fy,
        q.member.as_deref(),
        q.taxable_income,
        q.total_super_balance,
    )
    .await?;

    Ok(TaxOverview {
        financial_year: q.fy,
        label: models::financial_year::fy_label(q.fy),
        income_tax,
        super_guarantee,
        contributions,
        trust,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn rates_row_for_old_year_has_no_brackets() {
        let r = rates(2018).unwrap();
        assert_eq!(r.label, "2017-18");
        assert!(r.income_tax_brackets.is_none());
        assert_eq!(r.super_rates.concessional_cap, dec!(25000));
        assert_eq!(rates(2025).unwrap().income_tax_brackets.map(|b| b.len()), Some(5));
        assert!(rates(2010).is_err());
    }

    #[test]
    fn rates_rejects_out_of_range_year() {
        assert!(matches!(rates(i32::MIN), Err(ServiceError::Validation(_))));
        assert!(rates(i32::MAX).is_err());
    }

    #[test]
    fn trust_share_matches_beneficiary() {
        let now = Utc::now().into();
        let mk = |name: &str, amount: Decimal, credits: Decimal| models::trust_distribution::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            financial_year: 2025,
            beneficiary_name: name.into(),
            percentage: dec!(50),
            amount,
            franking_credits: credits,
            status: "draft".into(),
            resolution_date: None,
            created_at: now,
            updated_at: now,
        };
        let rows = vec![mk("Alex", dec!(500), dec!(150)), mk("Sam", dec!(500), dec!(150))];
        let s = trust_share(&rows, " alex ");
        assert_eq!(s.amount, dec!(500));
        assert_eq!(s.franking_credits, dec!(150));
    }
}
