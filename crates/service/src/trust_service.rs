//! Family trust income and distributions.
//!
//! Income is recorded per financial year; a distribution plan splits the
//! year's net income and franking credits between beneficiaries by
//! percentage. Persisted plans move draft -> resolved -> paid.

use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::trust_distribution::{self, DistributionStatus};
use models::{financial_year, trust_income};
use crate::errors::ServiceError;
use crate::tax::franking;

const PERCENT_TOLERANCE: Decimal = dec!(0.0001);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeneficiaryShare {
    pub name: String,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Allocation {
    pub beneficiary_name: String,
    pub percentage: Decimal,
    pub amount: Decimal,
    pub franking_credits: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DistributionPlan {
    pub financial_year: i32,
    pub net_income: Decimal,
    pub franking_credits: Decimal,
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrustIncomeSummary {
    pub financial_year: i32,
    pub by_type: BTreeMap<String, Decimal>,
    pub total_income: Decimal,
    pub total_franking_credits: Decimal,
    /// Cash income available to distribute.
    pub net_distributable: Decimal,
    pub distributed: Decimal,
    pub undistributed_tax: Decimal,
}

fn income_for_year(fy: i32, income: &[trust_income::Model]) -> impl Iterator<Item = &trust_income::Model> {
    income.iter().filter(move |r| r.financial_year == fy)
}

/// Totals by income type for `fy`; `distributed` feeds the trustee tax on the remainder.
pub fn summarize_income(fy: i32, income: &[trust_income::Model], distributed: Decimal) -> Result<TrustIncomeSummary, ServiceError> {
    let mut by_type: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut total = Decimal::ZERO;
    let mut credits = Decimal::ZERO;
    for r in income_for_year(fy, income) {
        *by_type.entry(r.income_type.clone()).or_default() += r.amount;
        total += r.amount;
        credits += r.franking_credits;
    }
    Ok(TrustIncomeSummary {
        financial_year: fy,
        by_type,
        total_income: total,
        total_franking_credits: credits,
        net_distributable: total,
        distributed,
        undistributed_tax: franking::undistributed_tax(fy, total, distributed)?,
    })
}

fn validate_beneficiaries(beneficiaries: &[BeneficiaryShare]) -> Result<(), ServiceError> {
    if beneficiaries.is_empty() {
        return Err(ServiceError::Validation("at least one beneficiary required".into()));
    }
    let mut seen = HashSet::new();
    let mut sum = Decimal::ZERO;
    for b in beneficiaries {
        let name = b.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("beneficiary name required".into()));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ServiceError::Validation(format!("duplicate beneficiary '{name}'")));
        }
        if b.percentage <= Decimal::ZERO {
            return Err(ServiceError::Validation(format!("percentage for '{name}' must be > 0")));
        }
        sum += b.percentage;
    }
    if (sum - dec!(100)).abs() > PERCENT_TOLERANCE {
        return Err(ServiceError::Validation(format!("percentages must sum to 100 (got {sum})")));
    }
    Ok(())
}

/// Split `total` by percentage; the last share absorbs rounding so the parts sum exactly.
fn split(total: Decimal, beneficiaries: &[BeneficiaryShare]) -> Vec<Decimal> {
    let mut out = Vec::with_capacity(beneficiaries.len());
    let mut allocated = Decimal::ZERO;
    for (i, b) in beneficiaries.iter().enumerate() {
        let part = if i + 1 == beneficiaries.len() {
            total - allocated
        } else {
            (total * b.percentage / dec!(100)).round_dp(2)
        };
        allocated += part;
        out.push(part);
    }
    out
}

/// Allocate the year's net income and franking credits pro rata.
pub fn plan_distribution(
    fy: i32,
    income: &[trust_income::Model],
    beneficiaries: &[BeneficiaryShare],
) -> Result<DistributionPlan, ServiceError> {
    financial_year::validate_fy(fy)?;
    validate_beneficiaries(beneficiaries)?;
    let (net_income, credits) = income_for_year(fy, income)
        .fold((Decimal::ZERO, Decimal::ZERO), |(a, c), r| (a + r.amount, c + r.franking_credits));
    let net_income = net_income.round_dp(2);
    let credits = credits.round_dp(2);

    let amounts = split(net_income, beneficiaries);
    let franking = split(credits, beneficiaries);
    let allocations = beneficiaries
        .iter()
        .zip(amounts.into_iter().zip(franking))
        .map(|(b, (amount, franking_credits))| Allocation {
            beneficiary_name: b.name.trim().to_string(),
            percentage: b.percentage,
            amount,
            franking_credits,
        })
        .collect();
    Ok(DistributionPlan { financial_year: fy, net_income, franking_credits: credits, allocations })
}

#[instrument(skip(db, input), fields(user_id = %user_id))]
pub async fn record_income(
    db: &DatabaseConnection,
    user_id: Uuid,
    input: trust_income::NewTrustIncome,
) -> Result<trust_income::Model, ServiceError> {
    let created = trust_income::create(db, user_id, input).await?;
    info!(event = "trust_income_recorded", income_id = %created.id, fy = created.financial_year);
    Ok(created)
}

pub async fn list_income(db: &DatabaseConnection, user_id: Uuid, fy: i32) -> Result<Vec<trust_income::Model>, ServiceError> {
    trust_income::Entity::find()
        .filter(trust_income::Column::UserId.eq(user_id))
        .filter(trust_income::Column::FinancialYear.eq(fy))
        .order_by_asc(trust_income::Column::ReceivedDate)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn delete_income(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let row = trust_income::Entity::find_by_id(id)
        .filter(trust_income::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("trust income"))?;
    row.delete(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(())
}

pub async fn list_distributions(db: &DatabaseConnection, user_id: Uuid, fy: i32) -> Result<Vec<trust_distribution::Model>, ServiceError> {
    trust_distribution::Entity::find()
        .filter(trust_distribution::Column::UserId.eq(user_id))
        .filter(trust_distribution::Column::FinancialYear.eq(fy))
        .order_by_asc(trust_distribution::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn income_summary(db: &DatabaseConnection, user_id: Uuid, fy: i32) -> Result<TrustIncomeSummary, ServiceError> {
    financial_year::validate_fy(fy)?;
    let income = list_income(db, user_id, fy).await?;
    let distributed: Decimal = list_distributions(db, user_id, fy).await?.iter().map(|d| d.amount).sum();
    summarize_income(fy, &income, distributed)
}

/// Compute a plan from the recorded income and store it as drafts, replacing earlier drafts.
/// Refused once any row for the year has been resolved.
#[instrument(skip(db, beneficiaries), fields(user_id = %user_id, fy = fy))]
pub async fn create_distributions(
    db: &DatabaseConnection,
    user_id: Uuid,
    fy: i32,
    beneficiaries: &[BeneficiaryShare],
) -> Result<Vec<trust_distribution::Model>, ServiceError> {
    let existing = list_distributions(db, user_id, fy).await?;
    if existing.iter().any(|d| d.status != DistributionStatus::Draft.as_str()) {
        return Err(ServiceError::Conflict(format!("distributions for FY{fy} are already resolved")));
    }
    let income = list_income(db, user_id, fy).await?;
    let plan = plan_distribution(fy, &income, beneficiaries)?;

    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    trust_distribution::Entity::delete_many()
        .filter(trust_distribution::Column::UserId.eq(user_id))
        .filter(trust_distribution::Column::FinancialYear.eq(fy))
        .filter(trust_distribution::Column::Status.eq(DistributionStatus::Draft.as_str()))
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let mut rows = Vec::with_capacity(plan.allocations.len());
    for a in &plan.allocations {
        let row = trust_distribution::create_draft(
            &txn,
            user_id,
            fy,
            &a.beneficiary_name,
            a.percentage,
            a.amount,
            a.franking_credits,
        )
        .await?;
        rows.push(row);
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(event = "trust_distribution_drafted", beneficiaries = rows.len(), net_income = %plan.net_income);
    Ok(rows)
}

/// Trustee resolution must be made by 30 June of the year.
pub fn validate_resolution_date(fy: i32, date: NaiveDate) -> Result<(), ServiceError> {
    financial_year::validate_fy(fy)?;
    let (_, end) = financial_year::fy_bounds(fy);
    if date > end {
        return Err(ServiceError::Validation(format!(
            "resolution date {date} is after the end of FY{fy} ({end})"
        )));
    }
    Ok(())
}

async fn transition_all(
    db: &DatabaseConnection,
    user_id: Uuid,
    fy: i32,
    from: DistributionStatus,
    to: DistributionStatus,
    resolution_date: Option<NaiveDate>,
) -> Result<Vec<trust_distribution::Model>, ServiceError> {
    let rows = list_distributions(db, user_id, fy).await?;
    if rows.is_empty() {
        return Err(ServiceError::not_found("distributions"));
    }
    if let Some(bad) = rows.iter().find(|r| r.status != from.as_str()) {
        return Err(ServiceError::Conflict(format!(
            "distribution for '{}' is {}, expected {}",
            bad.beneficiary_name, bad.status, from.as_str()
        )));
    }
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let mut am: trust_distribution::ActiveModel = r.into();
        am.status = Set(to.as_str().to_string());
        if let Some(d) = resolution_date {
            am.resolution_date = Set(Some(d));
        }
        am.updated_at = Set(Utc::now().into());
        out.push(am.update(&txn).await.map_err(|e| ServiceError::Db(e.to_string()))?);
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(out)
}

#[instrument(skip(db), fields(user_id = %user_id, fy = fy))]
pub async fn resolve_distributions(
    db: &DatabaseConnection,
    user_id: Uuid,
    fy: i32,
    resolution_date: NaiveDate,
) -> Result<Vec<trust_distribution::Model>, ServiceError> {
    validate_resolution_date(fy, resolution_date)?;
    let rows = transition_all(db, user_id, fy, DistributionStatus::Draft, DistributionStatus::Resolved, Some(resolution_date)).await?;
    info!(event = "trust_distribution_resolved", rows = rows.len());
    Ok(rows)
}

pub async fn mark_paid(db: &DatabaseConnection, user_id: Uuid, fy: i32) -> Result<Vec<trust_distribution::Model>, ServiceError> {
    transition_all(db, user_id, fy, DistributionStatus::Resolved, DistributionStatus::Paid, None).await
}

/// Remove draft rows for the year; returns how many were deleted.
pub async fn delete_drafts(db: &DatabaseConnection, user_id: Uuid, fy: i32) -> Result<u64, ServiceError> {
    let res = trust_distribution::Entity::delete_many()
        .filter(trust_distribution::Column::UserId.eq(user_id))
        .filter(trust_distribution::Column::FinancialYear.eq(fy))
        .filter(trust_distribution::Column::Status.eq(DistributionStatus::Draft.as_str()))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn income(fy: i32, kind: &str, amount: Decimal, credits: Decimal) -> trust_income::Model {
        trust_income::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            financial_year: fy,
            source: "src".into(),
            income_type: kind.into(),
            amount,
            franking_credits: credits,
            received_date: NaiveDate::from_ymd_opt(fy, 1, 15).unwrap(),
            notes: None,
            created_at: Utc::now().into(),
        }
    }

    fn share(name: &str, pct: Decimal) -> BeneficiaryShare {
        BeneficiaryShare { name: name.into(), percentage: pct }
    }

    #[test]
    fn thirds_sum_exactly() {
        let inc = vec![income(2025, "dividend", dec!(700), dec!(300)), income(2025, "interest", dec!(300), dec!(0))];
        let b = vec![share("A", dec!(33.3333)), share("B", dec!(33.3333)), share("C", dec!(33.3334))];
        let plan = plan_distribution(2025, &inc, &b).unwrap();
        assert_eq!(plan.net_income, dec!(1000));
        let amounts: Vec<Decimal> = plan.allocations.iter().map(|a| a.amount).collect();
        assert_eq!(amounts, vec![dec!(333.33), dec!(333.33), dec!(333.34)]);
        let credits: Decimal = plan.allocations.iter().map(|a| a.franking_credits).sum();
        assert_eq!(credits, dec!(300));
    }

    #[test]
    fn other_years_are_ignored_and_empty_income_is_zero() {
        let inc = vec![income(2024, "rent", dec!(999), dec!(0))];
        let plan = plan_distribution(2025, &inc, &[share("A", dec!(60)), share("B", dec!(40))]).unwrap();
        assert!(plan.allocations.iter().all(|a| a.amount.is_zero() && a.franking_credits.is_zero()));
    }

    #[test]
    fn invalid_percentages() {
        let inc = vec![income(2025, "rent", dec!(100), dec!(0))];
        assert!(plan_distribution(2025, &inc, &[share("A", dec!(50)), share("B", dec!(49))]).is_err());
        assert!(plan_distribution(2025, &inc, &[share("A", dec!(100)), share("B", dec!(0))]).is_err());
        assert!(plan_distribution(2025, &inc, &[share("A", dec!(50)), share("a", dec!(50))]).is_err());
        assert!(plan_distribution(2025, &inc, &[]).is_err());
        // within tolerance
        assert!(plan_distribution(2025, &inc, &[share("A", dec!(50.00005)), share("B", dec!(50))]).is_ok());
    }

    #[test]
    fn summary_and_trustee_tax() {
        let inc = vec![
            income(2025, "dividend", dec!(700), dec!(300)),
            income(2025, "dividend", dec!(1400), dec!(600)),
            income(2025, "capital_gain", dec!(900), dec!(0)),
        ];
        let s = summarize_income(2025, &inc, dec!(2000)).unwrap();
        assert_eq!(s.by_type.get("dividend"), Some(&dec!(2100)));
        assert_eq!(s.total_income, dec!(3000));
        assert_eq!(s.total_franking_credits, dec!(900));
        assert_eq!(s.undistributed_tax, dec!(470.00));
    }

    #[test]
    fn resolution_deadline() {
        assert!(validate_resolution_date(2025, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()).is_ok());
        assert!(validate_resolution_date(2025, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()).is_err());
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(matches!(validate_resolution_date(i32::MIN, date), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn draft_resolve_pay_lifecycle() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let user = Uuid::new_v4();
        record_income(&db, user, trust_income::NewTrustIncome {
            financial_year: Some(2025),
            source: "Shares".into(),
            income_type: "dividend".into(),
            amount: dec!(7000),
            franking_credits: dec!(3000),
            received_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            notes: None,
        }).await?;

        let beneficiaries = vec![share("Alex", dec!(50)), share("Sam", dec!(50))];
        create_distributions(&db, user, 2025, &beneficiaries).await?;
        // replacing drafts is allowed
        let rows = create_distributions(&db, user, 2025, &beneficiaries).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(list_distributions(&db, user, 2025).await?.len(), 2);

        assert!(mark_paid(&db, user, 2025).await.is_err());
        let resolved = resolve_distributions(&db, user, 2025, NaiveDate::from_ymd_opt(2025, 6, 28).unwrap()).await?;
        assert!(resolved.iter().all(|r| r.status == "resolved"));
        assert!(matches!(create_distributions(&db, user, 2025, &beneficiaries).await, Err(ServiceError::Conflict(_))));
        assert_eq!(delete_drafts(&db, user, 2025).await?, 0);

        let paid = mark_paid(&db, user, 2025).await?;
        assert!(paid.iter().all(|r| r.status == "paid"));

        let summary = income_summary(&db, user, 2025).await?;
        assert_eq!(summary.distributed, dec!(7000));
        assert_eq!(summary.undistributed_tax, dec!(0));
        Ok(())
    }
}
