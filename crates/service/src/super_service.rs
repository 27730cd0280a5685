use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use tracing::{info, instrument};
use uuid::Uuid;

use models::super_contribution::{self, ContributionType};
use crate::errors::ServiceError;
use crate::tax::super_rules::{self, ContributionLine, ContributionSummary, CARRY_FORWARD_EARLIEST_ACCRUAL_FY};

#[instrument(skip(db, input), fields(user_id = %user_id))]
pub async fn record_contribution(
    db: &DatabaseConnection,
    user_id: Uuid,
    input: super_contribution::NewContribution,
) -> Result<super_contribution::Model, ServiceError> {
    let created = super_contribution::create(db, user_id, input).await?;
    info!(event = "super_contribution_recorded", contribution_id = %created.id, fy = created.financial_year);
    Ok(created)
}

/// Contributions for a year, optionally for one member (case-insensitive).
pub async fn list_contributions(
    db: &DatabaseConnection,
    user_id: Uuid,
    fy: i32,
    member: Option<&str>,
) -> Result<Vec<super_contribution::Model>, ServiceError> {
    let rows = super_contribution::Entity::find()
        .filter(super_contribution::Column::UserId.eq(user_id))
        .filter(super_contribution::Column::FinancialYear.eq(fy))
        .order_by_asc(super_contribution::Column::ContributionDate)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(filter_member(rows, member))
}

fn filter_member(rows: Vec<super_contribution::Model>, member: Option<&str>) -> Vec<super_contribution::Model> {
    match member.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => rows.into_iter().filter(|r| r.member_name.eq_ignore_ascii_case(m)).collect(),
        None => rows,
    }
}

pub async fn delete_contribution(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let row = super_contribution::Entity::find_by_id(id)
        .filter(super_contribution::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("super contribution"))?;
    row.delete(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(())
}

pub fn to_lines(rows: &[super_contribution::Model]) -> Result<Vec<ContributionLine>, ServiceError> {
    rows.iter()
        .map(|r| {
            Ok(ContributionLine {
                member_name: r.member_name.clone(),
                kind: ContributionType::parse(&r.contribution_type)?,
                amount: r.amount,
            })
        })
        .collect()
}

/// Concessional totals per financial year for one member, oldest first.
pub fn concessional_history(rows: &[super_contribution::Model], member: &str) -> BTreeMap<i32, Decimal> {
    let mut out = BTreeMap::new();
    for r in rows.iter().filter(|r| r.member_name.eq_ignore_ascii_case(member)) {
        if r.contribution_type == ContributionType::Concessional.as_str() {
            *out.entry(r.financial_year).or_default() += r.amount;
        }
    }
    out
}

/// Contribution summary for a year. With a total super balance, each member's
/// carry-forward cap is computed from their recorded history.
#[instrument(skip(db), fields(user_id = %user_id, fy = fy))]
pub async fn contribution_summary(
    db: &DatabaseConnection,
    user_id: Uuid,
    fy: i32,
    member: Option<&str>,
    income: Option<Decimal>,
    total_super_balance: Option<Decimal>,
) -> Result<ContributionSummary, ServiceError> {
    let rows = list_contributions(db, user_id, fy, member).await?;
    let mut summary = super_rules::contribution_summary(fy, &to_lines(&rows)?, income, total_super_balance)?;

    if let Some(tsb) = total_super_balance {
        if fy > CARRY_FORWARD_EARLIEST_ACCRUAL_FY {
            let history_rows = super_contribution::Entity::find()
                .filter(super_contribution::Column::UserId.eq(user_id))
                .filter(super_contribution::Column::FinancialYear.gte(CARRY_FORWARD_EARLIEST_ACCRUAL_FY))
                .filter(super_contribution::Column::FinancialYear.lt(fy))
                .all(db)
                .await
                .map_err(|e| ServiceError::Db(e.to_string()))?;
            for m in summary.members.iter_mut() {
                let history = concessional_history(&history_rows, &m.member_name);
                m.carry_forward_cap = Some(super_rules::carry_forward_available(fy, &history, tsb)?);
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn row(member: &str, fy: i32, kind: &str, amount: Decimal) -> super_contribution::Model {
        super_contribution::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            financial_year: fy,
            member_name: member.into(),
            fund_name: "Fund".into(),
            contribution_type: kind.into(),
            amount,
            contribution_date: NaiveDate::from_ymd_opt(fy, 1, 1).unwrap(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn history_only_counts_concessional_for_member() {
        let rows = vec![
            row("Alex", 2021, "concessional", dec!(10000)),
            row("alex", 2021, "concessional", dec!(2000)),
            row("Alex", 2021, "non_concessional", dec!(50000)),
            row("Sam", 2021, "concessional", dec!(9999)),
            row("Alex", 2022, "concessional", dec!(1)),
        ];
        let h = concessional_history(&rows, "Alex");
        assert_eq!(h.get(&2021), Some(&dec!(12000)));
        assert_eq!(h.get(&2022), Some(&dec!(1)));
    }

    #[test]
    fn member_filter_is_case_insensitive() {
        let rows = vec![row("Alex", 2025, "concessional", dec!(1)), row("Sam", 2025, "concessional", dec!(1))];
        assert_eq!(filter_member(rows.clone(), Some("ALEX")).len(), 1);
        assert_eq!(filter_member(rows, Some(" ")).len(), 2);
    }

    #[tokio::test]
    async fn summary_with_carry_forward() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let user = Uuid::new_v4();
        for (date, amount) in [
            (NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(), dec!(10000)),  // FY2023
            (NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(), dec!(20000)), // FY2025
        ] {
            record_contribution(&db, user, super_contribution::NewContribution {
                member_name: "Alex".into(),
                fund_name: "Hostplus".into(),
                contribution_type: "concessional".into(),
                amount,
                contribution_date: date,
            }).await?;
        }
        let s = contribution_summary(&db, user, 2025, Some("Alex"), Some(dec!(120000)), Some(dec!(200000))).await?;
        assert_eq!(s.members.len(), 1);
        let m = &s.members[0];
        assert_eq!(m.concessional, dec!(20000));
        assert_eq!(m.concessional_headroom, dec!(10000));
        // unused: FY2020 25k, FY2021 25k, FY2022 27.5k, FY2023 17.5k, FY2024 27.5k
        assert_eq!(m.carry_forward_cap, Some(dec!(30000) + dec!(122500)));
        Ok(())
    }
}
