use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trust_distribution")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub financial_year: i32,
    pub beneficiary_name: String,
    #[sea_orm(column_type = "Decimal(Some((7, 4)))")]
    pub percentage: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub franking_credits: Decimal,
    pub status: String,
    pub resolution_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    Draft,
    Resolved,
    Paid,
}

impl DistributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionStatus::Draft => "draft",
            DistributionStatus::Resolved => "resolved",
            DistributionStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DistributionStatus::Draft),
            "resolved" => Ok(DistributionStatus::Resolved),
            "paid" => Ok(DistributionStatus::Paid),
            other => Err(ModelError::Validation(format!("invalid distribution status '{other}'"))),
        }
    }

    /// draft -> resolved -> paid, nothing else.
    pub fn can_transition_to(&self, next: DistributionStatus) -> bool {
        matches!(
            (self, next),
            (DistributionStatus::Draft, DistributionStatus::Resolved)
                | (DistributionStatus::Resolved, DistributionStatus::Paid)
        )
    }
}

/// Insert a draft distribution row; usable inside a transaction.
pub async fn create_draft<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    financial_year: i32,
    beneficiary_name: &str,
    percentage: Decimal,
    amount: Decimal,
    franking_credits: Decimal,
) -> Result<Model, ModelError> {
    if beneficiary_name.trim().is_empty() {
        return Err(ModelError::Validation("beneficiary_name required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        financial_year: Set(financial_year),
        beneficiary_name: Set(beneficiary_name.trim().to_string()),
        percentage: Set(percentage.round_dp(4)),
        amount: Set(amount.round_dp(2)),
        franking_credits: Set(franking_credits.round_dp(2)),
        status: Set(DistributionStatus::Draft.as_str().to_string()),
        resolution_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_forward_only() {
        use DistributionStatus::*;
        assert!(Draft.can_transition_to(Resolved));
        assert!(Resolved.can_transition_to(Paid));
        assert!(!Draft.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Draft));
        assert!(!Resolved.can_transition_to(Resolved));
    }

    #[test]
    fn status_parse() {
        assert_eq!(DistributionStatus::parse("PAID").unwrap(), DistributionStatus::Paid);
        assert!(DistributionStatus::parse("cancelled").is_err());
    }
}
