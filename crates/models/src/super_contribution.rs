use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::financial_year;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "super_contribution")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub financial_year: i32,
    pub member_name: String,
    pub fund_name: String,
    pub contribution_type: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    pub contribution_date: Date,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    /// Employer SG, salary sacrifice, personal deductible.
    Concessional,
    /// After-tax contributions.
    NonConcessional,
}

impl ContributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Concessional => "concessional",
            ContributionType::NonConcessional => "non_concessional",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "concessional" => Ok(ContributionType::Concessional),
            "non_concessional" => Ok(ContributionType::NonConcessional),
            other => Err(ModelError::Validation(format!("invalid contribution_type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContribution {
    pub member_name: String,
    pub fund_name: String,
    pub contribution_type: String,
    pub amount: Decimal,
    pub contribution_date: Date,
}

pub async fn create(db: &DatabaseConnection, user_id: Uuid, input: NewContribution) -> Result<Model, ModelError> {
    if input.member_name.trim().is_empty() { return Err(ModelError::Validation("member_name required".into())); }
    if input.fund_name.trim().is_empty() { return Err(ModelError::Validation("fund_name required".into())); }
    let kind = ContributionType::parse(&input.contribution_type)?;
    if input.amount <= Decimal::ZERO {
        return Err(ModelError::Validation("amount must be > 0".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        financial_year: Set(financial_year::financial_year_of(input.contribution_date)),
        member_name: Set(input.member_name.trim().to_string()),
        fund_name: Set(input.fund_name.trim().to_string()),
        contribution_type: Set(kind.as_str().to_string()),
        amount: Set(input.amount.round_dp(2)),
        contribution_date: Set(input.contribution_date),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contribution_type_accepts_hyphen() {
        assert_eq!(ContributionType::parse("non-concessional").unwrap(), ContributionType::NonConcessional);
        assert_eq!(ContributionType::parse("Concessional").unwrap(), ContributionType::Concessional);
        assert!(ContributionType::parse("downsizer").is_err());
    }
}
