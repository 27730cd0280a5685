use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::financial_year;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trust_income")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub financial_year: i32,
    pub source: String,
    pub income_type: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub franking_credits: Decimal,
    pub received_date: Date,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Interest,
    Dividend,
    Rent,
    CapitalGain,
    Other,
}

impl IncomeType {
    pub const ALL: [IncomeType; 5] = [
        IncomeType::Interest,
        IncomeType::Dividend,
        IncomeType::Rent,
        IncomeType::CapitalGain,
        IncomeType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeType::Interest => "interest",
            IncomeType::Dividend => "dividend",
            IncomeType::Rent => "rent",
            IncomeType::CapitalGain => "capital_gain",
            IncomeType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| ModelError::Validation(format!("invalid income_type '{s}'")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrustIncome {
    /// Derived from `received_date` when omitted.
    #[serde(default)]
    pub financial_year: Option<i32>,
    pub source: String,
    pub income_type: String,
    pub amount: Decimal,
    #[serde(default)]
    pub franking_credits: Decimal,
    pub received_date: Date,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Franking credits only attach to dividends and are never negative.
pub fn validate_franking(kind: IncomeType, credits: Decimal) -> Result<(), ModelError> {
    if credits.is_sign_negative() && !credits.is_zero() {
        return Err(ModelError::Validation("franking_credits must be >= 0".into()));
    }
    if !credits.is_zero() && kind != IncomeType::Dividend {
        return Err(ModelError::Validation("franking_credits only apply to dividend income".into()));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, user_id: Uuid, input: NewTrustIncome) -> Result<Model, ModelError> {
    if input.source.trim().is_empty() { return Err(ModelError::Validation("source required".into())); }
    let kind = IncomeType::parse(&input.income_type)?;
    validate_franking(kind, input.franking_credits)?;
    let fy = match input.financial_year {
        Some(fy) => {
            financial_year::validate_fy(fy)?;
            financial_year::validate_date_in_fy(input.received_date, fy)?;
            fy
        }
        None => financial_year::financial_year_of(input.received_date),
    };
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        financial_year: Set(fy),
        source: Set(input.source.trim().to_string()),
        income_type: Set(kind.as_str().to_string()),
        amount: Set(input.amount.round_dp(2)),
        franking_credits: Set(input.franking_credits.round_dp(2)),
        received_date: Set(input.received_date),
        notes: Set(input.notes.filter(|n| !n.trim().is_empty())),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn franking_only_on_dividends() {
        assert!(validate_franking(IncomeType::Dividend, dec!(300)).is_ok());
        assert!(validate_franking(IncomeType::Interest, dec!(0)).is_ok());
        assert!(validate_franking(IncomeType::Rent, dec!(10)).is_err());
        assert!(validate_franking(IncomeType::Dividend, dec!(-1)).is_err());
    }

    #[test]
    fn income_type_parse() {
        assert_eq!(IncomeType::parse("Capital_Gain").unwrap(), IncomeType::CapitalGain);
        assert!(IncomeType::parse("salary").is_err());
    }
}
