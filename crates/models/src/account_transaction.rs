use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::account;
use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_transaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub txn_date: Date,
    pub description: String,
    /// Negative values are outflows.
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    pub category: Option<String>,
    pub source: String,
    pub external_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Account }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Account => Entity::belongs_to(account::Entity)
                .from(Column::AccountId)
                .to(account::Column::Id)
                .into(),
        }
    }
}

impl Related<account::Entity> for Entity {
    fn to() -> RelationDef { Relation::Account.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    Manual,
    Xero,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::Manual => "manual",
            TransactionSource::Xero => "xero",
        }
    }
}

/// Input for recording a transaction against an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub txn_date: Date,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

pub fn validate_description(d: &str) -> Result<(), ModelError> {
    let t = d.trim();
    if t.is_empty() { return Err(ModelError::Validation("description required".into())); }
    if t.chars().count() > 512 { return Err(ModelError::Validation("description too long (<=512)".into())); }
    Ok(())
}

/// Lowercase and trim a category; blank becomes `None`.
pub fn normalize_category(c: Option<&str>) -> Result<Option<String>, ModelError> {
    match c.map(|v| v.trim().to_lowercase()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if v.chars().count() > 64 => Err(ModelError::Validation("category too long (<=64)".into())),
        Some(v) => Ok(Some(v)),
    }
}

pub async fn create(
    db: &DatabaseConnection,
    user_id: Uuid,
    input: NewTransaction,
    source: TransactionSource,
) -> Result<Model, ModelError> {
    validate_description(&input.description)?;
    let category = normalize_category(input.category.as_deref())?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        account_id: Set(input.account_id),
        txn_date: Set(input.txn_date),
        description: Set(input.description.trim().to_string()),
        amount: Set(input.amount.round_dp(2)),
        category: Set(category),
        source: Set(source.as_str().to_string()),
        external_id: Set(input.external_id.filter(|s| !s.trim().is_empty())),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_lowercased_and_blank_dropped() {
        assert_eq!(normalize_category(Some(" Groceries ")).unwrap().as_deref(), Some("groceries"));
        assert_eq!(normalize_category(Some("   ")).unwrap(), None);
        assert_eq!(normalize_category(None).unwrap(), None);
    }

    #[test]
    fn description_rules() {
        assert!(validate_description("Woolworths").is_ok());
        assert!(validate_description("  ").is_err());
        assert!(validate_description(&"x".repeat(513)).is_err());
    }
}
