use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub account_type: String,
    pub institution: String,
    pub account_number: Option<String>,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub opening_balance: Decimal,
    pub is_active: bool,
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
pub enum AccountType {
    Transaction,
    Savings,
    CreditCard,
    Loan,
    Investment,
    Super,
    Offset,
}

impl AccountType {
    pub const ALL: [AccountType; 7] = [
        AccountType::Transaction,
        AccountType::Savings,
        AccountType::CreditCard,
        AccountType::Loan,
        AccountType::Investment,
        AccountType::Super,
        AccountType::Offset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Transaction => "transaction",
            AccountType::Savings => "savings",
            AccountType::CreditCard => "credit_card",
            AccountType::Loan => "loan",
            AccountType::Investment => "investment",
            AccountType::Super => "super",
            AccountType::Offset => "offset",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| ModelError::Validation(format!("invalid account_type '{s}'")))
    }

    /// Balances of these accounts are owed rather than owned.
    pub fn is_liability(&self) -> bool {
        matches!(self, AccountType::CreditCard | AccountType::Loan)
    }
}

impl Model {
    pub fn kind(&self) -> Option<AccountType> {
        AccountType::parse(&self.account_type).ok()
    }
}

/// Input for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub account_type: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub opening_balance: Option<Decimal>,
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    let n = name.trim();
    if n.is_empty() { return Err(ModelError::Validation("name required".into())); }
    if n.chars().count() > 128 { return Err(ModelError::Validation("name too long (<=128)".into())); }
    Ok(())
}

pub fn validate_currency(c: &str) -> Result<String, ModelError> {
    let up = c.trim().to_ascii_uppercase();
    if up.len() != 3 || !up.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ModelError::Validation("currency must be a 3-letter ISO code".into()));
    }
    Ok(up)
}

/// Trim the account number; blank becomes `None`.
pub fn normalize_account_number(n: Option<&str>) -> Result<Option<String>, ModelError> {
    match n.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.len() > 64 => Err(ModelError::Validation("account_number too long (<=64)".into())),
        Some(v) => Ok(Some(v.to_string())),
    }
}

pub async fn create(db: &DatabaseConnection, user_id: Uuid, input: NewAccount) -> Result<Model, ModelError> {
    validate_name(&input.name)?;
    let kind = AccountType::parse(&input.account_type)?;
    let currency = validate_currency(input.currency.as_deref().unwrap_or("AUD"))?;
    let account_number = normalize_account_number(input.account_number.as_deref())?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(input.name.trim().to_string()),
        account_type: Set(kind.as_str().to_string()),
        institution: Set(input.institution.trim().to_string()),
        account_number: Set(account_number),
        currency: Set(currency),
        opening_balance: Set(input.opening_balance.unwrap_or_default().round_dp(2)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
