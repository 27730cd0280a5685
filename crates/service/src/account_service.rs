use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{account, account_transaction, financial_year};
use crate::errors::ServiceError;

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub account_type: Option<String>,
    pub institution: Option<String>,
    /// `Some("")` clears the number.
    pub account_number: Option<String>,
    pub currency: Option<String>,
    pub opening_balance: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub name: String,
    pub account_type: String,
    pub institution: String,
    pub currency: String,
    pub balance: Decimal,
    pub is_liability: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetWorthSummary {
    pub accounts: Vec<AccountBalance>,
    pub assets: Decimal,
    /// Sum of liability balances as stored (normally negative).
    pub liabilities: Decimal,
    pub net_worth: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategorySpend {
    pub category: String,
    /// Positive magnitude of the outflows.
    pub total: Decimal,
    pub transactions: u64,
}

pub const UNCATEGORISED: &str = "uncategorised";

/// Create a new account for a user.
#[instrument(skip(db, input), fields(user_id = %user_id))]
pub async fn create_account(db: &DatabaseConnection, user_id: Uuid, input: account::NewAccount) -> Result<account::Model, ServiceError> {
    let created = account::create(db, user_id, input).await?;
    info!(event = "account_created", account_id = %created.id, account_type = %created.account_type);
    Ok(created)
}

/// Get an account owned by `user_id`.
pub async fn get_account(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<account::Model, ServiceError> {
    account::Entity::find_by_id(id)
        .filter(account::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("account"))
}

/// List accounts, optionally only active (or only inactive) ones.
pub async fn list_accounts(
    db: &DatabaseConnection,
    user_id: Uuid,
    active: Option<bool>,
    opts: Pagination,
) -> Result<Vec<account::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = account::Entity::find().filter(account::Column::UserId.eq(user_id));
    if let Some(a) = active {
        q = q.filter(account::Column::IsActive.eq(a));
    }
    let items = q
        .order_by_asc(account::Column::Name)
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(items)
}

#[instrument(skip(db, patch), fields(user_id = %user_id, account_id = %id))]
pub async fn update_account(
    db: &DatabaseConnection,
    user_id: Uuid,
    id: Uuid,
    patch: AccountUpdate,
) -> Result<account::Model, ServiceError> {
    let mut am: account::ActiveModel = get_account(db, user_id, id).await?.into();
    if let Some(name) = patch.name {
        account::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(t) = patch.account_type {
        am.account_type = Set(account::AccountType::parse(&t)?.as_str().to_string());
    }
    if let Some(inst) = patch.institution {
        am.institution = Set(inst.trim().to_string());
    }
    if let Some(n) = patch.account_number {
        am.account_number = Set(account::normalize_account_number(Some(&n))?);
    }
    if let Some(c) = patch.currency {
        am.currency = Set(account::validate_currency(&c)?);
    }
    if let Some(ob) = patch.opening_balance {
        am.opening_balance = Set(ob.round_dp(2));
    }
    if let Some(active) = patch.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(updated)
}

/// Hide an account from active lists without losing its history.
pub async fn deactivate_account(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<account::Model, ServiceError> {
    update_account(db, user_id, id, AccountUpdate { is_active: Some(false), ..Default::default() }).await
}

/// Delete an account and (by cascade) its transactions.
#[instrument(skip(db), fields(user_id = %user_id, account_id = %id))]
pub async fn delete_account(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let acc = get_account(db, user_id, id).await?;
    acc.delete(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(event = "account_deleted", account_id = %id);
    Ok(())
}

pub fn compute_balance<I: IntoIterator<Item = Decimal>>(opening: Decimal, amounts: I) -> Decimal {
    amounts.into_iter().fold(opening, |acc, a| acc + a)
}

/// Opening balance plus every transaction, or those on/before `as_of`.
pub async fn account_balance(
    db: &DatabaseConnection,
    user_id: Uuid,
    id: Uuid,
    as_of: Option<NaiveDate>,
) -> Result<Decimal, ServiceError> {
    let acc = get_account(db, user_id, id).await?;
    let mut q = account_transaction::Entity::find()
        .select_only()
        .column_as(account_transaction::Column::Amount.sum(), "total")
        .filter(account_transaction::Column::AccountId.eq(acc.id));
    if let Some(d) = as_of {
        q = q.filter(account_transaction::Column::TxnDate.lte(d));
    }
    let total: Option<Option<Decimal>> = q
        .into_tuple()
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(compute_balance(acc.opening_balance, total.flatten()))
}

/// Balances of all active accounts with assets and liabilities totalled separately.
pub fn summarize_net_worth(rows: &[(account::Model, Decimal)]) -> NetWorthSummary {
    let mut assets = Decimal::ZERO;
    let mut liabilities = Decimal::ZERO;
    let mut accounts = Vec::with_capacity(rows.len());
    for (acc, balance) in rows {
        let is_liability = acc.kind().map(|k| k.is_liability()).unwrap_or(false);
        if is_liability { liabilities += *balance } else { assets += *balance }
        accounts.push(AccountBalance {
            account_id: acc.id,
            name: acc.name.clone(),
            account_type: acc.account_type.clone(),
            institution: acc.institution.clone(),
            currency: acc.currency.clone(),
            balance: *balance,
            is_liability,
        });
    }
    NetWorthSummary { accounts, assets, liabilities, net_worth: assets + liabilities }
}

#[instrument(skip(db), fields(user_id = %user_id))]
pub async fn net_worth(db: &DatabaseConnection, user_id: Uuid) -> Result<NetWorthSummary, ServiceError> {
    let accounts = account::Entity::find()
        .filter(account::Column::UserId.eq(user_id))
        .filter(account::Column::IsActive.eq(true))
        .order_by_asc(account::Column::Name)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    let sums: Vec<(Uuid, Option<Decimal>)> = account_transaction::Entity::find()
        .select_only()
        .column(account_transaction::Column::AccountId)
        .column_as(account_transaction::Column::Amount.sum(), "total")
        .filter(account_transaction::Column::UserId.eq(user_id))
        .group_by(account_transaction::Column::AccountId)
        .into_tuple()
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let sums: HashMap<Uuid, Decimal> = sums.into_iter().map(|(id, s)| (id, s.unwrap_or_default())).collect();

    let rows: Vec<(account::Model, Decimal)> = accounts
        .into_iter()
        .map(|a| {
            let bal = compute_balance(a.opening_balance, sums.get(&a.id).copied());
            (a, bal)
        })
        .collect();
    Ok(summarize_net_worth(&rows))
}

/// Group outflows by category, largest first.
pub fn aggregate_category_spend(rows: &[(Option<String>, Decimal)]) -> Vec<CategorySpend> {
    let mut by_cat: BTreeMap<String, (Decimal, u64)> = BTreeMap::new();
    for (cat, amount) in rows {
        if *amount >= Decimal::ZERO { continue; }
        let key = cat.clone().filter(|c| !c.is_empty()).unwrap_or_else(|| UNCATEGORISED.to_string());
        let e = by_cat.entry(key).or_default();
        e.0 += -*amount;
        e.1 += 1;
    }
    let mut out: Vec<CategorySpend> = by_cat
        .into_iter()
        .map(|(category, (total, transactions))| CategorySpend { category, total, transactions })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    out
}

pub async fn category_spend(db: &DatabaseConnection, user_id: Uuid, fy: i32) -> Result<Vec<CategorySpend>, ServiceError> {
    financial_year::validate_fy(fy)?;
    let (start, end) = financial_year::fy_bounds(fy);
    let rows: Vec<(Option<String>, Decimal)> = account_transaction::Entity::find()
        .select_only()
        .column(account_transaction::Column::Category)
        .column(account_transaction::Column::Amount)
        .filter(account_transaction::Column::UserId.eq(user_id))
        .filter(account_transaction::Column::TxnDate.between(start, end))
        .filter(account_transaction::Column::Amount.lt(Decimal::ZERO))
        .into_tuple()
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(aggregate_category_spend(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use rust_decimal_macros::dec;

    fn acc(name: &str, kind: &str) -> account::Model {
        let now = Utc::now().into();
        account::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.into(),
            account_type: kind.into(),
            institution: "Bank".into(),
            account_number: None,
            currency: "AUD".into(),
            opening_balance: Decimal::ZERO,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn balance_is_opening_plus_amounts() {
        assert_eq!(compute_balance(dec!(100), vec![dec!(-20.5), dec!(10)]), dec!(89.5));
        assert_eq!(compute_balance(dec!(5), None::<Decimal>), dec!(5));
    }

    #[test]
    fn net_worth_separates_liabilities() {
        let rows = vec![
            (acc("Everyday", "transaction"), dec!(2500)),
            (acc("Offset", "offset"), dec!(40000)),
            (acc("Visa", "credit_card"), dec!(-1200)),
            (acc("Home loan", "loan"), dec!(-350000)),
        ];
        let s = summarize_net_worth(&rows);
        assert_eq!(s.assets, dec!(42500));
        assert_eq!(s.liabilities, dec!(-351200));
        assert_eq!(s.net_worth, dec!(-308700));
        assert!(s.accounts[2].is_liability);
    }

    #[test]
    fn category_spend_groups_outflows() {
        let rows = vec![
            (Some("groceries".to_string()), dec!(-50)),
            (Some("groceries".to_string()), dec!(-25.5)),
            (None, dec!(-10)),
            (Some("salary".to_string()), dec!(5000)),
            (Some("fuel".to_string()), dec!(-80)),
        ];
        let out = aggregate_category_spend(&rows);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].category, "fuel");
        assert_eq!(out[1].total, dec!(75.5));
        assert_eq!(out[1].transactions, 2);
        assert_eq!(out[2].category, UNCATEGORISED);
    }

    #[tokio::test]
    async fn account_crud_and_balance() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let user = Uuid::new_v4();
        let a = create_account(&db, user, account::NewAccount {
            name: "Savings".into(),
            account_type: "savings".into(),
            institution: "ING".into(),
            account_number: None,
            currency: None,
            opening_balance: Some(dec!(1000)),
        }).await?;

        // other users cannot see it
        assert!(matches!(get_account(&db, Uuid::new_v4(), a.id).await, Err(ServiceError::NotFound(_))));

        account_transaction::create(&db, user, account_transaction::NewTransaction {
            account_id: a.id,
            txn_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            description: "Interest".into(),
            amount: dec!(12.34),
            category: None,
            external_id: None,
        }, account_transaction::TransactionSource::Manual).await?;
        assert_eq!(account_balance(&db, user, a.id, None).await?, dec!(1012.34));
        assert_eq!(account_balance(&db, user, a.id, NaiveDate::from_ymd_opt(2024, 8, 1)).await?, dec!(1000));

        let updated = update_account(&db, user, a.id, AccountUpdate { name: Some("Rainy day".into()), ..Default::default() }).await?;
        assert_eq!(updated.name, "Rainy day");

        let nw = net_worth(&db, user).await?;
        assert_eq!(nw.net_worth, dec!(1012.34));

        let off = deactivate_account(&db, user, a.id).await?;
        assert!(!off.is_active);
        assert!(list_accounts(&db, user, Some(true), Pagination::default()).await?.is_empty());

        delete_account(&db, user, a.id).await?;
        assert!(get_account(&db, user, a.id).await.is_err());
        Ok(())
    }
}
