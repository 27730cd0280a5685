use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use common::pagination::Pagination;
use models::account_transaction::{self, NewTransaction, TransactionSource};
use crate::{account_service, errors::ServiceError};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    pub txn_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    /// `Some("")` clears the category.
    pub category: Option<String>,
}

/// One row of a bulk import; `external_id` makes re-imports idempotent.
/// A row without one is counted as failed rather than rejecting the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportLine {
    #[serde(default)]
    pub external_id: Option<String>,
    pub txn_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    pub imported: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl ImportReport {
    pub fn merge(&mut self, other: ImportReport) {
        self.imported += other.imported;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

async fn find_by_external_id(
    db: &DatabaseConnection,
    account_id: Uuid,
    external_id: &str,
) -> Result<Option<account_transaction::Model>, ServiceError> {
    account_transaction::Entity::find()
        .filter(account_transaction::Column::AccountId.eq(account_id))
        .filter(account_transaction::Column::ExternalId.eq(external_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

/// Record a manual transaction against one of the user's accounts.
#[instrument(skip(db, input), fields(user_id = %user_id, account_id = %input.account_id))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    user_id: Uuid,
    input: NewTransaction,
) -> Result<account_transaction::Model, ServiceError> {
    account_service::get_account(db, user_id, input.account_id).await?;
    if let Some(ext) = input.external_id.as_deref().filter(|s| !s.trim().is_empty()) {
        if find_by_external_id(db, input.account_id, ext).await?.is_some() {
            return Err(ServiceError::Conflict(format!("transaction with external_id '{ext}' already exists")));
        }
    }
    let created = account_transaction::create(db, user_id, input, TransactionSource::Manual).await?;
    debug!(event = "transaction_created", txn_id = %created.id);
    Ok(created)
}

pub async fn get_transaction(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<account_transaction::Model, ServiceError> {
    account_transaction::Entity::find_by_id(id)
        .filter(account_transaction::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("transaction"))
}

/// Transactions of one account, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    user_id: Uuid,
    account_id: Uuid,
    filter: TransactionFilter,
    opts: Pagination,
) -> Result<Vec<account_transaction::Model>, ServiceError> {
    account_service::get_account(db, user_id, account_id).await?;
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(ServiceError::Validation("from must be on or before to".into()));
        }
    }
    let (page_idx, per_page) = opts.normalize();
    let mut q = account_transaction::Entity::find().filter(account_transaction::Column::AccountId.eq(account_id));
    if let Some(from) = filter.from {
        q = q.filter(account_transaction::Column::TxnDate.gte(from));
    }
    if let Some(to) = filter.to {
        q = q.filter(account_transaction::Column::TxnDate.lte(to));
    }
    let items = q
        .order_by_desc(account_transaction::Column::TxnDate)
        .order_by_desc(account_transaction::Column::CreatedAt)
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(items)
}

pub async fn update_transaction(
    db: &DatabaseConnection,
    user_id: Uuid,
    id: Uuid,
    patch: TransactionUpdate,
) -> Result<account_transaction::Model, ServiceError> {
    let mut am: account_transaction::ActiveModel = get_transaction(db, user_id, id).await?.into();
    if let Some(d) = patch.txn_date {
        am.txn_date = Set(d);
    }
    if let Some(desc) = patch.description {
        account_transaction::validate_description(&desc)?;
        am.description = Set(desc.trim().to_string());
    }
    if let Some(amount) = patch.amount {
        am.amount = Set(amount.round_dp(2));
    }
    if let Some(cat) = patch.category {
        am.category = Set(account_transaction::normalize_category(Some(&cat))?);
    }
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(updated)
}

pub async fn delete_transaction(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let txn = get_transaction(db, user_id, id).await?;
    txn.delete(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(())
}

/// Import rows into an account, skipping any whose `external_id` is already present.
/// A row that fails validation or insertion is counted and the import continues.
#[instrument(skip(db, lines), fields(user_id = %user_id, account_id = %account_id, lines = lines.len()))]
pub async fn import_transactions(
    db: &DatabaseConnection,
    user_id: Uuid,
    account_id: Uuid,
    lines: Vec<ImportLine>,
    source: TransactionSource,
) -> Result<ImportReport, ServiceError> {
    account_service::get_account(db, user_id, account_id).await?;
    let mut report = ImportReport::default();
    for line in lines {
        let ext = line.external_id.as_deref().map(str::trim).unwrap_or_default().to_string();
        if ext.is_empty() {
            report.failed += 1;
            warn!(event = "import_line_rejected", reason = "missing external_id");
            continue;
        }
        if find_by_external_id(db, account_id, &ext).await?.is_some() {
            report.skipped += 1;
            continue;
        }
        let input = NewTransaction {
            account_id,
            txn_date: line.txn_date,
            description: line.description,
            amount: line.amount,
            category: line.category,
            external_id: Some(ext.clone()),
        };
        match account_transaction::create(db, user_id, input, source).await {
            Ok(_) => report.imported += 1,
            Err(e) => {
                report.failed += 1;
                warn!(event = "import_line_failed", external_id = %ext, error = %e);
            }
        }
    }
    info!(event = "transactions_imported", imported = report.imported, skipped = report.skipped, failed = report.failed);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use models::account;
    use rust_decimal_macros::dec;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn report_merge() {
        let mut a = ImportReport { imported: 1, skipped: 2, failed: 0 };
        a.merge(ImportReport { imported: 3, skipped: 0, failed: 1 });
        assert_eq!(a, ImportReport { imported: 4, skipped: 2, failed: 1 });
    }

    #[test]
    fn batch_with_missing_external_id_still_parses() {
        let body = r#"[
            {"external_id": "b1", "txn_date": "2024-08-01", "description": "Rent", "amount": "-500.00"},
            {"txn_date": "2024-08-02", "description": "Cash", "amount": -20}
        ]"#;
        let lines: Vec<ImportLine> = serde_json::from_str(body).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].external_id.as_deref(), Some("b1"));
        assert!(lines[1].external_id.is_none());
    }

    #[tokio::test]
    async fn import_is_idempotent() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let user = Uuid::new_v4();
        let acc = account::create(&db, user, account::NewAccount {
            name: "Everyday".into(),
            account_type: "transaction".into(),
            institution: "NAB".into(),
            account_number: None,
            currency: None,
            opening_balance: None,
        }).await?;

        let lines = vec![
            ImportLine { external_id: Some("a1".into()), txn_date: d(8, 1), description: "Rent".into(), amount: dec!(-500), category: Some("housing".into()) },
            ImportLine { external_id: Some("a2".into()), txn_date: d(8, 2), description: "Pay".into(), amount: dec!(3000), category: None },
            ImportLine { external_id: Some(" ".into()), txn_date: d(8, 3), description: "Bad".into(), amount: dec!(1), category: None },
            ImportLine { external_id: None, txn_date: d(8, 4), description: "No id".into(), amount: dec!(2), category: None },
        ];
        let first = import_transactions(&db, user, acc.id, lines.clone(), TransactionSource::Xero).await?;
        assert_eq!(first, ImportReport { imported: 2, skipped: 0, failed: 2 });
        let second = import_transactions(&db, user, acc.id, lines, TransactionSource::Xero).await?;
        assert_eq!(second, ImportReport { imported: 0, skipped: 2, failed: 2 });

        let listed = list_transactions(&db, user, acc.id, TransactionFilter::default(), Pagination::default()).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].external_id.as_deref(), Some("a2"));
        assert_eq!(listed[0].source, "xero");

        let dup = create_transaction(&db, user, NewTransaction {
            account_id: acc.id,
            txn_date: d(8, 5),
            description: "dup".into(),
            amount: dec!(1),
            category: None,
            external_id: Some("a1".into()),
        }).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));

        let upd = update_transaction(&db, user, listed[1].id, TransactionUpdate { category: Some("".into()), ..Default::default() }).await?;
        assert_eq!(upd.category, None);
        delete_transaction(&db, user, upd.id).await?;
        assert!(get_transaction(&db, user, upd.id).await.is_err());
        account_service::delete_account(&db, user, acc.id).await?;
        Ok(())
    }
}
