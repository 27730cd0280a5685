use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::metrics::XERO_SYNC_TRANSACTIONS;
use models::account_transaction::TransactionSource;
use models::xero_connection as connection;

use crate::errors::ServiceError;
use crate::transaction_service::{self, ImportLine, ImportReport};
use super::client::XeroApi;
use super::connection_service;
use super::domain::XeroBankTransaction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub imported: u32,
    pub skipped: u32,
    pub failed: u32,
    /// Mapped accounts processed.
    pub accounts: u32,
    /// Mapped accounts whose fetch or import failed.
    pub failed_accounts: u32,
}

impl SyncReport {
    fn add(&mut self, r: ImportReport) {
        self.imported += r.imported;
        self.skipped += r.skipped;
        self.failed += r.failed;
    }
}

/// Convert remote transactions into import lines. Deleted rows count as
/// skipped, rows without a known direction or date as failed.
pub fn to_import_lines(txns: Vec<XeroBankTransaction>) -> (Vec<ImportLine>, ImportReport) {
    let mut pre = ImportReport::default();
    let mut lines = Vec::with_capacity(txns.len());
    for t in txns {
        if t.is_deleted() {
            pre.skipped += 1;
            continue;
        }
        let (Some(amount), Some(txn_date)) = (t.signed_amount(), t.txn_date()) else {
            pre.failed += 1;
            continue;
        };
        lines.push(ImportLine {
            description: t.description(),
            external_id: Some(t.bank_transaction_id),
            txn_date,
            amount,
            category: None,
        });
    }
    (lines, pre)
}

/// Pull bank transactions for every mapped account of a connection.
#[instrument(skip(db, api), fields(user_id = %user_id, connection_id = %connection_id))]
pub async fn sync_connection(
    db: &DatabaseConnection,
    api: &dyn XeroApi,
    user_id: Uuid,
    connection_id: Uuid,
) -> Result<SyncReport, ServiceError> {
    let conn = connection_service::get_connection(db, user_id, connection_id).await?;
    if !conn.is_active() {
        return Err(ServiceError::Conflict(format!("xero connection is {}", conn.status)));
    }
    let conn = connection_service::ensure_fresh_token(db, api, conn).await?;
    let mappings = connection_service::list_mappings(db, user_id, connection_id).await?;

    let mut report = SyncReport::default();
    for m in mappings {
        let Some(account_id) = m.account_id else { continue };
        report.accounts += 1;
        let txns = match api.bank_transactions(&conn.access_token, &conn.xero_tenant_id, &m.xero_account_id).await {
            Ok(t) => t,
            Err(e) => {
                report.failed_accounts += 1;
                warn!(event = "xero_sync_fetch_failed", xero_account_id = %m.xero_account_id, error = %e);
                continue;
            }
        };
        let (lines, pre) = to_import_lines(txns);
        report.add(pre);
        match transaction_service::import_transactions(db, user_id, account_id, lines, TransactionSource::Xero).await {
            Ok(r) => report.add(r),
            Err(e) => {
                report.failed_accounts += 1;
                warn!(event = "xero_sync_import_failed", account_id = %account_id, error = %e);
            }
        }
    }

    let mut am: connection::ActiveModel = conn.into();
    am.last_synced_at = Set(Some(Utc::now().into()));
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    XERO_SYNC_TRANSACTIONS.with_label_values(&["imported"]).inc_by(u64::from(report.imported));
    XERO_SYNC_TRANSACTIONS.with_label_values(&["skipped"]).inc_by(u64::from(report.skipped));
    XERO_SYNC_TRANSACTIONS.with_label_values(&["failed"]).inc_by(u64::from(report.failed));
    info!(
        event = "xero_sync_complete",
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed,
        accounts = report.accounts,
        failed_accounts = report.failed_accounts
    );
    Ok(report)
}
