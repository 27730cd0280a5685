use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use models::{account, xero_account_mapping as mapping, xero_connection as connection};
use models::xero_connection::ConnectionStatus;

use crate::{account_service, errors::ServiceError};
use super::client::XeroApi;
use super::domain::{TokenSet, XeroBankAccount, XeroTenant};
use super::matching::{self, Candidate};

/// Tokens this close to expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub matched: u32,
    pub unmatched: u32,
    /// Manual mappings left untouched.
    pub preserved: u32,
}

pub fn needs_refresh(expires_at: DateTime<FixedOffset>, now: DateTime<Utc>) -> bool {
    expires_at.with_timezone(&Utc) - now <= Duration::seconds(REFRESH_MARGIN_SECS)
}

fn expiry_from(tokens: &TokenSet) -> DateTime<FixedOffset> {
    (Utc::now() + Duration::seconds(tokens.expires_in.max(0))).into()
}

fn is_manual(m: &mapping::Model) -> bool {
    !m.auto_matched && m.account_id.is_some()
}

fn score_decimal(score: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(score).map(|d| d.round_dp(4))
}

/// Insert or refresh the connection for `(user, tenant)` with new tokens.
#[instrument(skip(db, tenant, tokens), fields(user_id = %user_id, tenant_id = %tenant.tenant_id))]
pub async fn upsert_connection(
    db: &DatabaseConnection,
    user_id: Uuid,
    tenant: &XeroTenant,
    tokens: &TokenSet,
) -> Result<connection::Model, ServiceError> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let existing = connection::Entity::find()
        .filter(connection::Column::UserId.eq(user_id))
        .filter(connection::Column::XeroTenantId.eq(tenant.tenant_id.as_str()))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    let is_new = existing.is_none();
    let mut am: connection::ActiveModel = match existing {
        Some(row) => row.into(),
        None => connection::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            xero_tenant_id: Set(tenant.tenant_id.clone()),
            last_synced_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        },
    };
    am.tenant_name = Set(tenant.display_name().to_string());
    am.access_token = Set(tokens.access_token.clone());
    am.refresh_token = Set(tokens.refresh_token.clone());
    am.expires_at = Set(expiry_from(tokens));
    am.status = Set(ConnectionStatus::Active.as_str().to_string());
    am.updated_at = Set(now);

    let saved = if is_new { am.insert(db).await } else { am.update(db).await };
    let saved = saved.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(event = "xero_connection_saved", connection_id = %saved.id);
    Ok(saved)
}

pub async fn list_connections(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<connection::Model>, ServiceError> {
    connection::Entity::find()
        .filter(connection::Column::UserId.eq(user_id))
        .order_by_asc(connection::Column::TenantName)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn get_connection(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<connection::Model, ServiceError> {
    connection::Entity::find_by_id(id)
        .filter(connection::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("xero connection"))
}

async fn mappings_of(db: &DatabaseConnection, connection_id: Uuid) -> Result<Vec<mapping::Model>, ServiceError> {
    mapping::Entity::find()
        .filter(mapping::Column::ConnectionId.eq(connection_id))
        .order_by_asc(mapping::Column::XeroAccountName)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn list_mappings(db: &DatabaseConnection, user_id: Uuid, connection_id: Uuid) -> Result<Vec<mapping::Model>, ServiceError> {
    get_connection(db, user_id, connection_id).await?;
    mappings_of(db, connection_id).await
}

/// Match remote bank accounts against the user's active accounts and upsert one
/// mapping per remote account. Manual mappings keep their local account, and
/// that account is not offered to the matcher.
#[instrument(skip(db, remote), fields(user_id = %user_id, connection_id = %connection_id, remote = remote.len()))]
pub async fn reconcile_mappings(
    db: &DatabaseConnection,
    user_id: Uuid,
    connection_id: Uuid,
    remote: &[XeroBankAccount],
    threshold: f64,
) -> Result<MatchStats, ServiceError> {
    let existing: HashMap<String, mapping::Model> = mappings_of(db, connection_id)
        .await?
        .into_iter()
        .map(|m| (m.xero_account_id.clone(), m))
        .collect();
    let reserved: HashSet<Uuid> = existing.values().filter(|m| is_manual(m)).filter_map(|m| m.account_id).collect();
    let locals: Vec<account::Model> = account::Entity::find()
        .filter(account::Column::UserId.eq(user_id))
        .filter(account::Column::IsActive.eq(true))
        .order_by_asc(account::Column::Name)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .into_iter()
        .filter(|a| !reserved.contains(&a.id))
        .collect();

    let open: Vec<&XeroBankAccount> = remote
        .iter()
        .filter(|r| !existing.get(&r.account_id).is_some_and(is_manual))
        .collect();
    let xero_c: Vec<Candidate<'_>> = open
        .iter()
        .map(|r| Candidate { name: &r.name, number: r.bank_account_number.as_deref() })
        .collect();
    let local_c: Vec<Candidate<'_>> = locals
        .iter()
        .map(|a| Candidate { name: &a.name, number: a.account_number.as_deref() })
        .collect();
    let assigned: HashMap<&str, (Uuid, f64)> = matching::assign(&xero_c, &local_c, threshold)
        .into_iter()
        .map(|m| (open[m.xero_index].account_id.as_str(), (locals[m.local_index].id, m.score)))
        .collect();

    let now: DateTime<FixedOffset> = Utc::now().into();
    let mut stats = MatchStats::default();
    for r in remote {
        let prior = existing.get(&r.account_id);
        let mut am: mapping::ActiveModel = match prior {
            Some(m) => m.clone().into(),
            None => mapping::ActiveModel {
                id: Set(Uuid::new_v4()),
                connection_id: Set(connection_id),
                xero_account_id: Set(r.account_id.clone()),
                created_at: Set(now),
                ..Default::default()
            },
        };
        am.xero_account_name = Set(r.name.clone());
        am.xero_account_number = Set(r.bank_account_number.clone());
        am.updated_at = Set(now);

        if prior.is_some_and(is_manual) {
            stats.preserved += 1;
        } else if let Some((account_id, score)) = assigned.get(r.account_id.as_str()) {
            am.account_id = Set(Some(*account_id));
            am.match_score = Set(score_decimal(*score));
            am.auto_matched = Set(true);
            stats.matched += 1;
        } else {
            am.account_id = Set(None);
            am.match_score = Set(None);
            am.auto_matched = Set(false);
            stats.unmatched += 1;
        }
        let written = if prior.is_some() { am.update(db).await } else { am.insert(db).await };
        written.map_err(|e| ServiceError::Db(e.to_string()))?;
    }
    info!(event = "xero_accounts_matched", matched = stats.matched, unmatched = stats.unmatched, preserved = stats.preserved);
    Ok(stats)
}

/// Manually set or clear the local account of a mapping.
#[instrument(skip(db), fields(user_id = %user_id, mapping_id = %mapping_id))]
pub async fn update_mapping(
    db: &DatabaseConnection,
    user_id: Uuid,
    mapping_id: Uuid,
    account_id: Option<Uuid>,
) -> Result<mapping::Model, ServiceError> {
    let row = mapping::Entity::find_by_id(mapping_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("xero account mapping"))?;
    // 映射本身没有 user_id，归属通过连接判断
    get_connection(db, user_id, row.connection_id)
        .await
        .map_err(|_| ServiceError::not_found("xero account mapping"))?;
    if let Some(acc) = account_id {
        account_service::get_account(db, user_id, acc).await?;
    }

    let mut am: mapping::ActiveModel = row.into();
    am.account_id = Set(account_id);
    am.match_score = Set(None);
    am.auto_matched = Set(false);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    debug!(event = "xero_mapping_updated", linked = account_id.is_some());
    Ok(updated)
}

/// Mark a connection disconnected and wipe its tokens. Mappings are kept.
#[instrument(skip(db), fields(user_id = %user_id, connection_id = %id))]
pub async fn disconnect(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<connection::Model, ServiceError> {
    let mut am: connection::ActiveModel = get_connection(db, user_id, id).await?.into();
    am.status = Set(ConnectionStatus::Disconnected.as_str().to_string());
    am.access_token = Set(String::new());
    am.refresh_token = Set(String::new());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(event = "xero_disconnected");
    Ok(updated)
}

/// Refresh the access token when it is about to expire and persist the rotated pair.
/// A failed refresh marks the connection as errored.
#[instrument(skip(db, api, conn), fields(connection_id = %conn.id))]
pub async fn ensure_fresh_token(
    db: &DatabaseConnection,
    api: &dyn XeroApi,
    conn: connection::Model,
) -> Result<connection::Model, ServiceError> {
    if !needs_refresh(conn.expires_at, Utc::now()) {
        return Ok(conn);
    }
    match api.refresh_token(&conn.refresh_token).await {
        Ok(tokens) => {
            let mut am: connection::ActiveModel = conn.into();
            am.access_token = Set(tokens.access_token.clone());
            am.refresh_token = Set(tokens.refresh_token.clone());
            am.expires_at = Set(expiry_from(&tokens));
            am.status = Set(ConnectionStatus::Active.as_str().to_string());
            am.updated_at = Set(Utc::now().into());
            let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
            debug!(event = "xero_token_refreshed");
            Ok(updated)
        }
        Err(e) => {
            warn!(event = "xero_token_refresh_failed", error = %e);
            let mut am: connection::ActiveModel = conn.into();
            am.status = Set(ConnectionStatus::Error.as_str().to_string());
            am.updated_at = Set(Utc::now().into());
            am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
            Err(e.into())
        }
    }
}
