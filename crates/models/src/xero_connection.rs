use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "xero_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub xero_tenant_id: String,
    pub tenant_name: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub expires_at: DateTimeWithTimeZone,
    pub status: String,
    pub last_synced_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Mappings }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Mappings => Entity::has_many(crate::xero_account_mapping::Entity).into(),
        }
    }
}

impl Related<crate::xero_account_mapping::Entity> for Entity {
    fn to() -> RelationDef { Relation::Mappings.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Active => "active",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s {
            "active" => Ok(ConnectionStatus::Active),
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "error" => Ok(ConnectionStatus::Error),
            other => Err(ModelError::Validation(format!("invalid connection status '{other}'"))),
        }
    }
}

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn tokens_are_never_serialized() {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let m = Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            xero_tenant_id: "t-1".into(),
            tenant_name: "Family Trust".into(),
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            expires_at: now,
            status: "active".into(),
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(!json.contains("secret-access"));
        assert!(!json.contains("secret-refresh"));
        assert!(m.is_active());
    }
}
