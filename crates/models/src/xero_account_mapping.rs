use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{account, xero_connection};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "xero_account_mapping")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub connection_id: Uuid,
    pub xero_account_id: String,
    pub xero_account_name: String,
    pub xero_account_number: Option<String>,
    /// Local account; `None` until matched.
    pub account_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub match_score: Option<Decimal>,
    pub auto_matched: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Connection, Account }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Connection => Entity::belongs_to(xero_connection::Entity)
                .from(Column::ConnectionId)
                .to(xero_connection::Column::Id)
                .into(),
            Relation::Account => Entity::belongs_to(account::Entity)
                .from(Column::AccountId)
                .to(account::Column::Id)
                .into(),
        }
    }
}

impl Related<xero_connection::Entity> for Entity {
    fn to() -> RelationDef { Relation::Connection.def() }
}

impl ActiveModelBehavior for ActiveModel {}
