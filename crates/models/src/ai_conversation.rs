use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const DEFAULT_TITLE: &str = "New conversation";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_conversation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Messages }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Messages => Entity::has_many(crate::ai_message::Entity).into(),
        }
    }
}

impl Related<crate::ai_message::Entity> for Entity {
    fn to() -> RelationDef { Relation::Messages.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Trim and cap a title at 128 characters; blank falls back to the default.
pub fn normalize_title(t: Option<&str>) -> String {
    match t.map(str::trim) {
        None | Some("") => DEFAULT_TITLE.to_string(),
        Some(v) => v.chars().take(128).collect(),
    }
}

pub async fn create(db: &DatabaseConnection, user_id: Uuid, title: Option<&str>) -> Result<Model, ModelError> {
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set(normalize_title(title)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
