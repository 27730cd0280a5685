use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{ai_conversation, errors::ModelError};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Conversation }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Conversation => Entity::belongs_to(ai_conversation::Entity)
                .from(Column::ConversationId)
                .to(ai_conversation::Column::Id)
                .into(),
        }
    }
}

impl Related<ai_conversation::Entity> for Entity {
    fn to() -> RelationDef { Relation::Conversation.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

pub async fn append(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    role: MessageRole,
    content: &str,
) -> Result<Model, ModelError> {
    if content.trim().is_empty() {
        return Err(ModelError::Validation("message content required".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conversation_id),
        role: Set(role.as_str().to_string()),
        content: Set(content.to_string()),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
