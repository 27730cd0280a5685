use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use common::metrics::CHAT_COMPLETIONS;
use models::ai_conversation::{self, DEFAULT_TITLE};
use models::ai_message::{self, MessageRole};

use crate::errors::ServiceError;
use crate::{account_service, documents};
use super::prompt::{self, CONTEXT_DOCUMENTS};
use super::provider::{ChatMessage, ChatProvider};

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: ai_conversation::Model,
    pub messages: Vec<ai_message::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub conversation: ai_conversation::Model,
    pub user_message: ai_message::Model,
    pub reply: ai_message::Model,
}

pub async fn list_conversations(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<ai_conversation::Model>, ServiceError> {
    ai_conversation::Entity::find()
        .filter(ai_conversation::Column::UserId.eq(user_id))
        .order_by_desc(ai_conversation::Column::UpdatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn create_conversation(db: &DatabaseConnection, user_id: Uuid, title: Option<&str>) -> Result<ai_conversation::Model, ServiceError> {
    let created = ai_conversation::create(db, user_id, title).await?;
    debug!(event = "conversation_created", conversation_id = %created.id);
    Ok(created)
}

pub async fn get_conversation(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<ai_conversation::Model, ServiceError> {
    ai_conversation::Entity::find_by_id(id)
        .filter(ai_conversation::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("conversation"))
}

async fn messages_of(db: &DatabaseConnection, conv: &ai_conversation::Model) -> Result<Vec<ai_message::Model>, ServiceError> {
    conv.find_related(ai_message::Entity)
        .order_by_asc(ai_message::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn conversation_with_messages(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<ConversationDetail, ServiceError> {
    let conversation = get_conversation(db, user_id, id).await?;
    let messages = messages_of(db, &conversation).await?;
    Ok(ConversationDetail { conversation, messages })
}

pub async fn rename_conversation(db: &DatabaseConnection, user_id: Uuid, id: Uuid, title: &str) -> Result<ai_conversation::Model, ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation("title required".into()));
    }
    let mut am: ai_conversation::ActiveModel = get_conversation(db, user_id, id).await?.into();
    am.title = Set(ai_conversation::normalize_title(Some(title)));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

/// Messages are removed with the conversation.
pub async fn delete_conversation(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let conv = get_conversation(db, user_id, id).await?;
    conv.delete(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(())
}

/// Store the user's message, ask the provider with account and document
/// context, then store and return the reply.
#[instrument(skip(db, provider, content), fields(user_id = %user_id, conversation_id = %conversation_id))]
pub async fn send_message(
    db: &DatabaseConnection,
    provider: Option<&dyn ChatProvider>,
    user_id: Uuid,
    conversation_id: Uuid,
    content: &str,
) -> Result<ChatReply, ServiceError> {
    let Some(provider) = provider else {
        return Err(ServiceError::Unavailable("ai_not_configured".into()));
    };
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("message content required".into()));
    }

    let conv = get_conversation(db, user_id, conversation_id).await?;
    let user_message = ai_message::append(db, conv.id, MessageRole::User, content).await?;

    let summary = account_service::net_worth(db, user_id).await?;
    let hits = documents::service::search(db, user_id, content, Some(CONTEXT_DOCUMENTS)).await?;
    let history = messages_of(db, &conv).await?;

    let mut request = Vec::with_capacity(prompt::HISTORY_WINDOW + 1);
    request.push(ChatMessage::new(MessageRole::System.as_str(), prompt::system_prompt(&summary, &hits)));
    request.extend(prompt::history_window(&history));

    let text = match provider.complete(&request).await {
        Ok(t) => {
            CHAT_COMPLETIONS.with_label_values(&["ok"]).inc();
            t
        }
        Err(e) => {
            CHAT_COMPLETIONS.with_label_values(&["error"]).inc();
            warn!(event = "chat_completion_failed", error = %e);
            return Err(e);
        }
    };
    let reply = ai_message::append(db, conv.id, MessageRole::Assistant, &text).await?;

    let retitle = conv.title == DEFAULT_TITLE;
    let mut am: ai_conversation::ActiveModel = conv.into();
    if retitle {
        am.title = Set(prompt::title_from_message(content));
    }
    am.updated_at = Set(Utc::now().into());
    let conversation = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    info!(event = "chat_reply_stored", context_documents = hits.len(), history = request.len() - 1);
    Ok(ChatReply { conversation, user_message, reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::ScriptedChatProvider;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let db = DatabaseConnection::Disconnected;
        let err = send_message(&db, None, Uuid::new_v4(), Uuid::new_v4(), "hi").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(ref m) if m == "ai_not_configured"));

        let p = ScriptedChatProvider::replying("x");
        let err = send_message(&db, Some(&p), Uuid::new_v4(), Uuid::new_v4(), "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(p.last_request().is_none());
    }

    #[tokio::test]
    async fn conversation_round_trip() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let user = Uuid::new_v4();
        let conv = create_conversation(&db, user, None).await?;
        assert_eq!(conv.title, DEFAULT_TITLE);

        let p = ScriptedChatProvider::replying("Your net worth is zero.");
        let out = send_message(&db, Some(&p), user, conv.id, "What is my net worth right now?").await?;
        assert_eq!(out.reply.content, "Your net worth is zero.");
        assert_eq!(out.reply.role, "assistant");
        assert_eq!(out.conversation.title, "What is my net worth right now?");

        let sent = p.last_request().unwrap();
        assert_eq!(sent[0].role, "system");
        assert!(sent[0].content.contains("none recorded"));
        assert_eq!(sent.last().map(|m| m.content.as_str()), Some("What is my net worth right now?"));

        let renamed = rename_conversation(&db, user, conv.id, "Net worth").await?;
        send_message(&db, Some(&p), user, conv.id, "And now?").await?;
        let detail = conversation_with_messages(&db, user, conv.id).await?;
        assert_eq!(detail.conversation.title, renamed.title);
        assert_eq!(detail.messages.len(), 4);

        let failing = ScriptedChatProvider::default();
        assert!(matches!(send_message(&db, Some(&failing), user, conv.id, "again").await, Err(ServiceError::Upstream(_))));
        assert!(get_conversation(&db, Uuid::new_v4(), conv.id).await.is_err());

        delete_conversation(&db, user, conv.id).await?;
        assert!(list_conversations(&db, user).await?.is_empty());
        Ok(())
    }
}
