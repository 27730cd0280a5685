use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use models::ai_conversation;
use service::ai::chat_service::{self, ChatReply, ConversationDetail};
use service::auth::AuthenticatedUser;

use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct TitleInput {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageInput {
    pub content: String,
}

#[utoipa::path(get, path = "/api/ai/conversations", tag = "ai",
    responses((status = 200, description = "Most recently updated first")),
    security(("bearer_auth" = [])))]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<ai_conversation::Model>>, JsonApiError> {
    Ok(Json(chat_service::list_conversations(&state.db, user.user_id).await?))
}

#[utoipa::path(post, path = "/api/ai/conversations", tag = "ai",
    request_body = crate::openapi::TitleDoc,
    responses((status = 201, description = "Created")),
    security(("bearer_auth" = [])))]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Option<Json<TitleInput>>,
) -> Result<(StatusCode, Json<ai_conversation::Model>), JsonApiError> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let created = chat_service::create_conversation(&state.db, user.user_id, input.title.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/api/ai/conversations/{id}", tag = "ai",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses((status = 200, description = "Conversation with messages, oldest first"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationDetail>, JsonApiError> {
    Ok(Json(chat_service::conversation_with_messages(&state.db, user.user_id, id).await?))
}

#[utoipa::path(patch, path = "/api/ai/conversations/{id}", tag = "ai",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = crate::openapi::TitleDoc,
    responses((status = 200, description = "Renamed"), (status = 400, description = "Empty title"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn rename(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<TitleInput>,
) -> Result<Json<ai_conversation::Model>, JsonApiError> {
    let title = input.title.unwrap_or_default();
    Ok(Json(chat_service::rename_conversation(&state.db, user.user_id, id, &title).await?))
}

#[utoipa::path(delete, path = "/api/ai/conversations/{id}", tag = "ai",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses((status = 204, description = "Deleted with its messages"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    chat_service::delete_conversation(&state.db, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/ai/conversations/{id}/messages", tag = "ai",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = crate::openapi::MessageDoc,
    responses((status = 200, description = "Stored user message and assistant reply"),
              (status = 502, description = "Provider failed"), (status = 503, description = "ai_not_configured")),
    security(("bearer_auth" = [])))]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<MessageInput>,
) -> Result<Json<ChatReply>, JsonApiError> {
    let reply = chat_service::send_message(&state.db, state.chat.as_deref(), user.user_id, id, &input.content).await?;
    Ok(Json(reply))
}
