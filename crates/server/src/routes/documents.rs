use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use models::document;
use service::auth::AuthenticatedUser;
use service::documents::service::{self as documents, DocumentFilter, DocumentUpload};
use service::documents::SearchHit;

use super::paginate;
use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub financial_year: Option<i32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

/// Collect the `file` part and metadata fields of an upload form.
async fn read_upload(mut form: Multipart) -> Result<DocumentUpload, JsonApiError> {
    let mut upload = DocumentUpload::default();
    let mut has_file = false;
    while let Some(field) = form.next_field().await.map_err(|e| JsonApiError::bad_request(e.body_text()))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().unwrap_or("upload.bin").to_string();
                upload.mime_type = field.content_type().map(str::to_string);
                upload.bytes = field.bytes().await.map_err(|e| JsonApiError::bad_request(e.body_text()))?.to_vec();
                has_file = true;
            }
            "title" | "category" | "financial_year" | "tags" => {
                let value = field.text().await.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "title" => upload.title = Some(value),
                    "category" => upload.category = Some(value),
                    "financial_year" => {
                        let fy = value
                            .parse::<i32>()
                            .map_err(|_| JsonApiError::bad_request("financial_year must be a number"))?;
                        upload.financial_year = Some(fy);
                    }
                    _ => upload.tags = value.split(',').map(str::to_string).collect(),
                }
            }
            other => debug!(field = %other, "ignoring unknown upload field"),
        }
    }
    if !has_file {
        return Err(JsonApiError::bad_request("multipart field 'file' is required"));
    }
    Ok(upload)
}

#[utoipa::path(post, path = "/api/documents", tag = "documents",
    request_body(content = crate::openapi::UploadDoc, content_type = "multipart/form-data"),
    responses((status = 201, description = "Stored"), (status = 400, description = "Missing file or too large"), (status = 413, description = "Body over limit")),
    security(("bearer_auth" = [])))]
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    form: Multipart,
) -> Result<(StatusCode, Json<document::Model>), JsonApiError> {
    let upload = read_upload(form).await?;
    let max = state.config.storage.max_upload_bytes;
    let created = documents::upload(&state.db, state.store.as_ref(), max, user.user_id, upload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/api/documents", tag = "documents",
    params(("category" = Option<String>, Query,), ("financial_year" = Option<i32>, Query,),
           ("page" = Option<u32>, Query,), ("per_page" = Option<u32>, Query,)),
    responses((status = 200, description = "Newest first")),
    security(("bearer_auth" = [])))]
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<document::Model>>, JsonApiError> {
    let filter = DocumentFilter { category: q.category, financial_year: q.financial_year };
    Ok(Json(documents::list(&state.db, user.user_id, &filter, paginate(q.page, q.per_page)).await?))
}

#[utoipa::path(get, path = "/api/documents/{id}", tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses((status = 200, description = "Metadata"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<document::Model>, JsonApiError> {
    Ok(Json(documents::get(&state.db, user.user_id, id).await?))
}

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name.chars().filter(|c| *c != '"' && !c.is_control()).collect();
    format!("attachment; filename=\"{safe}\"")
}

#[utoipa::path(get, path = "/api/documents/{id}/download", tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses((status = 200, description = "File bytes with the stored content type"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, JsonApiError> {
    let (doc, bytes) = documents::download(&state.db, state.store.as_ref(), user.user_id, id).await?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, doc.mime_type.as_str())
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CONTENT_DISPOSITION, content_disposition(&doc.file_name))
        .body(Body::from(bytes))
        .map_err(|e| JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "response_error", Some(e.to_string())))
}

#[utoipa::path(delete, path = "/api/documents/{id}", tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses((status = 204, description = "Row and blob removed"), (status = 404, description = "Not Found")),
    security(("bearer_auth" = [])))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    documents::delete(&state.db, state.store.as_ref(), user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/search/documents", tag = "documents",
    params(("q" = String, Query, description = "Free text"), ("limit" = Option<usize>, Query, description = "Default 10")),
    responses((status = 200, description = "Hits by score, newest first on ties")),
    security(("bearer_auth" = [])))]
pub async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, JsonApiError> {
    Ok(Json(documents::search(&state.db, user.user_id, &q.q, q.limit).await?))
}

#[cfg(test)]
mod tests {
    use super::content_disposition;

    #[test]
    fn disposition_strips_quotes() {
        assert_eq!(content_disposition("tax \"2024\".pdf"), "attachment; filename=\"tax 2024.pdf\"");
    }
}
