use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::pagination::Pagination;
use models::document;
use crate::errors::ServiceError;

use super::search::{self, SearchHit};
use super::store::DocumentStore;

/// A file received from the client together with its metadata.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub title: Option<String>,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub category: Option<String>,
    pub financial_year: Option<i32>,
    pub tags: Vec<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub financial_year: Option<i32>,
}

/// Uploads whose text is kept for search.
pub fn is_text_document(mime_type: &str, file_name: &str) -> bool {
    let mime = mime_type.to_ascii_lowercase();
    let name = file_name.to_ascii_lowercase();
    mime.starts_with("text/plain")
        || mime.starts_with("text/markdown")
        || mime.starts_with("text/x-markdown")
        || name.ends_with(".txt")
        || name.ends_with(".md")
        || name.ends_with(".markdown")
}

pub fn guess_mime(file_name: &str) -> &'static str {
    let name = file_name.to_ascii_lowercase();
    match name.rsplit('.').next().unwrap_or("") {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Store the blob, then the metadata row. The blob is removed again if the row cannot be written.
#[instrument(skip(db, store, upload), fields(user_id = %user_id, file_name = %upload.file_name, size = upload.bytes.len()))]
pub async fn upload(
    db: &DatabaseConnection,
    store: &dyn DocumentStore,
    max_bytes: usize,
    user_id: Uuid,
    upload: DocumentUpload,
) -> Result<document::Model, ServiceError> {
    if upload.bytes.is_empty() {
        return Err(ServiceError::Validation("file is empty".into()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(ServiceError::Validation(format!("file exceeds the {max_bytes} byte limit")));
    }
    let file_name = document::sanitize_file_name(&upload.file_name);
    let mime_type = upload
        .mime_type
        .filter(|m| !m.trim().is_empty() && m != "application/octet-stream")
        .unwrap_or_else(|| guess_mime(&file_name).to_string());
    let title = upload
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| file_name.clone());
    document::validate_title(&title)?;
    let extracted_text = is_text_document(&mime_type, &file_name)
        .then(|| String::from_utf8_lossy(&upload.bytes).into_owned());

    let storage_key = format!("{user_id}/{}-{file_name}", Uuid::new_v4());
    store.put(&storage_key, &upload.bytes).await?;

    let input = document::NewDocument {
        title,
        file_name,
        mime_type,
        size_bytes: upload.bytes.len() as i64,
        storage_key: storage_key.clone(),
        category: upload.category,
        financial_year: upload.financial_year,
        tags: upload.tags,
        extracted_text,
    };
    match document::create(db, user_id, input).await {
        Ok(doc) => {
            info!(event = "document_uploaded", document_id = %doc.id, mime = %doc.mime_type);
            Ok(doc)
        }
        Err(e) => {
            if let Err(del) = store.delete(&storage_key).await {
                warn!(event = "orphan_blob", key = %storage_key, error = %del);
            }
            Err(e.into())
        }
    }
}

pub async fn get(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<document::Model, ServiceError> {
    document::Entity::find_by_id(id)
        .filter(document::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("document"))
}

/// Newest first, optionally filtered.
pub async fn list(
    db: &DatabaseConnection,
    user_id: Uuid,
    filter: &DocumentFilter,
    opts: Pagination,
) -> Result<Vec<document::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut q = document::Entity::find().filter(document::Column::UserId.eq(user_id));
    if let Some(c) = filter.category.as_deref().map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()) {
        q = q.filter(document::Column::Category.eq(c));
    }
    if let Some(fy) = filter.financial_year {
        q = q.filter(document::Column::FinancialYear.eq(fy));
    }
    q.order_by_desc(document::Column::CreatedAt)
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn download(
    db: &DatabaseConnection,
    store: &dyn DocumentStore,
    user_id: Uuid,
    id: Uuid,
) -> Result<(document::Model, Vec<u8>), ServiceError> {
    let doc = get(db, user_id, id).await?;
    let bytes = store.get(&doc.storage_key).await?;
    Ok((doc, bytes))
}

/// Delete the row, then the blob. A blob that is already gone is only logged.
#[instrument(skip(db, store), fields(user_id = %user_id, document_id = %id))]
pub async fn delete(db: &DatabaseConnection, store: &dyn DocumentStore, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let doc = get(db, user_id, id).await?;
    let key = doc.storage_key.clone();
    doc.delete(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    match store.delete(&key).await {
        Ok(true) => {}
        Ok(false) => warn!(event = "blob_missing", key = %key, "document blob already absent"),
        Err(e) => warn!(event = "blob_delete_failed", key = %key, error = %e),
    }
    info!(event = "document_deleted");
    Ok(())
}

/// Ranked search over the user's documents.
pub async fn search(db: &DatabaseConnection, user_id: Uuid, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>, ServiceError> {
    let limit = limit.unwrap_or(search::DEFAULT_LIMIT).clamp(1, 50);
    if search::tokenize(query).is_empty() {
        return Ok(Vec::new());
    }
    let docs = document::Entity::find()
        .filter(document::Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(search::rank(query, docs, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::store::mock::MemoryDocumentStore;
    use crate::test_support::get_db;

    #[test]
    fn text_detection_and_mime_guess() {
        assert!(is_text_document("text/plain; charset=utf-8", "a.bin"));
        assert!(is_text_document("application/octet-stream", "notes.MD"));
        assert!(!is_text_document("application/pdf", "return.pdf"));
        assert_eq!(guess_mime("Return.PDF"), "application/pdf");
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn size_limits_are_checked_before_storage() {
        let store = MemoryDocumentStore::default();
        let db = sea_orm::DatabaseConnection::Disconnected;
        let user = Uuid::new_v4();
        let empty = upload(&db, &store, 10, user, DocumentUpload { file_name: "a.txt".into(), ..Default::default() }).await;
        assert!(matches!(empty, Err(ServiceError::Validation(_))));
        let big = upload(&db, &store, 3, user, DocumentUpload { file_name: "a.txt".into(), bytes: b"abcd".to_vec(), ..Default::default() }).await;
        assert!(matches!(big, Err(ServiceError::Validation(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn upload_search_download_delete() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let store = MemoryDocumentStore::default();
        let user = Uuid::new_v4();
        let doc = upload(&db, &store, 1024, user, DocumentUpload {
            title: Some("Insurance renewal".into()),
            file_name: "renewal.md".into(),
            mime_type: None,
            category: Some("Insurance".into()),
            financial_year: Some(2025),
            tags: vec!["home".into(), "policy".into()],
            bytes: b"# Home insurance\nPremium due in August".to_vec(),
        }).await?;
        assert_eq!(doc.mime_type, "text/markdown");
        assert!(doc.extracted_text.as_deref().unwrap_or("").contains("Premium"));

        let hits = search(&db, user, "premium insurance", None).await?;
        assert_eq!(hits.len(), 1);
        assert!(search(&db, Uuid::new_v4(), "premium", None).await?.is_empty());

        let listed = list(&db, user, &DocumentFilter { category: Some("insurance".into()), financial_year: Some(2025) }, Pagination::default()).await?;
        assert_eq!(listed.len(), 1);

        let (_, bytes) = download(&db, &store, user, doc.id).await?;
        assert!(bytes.starts_with(b"# Home"));

        delete(&db, &store, user, doc.id).await?;
        assert!(store.is_empty());
        assert!(get(&db, user, doc.id).await.is_err());
        Ok(())
    }
}
