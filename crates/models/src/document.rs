use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::financial_year;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub category: Option<String>,
    pub financial_year: Option<i32>,
    /// Comma separated, lowercase.
    pub tags: String,
    #[serde(skip_serializing)]
    pub extracted_text: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.split(',').filter(|t| !t.is_empty()).collect()
    }
}

/// Metadata captured alongside an upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub category: Option<String>,
    pub financial_year: Option<i32>,
    pub tags: Vec<String>,
    pub extracted_text: Option<String>,
}

pub fn validate_title(t: &str) -> Result<(), ModelError> {
    let t = t.trim();
    if t.is_empty() { return Err(ModelError::Validation("title required".into())); }
    if t.chars().count() > 256 { return Err(ModelError::Validation("title too long (<=256)".into())); }
    Ok(())
}

/// Lowercase, trim, drop blanks and duplicates; commas inside a tag are not allowed.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> String {
    let mut out: Vec<String> = Vec::new();
    for t in tags {
        let v = t.as_ref().trim().to_lowercase().replace(',', " ");
        let v = v.trim().to_string();
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out.join(",")
}

/// Strip any path components from a client supplied file name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("").trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." { "upload.bin".into() } else { cleaned }
}

pub async fn create(db: &DatabaseConnection, user_id: Uuid, input: NewDocument) -> Result<Model, ModelError> {
    validate_title(&input.title)?;
    if let Some(fy) = input.financial_year { financial_year::validate_fy(fy)?; }
    if input.size_bytes < 0 { return Err(ModelError::Validation("size_bytes must be >= 0".into())); }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set(input.title.trim().to_string()),
        file_name: Set(sanitize_file_name(&input.file_name)),
        mime_type: Set(input.mime_type),
        size_bytes: Set(input.size_bytes),
        storage_key: Set(input.storage_key),
        category: Set(input.category.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty())),
        financial_year: Set(input.financial_year),
        tags: Set(normalize_tags(&input.tags)),
        extracted_text: Set(input.extracted_text),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_deduplicated_and_lowercased() {
        assert_eq!(normalize_tags(&["Tax", " tax ", "", "ATO,2024"]), "tax,ato 2024");
        let empty: [&str; 0] = [];
        assert_eq!(normalize_tags(&empty), "");
    }

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\payslip.pdf"), "payslip.pdf");
        assert_eq!(sanitize_file_name(".."), "upload.bin");
        assert_eq!(sanitize_file_name(""), "upload.bin");
    }
}
