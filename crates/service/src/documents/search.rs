use std::collections::HashSet;

use serde::Serialize;

use models::document;

pub const DEFAULT_LIMIT: usize = 10;
const TITLE_WEIGHT: u32 = 3;
const TAG_WEIGHT: u32 = 2;
const CATEGORY_WEIGHT: u32 = 2;
/// Body text scores one point per occurrence, up to this many per token.
const TEXT_OCCURRENCE_CAP: u32 = 5;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "for", "from", "how", "in", "is", "it", "me", "my",
    "of", "on", "or", "our", "show", "the", "to", "was", "we", "what", "when", "where", "which", "with", "you",
];

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document: document::Model,
    pub score: u32,
}

/// Lowercased alphanumeric terms of at least two characters, stop words removed, first occurrence kept.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 2 && !STOP_WORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

pub fn score_document(tokens: &[String], doc: &document::Model) -> u32 {
    let title = doc.title.to_lowercase();
    let category = doc.category.as_deref().unwrap_or("").to_lowercase();
    let tags = doc.tag_list();
    let text = doc.extracted_text.as_deref().map(str::to_lowercase);

    let mut score = 0;
    for t in tokens {
        if title.contains(t.as_str()) {
            score += TITLE_WEIGHT;
        }
        if tags.iter().any(|tag| tag.contains(t.as_str())) {
            score += TAG_WEIGHT;
        }
        if !category.is_empty() && category.contains(t.as_str()) {
            score += CATEGORY_WEIGHT;
        }
        if let Some(body) = &text {
            let n = body.matches(t.as_str()).take(TEXT_OCCURRENCE_CAP as usize).count() as u32;
            score += n;
        }
    }
    score
}

/// Score every document against `query`; hits sorted by score then newest first.
pub fn rank(query: &str, docs: Vec<document::Model>, limit: usize) -> Vec<SearchHit> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<SearchHit> = docs
        .into_iter()
        .filter_map(|d| {
            let score = score_document(&tokens, &d);
            (score > 0).then_some(SearchHit { document: d, score })
        })
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.document.created_at.cmp(&a.document.created_at)));
    hits.truncate(limit);
    hits
}
