use std::fmt::Write;

use models::ai_message;

use crate::account_service::NetWorthSummary;
use crate::documents::SearchHit;
use super::provider::ChatMessage;

/// Most recent messages sent to the provider.
pub const HISTORY_WINDOW: usize = 20;
pub const CONTEXT_DOCUMENTS: usize = 3;
pub const TITLE_CHARS: usize = 60;
const EXCERPT_CHARS: usize = 400;

const PREAMBLE: &str = "You are a careful assistant for an Australian household's finances. \
Answer from the data below and say when it is not enough. Amounts are AUD unless noted. \
Do not give personal financial advice.";

pub fn system_prompt(summary: &NetWorthSummary, hits: &[SearchHit]) -> String {
    let mut out = String::from(PREAMBLE);
    // write! 到 String 不会失败
    let _ = write!(
        out,
        "\n\nAccounts (assets {}, liabilities {}, net worth {}):",
        summary.assets, summary.liabilities, summary.net_worth
    );
    if summary.accounts.is_empty() {
        out.push_str("\n- none recorded");
    }
    for a in &summary.accounts {
        let _ = write!(out, "\n- {} ({}, {}): {} {}", a.name, a.account_type, a.institution, a.balance, a.currency);
    }

    if !hits.is_empty() {
        out.push_str("\n\nRelevant documents:");
        for h in hits.iter().take(CONTEXT_DOCUMENTS) {
            let d = &h.document;
            let _ = write!(out, "\n- {}", d.title);
            if let Some(fy) = d.financial_year {
                let _ = write!(out, " [FY{fy}]");
            }
            if let Some(c) = d.category.as_deref() {
                let _ = write!(out, " ({c})");
            }
            if let Some(text) = d.extracted_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
                let _ = write!(out, ": {}", excerpt.replace('\n', " "));
            }
        }
    }
    out
}

/// Conversation title derived from the first user message.
pub fn title_from_message(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(TITLE_CHARS).collect()
}

/// The last `HISTORY_WINDOW` stored messages, oldest first.
pub fn history_window(messages: &[ai_message::Model]) -> Vec<ChatMessage> {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    messages[start..].iter().map(|m| ChatMessage::new(&m.role, m.content.clone())).collect()
}
