//! Chat assistant over the user's own finance data.
pub mod provider;
pub mod prompt;
pub mod chat_service;

pub use provider::{ChatMessage, ChatProvider, HttpChatProvider};
