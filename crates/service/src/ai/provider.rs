use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use configs::AiConfig;

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self { role: role.to_string(), content: content.into() }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Reply text for the given conversation, oldest message first.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ServiceError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct HttpChatProvider {
    http: reqwest::Client,
    cfg: AiConfig,
}

impl HttpChatProvider {
    pub fn new(cfg: AiConfig) -> Result<Self, ServiceError> {
        if !cfg.is_enabled() {
            return Err(ServiceError::Unavailable("ai_not_configured".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    #[instrument(skip_all, fields(model = %self.cfg.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        let res = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.cfg.api_key)
            .json(&CompletionRequest { model: &self.cfg.model, messages })
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(format!("chat request failed: {e}")))?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "chat provider returned an error");
            return Err(ServiceError::Upstream(format!("chat provider returned {}", status.as_u16())));
        }
        let parsed: CompletionResponse = res
            .json()
            .await
            .map_err(|e| ServiceError::Upstream(format!("invalid chat response: {e}")))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ServiceError::Upstream("chat provider returned no choices".into()))?;
        debug!(chars = reply.len(), "chat completion received");
        Ok(reply)
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Replies with a fixed text, or fails when `reply` is `None`.
    #[derive(Default)]
    pub struct ScriptedChatProvider {
        pub reply: Option<String>,
        pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChatProvider {
        pub fn replying(text: &str) -> Self {
            Self { reply: Some(text.to_string()), ..Default::default() }
        }

        pub fn last_request(&self) -> Option<Vec<ChatMessage>> {
            self.requests.lock().ok().and_then(|r| r.last().cloned())
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedChatProvider {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
            if let Ok(mut r) = self.requests.lock() {
                r.push(messages.to_vec());
            }
            self.reply.clone().ok_or_else(|| ServiceError::Upstream("scripted failure".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_key() {
        assert!(matches!(HttpChatProvider::new(AiConfig::default()), Err(ServiceError::Unavailable(_))));
        let p = HttpChatProvider::new(AiConfig { api_key: "k".into(), base_url: "http://llm.local/v1/".into(), ..Default::default() }).unwrap();
        assert_eq!(p.endpoint(), "http://llm.local/v1/chat/completions");
    }

    #[test]
    fn decodes_completion_payload() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hi");
        let req = serde_json::to_value(CompletionRequest { model: "m", messages: &[ChatMessage::new("user", "q")] }).unwrap();
        assert_eq!(req["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn scripted_provider_records_requests() {
        let p = mock::ScriptedChatProvider::replying("ok");
        let out = p.complete(&[ChatMessage::new("user", "hello")]).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(p.last_request().unwrap().len(), 1);
        assert!(mock::ScriptedChatProvider::default().complete(&[]).await.is_err());
    }
}
