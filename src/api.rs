use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type ConversationId = String;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx reply; `detail` carries the server's message when the
    /// body had one.
    #[error("service returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationDetail {
    pub id: ConversationId,
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: ConversationId,
}

#[derive(Deserialize)]
struct ConversationsResponse {
    conversations: Vec<ConversationSummary>,
}

#[derive(Deserialize)]
struct CreateResponse {
    conversation_id: ConversationId,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a ConversationId>,
}

/// HTTP client for the recommendation service. Cheap to clone; spawned
/// tasks each take their own copy.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Folds a non-2xx reply into [`ApiError::Status`], pulling the
    /// `{detail}` message out of the body when the server sent one.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| status.to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        let response = self
            .authed(self.client.get(self.url("/conversations")))
            .send()
            .await?;
        let body: ConversationsResponse = Self::check(response).await?.json().await?;
        Ok(body.conversations)
    }

    pub async fn create_conversation(&self, title: &str) -> Result<ConversationId, ApiError> {
        let response = self
            .authed(self.client.post(self.url("/conversations")))
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await?;
        let body: CreateResponse = Self::check(response).await?.json().await?;
        Ok(body.conversation_id)
    }

    pub async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationDetail, ApiError> {
        let response = self
            .authed(self.client.get(self.url(&format!("/conversations/{id}"))))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn rename_conversation(
        &self,
        id: &ConversationId,
        title: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .authed(self.client.put(self.url(&format!("/conversations/{id}"))))
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ApiError> {
        let response = self
            .authed(
                self.client
                    .delete(self.url(&format!("/conversations/{id}"))),
            )
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn send_chat(
        &self,
        conversation_id: Option<&ConversationId>,
        message: &str,
    ) -> Result<ChatResponse, ApiError> {
        let response = self
            .authed(self.client.post(self.url("/chat")))
            .json(&ChatRequest {
                message,
                conversation_id,
            })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversations_listing_parses() {
        let raw = r#"{"conversations":[
            {"id":"c1","title":"Mecha picks","updated_at":"2026-08-01T10:00:00Z"},
            {"id":"c2","title":"Slice of life","updated_at":"2026-07-30T09:00:00Z"}
        ]}"#;
        let body: ConversationsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.conversations.len(), 2);
        assert_eq!(body.conversations[0].id, "c1");
    }

    #[test]
    fn detail_tolerates_missing_timestamp() {
        let raw = r#"{"id":"c1","messages":[{"role":"user","content":"hi"}]}"#;
        let detail: ConversationDetail = serde_json::from_str(raw).unwrap();
        assert_eq!(detail.messages[0].role, "user");
        assert!(detail.messages[0].timestamp.is_none());
    }

    #[test]
    fn chat_request_omits_absent_conversation_id() {
        let raw = serde_json::to_string(&ChatRequest {
            message: "hello",
            conversation_id: None,
        })
        .unwrap();
        assert!(!raw.contains("conversation_id"));
    }
}
