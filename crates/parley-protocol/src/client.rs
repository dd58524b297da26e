//! Chat server access: the backend trait and its HTTP implementation

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    decoder::{ProtocolEventStream, decode_stream},
    error::{Error, Result},
    types::{ChatRequest, ConversationDetail, ConversationSummary},
};

/// Server operations consumed by a chat session
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a send-cycle. `Err` means no stream was established.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ProtocolEventStream>;

    /// List conversations, most recent first
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Fetch one conversation with its persisted history
    async fn get_conversation(&self, id: &str) -> Result<ConversationDetail>;

    /// Delete a conversation. Deleting an unknown id succeeds.
    async fn delete_conversation(&self, id: &str) -> Result<()>;
}

/// HTTP client for a parley-compatible chat server
pub struct HttpChatClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "server URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token: None,
        })
    }

    /// Authenticate requests with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Pass a successful response through, or turn it into a status error
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::status(status.as_u16(), error_detail(&body)))
}

/// Pull a readable message out of an error body (`{"detail": "..."}` or raw text)
fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    body.trim().chars().take(200).collect()
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ProtocolEventStream> {
        tracing::debug!(
            "Opening chat stream (conversation: {:?})",
            request.conversation_id
        );
        let response = self
            .request(reqwest::Method::POST, "/api/chat")
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(decode_stream(response.bytes_stream()))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let response = self
            .request(reqwest::Method::GET, "/api/conversations")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn get_conversation(&self, id: &str) -> Result<ConversationDetail> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/conversations/{}", id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id.to_string()));
        }
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn delete_conversation(&self, id: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/conversations/{}", id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Conversation {} already deleted", id);
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_scheme() {
        let err = HttpChatClient::new("localhost:8000").err().unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = HttpChatClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/chat"), "http://localhost:8000/api/chat");
    }

    #[test]
    fn test_error_detail_from_json() {
        assert_eq!(error_detail(r#"{"detail":"conversation not found"}"#), "conversation not found");
    }

    #[test]
    fn test_error_detail_raw_text() {
        assert_eq!(error_detail("  Bad Gateway \n"), "Bad Gateway");
    }
}
