use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChatError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// The two calls the client makes against the Q&A backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Succeeds when the backend has finished indexing and can answer.
    async fn health(&self) -> Result<(), ChatError>;

    /// Send one user utterance and return the generated answer.
    async fn chat(&self, message: &str) -> Result<String, ChatError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn health(&self) -> Result<(), ChatError> {
        (**self).health().await
    }

    async fn chat(&self, message: &str) -> Result<String, ChatError> {
        (**self).chat(message).await
    }
}

/// `Backend` over HTTP/JSON.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> Result<(), ChatError> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;

        // Body shape is not inspected; reading it only confirms the exchange completed.
        let body = response.text().await?;
        debug!(body = %body, "health check succeeded");
        Ok(())
    }

    async fn chat(&self, message: &str) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;
        let response = check_status(response).await?;

        let chat_response: ChatResponse = response.json().await?;
        debug!(len = chat_response.response.len(), "received chat response");
        Ok(chat_response.response)
    }
}

/// Turn a non-2xx response into `ChatError::Backend`, pulling `detail` out
/// of the body when the backend sent one.
async fn check_status(response: Response) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ChatError::backend(status.as_u16(), parse_detail(&text)))
}

fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => Some(detail),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string() {
        assert_eq!(
            parse_detail(r#"{"detail":"Chat engine not initialized"}"#),
            Some("Chat engine not initialized".to_string())
        );
    }

    #[test]
    fn detail_structured() {
        let detail = parse_detail(r#"{"detail":[{"loc":["body","message"],"msg":"field required"}]}"#);
        assert_eq!(
            detail.as_deref(),
            Some(r#"[{"loc":["body","message"],"msg":"field required"}]"#)
        );
    }

    #[test]
    fn detail_absent() {
        assert_eq!(parse_detail(""), None);
        assert_eq!(parse_detail("Internal Server Error"), None);
        assert_eq!(parse_detail(r#"{"error":"boom"}"#), None);
        assert_eq!(parse_detail(r#"{"detail":null}"#), None);
    }

    #[test]
    fn base_url_trailing_slash() {
        let backend = HttpBackend::new("http://127.0.0.1:8000/", None).unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:8000");
    }
}
