//! HTTP client for the conversation service.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;

use super::types::{
    Conversation, ConversationList, HealthReport, Message, MessageList, SendMessageRequest,
};

/// Remote conversation service as seen by the session core.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// `POST /conversations`
    async fn create_conversation(&self) -> Result<Conversation, ApiError>;

    /// `GET /conversations`
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// `GET /conversations/{id}/messages`
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    /// `POST /conversations/{id}/messages`. Returns the assistant's reply.
    async fn post_message(&self, conversation_id: &str, message: &str) -> Result<Message, ApiError>;

    /// `DELETE /conversations/{id}`
    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthReport, ApiError>;
}

/// reqwest-backed [`ConversationApi`].
pub struct HttpConversationApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpConversationApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                endpoint: config.api_base_url.clone(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        let base_url = Url::parse(&config.api_base_url).map_err(|e| ApiError::Transport {
            endpoint: config.api_base_url.clone(),
            reason: format!("Invalid base URL: {e}"),
        })?;
        Ok(Self { base_url, client })
    }

    /// Base URL with `segments` appended, each percent-encoded as a single
    /// path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport {
                endpoint: self.base_url.to_string(),
                reason: "Base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the response if it was a success.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&SendMessageRequest>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(segments)?;
        let endpoint = format!("{method} {}", url.path());
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&SendMessageRequest>,
    ) -> Result<T, ApiError> {
        let endpoint = format!("{method} /{}", segments.join("/"));
        let resp = self.send(method, segments, body).await?;
        resp.json::<T>().await.map_err(|e| ApiError::Decode {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ConversationApi for HttpConversationApi {
    async fn create_conversation(&self) -> Result<Conversation, ApiError> {
        self.send_json(Method::POST, &["conversations"], None).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let list: ConversationList = self.send_json(Method::GET, &["conversations"], None).await?;
        Ok(list.conversations)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let segments = ["conversations", conversation_id, "messages"];
        let list: MessageList = self.send_json(Method::GET, &segments, None).await?;
        Ok(list.messages)
    }

    async fn post_message(&self, conversation_id: &str, message: &str) -> Result<Message, ApiError> {
        let segments = ["conversations", conversation_id, "messages"];
        let body = SendMessageRequest {
            message: message.to_string(),
        };
        self.send_json(Method::POST, &segments, Some(&body)).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        match self.send(Method::DELETE, &["conversations", conversation_id], None).await {
            Ok(_) => Ok(()),
            // Already gone is as good as deleted.
            Err(e) if e.is_not_found() => {
                tracing::debug!(conversation_id, "Conversation already absent on server");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        self.send_json(Method::GET, &["health"], None).await
    }
}
