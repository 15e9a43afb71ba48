use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use opsassist_core::config::AssistantConfig;
use opsassist_core::session::{ChatApiRequest, PromptKind, Responder};

// --- Concrete Responder Implementation (HTTP Endpoint) ---
pub struct HttpResponder {
    http_client: Client,
    endpoint_url: String,
    api_key: String,
}

/// Shape of a successful reply from the chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatApiReply {
    chat_response: String,
}

impl HttpResponder {
    pub fn new(config: &AssistantConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client for chat endpoint");

        Self {
            http_client,
            endpoint_url: config.chat_url(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, request: &ChatApiRequest, _kind: PromptKind) -> Result<Vec<String>> {
        tracing::debug!(
            endpoint = %self.endpoint_url,
            session_id = %request.session_id,
            "Sending chat request"
        );

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .header("Accept", "application/json")
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!(
                "Chat endpoint call failed with status: {}. Body: {}",
                status,
                text
            );
        }

        let reply: ChatApiReply = response.json().await?;
        Ok(vec![reply.chat_response])
    }
}
