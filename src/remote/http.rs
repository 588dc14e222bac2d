use super::traits::{
    ConversationService, ConversationStart, DocumentLibrary, DocumentSummary, ExecutionService,
    RunState, RunStatus,
};
use crate::config::Config;
use crate::error::RemoteError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP client for the remote research platform; implements all three
/// collaborator traits against one base URL.
pub struct HttpApiClient {
    base_url: String,
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    interaction: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    interaction: &'a str,
    task: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    job_id: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct StartConversationRequest<'a> {
    document_id: &'a str,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartConversationResponse {
    conversation_id: String,
    run_id: String,
}

#[derive(Debug, Serialize)]
struct ContinueConversationRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContinueConversationResponse {
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct RunStatusResponse {
    status: String,
    #[serde(default)]
    result: Option<Value>,
}

impl HttpApiClient {
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, config.api_key.as_deref(), &config.interaction_name)
    }

    pub fn new(base_url: &str, api_key: Option<&str>, interaction: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            interaction: interaction.to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.cached_auth_header {
            Some(header) => request.header("Authorization", header),
            None => request,
        }
    }

    async fn check(endpoint: &str, response: Response) -> anyhow::Result<Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Auth.into()),
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(RemoteError::Request {
                    endpoint: endpoint.to_string(),
                    message: format!("{status}: {message}"),
                }
                .into())
            }
            _ => Ok(response),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        response: Response,
    ) -> anyhow::Result<T> {
        response.json::<T>().await.map_err(|e| {
            RemoteError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl DocumentLibrary for HttpApiClient {
    async fn list(&self) -> anyhow::Result<Vec<DocumentSummary>> {
        let url = self.url("/objects");
        let response = self
            .authorize(self.client.get(&url).query(&[("limit", "1000"), ("offset", "0")]))
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: "/objects".into(),
                message: e.to_string(),
            })?;

        let response = Self::check("/objects", response).await?;
        let entries: Vec<ObjectEntry> = Self::decode("/objects", response).await?;

        Ok(entries
            .into_iter()
            .map(|entry| DocumentSummary {
                name: entry.name.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                created_at: entry.created_at,
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        let url = self.url(&format!("/objects/{id}"));
        let response = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: "/objects/{id}".into(),
                message: e.to_string(),
            })?;
        Self::check("/objects/{id}", response).await?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionService for HttpApiClient {
    async fn submit(&self, task: &str) -> anyhow::Result<String> {
        let url = self.url("/execute/async");
        let body = ExecuteRequest {
            interaction: &self.interaction,
            task,
        };
        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: "/execute/async".into(),
                message: e.to_string(),
            })?;

        let response = Self::check("/execute/async", response).await?;
        let parsed: ExecuteResponse = Self::decode("/execute/async", response).await?;

        parsed.job_id.or(parsed.id).ok_or_else(|| {
            RemoteError::Decode {
                endpoint: "/execute/async".into(),
                message: "response carried neither job_id nor id".into(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ConversationService for HttpApiClient {
    async fn start(
        &self,
        document_id: &str,
        question: &str,
    ) -> anyhow::Result<ConversationStart> {
        let url = self.url("/conversations");
        let body = StartConversationRequest {
            document_id,
            question,
        };
        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: "/conversations".into(),
                message: e.to_string(),
            })?;

        let response = Self::check("/conversations", response).await?;
        let parsed: StartConversationResponse = Self::decode("/conversations", response).await?;

        Ok(ConversationStart {
            conversation_id: parsed.conversation_id,
            run_id: parsed.run_id,
        })
    }

    async fn continue_conversation(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> anyhow::Result<String> {
        let url = self.url(&format!("/conversations/{conversation_id}/messages"));
        let body = ContinueConversationRequest { question };
        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: "/conversations/{id}/messages".into(),
                message: e.to_string(),
            })?;

        let response = Self::check("/conversations/{id}/messages", response).await?;
        let parsed: ContinueConversationResponse =
            Self::decode("/conversations/{id}/messages", response).await?;
        Ok(parsed.run_id)
    }

    async fn run_status(&self, run_id: &str) -> anyhow::Result<RunStatus> {
        let url = self.url(&format!("/runs/{run_id}"));
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: "/runs/{id}".into(),
                message: e.to_string(),
            })?;

        let response = Self::check("/runs/{id}", response).await?;
        let parsed: RunStatusResponse = Self::decode("/runs/{id}", response).await?;

        // Providers are loose about status vocabulary; fold the synonyms.
        let state = match parsed.status.as_str() {
            "completed" | "success" | "succeeded" => RunState::Succeeded,
            "failed" | "error" => RunState::Failed,
            _ => RunState::Pending,
        };

        Ok(RunStatus {
            state,
            result: parsed.result,
        })
    }
}
