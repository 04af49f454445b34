use log::{debug, warn};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::VisionConfig;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Vision API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("Vision API reply had no content")]
    EmptyReply,
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("AI analysis returned incomplete data: {0}")]
    IncompleteAnalysis(String),
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self { kind: "json_object" }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Parts(parts),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Chat-completions client for an OpenAI-compatible multimodal endpoint.
#[derive(Clone)]
pub struct VisionClient {
    http_client: HttpClient,
    api_key: String,
    completions_url: String,
    model: String,
    pub(crate) analysis_max_tokens: u32,
    pub(crate) rerank_max_tokens: u32,
}

impl VisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;
        let completions_url = format!(
            "{}/chat/completions",
            config.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            completions_url,
            model: config.model.clone(),
            analysis_max_tokens: config.analysis_max_tokens,
            rerank_max_tokens: config.rerank_max_tokens,
        })
    }

    pub fn request(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        json_reply: bool,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            response_format: json_reply.then(ResponseFormat::json_object),
        }
    }

    /// Sends one chat completion and returns the text of the first choice.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, VisionError> {
        debug!(
            "Sending chat completion to {} (model {}, max_tokens {})",
            self.completions_url, request.model, request.max_tokens
        );

        let response = self
            .http_client
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            warn!("Vision API returned {}: {}", status, body);
            return Err(VisionError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(VisionError::EmptyReply)
    }
}
