use crate::config::Settings;
use crate::error::ChapterError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Sampling parameters, kept tight so repeated runs agree with each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            temperature: 0.2,
            top_p: 1.0,
            top_k: 1,
            response_mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Blocks medium-and-above content in every harm category.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
    })
    .collect()
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub generation: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        GenerationRequest {
            prompt: prompt.into(),
            generation: GenerationConfig::default(),
            safety: default_safety_settings(),
        }
    }
}

/// What came back from the model. `text` is `None` when no parts were returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub block_reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Text-generation service the model resolver talks to.
pub trait ModelClient {
    fn model_name(&self) -> &str;

    fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, LlmError>;
}

/// Gemini `generateContent` over blocking HTTP.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChapterError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ChapterError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(GeminiClient {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ChapterError> {
        let api_key = settings.api_key()?;
        Self::new(
            api_key,
            settings.model.clone(),
            settings.api_base.clone(),
            settings.request_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

impl ModelClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, request: &GenerationRequest) -> Result<ModelReply, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        let body = response.text().map_err(|e| LlmError::Request(e.to_string()))?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "gemini response");

        classify_response(status.as_u16(), body)
    }
}

/// Maps an HTTP status and body to a reply or a typed failure.
///
/// Quota markers only count on error statuses; a successful body may quote them.
pub fn classify_response(status: u16, body: String) -> Result<ModelReply, LlmError> {
    if (200..300).contains(&status) {
        return parse_reply(&body);
    }
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        return Err(LlmError::RateLimited(body));
    }
    Err(LlmError::Status { status, body })
}

pub fn request_body(request: &GenerationRequest) -> serde_json::Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }]
        }],
        "generationConfig": request.generation,
        "safetySettings": request.safety,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub fn parse_reply(body: &str) -> Result<ModelReply, LlmError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(ModelReply {
            text: None,
            finish_reason: None,
            block_reason,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(ModelReply {
        text: if text.is_empty() { None } else { Some(text) },
        finish_reason: candidate.finish_reason,
        block_reason,
    })
}
