// gemini.rs - Google Gemini `generateContent` client behind the GenerativeModel trait
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Fallback shown when a failure carries no provider message.
pub const GENERIC_ERROR: &str = "An unknown error occurred.";

// ── Content parts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 bytes, no data: prefix
    pub data:      String,
}

/// One fragment of a request or response. Gemini sends either `text` or
/// `inlineData`; unknown part kinds deserialize with both fields empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text:        Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text:        None,
            inline_data: Some(InlineData { mime_type: mime_type.into(), data: data.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Image,
    Text,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model:               String,
    pub parts:               Vec<Part>,
    /// Empty = provider default (text only)
    pub response_modalities: Vec<Modality>,
}

/// First part carrying inline binary data, in part order.
pub fn first_inline_data(parts: &[Part]) -> Option<&InlineData> {
    parts.iter().find_map(|p| p.inline_data.as_ref())
}

/// First non-blank text part, in part order. Whitespace-only parts are
/// passed over so a reply of nothing but blanks counts as no result.
pub fn first_text(parts: &[Part]) -> Option<&str> {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .find(|t| !t.trim().is_empty())
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Gemini {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Message shown to the user: the provider's own message when it sent a
    /// structured error, the generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_ERROR.to_string(),
        }
    }
}

// ── Trait seam ───────────────────────────────────────────────────────────

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the parts of the first candidate (empty when there is none).
    async fn generate(&self, request: GenerateRequest) -> Result<Vec<Part>, ProviderError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Gemini REST
// ═══════════════════════════════════════════════════════════════════════

fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120)) // image models are slow
        .user_agent("image-mixer/0.1")
        .build()
}

pub struct GeminiClient {
    client:   Client,
    api_key:  String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: &str) -> reqwest::Result<Self> {
        Ok(Self {
            client:   http_client()?,
            api_key:  api_key.into(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

/// Build the `generateContent` body for a single user turn.
pub fn request_body(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": request.parts }]
    });
    if !request.response_modalities.is_empty() {
        body["generationConfig"] = json!({ "responseModalities": request.response_modalities });
    }
    body
}

/// Pull the first candidate's parts out of a `generateContent` response.
pub fn candidate_parts(json: &Value) -> Result<Vec<Part>, ProviderError> {
    let parts = &json["candidates"][0]["content"]["parts"];
    if parts.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(parts.clone()).map_err(|e| ProviderError::Decode(e.to_string()))
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<Vec<Part>, ProviderError> {
        let url = self.endpoint(&request.model);
        log::debug!("gemini → {} ({} part(s))", url, request.parts.len());

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&request))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = resp.status();
        // Read as text first so a non-JSON error page still yields something
        let body_text = resp.text().await.map_err(|e| ProviderError::Network(e.to_string()))?;
        let json: Option<Value> = serde_json::from_str(&body_text).ok();

        if !status.is_success() {
            let message = json
                .as_ref()
                .and_then(|j| j["error"]["message"].as_str())
                .unwrap_or("")
                .to_string();
            return Err(ProviderError::Api { status: status.as_u16(), message });
        }

        let json = json.ok_or_else(|| {
            ProviderError::Decode(body_text.chars().take(200).collect::<String>())
        })?;
        candidate_parts(&json)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
