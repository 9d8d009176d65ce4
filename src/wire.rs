// wire.rs - JSON bodies of the relay HTTP surface (server and client share these)
use serde::{Deserialize, Serialize};

/// Shown when a mix is submitted without images or without a prompt.
pub const MISSING_MIX_INPUT: &str = "Please add at least one image and a prompt.";

// ── Requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceImage {
    /// `data:<mimeType>;base64,<payload>`
    pub data_url:  String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixRequest {
    pub images: Vec<SourceImage>,
    pub prompt: String,
}

/// Body of `/optimize` and `/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixResponse {
    /// Base64 image bytes, no data: prefix
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationsResponse {
    /// Raw numbered list as returned by the model
    pub prompts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Provider answered, but without a usable part
    NoResult,
    /// Transport or provider-side failure
    Provider,
    InvalidRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code:  Option<ErrorCode>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self { error: error.into(), code: Some(code) }
    }
}
