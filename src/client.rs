// client.rs - relay client used by the workbench (client → backend → provider)
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::gemini::GENERIC_ERROR;
use crate::wire::{
    ErrorCode, ErrorResponse, MixRequest, MixResponse, OptimizeResponse, PromptRequest,
    SourceImage, VariationsResponse,
};

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3001";

#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not reach the relay or read its reply
    #[error("Network error: {0}")]
    Transport(String),
    /// The relay answered with an error message
    #[error("{0}")]
    Remote(String),
    #[error("Unexpected response from relay: {0}")]
    Decode(String),
}

/// The three relayed actions. `Ok(None)` is the "model returned nothing
/// usable" outcome, kept apart from failures.
#[async_trait]
pub trait MixerBackend: Send + Sync {
    async fn mix(&self, images: &[SourceImage], prompt: &str) -> Result<Option<String>, BackendError>;
    async fn optimize(&self, prompt: &str) -> Result<Option<String>, BackendError>;
    async fn generate_variations(&self, prompt: &str) -> Result<Option<String>, BackendError>;
}

fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(180)) // relay itself waits up to 120 s on the provider
        .user_agent("image-mixer/0.1")
        .build()
}

pub struct HttpBackend {
    client:   Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        Ok(Self {
            client:   http_client()?,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, route: &str, body: &B) -> Result<Option<T>, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, route);
        log::debug!("relay → {}", url);

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        let body_text = resp.text().await.map_err(|e| BackendError::Transport(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str::<T>(&body_text)
                .map(Some)
                .map_err(|e| BackendError::Decode(e.to_string()));
        }

        match serde_json::from_str::<ErrorResponse>(&body_text) {
            Ok(ErrorResponse { code: Some(ErrorCode::NoResult), error }) => {
                log::warn!("relay {}: {}", route, error);
                Ok(None)
            }
            Ok(ErrorResponse { error, .. }) if !error.trim().is_empty() => Err(BackendError::Remote(error)),
            _ => {
                log::error!("relay {} returned {}: {}", route, status, body_text.chars().take(200).collect::<String>());
                Err(BackendError::Remote(GENERIC_ERROR.into()))
            }
        }
    }
}

#[async_trait]
impl MixerBackend for HttpBackend {
    async fn mix(&self, images: &[SourceImage], prompt: &str) -> Result<Option<String>, BackendError> {
        let body = MixRequest { images: images.to_vec(), prompt: prompt.to_string() };
        Ok(self.post::<_, MixResponse>("/mix", &body).await?.map(|r| r.image))
    }

    async fn optimize(&self, prompt: &str) -> Result<Option<String>, BackendError> {
        let body = PromptRequest { prompt: prompt.to_string() };
        Ok(self.post::<_, OptimizeResponse>("/optimize", &body).await?.map(|r| r.prompt))
    }

    async fn generate_variations(&self, prompt: &str) -> Result<Option<String>, BackendError> {
        let body = PromptRequest { prompt: prompt.to_string() };
        Ok(self.post::<_, VariationsResponse>("/generate", &body).await?.map(|r| r.prompts))
    }
}
