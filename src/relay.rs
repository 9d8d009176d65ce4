// relay.rs - turns (images, prompt) pairs into provider requests and extracts the result
use thiserror::Error;

use crate::data_url::{self, DataUrlError};
use crate::gemini::{self, GenerateRequest, GenerativeModel, Modality, Part, ProviderError};
use crate::prompt;
use crate::wire::SourceImage;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    /// Multimodal model used by `mix`
    pub image: String,
    /// Text model used by the prompt helpers
    pub text:  String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self { image: DEFAULT_IMAGE_MODEL.into(), text: DEFAULT_TEXT_MODEL.into() }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("image {index}: {source}")]
    InvalidImage { index: usize, source: DataUrlError },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Stateless apart from the model handle; shared across requests.
pub struct Relay<M> {
    model:  M,
    models: ModelNames,
}

impl<M: GenerativeModel> Relay<M> {
    pub fn new(model: M, models: ModelNames) -> Self {
        Self { model, models }
    }

    pub fn models(&self) -> &ModelNames {
        &self.models
    }

    /// One inline part per image (in order), then the prompt as a text part.
    /// `Ok(None)` when the provider answered without any inline data.
    pub async fn mix(&self, images: &[SourceImage], prompt: &str) -> Result<Option<String>, RelayError> {
        let mut parts = Vec::with_capacity(images.len() + 1);
        for (index, img) in images.iter().enumerate() {
            let payload = data_url::strip(&img.data_url)
                .map_err(|source| RelayError::InvalidImage { index, source })?;
            parts.push(Part::inline(img.mime_type.clone(), payload));
        }
        parts.push(Part::text(prompt));

        log::info!("mix: {} image(s) → {}", images.len(), self.models.image);
        let reply = self
            .model
            .generate(GenerateRequest {
                model:               self.models.image.clone(),
                parts,
                response_modalities: vec![Modality::Image, Modality::Text],
            })
            .await
            .map_err(|e| {
                log::error!("mix failed: {}", e);
                e
            })?;

        let image = gemini::first_inline_data(&reply).map(|d| d.data.clone());
        if image.is_none() {
            log::warn!("mix: model returned {} part(s) but no inline image", reply.len());
        }
        Ok(image)
    }

    pub async fn optimize(&self, prompt: &str) -> Result<Option<String>, RelayError> {
        log::info!("optimize → {}", self.models.text);
        self.complete_text(prompt::optimize_instruction(prompt)).await
    }

    /// Returns the raw numbered list; splitting is the caller's job.
    pub async fn generate_variations(&self, prompt: &str) -> Result<Option<String>, RelayError> {
        log::info!("generate variations → {}", self.models.text);
        self.complete_text(prompt::variations_instruction(prompt)).await
    }

    async fn complete_text(&self, instruction: String) -> Result<Option<String>, RelayError> {
        let reply = self
            .model
            .generate(GenerateRequest {
                model:               self.models.text.clone(),
                parts:               vec![Part::text(instruction)],
                response_modalities: Vec::new(),
            })
            .await
            .map_err(|e| {
                log::error!("text request failed: {}", e);
                e
            })?;
        Ok(gemini::first_text(&reply).map(str::to_string))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a canned reply and records every request it receives.
    struct ScriptedModel {
        reply:    Result<Vec<Part>, u16>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedModel {
        fn replying(parts: Vec<Part>) -> Self {
            Self { reply: Ok(parts), requests: Mutex::new(Vec::new()) }
        }

        fn failing(status: u16) -> Self {
            Self { reply: Err(status), requests: Mutex::new(Vec::new()) }
        }

        fn last_request(&self) -> GenerateRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: GenerateRequest) -> Result<Vec<Part>, ProviderError> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(parts) => Ok(parts.clone()),
                Err(status) => Err(ProviderError::Api { status: *status, message: "quota exceeded".into() }),
            }
        }
    }

    fn img(mime: &str, payload: &str) -> SourceImage {
        SourceImage { data_url: data_url::encode(mime, payload), mime_type: mime.into() }
    }

    #[tokio::test]
    async fn test_mix_orders_images_before_prompt() {
        let model = ScriptedModel::replying(vec![Part::inline("image/png", "OUT")]);
        let relay = Relay::new(model, ModelNames::default());
        let images = vec![img("image/png", "AAA"), img("image/jpeg", "BBB")];

        let out = relay.mix(&images, "blend them").await.unwrap();
        assert_eq!(out.as_deref(), Some("OUT"));

        let req = relay.model.last_request();
        assert_eq!(req.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(req.parts.len(), 3);
        assert_eq!(req.parts[0], Part::inline("image/png", "AAA"));
        assert_eq!(req.parts[1], Part::inline("image/jpeg", "BBB"));
        assert_eq!(req.parts[2], Part::text("blend them"));
        assert_eq!(req.response_modalities, vec![Modality::Image, Modality::Text]);
    }

    #[tokio::test]
    async fn test_mix_returns_inline_after_text() {
        let model = ScriptedModel::replying(vec![
            Part::text("Sure, here it is"),
            Part::inline("image/png", "FIRST"),
            Part::inline("image/png", "SECOND"),
        ]);
        let relay = Relay::new(model, ModelNames::default());
        let out = relay.mix(&[img("image/png", "A")], "p").await.unwrap();
        assert_eq!(out.as_deref(), Some("FIRST"));
    }

    #[tokio::test]
    async fn test_mix_text_only_is_no_result() {
        let model = ScriptedModel::replying(vec![Part::text("I can't do that")]);
        let relay = Relay::new(model, ModelNames::default());
        assert!(relay.mix(&[img("image/png", "A")], "p").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mix_rejects_bare_base64() {
        let model = ScriptedModel::replying(vec![]);
        let relay = Relay::new(model, ModelNames::default());
        let bad = SourceImage { data_url: "AAAA".into(), mime_type: "image/png".into() };
        let err = relay.mix(&[img("image/png", "A"), bad], "p").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidImage { index: 1, .. }));
        assert!(relay.model.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let relay = Relay::new(ScriptedModel::failing(429), ModelNames::default());
        let err = relay.optimize("a cat").await.unwrap_err();
        match err {
            RelayError::Provider(p) => assert_eq!(p.user_message(), "quota exceeded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_optimize_wraps_prompt_in_template() {
        let model = ScriptedModel::replying(vec![Part::text("A majestic fluffy cat")]);
        let relay = Relay::new(model, ModelNames::default());
        let out = relay.optimize("A cat").await.unwrap();
        assert_eq!(out.as_deref(), Some("A majestic fluffy cat"));

        let req = relay.model.last_request();
        assert_eq!(req.model, DEFAULT_TEXT_MODEL);
        assert!(req.response_modalities.is_empty());
        assert_eq!(req.parts, vec![Part::text(prompt::optimize_instruction("A cat"))]);
    }

    #[tokio::test]
    async fn test_variations_returns_raw_list() {
        let list = "\n1. A fluffy cat\n2. A cat in space\n3. A cartoon cat";
        let model = ScriptedModel::replying(vec![Part::text(list)]);
        let relay = Relay::new(model, ModelNames { image: "i".into(), text: "t".into() });
        assert_eq!(relay.generate_variations("A cat").await.unwrap().as_deref(), Some(list));
        assert_eq!(relay.model.last_request().model, "t");
        assert_eq!(relay.models().image, "i");
    }

    #[tokio::test]
    async fn test_text_helpers_no_result_on_empty_reply() {
        let relay = Relay::new(ScriptedModel::replying(vec![]), ModelNames::default());
        assert!(relay.generate_variations("x").await.unwrap().is_none());
    }
}
