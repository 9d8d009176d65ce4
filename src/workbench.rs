// workbench.rs - orchestration state: collection, prompt, result and per-action busy flags
//
// Every relayed action is split in two halves so the busy flag is visible for
// the whole time the call is out:
//   begin_*   validate, set the flag, snapshot what goes over the wire
//   finish_*  apply the outcome (or the error) and clear the flag
// `mix`, `optimize` and `generate_variations` run both halves around a backend.

use thiserror::Error;

use crate::client::{BackendError, MixerBackend};
use crate::collection::ImageCollection;
use crate::data_url;
use crate::image_record::{ImageId, NewImage, SourceKind};
use crate::prompt::{self, PromptBuilder, VariationFormat};
use crate::wire::{self, SourceImage};

pub const MIX_VALIDATION: &str = wire::MISSING_MIX_INPUT;
pub const PROMPT_VALIDATION: &str = "Please enter a prompt first.";
pub const NO_IMAGE_RETURNED: &str = "Failed to generate image. The model might not have returned an image.";
pub const NO_PROMPT_RETURNED: &str = "Failed to optimize the prompt. The model did not return any text.";
pub const NO_VARIATIONS_RETURNED: &str = "Failed to generate prompt variations. The model did not return any text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Mix,
    Optimize,
    Variations,
}

/// Why a `begin_*` call refused to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Blocked {
    /// Precondition failed; the validation message is now in `error()`
    #[error("input is incomplete")]
    Invalid,
    /// Same action already in flight
    #[error("already running")]
    Busy,
}

/// Snapshot of a mix submission.
#[derive(Debug, Clone)]
pub struct MixTicket {
    pub images: Vec<SourceImage>,
    pub prompt: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct InFlight {
    mix:        bool,
    optimize:   bool,
    variations: bool,
}

#[derive(Default)]
pub struct Workbench {
    images:     ImageCollection,
    prompt:     String,
    result:     Option<String>,
    error:      Option<String>,
    suggestion: Option<String>,
    variations: Vec<String>,
    busy:       InFlight,
}

impl Workbench {
    pub fn new(images: ImageCollection) -> Self {
        Self { images, ..Self::default() }
    }

    // ── Read side ─────────────────────────────────────────────────────────

    pub fn images(&self) -> &ImageCollection {
        &self.images
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Last generated image as a PNG data URL.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Optimized prompt waiting for the user's review.
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn variations(&self) -> &[String] {
        &self.variations
    }

    pub fn is_busy(&self, action: Action) -> bool {
        match action {
            Action::Mix        => self.busy.mix,
            Action::Optimize   => self.busy.optimize,
            Action::Variations => self.busy.variations,
        }
    }

    /// Whether the mix control is enabled.
    pub fn can_mix(&self) -> bool {
        !self.images.is_empty() && !prompt::is_blank(&self.prompt) && !self.busy.mix
    }

    // ── Collection & prompt ───────────────────────────────────────────────

    pub fn add_image(&mut self, image: NewImage) -> ImageId {
        self.images.add(image)
    }

    pub fn remove_image(&mut self, id: ImageId) -> bool {
        self.images.remove(id)
    }

    pub fn clear_images(&mut self) {
        self.images.clear();
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    /// Overwrite the prompt with the builder's rendering.
    pub fn apply_builder(&mut self, builder: &PromptBuilder) {
        self.prompt = builder.build();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Put the current result into the collection as a generated source.
    pub fn reuse_result(&mut self) -> Option<ImageId> {
        let url = self.result.as_deref()?;
        match NewImage::from_data_url(SourceKind::Generated, url) {
            Ok(image) => Some(self.images.add(image)),
            Err(e) => {
                log::error!("stored result is not a data URL: {}", e);
                None
            }
        }
    }

    // ── Mix ───────────────────────────────────────────────────────────────

    pub fn begin_mix(&mut self) -> Result<MixTicket, Blocked> {
        if self.busy.mix {
            return Err(Blocked::Busy);
        }
        if self.images.is_empty() || prompt::is_blank(&self.prompt) {
            self.error = Some(MIX_VALIDATION.into());
            return Err(Blocked::Invalid);
        }
        self.error = None;
        self.result = None;
        self.busy.mix = true;
        Ok(MixTicket {
            images: self.images.iter().map(|r| r.to_source_image()).collect(),
            prompt: self.prompt.clone(),
        })
    }

    pub fn finish_mix(&mut self, outcome: Result<Option<String>, BackendError>) {
        self.busy.mix = false;
        match outcome {
            Ok(Some(payload)) => self.result = Some(data_url::png(&payload)),
            Ok(None) => self.error = Some(NO_IMAGE_RETURNED.into()),
            Err(e) => {
                log::error!("mix failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    pub async fn mix<B: MixerBackend + ?Sized>(&mut self, backend: &B) -> Result<(), Blocked> {
        let ticket = self.begin_mix()?;
        let outcome = backend.mix(&ticket.images, &ticket.prompt).await;
        self.finish_mix(outcome);
        Ok(())
    }

    // ── Optimize ──────────────────────────────────────────────────────────

    pub fn begin_optimize(&mut self) -> Result<String, Blocked> {
        if self.busy.optimize {
            return Err(Blocked::Busy);
        }
        if prompt::is_blank(&self.prompt) {
            self.error = Some(PROMPT_VALIDATION.into());
            return Err(Blocked::Invalid);
        }
        self.error = None;
        self.busy.optimize = true;
        Ok(self.prompt.clone())
    }

    /// A returned rewrite is held in `suggestion()`; the prompt is untouched
    /// until `accept_suggestion`.
    pub fn finish_optimize(&mut self, outcome: Result<Option<String>, BackendError>) {
        self.busy.optimize = false;
        match outcome {
            Ok(Some(text)) => self.suggestion = Some(text.trim().to_string()),
            Ok(None) => self.error = Some(NO_PROMPT_RETURNED.into()),
            Err(e) => {
                log::error!("optimize failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    pub async fn optimize<B: MixerBackend + ?Sized>(&mut self, backend: &B) -> Result<(), Blocked> {
        let prompt = self.begin_optimize()?;
        let outcome = backend.optimize(&prompt).await;
        self.finish_optimize(outcome);
        Ok(())
    }

    pub fn accept_suggestion(&mut self) -> bool {
        match self.suggestion.take() {
            Some(text) => {
                self.prompt = text;
                true
            }
            None => false,
        }
    }

    pub fn dismiss_suggestion(&mut self) {
        self.suggestion = None;
    }

    // ── Variations ────────────────────────────────────────────────────────

    pub fn begin_variations(&mut self) -> Result<String, Blocked> {
        if self.busy.variations {
            return Err(Blocked::Busy);
        }
        if prompt::is_blank(&self.prompt) {
            self.error = Some(PROMPT_VALIDATION.into());
            return Err(Blocked::Invalid);
        }
        self.error = None;
        self.busy.variations = true;
        Ok(self.prompt.clone())
    }

    pub fn finish_variations(&mut self, outcome: Result<Option<String>, BackendError>) {
        self.busy.variations = false;
        match outcome {
            Ok(Some(list)) => {
                let parsed = prompt::parse_variations(&list, VariationFormat::default());
                if parsed.is_empty() {
                    self.error = Some(NO_VARIATIONS_RETURNED.into());
                }
                self.variations = parsed;
            }
            Ok(None) => self.error = Some(NO_VARIATIONS_RETURNED.into()),
            Err(e) => {
                log::error!("variations failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    pub async fn generate_variations<B: MixerBackend + ?Sized>(&mut self, backend: &B) -> Result<(), Blocked> {
        let prompt = self.begin_variations()?;
        let outcome = backend.generate_variations(&prompt).await;
        self.finish_variations(outcome);
        Ok(())
    }

    /// Replace the prompt with candidate `index`.
    pub fn adopt_variation(&mut self, index: usize) -> bool {
        match self.variations.get(index) {
            Some(text) => {
                self.prompt = text.clone();
                true
            }
            None => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        calls:     AtomicUsize,
        mix_reply: Mutex<Option<Result<Option<String>, BackendError>>>,
        text:      Option<String>,
        seen:      Mutex<Vec<SourceImage>>,
    }

    impl FakeBackend {
        fn mixing(reply: Result<Option<String>, BackendError>) -> Self {
            Self { mix_reply: Mutex::new(Some(reply)), ..Self::default() }
        }

        fn texting(text: &str) -> Self {
            Self { text: Some(text.to_string()), ..Self::default() }
        }
    }

    #[async_trait]
    impl MixerBackend for FakeBackend {
        async fn mix(&self, images: &[SourceImage], _prompt: &str) -> Result<Option<String>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().extend_from_slice(images);
            self.mix_reply.lock().unwrap().take().unwrap_or(Ok(None))
        }

        async fn optimize(&self, _prompt: &str) -> Result<Option<String>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }

        async fn generate_variations(&self, _prompt: &str) -> Result<Option<String>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    fn bench_with_image(prompt: &str) -> Workbench {
        let mut wb = Workbench::new(ImageCollection::new());
        wb.add_image(NewImage::from_bytes(SourceKind::Uploaded, "image/jpeg", b"jpeg"));
        wb.set_prompt(prompt);
        wb
    }

    #[tokio::test]
    async fn test_mix_without_images_never_calls_backend() {
        let backend = FakeBackend::default();
        let mut wb = Workbench::new(ImageCollection::new());
        wb.set_prompt("combine");
        assert!(!wb.can_mix());
        assert_eq!(wb.mix(&backend).await, Err(Blocked::Invalid));
        assert_eq!(wb.error(), Some(MIX_VALIDATION));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mix_with_blank_prompt_never_calls_backend() {
        let backend = FakeBackend::default();
        let mut wb = bench_with_image("   \n\t");
        assert_eq!(wb.mix(&backend).await, Err(Blocked::Invalid));
        assert_eq!(wb.error(), Some(MIX_VALIDATION));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mix_success_sets_png_result() {
        let backend = FakeBackend::mixing(Ok(Some("R0lG".into())));
        let mut wb = bench_with_image("make it vintage");
        wb.mix(&backend).await.unwrap();
        assert_eq!(wb.result(), Some("data:image/png;base64,R0lG"));
        assert!(wb.error().is_none());
        assert!(!wb.is_busy(Action::Mix));
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].mime_type, "image/jpeg");
        assert_eq!(seen[0].data_url, "data:image/jpeg;base64,anBlZw==");
    }

    #[tokio::test]
    async fn test_mix_no_result_uses_distinct_message() {
        let backend = FakeBackend::mixing(Ok(None));
        let mut wb = bench_with_image("p");
        wb.mix(&backend).await.unwrap();
        assert_eq!(wb.error(), Some(NO_IMAGE_RETURNED));
        assert!(wb.result().is_none());
        assert!(!wb.is_busy(Action::Mix));
    }

    #[tokio::test]
    async fn test_mix_transport_error_keeps_state() {
        let backend = FakeBackend::mixing(Err(BackendError::Remote("quota exceeded".into())));
        let mut wb = bench_with_image("p");
        wb.mix(&backend).await.unwrap();
        assert_eq!(wb.error(), Some("quota exceeded"));
        assert_ne!(wb.error(), Some(NO_IMAGE_RETURNED));
        assert_eq!(wb.images().len(), 1);
        assert_eq!(wb.prompt(), "p");
        assert!(!wb.is_busy(Action::Mix));
    }

    #[test]
    fn test_busy_flag_blocks_second_mix() {
        let mut wb = bench_with_image("p");
        let ticket = wb.begin_mix().unwrap();
        assert_eq!(ticket.images.len(), 1);
        assert!(wb.is_busy(Action::Mix));
        assert!(!wb.can_mix());
        assert_eq!(wb.begin_mix().unwrap_err(), Blocked::Busy);
        // other actions are independent
        assert!(wb.begin_optimize().is_ok());
        wb.finish_mix(Ok(Some("AA==".into())));
        assert!(!wb.is_busy(Action::Mix));
        assert!(wb.can_mix());
    }

    #[test]
    fn test_busy_flag_blocks_second_optimize() {
        let mut wb = bench_with_image("a cat");
        assert_eq!(wb.begin_optimize().unwrap(), "a cat");
        assert!(wb.is_busy(Action::Optimize));
        assert_eq!(wb.begin_optimize().unwrap_err(), Blocked::Busy);
        // mix and variations keep their own flags
        assert!(wb.can_mix());
        assert!(wb.begin_variations().is_ok());
        wb.finish_optimize(Err(BackendError::Transport("connection refused".into())));
        assert!(!wb.is_busy(Action::Optimize));
        assert_eq!(wb.error(), Some("Network error: connection refused"));
        assert!(wb.suggestion().is_none());
        assert!(wb.begin_optimize().is_ok());
    }

    #[test]
    fn test_busy_flag_blocks_second_variations() {
        let mut wb = bench_with_image("a cat");
        wb.begin_variations().unwrap();
        assert!(wb.is_busy(Action::Variations));
        assert_eq!(wb.begin_variations().unwrap_err(), Blocked::Busy);
        assert!(!wb.is_busy(Action::Optimize));
        wb.finish_variations(Ok(None));
        assert!(!wb.is_busy(Action::Variations));
        assert_eq!(wb.error(), Some(NO_VARIATIONS_RETURNED));
        assert!(wb.begin_variations().is_ok());
    }

    #[test]
    fn test_busy_check_precedes_validation() {
        let mut wb = bench_with_image("a cat");
        wb.begin_optimize().unwrap();
        wb.set_prompt("  ");
        assert_eq!(wb.begin_optimize().unwrap_err(), Blocked::Busy);
        assert!(wb.error().is_none());
    }

    #[test]
    fn test_dismiss_error_and_suggestion() {
        let mut wb = Workbench::default();
        assert_eq!(wb.begin_mix().unwrap_err(), Blocked::Invalid);
        assert!(wb.error().is_some());
        wb.dismiss_error();
        assert!(wb.error().is_none());

        wb.set_prompt("A cat");
        wb.begin_optimize().unwrap();
        wb.finish_optimize(Ok(Some("A regal cat".into())));
        assert_eq!(wb.suggestion(), Some("A regal cat"));
        wb.dismiss_suggestion();
        assert!(wb.suggestion().is_none());
        assert!(!wb.accept_suggestion());
        assert_eq!(wb.prompt(), "A cat");
    }

    #[test]
    fn test_begin_mix_clears_previous_result() {
        let mut wb = bench_with_image("p");
        wb.begin_mix().unwrap();
        wb.finish_mix(Ok(Some("AA==".into())));
        assert!(wb.result().is_some());
        wb.begin_mix().unwrap();
        assert!(wb.result().is_none());
    }

    #[test]
    fn test_late_result_applies_to_current_state() {
        let mut wb = bench_with_image("first");
        wb.begin_mix().unwrap();
        wb.set_prompt("second");
        wb.clear_images();
        wb.finish_mix(Ok(Some("TATE".into())));
        assert_eq!(wb.result(), Some("data:image/png;base64,TATE"));
    }

    #[tokio::test]
    async fn test_optimize_held_for_review() {
        let backend = FakeBackend::texting("  A majestic fluffy cat, golden hour  ");
        let mut wb = bench_with_image("A cat");
        wb.optimize(&backend).await.unwrap();
        assert_eq!(wb.prompt(), "A cat");
        assert_eq!(wb.suggestion(), Some("A majestic fluffy cat, golden hour"));
        assert!(wb.accept_suggestion());
        assert_eq!(wb.prompt(), "A majestic fluffy cat, golden hour");
        assert!(wb.suggestion().is_none());
        assert!(!wb.accept_suggestion());
    }

    #[tokio::test]
    async fn test_optimize_blank_prompt_rejected() {
        let backend = FakeBackend::texting("x");
        let mut wb = Workbench::default();
        assert_eq!(wb.optimize(&backend).await, Err(Blocked::Invalid));
        assert_eq!(wb.error(), Some(PROMPT_VALIDATION));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_variations_split_and_adopt() {
        let backend = FakeBackend::texting("\n1. A fluffy cat\n2. A cat in space\n3. A cartoon cat");
        let mut wb = bench_with_image("A cat");
        wb.generate_variations(&backend).await.unwrap();
        assert_eq!(wb.variations(), ["A fluffy cat", "A cat in space", "A cartoon cat"]);
        assert!(wb.adopt_variation(1));
        assert_eq!(wb.prompt(), "A cat in space");
        assert!(!wb.adopt_variation(3));
        assert!(!wb.is_busy(Action::Variations));
    }

    #[tokio::test]
    async fn test_variations_empty_reply() {
        let backend = FakeBackend::default();
        let mut wb = bench_with_image("A cat");
        wb.generate_variations(&backend).await.unwrap();
        assert_eq!(wb.error(), Some(NO_VARIATIONS_RETURNED));
        assert!(wb.variations().is_empty());
    }

    #[test]
    fn test_apply_builder_overwrites_prompt() {
        let mut wb = bench_with_image("old");
        let builder = PromptBuilder { scale: "1/4".into(), ..PromptBuilder::default() };
        wb.apply_builder(&builder);
        assert!(wb.prompt().starts_with("Create a 1/4 scale commercialized figure"));
    }

    #[test]
    fn test_reuse_result_adds_generated_source() {
        let mut wb = bench_with_image("p");
        assert!(wb.reuse_result().is_none());
        wb.begin_mix().unwrap();
        wb.finish_mix(Ok(Some("iVBORw==".into())));
        let id = wb.reuse_result().unwrap();
        let rec = wb.images().get(id).unwrap();
        assert_eq!(rec.source(), SourceKind::Generated);
        assert_eq!(rec.mime_type(), "image/png");
        assert_eq!(rec.payload(), "iVBORw==");
        assert_eq!(wb.images().len(), 2);
    }
}
