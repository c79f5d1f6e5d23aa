//! Configuration types for PDF text extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder lets callers set only what they care about and rely on documented
//! defaults for the rest.

use crate::backend::{ModelBackend, DEFAULT_MODEL};
use crate::error::PagescribeError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Configuration for a document extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pagescribe::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .chunk_size(5)
///     .concurrency(8)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Pages per chunk. Minimum 1. Default: 3.
    ///
    /// Three pages is the sweet spot for the extraction prompt: enough
    /// context for the model to hold reading order and notice page-spanning
    /// sentences, while each request stays small enough to answer quickly
    /// and retry cheaply. Raise it for documents with many near-empty
    /// pages; lower it to 1 to maximise fan-out on large documents.
    pub chunk_size: usize,

    /// Concurrent in-flight model calls per document. Minimum 1. Default: 5.
    ///
    /// The API is network-bound, not CPU-bound, so five requests at once cut
    /// wall-clock time roughly fivefold. If you hit rate-limit errors
    /// (`429`), lower this; the retry policy absorbs occasional rejections
    /// either way.
    pub concurrency: usize,

    /// Model identifier sent to the API. Default: `"gemini-2.5-flash"`.
    pub model: String,

    /// API key. Falls back to the `GEMINI_API_KEY` environment variable when
    /// unset; extraction fails before any work if neither resolves. An empty
    /// string counts as unset.
    pub api_key: Option<String>,

    /// Retries per chunk after the first attempt. Default: 4 (5 attempts).
    ///
    /// Most model-side failures are transient: an overloaded backend, a
    /// malformed answer, a momentary rate limit. Five attempts with the
    /// backoff below catch the vast majority without stalling a chunk for
    /// minutes. A chunk that exhausts the budget degrades to an empty
    /// result instead of failing the document.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds; doubles per retry. Default: 4000.
    ///
    /// With the default, retries wait 4 s, 8 s, 16 s, 32 s. Doubling avoids
    /// the thundering herd where every concurrent chunk retries at once
    /// against a recovering endpoint.
    pub retry_backoff_ms: u64,

    /// Upper bound on a single backoff wait in milliseconds. Default: 60000.
    pub retry_backoff_cap_ms: u64,

    /// Cooldown in milliseconds after a chunk exhausts its retries on a
    /// quota or rate-limit signature. Default: 10000.
    ///
    /// A courtesy pause before sibling chunks keep hammering the same
    /// project quota. It runs once per exhausted chunk and does not
    /// resurrect the chunk.
    pub quota_cooldown_ms: u64,

    /// Custom instruction prompt. When `None`, the built-in
    /// [`crate::prompts::EXTRACTION_PROMPT`] is used.
    ///
    /// An override must still demand the `{"data": [...]}` JSON shape, or
    /// every chunk will fail payload parsing.
    pub prompt: Option<String>,

    /// Pre-constructed model backend. Takes precedence over `api_key` and
    /// the environment. This is the seam tests and embedding applications
    /// use to supply a scripted or wrapped backend.
    pub backend: Option<Arc<dyn ModelBackend>>,

    /// Progress callback receiving per-chunk events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            concurrency: 5,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_retries: 4,
            retry_backoff_ms: 4_000,
            retry_backoff_cap_ms: 60_000,
            quota_cooldown_ms: 10_000,
            prompt: None,
            backend: None,
            progress_callback: None,
        }
    }
}

// Trait objects have no useful Debug output; show whether they are set.
impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("retry_backoff_cap_ms", &self.retry_backoff_cap_ms)
            .field("quota_cooldown_ms", &self.quota_cooldown_ms)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ModelBackend>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Start building a configuration.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Default)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    /// Set pages per chunk. Values below 1 are clamped to 1.
    pub fn chunk_size(mut self, pages: usize) -> Self {
        self.config.chunk_size = pages.max(1);
        self
    }

    /// Set the number of concurrent model calls. Values below 1 are clamped
    /// to 1.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Set the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the retry budget per chunk.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the initial backoff delay in milliseconds.
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Set the backoff cap in milliseconds.
    pub fn retry_backoff_cap_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_cap_ms = ms;
        self
    }

    /// Set the post-exhaustion quota cooldown in milliseconds.
    pub fn quota_cooldown_ms(mut self, ms: u64) -> Self {
        self.config.quota_cooldown_ms = ms;
        self
    }

    /// Replace the default instruction prompt.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    /// Inject a pre-constructed model backend.
    pub fn backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Attach a progress callback.
    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Validate and produce the final configuration.
    pub fn build(self) -> Result<ExtractionConfig, PagescribeError> {
        let config = self.config;

        if config.model.is_empty() {
            return Err(PagescribeError::InvalidConfig(
                "model must not be empty".to_string(),
            ));
        }
        if config.retry_backoff_cap_ms < config.retry_backoff_ms {
            return Err(PagescribeError::InvalidConfig(format!(
                "retry_backoff_cap_ms ({}) must be at least retry_backoff_ms ({})",
                config.retry_backoff_cap_ms, config.retry_backoff_ms
            )));
        }
        if let Some(ref prompt) = config.prompt {
            if prompt.trim().is_empty() {
                return Err(PagescribeError::InvalidConfig(
                    "prompt override must not be empty".to_string(),
                ));
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ModelReply;
    use crate::document::PdfChunk;
    use crate::error::ModelError;

    struct DummyBackend;

    #[async_trait::async_trait]
    impl ModelBackend for DummyBackend {
        async fn transcribe(
            &self,
            _chunk: &PdfChunk,
            _prompt: &str,
        ) -> Result<ModelReply, ModelError> {
            Err(ModelError::EmptyResponse)
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.chunk_size, 3);
        assert_eq!(c.concurrency, 5);
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.max_retries, 4);
        assert_eq!(c.retry_backoff_ms, 4_000);
        assert_eq!(c.retry_backoff_cap_ms, 60_000);
        assert_eq!(c.quota_cooldown_ms, 10_000);
        assert!(c.api_key.is_none());
        assert!(c.prompt.is_none());
        assert!(c.backend.is_none());
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn builder_clamps_degenerate_values() {
        let c = ExtractionConfig::builder()
            .chunk_size(0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.chunk_size, 1);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn build_rejects_inverted_backoff_bounds() {
        let err = ExtractionConfig::builder()
            .retry_backoff_ms(5_000)
            .retry_backoff_cap_ms(1_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, PagescribeError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_empty_model() {
        let err = ExtractionConfig::builder().model("").build().unwrap_err();
        assert!(matches!(err, PagescribeError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_blank_prompt_override() {
        let err = ExtractionConfig::builder()
            .prompt("   ")
            .build()
            .unwrap_err();
        assert!(matches!(err, PagescribeError::InvalidConfig(_)));
    }

    #[test]
    fn debug_elides_trait_objects_and_secrets() {
        let c = ExtractionConfig::builder()
            .api_key("sk-very-secret")
            .backend(Arc::new(DummyBackend))
            .build()
            .unwrap();
        let s = format!("{c:?}");
        assert!(s.contains("<dyn ModelBackend>"));
        assert!(s.contains("<redacted>"));
        assert!(!s.contains("sk-very-secret"));
        assert!(!s.contains("DummyBackend"));
    }
}
