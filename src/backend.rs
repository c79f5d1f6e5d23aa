//! Model backend: the trait seam plus the Gemini REST implementation.
//!
//! The pipeline talks to the model through [`ModelBackend`], an object-safe
//! async trait. Production uses [`GeminiBackend`]; tests and embedders inject
//! their own implementation through
//! [`crate::config::ExtractionConfig::backend`].
//!
//! ## Request shape
//!
//! One `generateContent` call per chunk: a text part carrying the extraction
//! prompt, an inline-data part carrying the chunk's PDF bytes base64-encoded
//! as `application/pdf`, and a generation config pinning the response MIME
//! type to JSON. The candidate text is parsed straight into an
//! [`ExtractionResult`]; a surrounding ```json fence (models sometimes
//! disobey the output rules) is stripped first.

use crate::document::{ExtractionResult, PdfChunk};
use crate::error::ModelError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// How much of an unparseable payload to keep in logs and errors.
const EXCERPT_CHARS: usize = 500;

/// A parsed model answer for one chunk, with token accounting.
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// The chunk's items, page indices still chunk-local.
    pub result: ExtractionResult,
    /// Prompt tokens reported by the API (0 when unreported).
    pub input_tokens: u32,
    /// Candidate tokens reported by the API (0 when unreported).
    pub output_tokens: u32,
}

/// One transcription call against an external model.
///
/// Implementations must not retry internally; retrying is the chunk
/// processor's job, and every [`ModelError`] is treated as transient there.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Transcribe one chunk into structured items.
    ///
    /// `prompt` is the full instruction text, either the built-in default or
    /// a caller override.
    async fn transcribe(&self, chunk: &PdfChunk, prompt: &str) -> Result<ModelReply, ModelError>;
}

// Backend trait objects have no useful Debug output (and may hold secrets);
// print a fixed tag so containers of `Arc<dyn ModelBackend>` can be debugged.
impl fmt::Debug for dyn ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<dyn ModelBackend>")
    }
}

/// [`ModelBackend`] speaking the Gemini `generateContent` REST API.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    /// Create a backend for the given key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Point the backend at a different API root. Useful for proxies and
    /// local emulators.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn transcribe(&self, chunk: &PdfChunk, prompt: &str) -> Result<ModelReply, ModelError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::text(prompt), Part::pdf(STANDARD.encode(&chunk.bytes))],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        debug!(
            "Requesting {} for pages {}..{} ({} bytes inline)",
            self.model,
            chunk.start_page,
            chunk.end_page(),
            chunk.bytes.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::InvalidPayload {
                detail: e.to_string(),
                excerpt: excerpt(&body),
            })?;

        let text = parsed.candidate_text().ok_or(ModelError::EmptyResponse)?;
        let result = parse_payload(&text)?;

        let (input_tokens, output_tokens) = parsed
            .usage_metadata
            .map(|usage| (usage.prompt_token_count, usage.candidates_token_count))
            .unwrap_or((0, 0));

        Ok(ModelReply {
            result,
            input_tokens,
            output_tokens,
        })
    }
}

// ── Payload parsing ──────────────────────────────────────────────────────────

static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip one surrounding ```json fence, if present.
fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match RE_JSON_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Parse candidate text into an [`ExtractionResult`].
///
/// Decode failures are logged with an excerpt of the offending payload and
/// surfaced as a retryable [`ModelError::InvalidPayload`].
fn parse_payload(text: &str) -> Result<ExtractionResult, ModelError> {
    serde_json::from_str(strip_json_fences(text)).map_err(|e| {
        let excerpt = excerpt(text);
        error!("Model returned invalid JSON ({}): {}", e, excerpt);
        ModelError::InvalidPayload {
            detail: e.to_string(),
            excerpt,
        }
    })
}

fn excerpt(text: &str) -> String {
    let mut cut: String = text.chars().take(EXCERPT_CHARS).collect();
    if cut.len() < text.len() {
        cut.push('\u{2026}');
    }
    cut
}

// ── Wire types (Gemini generateContent) ──────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl<'a> Part<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn pdf(data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "application/pdf",
                data,
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn candidate_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}
