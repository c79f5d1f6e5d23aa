//! Error types for the pagescribe library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`PagescribeError`]: **fatal**. The extraction cannot proceed at all
//!   (missing credential, unreadable input, corrupt PDF). Returned as
//!   `Err(PagescribeError)` from the top-level `extract*` functions.
//!
//! * [`ChunkError`]: **non-fatal**. A single chunk failed after every retry
//!   while its siblings are fine. Stored inside
//!   [`crate::output::ChunkResult`] so callers can inspect partial success
//!   rather than losing the whole document to one bad chunk.
//!
//! * [`ModelError`]: **retryable**. One model call failed (HTTP transport,
//!   API status, empty or malformed payload). The chunk processor retries
//!   these with backoff; only the final one survives, folded into a
//!   [`ChunkError`].
//!
//! The separation lets callers pick their own tolerance: check
//! `ChunkResult::error` per chunk, or trust the merged output and ignore
//! failures entirely.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagescribe library.
///
/// Chunk-level failures use [`ChunkError`] and are stored in
/// [`crate::output::ChunkResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PagescribeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but does not start with the PDF magic.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Batch mode was pointed at something that is not a directory.
    #[error("'{path}' is not a directory\nPass a single PDF file or a directory of PDFs.")]
    NotADirectory { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf repaired.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A chunk sub-document could not be assembled or serialised.
    #[error("Failed to split out pages starting at {start_page}: {detail}")]
    SplitFailed { start_page: usize, detail: String },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No API key was supplied and the environment variable is unset.
    #[error("No API key configured.\nPass --api-key <KEY> or set the GEMINI_API_KEY environment variable.")]
    MissingApiKey,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (runtime construction, task panic).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal, per-chunk failure.
///
/// Constructed only after the retry budget is spent. The extraction
/// continues; a failed chunk simply contributes no items to the merge.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Model call failed on every attempt.
    #[error("Chunk {chunk}: model call failed after {retries} retries: {detail}")]
    ModelFailed {
        chunk: usize,
        retries: u8,
        detail: String,
    },

    /// Model call failed on every attempt with a quota or rate-limit
    /// signature. The cooldown sleep has already happened by the time this
    /// is constructed.
    #[error("Chunk {chunk}: quota or rate limit exhausted: {detail}")]
    QuotaExhausted { chunk: usize, detail: String },
}

/// A retryable error from a single model call.
///
/// Every variant triggers the chunk processor's backoff-and-retry policy;
/// none of them escapes to the caller directly.
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP transport failure (connect, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but carried no candidate text.
    #[error("API response contained no candidate text")]
    EmptyResponse,

    /// The candidate text was not the JSON payload the prompt demands.
    #[error("Model returned invalid JSON: {detail}")]
    InvalidPayload { detail: String, excerpt: String },
}

impl ModelError {
    /// True when the error looks like a quota or rate-limit rejection, which
    /// earns the chunk its post-exhaustion cooldown.
    pub fn is_quota(&self) -> bool {
        if let ModelError::Api { status: 429, .. } = self {
            return true;
        }
        let text = self.to_string().to_lowercase();
        text.contains("quota") || text.contains("rate limit")
    }
}
