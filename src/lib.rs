//! # pagescribe
//!
//! Extract structured, ordered text from PDF documents using a multimodal
//! model.
//!
//! ## Why this crate?
//!
//! Traditional PDF text extractors (pdftotext, pdf-extract) lose document
//! structure: multi-column layouts come out interleaved, tables collapse
//! into word soup, and headings are indistinguishable from body text.
//! Sending the whole document to a multimodal model fixes the structure
//! problem but fails on length: answers degrade past a few pages, and a
//! single transient error costs the entire document. pagescribe splits the
//! PDF into small page chunks, has the model transcribe each chunk into
//! typed elements (headings, paragraphs, tables) concurrently, and
//! reassembles one ordered text with page markers, stitching sentences that
//! a page break cut in half.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       read and validate the source bytes
//!  ├─ 2. Split       slice into 3-page chunks (lopdf, spawn_blocking)
//!  ├─ 3. Transcribe  concurrent Gemini calls with retry + backoff
//!  ├─ 4. Merge       stable sort by global page index
//!  └─ 5. Render      page markers, '##' headings, sentence stitching
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagescribe::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract("document.pdf", &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Output Format
//!
//! ```text
//! [page_index: 0]
//!
//! ## Introduction
//!
//! The opening paragraph, re-flowed into running text.
//!
//!
//!
//! [page_index: 1]
//!
//! | metric | value |
//! |--------|-------|
//! | pages  | 12    |
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagescribe` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//!
//! ```toml
//! [dependencies]
//! pagescribe = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports: the public API surface ───────────────────────────────────────

pub use backend::{GeminiBackend, ModelBackend, ModelReply, API_KEY_ENV, DEFAULT_MODEL};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{ContentItem, ExtractionResult, ItemKind, PdfChunk};
pub use error::{ChunkError, ModelError, PagescribeError};
pub use extract::{
    extract, extract_dir, extract_from_bytes, extract_sync, extract_to_file, inspect, output_path,
};
pub use output::{BatchSummary, ChunkResult, DocumentMetadata, ExtractionOutput, ExtractionStats};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
