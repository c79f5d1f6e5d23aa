//! Output types: per-chunk results, merged document output, statistics,
//! metadata, and batch summaries.
//!
//! Everything here derives `Serialize`/`Deserialize` so the CLI's `--json`
//! mode and any embedding application can persist a full extraction report
//! without extra mapping code.

use crate::document::ContentItem;
use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The result of transcribing one chunk.
///
/// Always produced, success or failure: a failed chunk carries empty `items`
/// and a populated `error`, so the merge can skip it without special cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// Position of the chunk in the split sequence (zero-based).
    pub chunk_index: usize,
    /// First page of the chunk in the source document (zero-based).
    pub start_page: usize,
    /// Pages in the chunk.
    pub page_count: usize,
    /// Extracted items with document-global page indices. Empty on failure.
    pub items: Vec<ContentItem>,
    /// Prompt tokens reported by the API (0 when unreported or failed).
    pub input_tokens: u32,
    /// Candidate tokens reported by the API (0 when unreported or failed).
    pub output_tokens: u32,
    /// Wall-clock time for this chunk, including retries and backoff.
    pub duration_ms: u64,
    /// Retries consumed before the final outcome.
    pub retries: u8,
    /// Present when the chunk exhausted its retry budget.
    pub error: Option<ChunkError>,
}

impl ChunkResult {
    /// True when the chunk produced usable items.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Complete output of a single document extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The rendered text, exactly as written to the output file.
    pub text: String,
    /// Merged items, ordered by global page index.
    pub items: Vec<ContentItem>,
    /// Per-chunk results in chunk order, failed chunks included.
    pub chunks: Vec<ChunkResult>,
    /// Metadata read from the PDF itself.
    pub metadata: DocumentMetadata,
    /// Aggregate statistics.
    pub stats: ExtractionStats,
}

/// Aggregate statistics for one document extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Chunks the document was split into.
    pub chunk_count: usize,
    /// Chunks that produced items.
    pub processed_chunks: usize,
    /// Chunks that exhausted their retry budget.
    pub failed_chunks: usize,
    /// Items in the merged result.
    pub item_count: usize,
    /// Sum of prompt tokens across chunks.
    pub total_input_tokens: u64,
    /// Sum of candidate tokens across chunks.
    pub total_output_tokens: u64,
    /// Time spent parsing and splitting the PDF.
    pub split_duration_ms: u64,
    /// Time spent in the model fan-out, bounded by the concurrency limiter.
    pub model_duration_ms: u64,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
}

/// Document metadata from the PDF trailer's Info dictionary.
///
/// Available without a credential via [`crate::inspect`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Page count of the source document.
    pub page_count: usize,
    /// PDF version from the header, e.g. "1.7".
    pub pdf_version: String,
    /// True when the trailer carries an Encrypt dictionary.
    pub is_encrypted: bool,
}

/// Outcome of a batch run over a directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// PDF files discovered.
    pub total: usize,
    /// Documents whose output file was written.
    pub succeeded: usize,
    /// Documents that failed fatally (unreadable, corrupt) and were skipped.
    pub failed: usize,
    /// Output files written, in discovery order.
    pub outputs: Vec<PathBuf>,
}
