//! Document-level extraction entry points.
//!
//! [`extract`] drives a single document end to end: read, split, fan the
//! chunks out against the model under a counting limiter, merge, render.
//! [`extract_dir`] runs the same pipeline over every PDF in a directory with
//! document-level concurrency, each document getting its own limiter.

use crate::backend::{GeminiBackend, ModelBackend, API_KEY_ENV};
use crate::config::ExtractionConfig;
use crate::document::PdfChunk;
use crate::error::PagescribeError;
use crate::output::{BatchSummary, ChunkResult, DocumentMetadata, ExtractionOutput, ExtractionStats};
use crate::pipeline::{input, merge, render, split, transcribe};
use futures::future::join_all;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Extract a single PDF document.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ExtractionOutput)` on success, even if some chunks failed; check
/// `output.stats.failed_chunks` for partial results.
///
/// # Errors
/// Returns `Err(PagescribeError)` only for fatal conditions: a missing
/// credential (checked before the input is touched), an unreadable path, a
/// non-PDF file, or a corrupt document. A document whose chunks all fail is
/// NOT an error; it renders as empty text.
pub async fn extract(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PagescribeError> {
    let path = input_path.as_ref();
    let backend = resolve_backend(config)?;

    info!("Starting extraction: {}", path.display());
    let bytes = input::read_pdf_bytes(path).await?;
    extract_with_backend(path, bytes, backend, config).await
}

/// Extract PDF bytes already held in memory.
pub async fn extract_from_bytes(
    bytes: Vec<u8>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PagescribeError> {
    let backend = resolve_backend(config)?;
    let source = Path::new("<memory>");
    input::check_magic(source, &bytes)?;
    extract_with_backend(source, bytes, backend, config).await
}

async fn extract_with_backend(
    source: &Path,
    bytes: Vec<u8>,
    backend: Arc<dyn ModelBackend>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PagescribeError> {
    let total_start = Instant::now();

    // ── Step 1: Parse the document ───────────────────────────────────────
    let split_start = Instant::now();
    let doc = split::load_document(source, bytes).await?;
    let metadata = split::document_metadata(&doc);
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 2: Split into page chunks ───────────────────────────────────
    let chunks = split::split_document(doc, config.chunk_size).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;
    debug!(
        "Split into {} chunks of up to {} pages in {}ms",
        chunks.len(),
        config.chunk_size,
        split_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(chunks.len());
    }

    // ── Step 3: Fan out against the model ────────────────────────────────
    let model_start = Instant::now();
    let chunk_results = process_chunks(&backend, chunks, config).await;
    let model_duration_ms = model_start.elapsed().as_millis() as u64;

    // ── Step 4: Merge and render ─────────────────────────────────────────
    let merged = merge::merge_results(&chunk_results);
    let text = render::render_text(&merged);

    // ── Step 5: Compute stats ────────────────────────────────────────────
    let processed = chunk_results.iter().filter(|c| c.is_success()).count();
    let stats = ExtractionStats {
        total_pages,
        chunk_count: chunk_results.len(),
        processed_chunks: processed,
        failed_chunks: chunk_results.len() - processed,
        item_count: merged.data.len(),
        total_input_tokens: chunk_results.iter().map(|c| c.input_tokens as u64).sum(),
        total_output_tokens: chunk_results.iter().map(|c| c.output_tokens as u64).sum(),
        split_duration_ms,
        model_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    if stats.failed_chunks > 0 {
        warn!(
            "{}/{} chunks failed; their pages are missing from the output",
            stats.failed_chunks, stats.chunk_count
        );
    }
    info!(
        "Extraction complete: {}/{} chunks, {} items, {}ms total",
        processed, stats.chunk_count, stats.item_count, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(stats.chunk_count, processed);
    }

    Ok(ExtractionOutput {
        text,
        items: merged.data,
        chunks: chunk_results,
        metadata,
        stats,
    })
}

/// Fan chunks out against the backend, bounded by the per-document limiter.
///
/// One future per chunk, each acquiring a semaphore permit before its model
/// call. `join_all` returns results in chunk order regardless of completion
/// order, which keeps the downstream merge deterministic.
async fn process_chunks(
    backend: &Arc<dyn ModelBackend>,
    chunks: Vec<PdfChunk>,
    config: &ExtractionConfig,
) -> Vec<ChunkResult> {
    let total_chunks = chunks.len();
    let limiter = Arc::new(Semaphore::new(config.concurrency));

    let tasks = chunks.into_iter().enumerate().map(|(chunk_index, chunk)| {
        let backend = Arc::clone(backend);
        let limiter = Arc::clone(&limiter);
        let config = config.clone();
        async move {
            // The limiter is never closed; the permit is held for the whole
            // call, retries included.
            let _permit = limiter.acquire().await.ok();

            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_start(chunk_index, total_chunks);
            }
            let result = transcribe::process_chunk(&backend, chunk, chunk_index, &config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => cb.on_chunk_complete(chunk_index, total_chunks, result.items.len()),
                    Some(e) => cb.on_chunk_error(chunk_index, total_chunks, e.to_string()),
                }
            }
            result
        }
    });

    join_all(tasks).await
}

/// Resolve the model backend, from most-specific to least-specific source.
///
/// 1. **Pre-built backend** (`config.backend`): the caller constructed the
///    backend entirely. Used by tests and by embedders that need custom
///    middleware (caching, recording, a different provider).
/// 2. **Explicit key** (`config.api_key`): build a [`GeminiBackend`] for the
///    configured model.
/// 3. **Environment** (`GEMINI_API_KEY`): same, with the key from the
///    environment.
///
/// Empty strings count as unset. With no key from any source this fails with
/// [`PagescribeError::MissingApiKey`] before any file or network work.
fn resolve_backend(config: &ExtractionConfig) -> Result<Arc<dyn ModelBackend>, PagescribeError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let api_key = config
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()))
        .ok_or(PagescribeError::MissingApiKey)?;

    Ok(Arc::new(GeminiBackend::new(api_key, config.model.clone())))
}

/// Extract a document and write the rendered text to
/// `<output_dir>/<input_basename>.txt`.
///
/// The write is atomic (temp file + rename) so readers never observe a
/// partial file; the output directory is created if missing. Returns the
/// full output so callers can inspect stats or serialise the structured
/// result without re-running the extraction.
pub async fn extract_to_file(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PagescribeError> {
    let input_path = input_path.as_ref();
    let output = extract(input_path, config).await?;
    let path = output_path(input_path, output_dir.as_ref());

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            PagescribeError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            }
        })?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, &output.text).await.map_err(|e| {
        PagescribeError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        }
    })?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
        PagescribeError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        }
    })?;

    info!("Wrote {}", path.display());
    Ok(output)
}

/// Where [`extract_to_file`] writes the text for `input_path`.
///
/// Only the final extension is replaced, so `report.v2.pdf` becomes
/// `report.v2.txt`.
pub fn output_path(input_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_else(|| OsStr::new("output"));
    output_dir.join(format!("{}.txt", stem.to_string_lossy()))
}

/// Synchronous wrapper around [`extract`] for non-async callers.
///
/// Builds a throwaway tokio runtime internally; do not call from inside an
/// async context.
pub fn extract_sync(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, PagescribeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PagescribeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_path, config))
}

/// Read document metadata without calling the model.
///
/// Requires no API key.
pub async fn inspect(input_path: impl AsRef<Path>) -> Result<DocumentMetadata, PagescribeError> {
    let path = input_path.as_ref();
    let bytes = input::read_pdf_bytes(path).await?;
    let doc = split::load_document(path, bytes).await?;
    Ok(split::document_metadata(&doc))
}

/// Extract every PDF in a directory (non-recursive).
///
/// Documents run concurrently at the document level; each gets its own
/// chunk-level limiter, so one slow document cannot starve another's
/// permits. Per-document fatal failures (unreadable, corrupt) are logged,
/// counted, and skipped; the batch itself fails only on a missing credential
/// or a path that is not a directory. A progress callback, if set, receives
/// each document's chunk events without document identity, so batch callers
/// usually leave it unset.
pub async fn extract_dir(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchSummary, PagescribeError> {
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.as_ref();

    if !input_dir.is_dir() {
        return Err(PagescribeError::NotADirectory {
            path: input_dir.to_path_buf(),
        });
    }

    // Resolve the credential once so a missing key fails before any
    // document work, then share the backend across documents.
    let backend = resolve_backend(config)?;
    let mut doc_config = config.clone();
    doc_config.backend = Some(backend);

    let documents = discover_pdfs(input_dir).await?;
    if documents.is_empty() {
        warn!("No PDF files found in {}", input_dir.display());
        return Ok(BatchSummary::default());
    }

    info!(
        "Batch extracting {} documents from {}",
        documents.len(),
        input_dir.display()
    );

    let tasks = documents.iter().map(|path| {
        let doc_config = doc_config.clone();
        async move {
            let result = extract_to_file(path, output_dir, &doc_config).await;
            (path, result)
        }
    });

    let mut summary = BatchSummary {
        total: documents.len(),
        ..BatchSummary::default()
    };

    for (path, result) in join_all(tasks).await {
        match result {
            Ok(output) => {
                summary.succeeded += 1;
                summary.outputs.push(output_path(path, output_dir));
                debug!(
                    "{}: {}/{} chunks, {} items",
                    path.display(),
                    output.stats.processed_chunks,
                    output.stats.chunk_count,
                    output.stats.item_count
                );
            }
            Err(e) => {
                summary.failed += 1;
                error!("Extraction failed for {}: {}", path.display(), e);
            }
        }
    }

    Ok(summary)
}

/// Non-recursive `*.pdf` discovery, case-insensitive, sorted by name.
async fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, PagescribeError> {
    let read_err = |e: std::io::Error| {
        PagescribeError::Internal(format!("Failed to read directory {}: {}", dir.display(), e))
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut documents = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}
