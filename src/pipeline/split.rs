//! PDF structure access: parse, metadata, and page-range splitting.
//!
//! All lopdf work runs on the blocking pool. Parsing a large document and
//! re-serialising chunk sub-documents are CPU-bound, and the fan-out above
//! this module must stay responsive while they run.
//!
//! ## How a chunk is materialised
//!
//! Each chunk is a full copy of the parsed document with every page outside
//! the chunk's window deleted, unreferenced objects pruned, and object ids
//! renumbered before serialisation. The result is a standalone PDF the model
//! can read independently of the source document.

use crate::document::PdfChunk;
use crate::error::PagescribeError;
use crate::output::DocumentMetadata;
use lopdf::{Document, Object};
use std::path::Path;
use tracing::debug;

/// Parse a PDF from bytes on the blocking pool.
///
/// `source` is used for error reporting only.
pub async fn load_document(source: &Path, bytes: Vec<u8>) -> Result<Document, PagescribeError> {
    let path = source.to_path_buf();
    tokio::task::spawn_blocking(move || {
        Document::load_mem(&bytes).map_err(|e| PagescribeError::CorruptPdf {
            path,
            detail: e.to_string(),
        })
    })
    .await
    .map_err(|e| PagescribeError::Internal(format!("Parse task panicked: {}", e)))?
}

/// Split a document into page chunks of at most `chunk_size` pages.
///
/// The returned chunks partition the document's pages exactly: ascending,
/// gap-free, overlap-free, with only the final chunk possibly short. A
/// zero-page document yields an empty vector.
pub async fn split_document(
    doc: Document,
    chunk_size: usize,
) -> Result<Vec<PdfChunk>, PagescribeError> {
    tokio::task::spawn_blocking(move || split_blocking(&doc, chunk_size))
        .await
        .map_err(|e| PagescribeError::Internal(format!("Split task panicked: {}", e)))?
}

fn split_blocking(doc: &Document, chunk_size: usize) -> Result<Vec<PdfChunk>, PagescribeError> {
    let chunk_size = chunk_size.max(1);
    let total_pages = doc.get_pages().len();
    let mut chunks = Vec::with_capacity(total_pages.div_ceil(chunk_size));

    for start_page in (0..total_pages).step_by(chunk_size) {
        let end_page = (start_page + chunk_size).min(total_pages);

        // Page numbers are 1-based in the page tree; the window keeps
        // [start_page, end_page) in zero-based terms.
        let keep = (start_page as u32 + 1)..=(end_page as u32);
        let drop: Vec<u32> = (1..=total_pages as u32)
            .filter(|n| !keep.contains(n))
            .collect();

        let mut piece = doc.clone();
        if !drop.is_empty() {
            piece.delete_pages(&drop);
        }
        piece.prune_objects();
        piece.renumber_objects();
        piece.compress();

        let mut bytes = Vec::new();
        piece
            .save_to(&mut bytes)
            .map_err(|e| PagescribeError::SplitFailed {
                start_page,
                detail: e.to_string(),
            })?;

        debug!(
            "Pages {}..{} serialised to {} bytes",
            start_page,
            end_page,
            bytes.len()
        );

        chunks.push(PdfChunk {
            bytes,
            start_page,
            page_count: end_page - start_page,
        });
    }

    Ok(chunks)
}

/// Read document metadata without touching the model.
pub fn document_metadata(doc: &Document) -> DocumentMetadata {
    let mut metadata = DocumentMetadata {
        page_count: doc.get_pages().len(),
        pdf_version: doc.version.clone(),
        is_encrypted: doc.trailer.get(b"Encrypt").is_ok(),
        ..DocumentMetadata::default()
    };

    if let Some(info) = info_dictionary(doc) {
        metadata.title = info_string(info, b"Title");
        metadata.author = info_string(info, b"Author");
        metadata.subject = info_string(info, b"Subject");
        metadata.creator = info_string(info, b"Creator");
        metadata.producer = info_string(info, b"Producer");
    }

    metadata
}

fn info_dictionary(doc: &Document) -> Option<&lopdf::Dictionary> {
    let id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    match doc.get_object(id) {
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    }
}

fn info_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// Info strings are usually UTF-8 in practice; fall back to a Latin-1 view
/// for the legacy PDFDocEncoding case.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
