//! Content data model shared by every pipeline stage.
//!
//! [`PdfChunk`] is the unit of work produced by the splitter and consumed by
//! the model backend. [`ContentItem`] and [`ExtractionResult`] mirror the JSON
//! contract the extraction prompt demands from the model, so the backend can
//! deserialise a response payload directly. The serde defaults are deliberate:
//! a model that omits a field or invents a new `type` yields a usable item
//! instead of a decode failure for the whole chunk.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous page range of the source PDF, materialised as an independent
/// single-document byte blob.
///
/// Chunks are created once by the splitter and never mutated. `start_page` is
/// the zero-based index of the chunk's first page in the source document; it
/// is the offset added to every chunk-local `page_index` during rebasing.
#[derive(Clone)]
pub struct PdfChunk {
    /// A complete, standalone PDF containing only this chunk's pages.
    pub bytes: Vec<u8>,
    /// Zero-based index of the first page within the source document.
    pub start_page: usize,
    /// Number of pages in this chunk. The final chunk may be short.
    pub page_count: usize,
}

impl PdfChunk {
    /// Exclusive end of this chunk's page range in the source document.
    pub fn end_page(&self) -> usize {
        self.start_page + self.page_count
    }
}

impl fmt::Debug for PdfChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfChunk")
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .field("start_page", &self.start_page)
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// Element kind reported by the model for a [`ContentItem`].
///
/// Unknown kinds deserialise as [`ItemKind::Paragraph`], so a model that
/// invents a label (say `"caption"`) degrades to plain text rather than
/// failing the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A section heading; rendered with a `## ` prefix.
    SubTitle,
    /// A table, pre-formatted as markdown pipes by the model.
    Table,
    /// Running body text. The default and the fallback for unknown kinds.
    #[default]
    #[serde(other)]
    Paragraph,
}

/// One extracted document element with its page origin and completeness flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Element kind. The wire name is `type`.
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    /// Page the element was read from. Chunk-local (zero-based) as produced
    /// by the model; document-global after rebasing.
    #[serde(default)]
    pub page_index: usize,
    /// The element's text. Tables arrive pre-formatted as markdown.
    #[serde(default)]
    pub content: String,
    /// True when this is the trailing paragraph of a page whose sentence
    /// continues on the next page. Only meaningful on the last item of a
    /// page; the renderer inspects it on the immediately preceding item.
    #[serde(default)]
    pub is_incomplete: bool,
}

/// The model's answer for one chunk and, after merging, for the whole
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Items in the model's reading order (top-to-bottom, page-ascending).
    #[serde(default)]
    pub data: Vec<ContentItem>,
}

impl ExtractionResult {
    /// Translate every chunk-local `page_index` to a document-global one by
    /// adding the chunk's starting page.
    pub fn rebase_pages(&mut self, base_page: usize) {
        for item in &mut self.data {
            item.page_index += base_page;
        }
    }
}
