//! Result merging: concatenate chunk results and order them globally.

use crate::document::{ContentItem, ExtractionResult};
use crate::output::ChunkResult;

/// Merge per-chunk results into one document-ordered [`ExtractionResult`].
///
/// Items are concatenated in chunk order (failed chunks carry no items) and
/// stable-sorted by global `page_index`. Stability matters: chunks partition
/// the page range, so equal page indices can only come from the same chunk,
/// and their intra-chunk reading order must survive the sort.
pub fn merge_results(chunks: &[ChunkResult]) -> ExtractionResult {
    let mut data: Vec<ContentItem> = chunks
        .iter()
        .flat_map(|chunk| chunk.items.iter().cloned())
        .collect();

    // Vec::sort_by_key is stable.
    data.sort_by_key(|item| item.page_index);

    ExtractionResult { data }
}
