//! Text rendering: merged items to the final page-marked text.
//!
//! The renderer is an append-mostly block builder with one correction rule:
//! when the previously emitted item was flagged incomplete and the current
//! item is a paragraph, the previous content block is popped and the two
//! contents are re-emitted as one merged block. Keeping blocks in a
//! `Vec<String>` until the final join makes that splice a constant-time pop
//! instead of a rewrite of already-streamed output.

use crate::document::{ExtractionResult, ItemKind};

/// Render a merged extraction into the output text.
///
/// Blocks are joined by blank lines. Each page transition emits a
/// `[page_index: N]` marker, preceded by an empty separator block unless it
/// opens the document. Sub-titles get a `## ` prefix; paragraphs and tables
/// are emitted verbatim. An empty extraction renders as the empty string.
pub fn render_text(result: &ExtractionResult) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut current_page: Option<usize> = None;
    let mut prev_incomplete = false;
    let mut prev_content = String::new();

    for item in &result.data {
        let mut content = item.content.clone();

        // Stitch a page-spanning sentence: pop the previous content block
        // and merge it into this one. The carried-forward content is the
        // merged value, so chains of incomplete paragraphs keep stitching.
        if prev_incomplete && item.kind == ItemKind::Paragraph {
            blocks.pop();
            content = format!("{} {}", prev_content, content);
        }

        if current_page != Some(item.page_index) {
            if !blocks.is_empty() {
                blocks.push(String::new());
            }
            blocks.push(format!("[page_index: {}]", item.page_index));
            current_page = Some(item.page_index);
        }

        match item.kind {
            ItemKind::SubTitle => blocks.push(format!("## {}", content)),
            ItemKind::Paragraph | ItemKind::Table => blocks.push(content.clone()),
        }

        prev_incomplete = item.is_incomplete;
        prev_content = content;
    }

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ContentItem;

    fn item(kind: ItemKind, page_index: usize, content: &str, is_incomplete: bool) -> ContentItem {
        ContentItem {
            kind,
            page_index,
            content: content.into(),
            is_incomplete,
        }
    }

    fn result(data: Vec<ContentItem>) -> ExtractionResult {
        ExtractionResult { data }
    }

    #[test]
    fn empty_extraction_renders_empty() {
        assert_eq!(render_text(&result(vec![])), "");
    }

    #[test]
    fn single_paragraph_gets_a_page_marker() {
        let text = render_text(&result(vec![item(ItemKind::Paragraph, 0, "Hello.", false)]));
        assert_eq!(text, "[page_index: 0]\n\nHello.");
    }

    #[test]
    fn sub_titles_are_prefixed() {
        let text = render_text(&result(vec![
            item(ItemKind::SubTitle, 0, "Introduction", false),
            item(ItemKind::Paragraph, 0, "Body.", false),
        ]));
        assert_eq!(text, "[page_index: 0]\n\n## Introduction\n\nBody.");
    }

    #[test]
    fn tables_are_verbatim() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        let text = render_text(&result(vec![item(ItemKind::Table, 0, table, false)]));
        assert_eq!(text, format!("[page_index: 0]\n\n{table}"));
    }

    #[test]
    fn page_transitions_emit_separated_markers() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "One.", false),
            item(ItemKind::Paragraph, 1, "Two.", false),
        ]));
        assert_eq!(text, "[page_index: 0]\n\nOne.\n\n\n\n[page_index: 1]\n\nTwo.");
    }

    #[test]
    fn incomplete_paragraph_stitches_across_pages() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "The cat sat on the", true),
            item(ItemKind::Paragraph, 1, "mat.", false),
        ]));
        // The page-0 content block is replaced; its marker stays, and the
        // merged sentence lands under the page-1 marker.
        assert_eq!(
            text,
            "[page_index: 0]\n\n\n\n[page_index: 1]\n\nThe cat sat on the mat."
        );
    }

    #[test]
    fn stitching_chains_through_consecutive_incompletes() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "It was the best", true),
            item(ItemKind::Paragraph, 1, "of times, it was", true),
            item(ItemKind::Paragraph, 2, "the worst of times.", false),
        ]));
        assert!(text.ends_with("It was the best of times, it was the worst of times."));
        assert_eq!(text.matches("It was the best").count(), 1);
    }

    #[test]
    fn incomplete_followed_by_table_does_not_stitch() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "Results are shown in", true),
            item(ItemKind::Table, 1, "| x |", false),
        ]));
        assert!(text.contains("Results are shown in"));
        assert!(text.contains("| x |"));
        assert!(!text.contains("Results are shown in | x |"));
    }

    #[test]
    fn incomplete_followed_by_sub_title_does_not_stitch() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "trailing clause", true),
            item(ItemKind::SubTitle, 1, "Next Section", false),
        ]));
        assert!(text.contains("trailing clause"));
        assert!(text.contains("## Next Section"));
    }

    #[test]
    fn same_page_stitch_replaces_in_place() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "Split mid", true),
            item(ItemKind::Paragraph, 0, "sentence.", false),
        ]));
        assert_eq!(text, "[page_index: 0]\n\nSplit mid sentence.");
    }

    #[test]
    fn complete_items_map_to_one_block_each() {
        let text = render_text(&result(vec![
            item(ItemKind::Paragraph, 0, "a", false),
            item(ItemKind::Paragraph, 0, "b", false),
            item(ItemKind::Paragraph, 1, "c", false),
        ]));
        // 3 content blocks + 2 page markers + 1 separator block.
        let blocks: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(blocks.len(), 6);
        assert_eq!(
            blocks
                .iter()
                .filter(|b| b.starts_with("[page_index:"))
                .count(),
            2
        );
    }
}
