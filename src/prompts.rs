//! Instruction prompt for chunk transcription.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth**: tightening an extraction rule (say, the
//!    table format) means editing exactly one place.
//!
//! 2. **Testability**: unit tests can check the prompt pins the JSON schema
//!    without a live model, so schema regressions are caught early.
//!
//! Callers override it via [`crate::config::ExtractionConfig::prompt`]; the
//! constant here is used whenever no override is provided.

/// Default instruction sent with every chunk.
///
/// The model receives this text plus the chunk's PDF bytes and must answer
/// with a single JSON object. `page_index` is zero-based and local to the
/// pages the model was given; the chunk processor rebases it afterwards.
pub const EXTRACTION_PROMPT: &str = r#"You are an expert document transcriber. Read the attached PDF pages in natural reading order (top to bottom, page by page) and extract every content element.

Respond with ONLY a JSON object of this exact shape:

{"data": [{"type": "...", "page_index": 0, "content": "...", "is_incomplete": false}, ...]}

Follow these rules precisely:

1. ELEMENT TYPES
   - "sub_title" for section headings and titles
   - "paragraph" for running body text
   - "table" for tabular content

2. PAGE INDEXING
   - page_index is zero-based and relative to the pages you were given
   - The first attached page is page_index 0, the second is 1, and so on
   - List elements in reading order within each page, pages ascending

3. TEXT RECONSTRUCTION
   - Join line breaks that fall mid-sentence or mid-word into flowing text
   - Preserve the original wording exactly; never summarise or paraphrase
   - Put heading text in "content" without any markdown markers

4. TABLES
   - Format tables as GitHub-flavoured markdown pipes inside "content"
   - Keep every row and every cell; never truncate wide tables

5. WHAT TO EXCLUDE
   - Page numbers
   - Headers and footers repeated on every page
   - Decorative rules and borders with no content meaning

6. INCOMPLETE PARAGRAPHS
   - If the last paragraph of a page stops mid-sentence and continues on
     the next page, set "is_incomplete": true on that paragraph
   - Every other element gets "is_incomplete": false

7. OUTPUT FORMAT
   - Output ONLY the JSON object
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary, explanations, or keys beyond the schema"#;
