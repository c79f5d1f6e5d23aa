//! Pipeline stages for chunked PDF extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different model backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ transcribe ──▶ merge ──▶ render
//! (read)   (lopdf)  (model+retry)   (sort)    (text)
//! ```
//!
//! 1. [`input`]: read and validate the source PDF bytes
//! 2. [`split`]: parse and slice into page chunks; runs in `spawn_blocking`
//!    because lopdf is synchronous and CPU-bound
//! 3. [`transcribe`]: drive the model call with retry/backoff and page
//!    rebasing; the only stage with network I/O
//! 4. [`merge`]: concatenate chunk results, stable-sorted by global page
//! 5. [`render`]: assemble text blocks with page markers and
//!    incomplete-paragraph stitching

pub mod input;
pub mod merge;
pub mod render;
pub mod split;
pub mod transcribe;
