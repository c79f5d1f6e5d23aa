//! Progress-callback trait for per-chunk extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline fans chunks out against the model.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a broadcast channel, a WebSocket, a database row, or a terminal
//! progress bar without the library knowing how the host application
//! communicates. The trait is `Send + Sync` because chunks are processed
//! concurrently, and the error event carries an owned `String` so callback
//! invocations can cross `tokio::spawn` boundaries.
//!
//! # Example
//!
//! ```rust
//! use pagescribe::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk_index: usize, total_chunks: usize, item_count: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!(
//!             "chunk {} finished ({}/{} done, {} items)",
//!             chunk_index, done, total_chunks, item_count
//!         );
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Receives extraction progress events.
///
/// All methods have default no-op implementations, so implementors override
/// only the events they care about. Chunk indices are zero-based and match
/// [`crate::output::ChunkResult::chunk_index`].
pub trait ExtractionProgressCallback: Send + Sync {
    /// The document has been split; the fan-out is about to start.
    fn on_extraction_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// A chunk acquired a concurrency permit and is being dispatched.
    fn on_chunk_start(&self, chunk_index: usize, total_chunks: usize) {
        let _ = (chunk_index, total_chunks);
    }

    /// A chunk was transcribed successfully.
    fn on_chunk_complete(&self, chunk_index: usize, total_chunks: usize, item_count: usize) {
        let _ = (chunk_index, total_chunks, item_count);
    }

    /// A chunk exhausted its retry budget. `error` is the display text of
    /// the final failure.
    fn on_chunk_error(&self, chunk_index: usize, total_chunks: usize, error: String) {
        let _ = (chunk_index, total_chunks, error);
    }

    /// Every chunk has settled; the document is about to be merged.
    fn on_extraction_complete(&self, total_chunks: usize, success_count: usize) {
        let _ = (total_chunks, success_count);
    }
}

/// A callback that ignores every event. Useful as an explicit placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Shared handle to a progress callback, as stored in
/// [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
