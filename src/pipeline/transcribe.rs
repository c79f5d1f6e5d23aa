//! Chunk processing: drive the model call with retry, backoff, and rebasing.
//!
//! This stage owns the failure policy. A chunk is retried on any backend
//! error (transport, API status, empty or malformed payload) with doubling
//! backoff, and a chunk that exhausts its budget degrades to an empty result
//! instead of an error: one bad chunk must never abort its siblings.
//!
//! ## Retry strategy
//!
//! With the default 4000 ms base, retries wait 4 s, 8 s, 16 s, then 32 s,
//! bounded by `retry_backoff_cap_ms`. Quota and rate-limit signatures get an
//! extra fixed cooldown after the final failure, a courtesy to sibling
//! chunks sharing the same project quota.

use crate::backend::ModelBackend;
use crate::config::ExtractionConfig;
use crate::document::PdfChunk;
use crate::error::ChunkError;
use crate::output::ChunkResult;
use crate::prompts::EXTRACTION_PROMPT;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Transcribe a single chunk into document-global items.
///
/// ## Return value
///
/// Always returns a [`ChunkResult`], never an error: callers check
/// `result.error` to decide whether the chunk contributed items. On success
/// every `page_index` has already been rebased by the chunk's start page.
pub async fn process_chunk(
    backend: &Arc<dyn ModelBackend>,
    chunk: PdfChunk,
    chunk_index: usize,
    config: &ExtractionConfig,
) -> ChunkResult {
    let start = Instant::now();
    let prompt = config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);

    debug!(
        "Chunk {}: dispatching pages {}..{} ({} bytes)",
        chunk_index,
        chunk.start_page,
        chunk.end_page(),
        chunk.bytes.len()
    );

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt - 1))
                .min(config.retry_backoff_cap_ms);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                chunk_index, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match backend.transcribe(&chunk, prompt).await {
            Ok(mut reply) => {
                reply.result.rebase_pages(chunk.start_page);
                let duration = start.elapsed();
                debug!(
                    "Chunk {}: {} items, {} input tokens, {} output tokens, {:?}",
                    chunk_index,
                    reply.result.data.len(),
                    reply.input_tokens,
                    reply.output_tokens,
                    duration
                );

                return ChunkResult {
                    chunk_index,
                    start_page: chunk.start_page,
                    page_count: chunk.page_count,
                    items: reply.result.data,
                    input_tokens: reply.input_tokens,
                    output_tokens: reply.output_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt as u8,
                    error: None,
                };
            }
            Err(e) => {
                warn!(
                    "Chunk {}: attempt {} failed: {}",
                    chunk_index,
                    attempt + 1,
                    e
                );
                last_err = Some(e);
            }
        }
    }

    // Retries exhausted. Quota signatures get one fixed cooldown before the
    // chunk settles as failed.
    let quota = last_err.as_ref().map(|e| e.is_quota()).unwrap_or(false);
    let detail = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "Unknown error".to_string());

    if quota {
        warn!(
            "Chunk {}: quota or rate limit exhausted, cooling down for {}ms",
            chunk_index, config.quota_cooldown_ms
        );
        sleep(Duration::from_millis(config.quota_cooldown_ms)).await;
    }

    let error = if quota {
        ChunkError::QuotaExhausted {
            chunk: chunk_index,
            detail,
        }
    } else {
        ChunkError::ModelFailed {
            chunk: chunk_index,
            retries: config.max_retries as u8,
            detail,
        }
    };

    ChunkResult {
        chunk_index,
        start_page: chunk.start_page,
        page_count: chunk.page_count,
        items: Vec::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries: config.max_retries as u8,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ModelReply;
    use crate::document::{ContentItem, ExtractionResult, ItemKind};
    use crate::error::ModelError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(start_page: usize, page_count: usize) -> PdfChunk {
        PdfChunk {
            bytes: b"%PDF-stub".to_vec(),
            start_page,
            page_count,
        }
    }

    fn item(page_index: usize, content: &str) -> ContentItem {
        ContentItem {
            kind: ItemKind::Paragraph,
            page_index,
            content: content.into(),
            is_incomplete: false,
        }
    }

    fn fast_config() -> ExtractionConfig {
        ExtractionConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .quota_cooldown_ms(1)
            .build()
            .unwrap()
    }

    /// Fails the first `failures` calls, then answers with two items.
    struct FlakyBackend {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyBackend {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelBackend for FlakyBackend {
        async fn transcribe(
            &self,
            _chunk: &PdfChunk,
            _prompt: &str,
        ) -> Result<ModelReply, ModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ModelError::Api {
                    status: 503,
                    message: "upstream unavailable".into(),
                });
            }
            Ok(ModelReply {
                result: ExtractionResult {
                    data: vec![item(0, "hello"), item(2, "world")],
                },
                input_tokens: 11,
                output_tokens: 7,
            })
        }
    }

    struct QuotaBackend;

    #[async_trait]
    impl ModelBackend for QuotaBackend {
        async fn transcribe(
            &self,
            _chunk: &PdfChunk,
            _prompt: &str,
        ) -> Result<ModelReply, ModelError> {
            Err(ModelError::Api {
                status: 429,
                message: "Resource exhausted: check quota".into(),
            })
        }
    }

    #[tokio::test]
    async fn success_rebases_page_indices() {
        let backend: Arc<dyn ModelBackend> = Arc::new(FlakyBackend::new(0));
        let result = process_chunk(&backend, chunk(6, 3), 2, &fast_config()).await;

        assert!(result.error.is_none());
        assert_eq!(result.retries, 0);
        assert_eq!(result.items[0].page_index, 6);
        assert_eq!(result.items[1].page_index, 8);
        assert_eq!(result.input_tokens, 11);
        assert_eq!(result.output_tokens, 7);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let backend: Arc<dyn ModelBackend> = Arc::new(FlakyBackend::new(2));
        let result = process_chunk(&backend, chunk(0, 3), 0, &fast_config()).await;

        assert!(result.error.is_none());
        assert_eq!(result.retries, 2);
        assert_eq!(result.items.len(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_degrade_to_an_empty_result() {
        let backend: Arc<dyn ModelBackend> = Arc::new(FlakyBackend::new(99));
        let result = process_chunk(&backend, chunk(3, 3), 1, &fast_config()).await;

        assert!(result.items.is_empty());
        assert_eq!(result.retries, 2);
        assert_eq!(result.start_page, 3);
        match result.error {
            Some(ChunkError::ModelFailed { chunk, retries, .. }) => {
                assert_eq!(chunk, 1);
                assert_eq!(retries, 2);
            }
            other => panic!("expected ModelFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attempts_are_bounded_by_the_budget() {
        let backend = Arc::new(FlakyBackend::new(99));
        let as_dyn: Arc<dyn ModelBackend> = backend.clone();
        let _ = process_chunk(&as_dyn, chunk(0, 1), 0, &fast_config()).await;
        assert_eq!(
            backend.calls.load(Ordering::SeqCst),
            3,
            "1 attempt + 2 retries"
        );
    }

    #[test]
    fn quota_exhaustion_is_labelled() {
        let backend: Arc<dyn ModelBackend> = Arc::new(QuotaBackend);
        let config = fast_config();
        let result = tokio_test::block_on(process_chunk(&backend, chunk(0, 2), 0, &config));

        assert!(result.items.is_empty());
        assert!(matches!(
            result.error,
            Some(ChunkError::QuotaExhausted { .. })
        ));
    }
}
