//! Input validation: read the source PDF into memory.
//!
//! The splitter works from an in-memory parse, so the only filesystem work
//! here is reading the bytes. The `%PDF` magic is checked before the buffer
//! reaches the parser, so a mislabelled file gets a precise error instead of
//! a generic parse failure.

use crate::error::PagescribeError;
use std::path::Path;
use tracing::debug;

/// Read a PDF file fully into memory, validating existence, readability,
/// and the PDF magic bytes.
pub async fn read_pdf_bytes(path: &Path) -> Result<Vec<u8>, PagescribeError> {
    if !path.exists() {
        return Err(PagescribeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PagescribeError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PagescribeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    check_magic(path, &bytes)?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Verify the buffer starts with the `%PDF` marker.
///
/// Buffers shorter than four bytes pass through; the parser rejects them
/// with a more specific error.
pub fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), PagescribeError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(PagescribeError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}
