//! Plain-text extraction from files on disk.
//!
//! Reads a file, decodes it to UTF-8 (transcoding Latin-1, Shift-JIS and
//! other legacy encodings via detection), and rejects binary or oversized
//! content with an extraction error the indexer can surface per file.

use crate::error::{Error, Result};
use std::path::Path;

/// Files larger than this are rejected rather than indexed.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extract searchable text from a file.
///
/// Empty files extract to the empty string. Unsupported (binary) or corrupt
/// content fails with [`Error::Extraction`]; the caller decides whether that
/// aborts the operation.
pub fn extract_text(path: &Path) -> Result<String> {
    extract_text_capped(path, MAX_FILE_SIZE)
}

/// As [`extract_text`], with an explicit size cap.
pub fn extract_text_capped(path: &Path, max_file_size: u64) -> Result<String> {
    let metadata = std::fs::metadata(path).map_err(|e| extraction_error(path, e.to_string()))?;
    if metadata.len() > max_file_size {
        return Err(extraction_error(
            path,
            format!("file too large ({} bytes)", metadata.len()),
        ));
    }

    let bytes = std::fs::read(path).map_err(|e| extraction_error(path, e.to_string()))?;
    if bytes.is_empty() {
        return Ok(String::new());
    }

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => transcode(path, err.into_bytes())?,
    };

    if is_binary_content(&text) {
        return Err(extraction_error(path, "binary content".to_string()));
    }

    Ok(text)
}

/// Decode non-UTF-8 bytes using detected encoding.
fn transcode(path: &Path, bytes: Vec<u8>) -> Result<String> {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(&bytes, true);
    let encoding = detector.guess(None, true);

    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(extraction_error(
            path,
            format!("undecodable content (guessed {})", encoding.name()),
        ));
    }

    tracing::debug!(path = %path.display(), encoding = encoding.name(), "Transcoded to UTF-8");
    Ok(text.into_owned())
}

/// Check if content appears to be binary (contains null bytes or a high
/// ratio of non-printable characters). Only the first 8KB is inspected.
fn is_binary_content(content: &str) -> bool {
    let check_len = content.len().min(8192);
    let sample = &content.as_bytes()[..check_len];

    let mut non_text_count = 0;
    for &byte in sample {
        if byte == 0 {
            return true;
        }
        if byte < 32 && !matches!(byte, b'\t' | b'\n' | b'\r') {
            non_text_count += 1;
        }
    }

    non_text_count > check_len / 10
}

fn extraction_error(path: &Path, reason: String) -> Error {
    Error::Extraction {
        path: path.to_path_buf(),
        reason,
    }
}
