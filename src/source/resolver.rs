//! Source resolution for PDF data
//!
//! Nothing here rejects bytes for not looking like a PDF. The header and
//! extension checks only log; the PDF library decides what it can parse.

use crate::error::{Error, Result};
use crate::source::CacheManager;
use base64::Engine;
use std::path::Path;

/// Resolved PDF data
#[derive(Debug)]
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

fn warn_if_not_pdf(data: &[u8], source: &str) {
    if !data.starts_with(b"%PDF") {
        tracing::warn!(source, "data does not start with a %PDF header");
    }
}

/// Resolve a file path to PDF data
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let is_pdf_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf_extension {
        tracing::warn!(path = %path.display(), "file does not have a .pdf extension");
    }

    let data = std::fs::read(path)?;
    let source_name = path.display().to_string();
    warn_if_not_pdf(&data, &source_name);

    Ok(ResolvedPdf { data, source_name })
}

/// Resolve base64 encoded data to PDF data
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;
    warn_if_not_pdf(&data, "<base64>");

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
    })
}

/// Resolve a cache key to a previously saved PDF
pub fn resolve_cache(cache_key: &str, cache: &CacheManager) -> Result<ResolvedPdf> {
    let entry = cache.get(cache_key).ok_or_else(|| Error::CacheKeyNotFound {
        key: cache_key.to_string(),
    })?;

    Ok(ResolvedPdf {
        data: entry.data,
        source_name: entry.file_name,
    })
}
