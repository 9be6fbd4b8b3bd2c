//! qpdf FFI wrapper
//!
//! lopdf edits the form; qpdf handles what lopdf cannot do reliably:
//! opening password-protected files and counting pages of damaged ones.

use crate::error::{Error, Result};
use qpdf::QPdf;

/// Wrapper for qpdf operations via FFI
pub struct QpdfWrapper;

/// Helper: open a QPdf from memory, optionally with password
fn open_qpdf(data: &[u8], password: Option<&str>) -> Result<QPdf> {
    match password {
        Some(pwd) => QPdf::read_from_memory_encrypted(data, pwd).map_err(map_qpdf_error),
        None => QPdf::read_from_memory(data).map_err(map_qpdf_error),
    }
}

/// Map qpdf crate errors to our error types
fn map_qpdf_error(e: qpdf::QPdfError) -> Error {
    match e.error_code() {
        qpdf::QPdfErrorCode::InvalidPassword => Error::IncorrectPassword,
        _ => Error::QpdfError {
            reason: e.to_string(),
        },
    }
}

impl QpdfWrapper {
    /// Remove password protection.
    ///
    /// Returns the same document rewritten without encryption, ready to be
    /// parsed and edited.
    pub fn decrypt(input_data: &[u8], password: &str) -> Result<Vec<u8>> {
        let qpdf = open_qpdf(input_data, Some(password))?;

        let mut writer = qpdf.writer();
        writer.preserve_encryption(false);
        writer.write_to_memory().map_err(map_qpdf_error)
    }

    /// Get the page count of a PDF
    pub fn get_page_count(input_data: &[u8], password: Option<&str>) -> Result<u32> {
        let qpdf = open_qpdf(input_data, password)?;
        qpdf.get_num_pages().map_err(map_qpdf_error)
    }
}
