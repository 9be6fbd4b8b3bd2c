//! Error types for the PDF form bridge

use thiserror::Error;

/// Result type alias for the PDF form bridge
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF form bridge
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Bytes the PDF library refused to parse
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// The document parsed but carries no AcroForm fields
    #[error("PDF has no form fields")]
    NoFormFields,

    /// PDF is password protected and no password was provided
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Incorrect password provided
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Cache key not found
    #[error("Cache key not found: {key}")]
    CacheKeyNotFound { key: String },

    /// Unknown or expired form session
    #[error("Form session not found: {id}")]
    SessionNotFound { id: String },

    /// A load or save is already running against this session
    #[error("Form session {id} is busy")]
    SessionBusy { id: String },

    /// Save submitted against a form that has since been reloaded
    #[error("Stale form: submitted generation {submitted}, current generation {current}")]
    StaleForm { submitted: u64, current: u64 },

    /// Save requested before any form was loaded into the session
    #[error("No form document loaded")]
    NoDocumentLoaded,

    /// Writing the document back to bytes failed
    #[error("Failed to serialize PDF: {reason}")]
    Serialize { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// qpdf error
    #[error("qpdf error: {reason}")]
    QpdfError { reason: String },

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// Blocking task panicked or was cancelled
    #[error("Task join error: {reason}")]
    TaskJoin { reason: String },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::NoFormFields => "This PDF has no form fields".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::IncorrectPassword => "Incorrect password".to_string(),
            Error::CacheKeyNotFound { .. } => "Cache key not found".to_string(),
            Error::SessionNotFound { .. } => "Form session not found".to_string(),
            Error::SessionBusy { .. } => {
                "Another load or save is in progress for this session".to_string()
            }
            Error::StaleForm { current, .. } => format!(
                "The form was reloaded; resubmit against generation {}",
                current
            ),
            Error::NoDocumentLoaded => "No PDF is loaded in this session".to_string(),
            Error::Serialize { .. } => "Failed to generate the PDF".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::QpdfError { .. } => "PDF processing error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::TaskJoin { .. } => "Internal error".to_string(),
        }
    }

    /// Whether this outcome is a notice rather than a failure.
    ///
    /// A form without fields still loaded fine; the client just has
    /// nothing to edit.
    pub fn is_notice(&self) -> bool {
        matches!(self, Error::NoFormFields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_details() {
        let err = Error::InvalidPdf {
            reason: "xref offset 1234 out of range".to_string(),
        };
        assert_eq!(err.client_message(), "Invalid PDF file");

        let err = Error::PathAccessDenied {
            path: "/etc/secret.pdf".to_string(),
        };
        assert!(!err.client_message().contains("/etc"));
    }

    #[test]
    fn test_no_form_fields_is_notice() {
        assert!(Error::NoFormFields.is_notice());
        assert!(!Error::InvalidPdf {
            reason: String::new()
        }
        .is_notice());
    }

    #[test]
    fn test_stale_form_message_names_current_generation() {
        let err = Error::StaleForm {
            submitted: 1,
            current: 3,
        };
        assert!(err.client_message().contains('3'));
    }
}
