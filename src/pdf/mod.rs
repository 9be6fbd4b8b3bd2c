//! PDF processing layer
//!
//! This module provides the concrete form backend using lopdf, plus qpdf for
//! decryption.

mod acroform;
mod qpdf;
mod text;

pub use acroform::{AcroField, AcroForm, FieldFlags};
pub use qpdf::QpdfWrapper;
pub use text::{decode_text_string, encode_text_string};
