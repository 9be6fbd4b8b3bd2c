//! PDF Form Bridge Library
//!
//! Classifies the AcroForm fields of a PDF by what they support, turns them
//! into editable controls, and writes edited values back into the document.
//!
//! MCP tools:
//! - `load_form`: Load a PDF into a session and return its fields and controls
//! - `get_form`: Return the current fields and controls of a session
//! - `save_form`: Apply edited controls and save a new PDF
//! - `fill_form`: Fill fields by name and save, without a session
//! - `close_form`: Drop a session
//! - `list_pdfs`: List PDF files in a directory

pub mod bridge;
pub mod error;
pub mod form;
pub mod pdf;
pub mod server;
pub mod session;
pub mod source;

pub use bridge::{load_document, LoadedForm, SavedDocument};
pub use error::{Error, Result};
pub use form::{ControlState, FieldKind, FieldRecord, FieldValue, FormControl, FormModel};
pub use server::{
    run_server, run_server_with_config, run_server_with_dirs, ListPdfsParams, ListPdfsResult,
    PdfFileInfo, PdfFormServer, PdfSource, ServerConfig,
};
pub use session::{FormSession, SessionStore};
