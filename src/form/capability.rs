//! The capability protocol a form field handle exposes

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Operations a field handle supports.
    ///
    /// Sets overlap between field kinds; only the classifier's rule order
    /// turns a set into a kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u16 {
        const GET_TEXT = 1 << 0;
        const SET_TEXT = 1 << 1;
        const CHECK = 1 << 2;
        const UNCHECK = 1 << 3;
        const IS_CHECKED = 1 << 4;
        /// Enumerate the field's options
        const OPTIONS = 1 << 5;
        const SELECT = 1 << 6;
        const GET_SELECTED = 1 << 7;
        const IS_EDITABLE = 1 << 8;
        const IS_MULTISELECT = 1 << 9;
        const UPDATE_APPEARANCES = 1 << 10;
    }
}

/// Per-field operation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldOpError {
    /// The handle does not expose the requested operation
    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    /// Option is not one of the field's choices
    #[error("unknown option: {option}")]
    UnknownOption { option: String },

    /// Text longer than the field's maximum length
    #[error("text of {len} characters exceeds max length {max}")]
    TooLong { len: usize, max: usize },

    /// The underlying field object is damaged or of an unexpected shape
    #[error("malformed field: {reason}")]
    Malformed { reason: String },
}

impl FieldOpError {
    pub fn unsupported(operation: &'static str) -> Self {
        FieldOpError::Unsupported { operation }
    }
}

pub type FieldResult<T> = std::result::Result<T, FieldOpError>;

/// What a choice-like field reports as selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    None,
    One(String),
    Many(Vec<String>),
}

impl Selection {
    /// First selected entry, or empty when nothing is selected
    pub fn first_or_empty(self) -> String {
        match self {
            Selection::None => String::new(),
            Selection::One(s) => s,
            Selection::Many(v) => v.into_iter().next().unwrap_or_default(),
        }
    }
}

/// An opaque form field owned by a document.
///
/// Every operation defaults to [`FieldOpError::Unsupported`]; implementors
/// override the ones listed in [`FieldHandle::capabilities`].
pub trait FieldHandle {
    /// Fully qualified field name
    fn name(&self) -> String;

    fn capabilities(&self) -> Capabilities;

    fn get_text(&self) -> FieldResult<Option<String>> {
        Err(FieldOpError::unsupported("get_text"))
    }

    fn set_text(&mut self, _text: &str) -> FieldResult<()> {
        Err(FieldOpError::unsupported("set_text"))
    }

    fn is_checked(&self) -> FieldResult<bool> {
        Err(FieldOpError::unsupported("is_checked"))
    }

    fn check(&mut self) -> FieldResult<()> {
        Err(FieldOpError::unsupported("check"))
    }

    fn uncheck(&mut self) -> FieldResult<()> {
        Err(FieldOpError::unsupported("uncheck"))
    }

    fn options(&self) -> FieldResult<Vec<String>> {
        Err(FieldOpError::unsupported("options"))
    }

    fn selected(&self) -> FieldResult<Selection> {
        Err(FieldOpError::unsupported("selected"))
    }

    fn select(&mut self, _option: &str) -> FieldResult<()> {
        Err(FieldOpError::unsupported("select"))
    }

    fn is_editable(&self) -> FieldResult<bool> {
        Err(FieldOpError::unsupported("is_editable"))
    }

    fn is_multiselect(&self) -> FieldResult<bool> {
        Err(FieldOpError::unsupported("is_multiselect"))
    }

    fn update_appearances(&mut self) -> FieldResult<()> {
        Err(FieldOpError::unsupported("update_appearances"))
    }
}

/// A document that owns form fields and can serialize itself.
pub trait FormDocument {
    type Field<'a>: FieldHandle
    where
        Self: 'a;

    fn field_count(&self) -> usize;

    /// Handle for the field at `index` in enumeration order
    fn field(&mut self, index: usize) -> Option<Self::Field<'_>>;

    /// Serialize the whole document
    fn save(&mut self) -> crate::Result<Vec<u8>>;
}

/// Forwarding impl so a borrowed handle is itself a handle
impl<T: FieldHandle + ?Sized> FieldHandle for &mut T {
    fn name(&self) -> String {
        (**self).name()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn get_text(&self) -> FieldResult<Option<String>> {
        (**self).get_text()
    }

    fn set_text(&mut self, text: &str) -> FieldResult<()> {
        (**self).set_text(text)
    }

    fn is_checked(&self) -> FieldResult<bool> {
        (**self).is_checked()
    }

    fn check(&mut self) -> FieldResult<()> {
        (**self).check()
    }

    fn uncheck(&mut self) -> FieldResult<()> {
        (**self).uncheck()
    }

    fn options(&self) -> FieldResult<Vec<String>> {
        (**self).options()
    }

    fn selected(&self) -> FieldResult<Selection> {
        (**self).selected()
    }

    fn select(&mut self, option: &str) -> FieldResult<()> {
        (**self).select(option)
    }

    fn is_editable(&self) -> FieldResult<bool> {
        (**self).is_editable()
    }

    fn is_multiselect(&self) -> FieldResult<bool> {
        (**self).is_multiselect()
    }

    fn update_appearances(&mut self) -> FieldResult<()> {
        (**self).update_appearances()
    }
}
