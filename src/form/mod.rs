//! Form field layer
//!
//! Everything here works against the [`FieldHandle`] capability protocol and
//! never against a concrete PDF library type:
//! - `classify`: infer a [`FieldKind`] from a handle's capability set
//! - `value`: read current values and apply edited UI values back
//! - `model`: the UI form model mirroring the classified fields

mod capability;
mod classify;
mod model;
mod value;

#[cfg(test)]
pub(crate) mod fake;

pub use capability::{Capabilities, FieldHandle, FieldOpError, FieldResult, FormDocument, Selection};
pub use classify::classify;
pub use model::{
    ControlState, FormControl, FormModel, InputKind, SelectOption, UnappliedValue,
    EMPTY_OPTION_LABEL,
};
pub use value::{apply_controls, apply_value, read_value, ApplyOutcome, ApplyReport, FieldFailure};

use schemars::JsonSchema;
use serde::Serialize;

/// Kind of a form field, as inferred from its capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Checkbox,
    Dropdown,
    MultiSelectList,
    RadioGroup,
    Button,
    /// No rule matched; edited as a text field
    #[serde(rename = "unknown")]
    UnknownDefaultsToText,
}

impl FieldKind {
    /// Stable name used in tool output
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Dropdown => "dropdown",
            FieldKind::MultiSelectList => "multi_select_list",
            FieldKind::RadioGroup => "radio_group",
            FieldKind::Button => "button",
            FieldKind::UnknownDefaultsToText => "unknown",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text content or the selected option (empty when nothing is selected)
    Text(String),
    /// Checkbox state
    Checked(bool),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Checked(_) => None,
        }
    }

    /// Truthiness the UI uses for a checkbox control
    pub fn is_checked(&self) -> bool {
        match self {
            FieldValue::Checked(b) => *b,
            FieldValue::Text(s) => !s.is_empty(),
        }
    }
}

/// One field of a loaded document.
///
/// `index` is the field's position in the owning document's enumeration
/// order; the document owns the field, the record only points at it.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FieldRecord {
    pub index: usize,
    pub name: String,
    pub kind: FieldKind,
    pub value: FieldValue,
}

/// Build records for every field of `document`, in enumeration order.
pub fn build_records<D: FormDocument>(document: &mut D) -> Vec<FieldRecord> {
    let count = document.field_count();
    let mut records = Vec::with_capacity(count);

    for index in 0..count {
        let Some(handle) = document.field(index) else {
            tracing::warn!(index, "field handle vanished during enumeration");
            continue;
        };
        records.push(FieldRecord {
            index,
            name: handle.name(),
            kind: classify(&handle),
            value: read_value(&handle),
        });
    }

    records
}
