//! Reading field values and applying edited UI values back to handles

use super::{
    Capabilities, ControlState, FieldHandle, FieldOpError, FieldRecord, FieldValue, FormDocument,
    InputKind,
};
use std::collections::HashSet;

/// Read a field's current value.
///
/// Tries text, then checked state, then selection. Failures are logged and
/// read as an empty value; they never abort the caller.
pub fn read_value<H: FieldHandle + ?Sized>(handle: &H) -> FieldValue {
    match try_read_value(handle) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(field = %handle.name(), error = %e, "failed to read field value");
            FieldValue::default()
        }
    }
}

fn try_read_value<H: FieldHandle + ?Sized>(handle: &H) -> Result<FieldValue, FieldOpError> {
    let caps = handle.capabilities();

    if caps.contains(Capabilities::GET_TEXT) {
        return Ok(FieldValue::Text(handle.get_text()?.unwrap_or_default()));
    }
    if caps.contains(Capabilities::IS_CHECKED) {
        return Ok(FieldValue::Checked(handle.is_checked()?));
    }
    if caps.contains(Capabilities::GET_SELECTED) {
        return Ok(FieldValue::Text(handle.selected()?.first_or_empty()));
    }

    Ok(FieldValue::default())
}

/// What happened to a field when a control was applied to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The field was mutated
    Written,
    /// Select with an empty value; the field keeps its selection
    NoOp,
    /// The handle exposes no writable capability
    Unsupported,
}

/// Apply one control's state to a handle.
///
/// Dispatch is by capability, first match wins: text, then check/uncheck,
/// then select.
pub fn apply_value<H: FieldHandle + ?Sized>(
    handle: &mut H,
    control: &ControlState,
) -> Result<ApplyOutcome, FieldOpError> {
    let caps = handle.capabilities();

    if caps.contains(Capabilities::SET_TEXT) {
        handle.set_text(&control.value)?;
        return Ok(ApplyOutcome::Written);
    }

    if caps.contains(Capabilities::CHECK | Capabilities::UNCHECK) {
        if control.checked {
            handle.check()?;
        } else {
            handle.uncheck()?;
        }
        return Ok(ApplyOutcome::Written);
    }

    if caps.contains(Capabilities::SELECT) {
        if control.value.is_empty() {
            return Ok(ApplyOutcome::NoOp);
        }
        handle.select(&control.value)?;
        return Ok(ApplyOutcome::Written);
    }

    Ok(ApplyOutcome::Unsupported)
}

/// A field whose apply step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Result of one apply pass over a set of controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Field indices that were written, in application order
    pub written: Vec<usize>,
    /// Field indices that were visited but left as they were
    pub unchanged: Vec<usize>,
    pub failed: Vec<FieldFailure>,
}

impl ApplyReport {
    pub fn written_count(&self) -> u32 {
        self.written.len() as u32
    }
}

/// Apply UI controls to the document's fields.
///
/// Unselected radio controls are skipped and each field is applied at most
/// once. A failing field is logged and recorded; the pass continues.
/// Fields that were written get their appearances refreshed.
pub fn apply_controls<D: FormDocument>(
    document: &mut D,
    records: &[FieldRecord],
    controls: &[ControlState],
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut processed = HashSet::new();

    for control in controls {
        if control.input == InputKind::Radio && !control.checked {
            continue;
        }

        let Some(record) = records.get(control.field_index) else {
            tracing::warn!(
                field_index = control.field_index,
                "control references a field outside the loaded form"
            );
            continue;
        };

        if !processed.insert(record.index) {
            continue;
        }

        let Some(mut handle) = document.field(record.index) else {
            tracing::warn!(field = %record.name, "field handle not found");
            continue;
        };

        match apply_value(&mut handle, control) {
            Ok(ApplyOutcome::Written) => {
                refresh_appearances(&mut handle, &record.name);
                report.written.push(record.index);
            }
            Ok(ApplyOutcome::NoOp | ApplyOutcome::Unsupported) => {
                report.unchanged.push(record.index);
            }
            Err(e) => {
                tracing::warn!(field = %record.name, error = %e, "failed to update field");
                report.failed.push(FieldFailure {
                    index: record.index,
                    name: record.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

fn refresh_appearances<H: FieldHandle + ?Sized>(handle: &mut H, name: &str) {
    if !handle
        .capabilities()
        .contains(Capabilities::UPDATE_APPEARANCES)
    {
        return;
    }
    if let Err(e) = handle.update_appearances() {
        tracing::warn!(field = %name, error = %e, "failed to update field appearance");
    }
}
