//! Document bridge: load a form, expose its model, write edits back

use crate::error::{Error, Result};
use crate::form::{
    apply_controls, build_records, ApplyReport, ControlState, FieldRecord, FormDocument, FormModel,
};
use crate::pdf::{AcroForm, QpdfWrapper};
use chrono::{DateTime, Utc};

/// A document with at least one form field, plus its records
#[derive(Debug)]
pub struct LoadedForm<D> {
    document: D,
    records: Vec<FieldRecord>,
}

/// Output of a successful save
#[derive(Debug, Clone)]
pub struct SavedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub report: ApplyReport,
}

impl<D: FormDocument> LoadedForm<D> {
    /// Classify and read every field of `document`.
    ///
    /// A document without fields is [`Error::NoFormFields`], which callers
    /// report as a notice.
    pub fn from_document(mut document: D) -> Result<Self> {
        if document.field_count() == 0 {
            return Err(Error::NoFormFields);
        }
        let records = build_records(&mut document);
        tracing::info!(fields = records.len(), "form loaded");
        Ok(Self { document, records })
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// UI controls for the current field values
    pub fn form_model(&mut self) -> FormModel {
        FormModel::build(&mut self.document, &self.records)
    }

    /// Apply `controls` and serialize, naming the output by the current time.
    pub fn save(&mut self, controls: &[ControlState]) -> Result<SavedDocument> {
        self.save_at(controls, Utc::now())
    }

    /// Apply `controls` and serialize.
    ///
    /// Fields no control points at are never touched. A serialization
    /// failure leaves the form loaded, with the applied values, so the save
    /// can be retried.
    pub fn save_at(&mut self, controls: &[ControlState], now: DateTime<Utc>) -> Result<SavedDocument> {
        let report = apply_controls(&mut self.document, &self.records, controls);
        if !report.failed.is_empty() {
            tracing::warn!(failed = report.failed.len(), "some fields were not updated");
        }

        // Records follow the document even when serialization fails
        let serialized = self.document.save();
        self.records = build_records(&mut self.document);
        let bytes = serialized?;

        tracing::info!(
            written = report.written.len(),
            size = bytes.len(),
            "form saved"
        );

        Ok(SavedDocument {
            file_name: output_file_name(now),
            bytes,
            report,
        })
    }
}

/// Parse PDF bytes into a loaded form.
///
/// With a password the document is decrypted through qpdf first.
pub fn load_document(data: &[u8], password: Option<&str>) -> Result<LoadedForm<AcroForm>> {
    let form = match password {
        Some(password) => {
            let plain = QpdfWrapper::decrypt(data, password).map_err(|e| match e {
                Error::QpdfError { reason } => Error::InvalidPdf { reason },
                other => other,
            })?;
            AcroForm::load(&plain)?
        }
        None => AcroForm::load(data)?,
    };

    LoadedForm::from_document(form)
}

/// `filled-form-<epoch-millis>.pdf`
pub fn output_file_name(now: DateTime<Utc>) -> String {
    format!("filled-form-{}.pdf", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::fake::{FakeDocument, FakeField};
    use crate::form::InputKind;
    use chrono::TimeZone;

    fn loaded() -> LoadedForm<FakeDocument> {
        LoadedForm::from_document(FakeDocument::new(vec![
            FakeField::text("Name", Some("Alice")),
            FakeField::checkbox("Agree", false),
        ]))
        .unwrap()
    }

    #[test]
    fn test_empty_document_is_no_form_fields() {
        let err = LoadedForm::from_document(FakeDocument::new(vec![])).unwrap_err();
        assert!(matches!(err, Error::NoFormFields));
        assert!(err.is_notice());
    }

    #[test]
    fn test_save_applies_controls_and_refreshes_records() {
        let mut form = loaded();
        let mut states = form.form_model().states();
        states[0].value = "Bob".to_string();
        states[1].checked = true;

        let saved = form.save(&states).unwrap();
        assert_eq!(saved.report.written, vec![0, 1]);
        assert!(String::from_utf8_lossy(&saved.bytes).contains("Name=Some(\"Bob\")"));
        assert_eq!(form.records()[0].value.as_text(), Some("Bob"));
        assert!(form.records()[1].value.is_checked());
    }

    #[test]
    fn test_save_without_controls_touches_nothing() {
        let mut form = loaded();
        let saved = form.save(&[]).unwrap();
        assert!(saved.report.written.is_empty());
        assert_eq!(form.document().fields[0].writes, 0);
    }

    #[test]
    fn test_serialize_failure_keeps_form_usable() {
        let mut form = loaded();
        let control = ControlState {
            field_index: 0,
            input: InputKind::Text,
            value: "Bob".to_string(),
            checked: false,
        };

        form.document.fail_save = true;
        let err = form.save(std::slice::from_ref(&control)).unwrap_err();
        assert!(matches!(err, Error::Serialize { .. }));
        assert_eq!(form.records()[0].value.as_text(), Some("Bob"));

        form.document.fail_save = false;
        let saved = form.save(&[control]).unwrap();
        assert_eq!(saved.report.written, vec![0]);
    }

    #[test]
    fn test_output_file_name() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(output_file_name(now), "filled-form-1700000000123.pdf");
    }

    #[test]
    fn test_load_document_rejects_garbage() {
        let err = load_document(b"%PDF-1.7 but nothing else", None).unwrap_err();
        assert!(matches!(err, Error::InvalidPdf { .. }));
    }
}
