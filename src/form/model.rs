//! UI form model mirroring the classified fields

use super::{FieldHandle, FieldKind, FieldRecord, FieldValue, FormDocument};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label of the leading empty option of every select control
pub const EMPTY_OPTION_LABEL: &str = "Select an option";

/// Kind of UI input a control renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Checkbox,
    Radio,
    Select,
}

/// The editable state of one control, as submitted back by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ControlState {
    /// Index of the field in the loaded form
    pub field_index: usize,
    pub input: InputKind,
    /// Text content, radio option, or selected option
    #[serde(default)]
    pub value: String,
    /// Checkbox state, or whether this radio control is the selected one
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A rendered control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FormControl {
    /// `field-<i>`, or `field-<i>-<j>` for the j-th radio option
    pub id: String,
    /// Group name; radio controls of one field share it
    pub group: String,
    pub label: String,
    #[serde(flatten)]
    pub state: ControlState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Controls for every editable field, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormModel {
    pub controls: Vec<FormControl>,
}

impl FormModel {
    /// Build the controls for `records`, asking `document` for option lists.
    pub fn build<D: FormDocument>(document: &mut D, records: &[FieldRecord]) -> Self {
        let mut controls = Vec::new();

        for record in records {
            match record.kind {
                FieldKind::Button => {}
                FieldKind::Checkbox => controls.push(checkbox_control(record)),
                FieldKind::RadioGroup => {
                    let options = field_options(document, record);
                    controls.extend(radio_controls(record, &options));
                }
                FieldKind::Dropdown | FieldKind::MultiSelectList => {
                    let options = field_options(document, record);
                    controls.push(select_control(record, &options));
                }
                FieldKind::Text | FieldKind::UnknownDefaultsToText => {
                    controls.push(text_control(record))
                }
            }
        }

        Self { controls }
    }

    /// The submitted state of every control
    pub fn states(&self) -> Vec<ControlState> {
        self.controls.iter().map(|c| c.state.clone()).collect()
    }

    /// Override controls by field name.
    ///
    /// Text and select controls take `value`; checkboxes take `checked`;
    /// for a radio group the control whose option equals `value` becomes
    /// the selected one. Returns the requests that could not be applied:
    /// names that match no control and radio values that match no option.
    pub fn with_field_values<'a, I>(&mut self, values: I) -> Vec<UnappliedValue>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>, Option<bool>)>,
    {
        let mut unapplied = Vec::new();

        for (name, value, checked) in values {
            let mut matched = false;
            let mut radio_value = None;

            for control in self.controls.iter_mut().filter(|c| c.label == name) {
                matched = true;
                let state = &mut control.state;
                match state.input {
                    InputKind::Text | InputKind::Select => {
                        if let Some(v) = value {
                            state.value = v.to_string();
                        }
                    }
                    InputKind::Checkbox => {
                        if let Some(c) = checked {
                            state.checked = c;
                        } else if let Some(v) = value {
                            state.checked = is_truthy(v);
                        }
                    }
                    InputKind::Radio => radio_value = value,
                }
            }

            if let Some(v) = radio_value {
                let is_radio =
                    |c: &FormControl| c.label == name && c.state.input == InputKind::Radio;
                if self.controls.iter().any(|c| is_radio(c) && c.state.value == v) {
                    for control in self.controls.iter_mut().filter(|c| is_radio(&**c)) {
                        control.state.checked = control.state.value == v;
                    }
                } else {
                    // The group keeps its selection; the request is reported instead
                    unapplied.push(UnappliedValue {
                        name: name.to_string(),
                        reason: format!("unknown option: {}", v),
                    });
                }
            }

            if !matched {
                unapplied.push(UnappliedValue {
                    name: name.to_string(),
                    reason: "No field with this name".to_string(),
                });
            }
        }

        unapplied
    }
}

/// A by-name value that [`FormModel::with_field_values`] could not apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnappliedValue {
    pub name: String,
    pub reason: String,
}

fn is_truthy(value: &str) -> bool {
    ["true", "on", "yes", "1"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}

fn field_options<D: FormDocument>(document: &mut D, record: &FieldRecord) -> Vec<String> {
    let Some(handle) = document.field(record.index) else {
        return Vec::new();
    };
    handle.options().unwrap_or_else(|e| {
        tracing::warn!(field = %record.name, error = %e, "failed to read field options");
        Vec::new()
    })
}

fn field_id(record: &FieldRecord) -> String {
    format!("field-{}", record.index)
}

fn text_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Checked(b) => b.to_string(),
    }
}

fn checkbox_control(record: &FieldRecord) -> FormControl {
    FormControl {
        id: field_id(record),
        group: field_id(record),
        label: record.name.clone(),
        state: ControlState {
            field_index: record.index,
            input: InputKind::Checkbox,
            value: "on".to_string(),
            checked: record.value.is_checked(),
        },
        options: Vec::new(),
        placeholder: None,
    }
}

fn radio_controls(record: &FieldRecord, options: &[String]) -> Vec<FormControl> {
    let current = record.value.as_text().unwrap_or_default();

    options
        .iter()
        .enumerate()
        .map(|(j, option)| FormControl {
            id: format!("field-{}-{}", record.index, j),
            group: field_id(record),
            label: record.name.clone(),
            state: ControlState {
                field_index: record.index,
                input: InputKind::Radio,
                value: option.clone(),
                checked: option == current,
            },
            options: Vec::new(),
            placeholder: None,
        })
        .collect()
}

fn select_control(record: &FieldRecord, options: &[String]) -> FormControl {
    let current = record.value.as_text().unwrap_or_default();

    let mut select_options = Vec::with_capacity(options.len() + 1);
    select_options.push(SelectOption {
        value: String::new(),
        label: EMPTY_OPTION_LABEL.to_string(),
        selected: current.is_empty(),
    });
    select_options.extend(options.iter().map(|option| SelectOption {
        value: option.clone(),
        label: option.clone(),
        selected: option == current,
    }));

    FormControl {
        id: field_id(record),
        group: field_id(record),
        label: record.name.clone(),
        state: ControlState {
            field_index: record.index,
            input: InputKind::Select,
            value: current.to_string(),
            checked: false,
        },
        options: select_options,
        placeholder: None,
    }
}

fn text_control(record: &FieldRecord) -> FormControl {
    FormControl {
        id: field_id(record),
        group: field_id(record),
        label: record.name.clone(),
        state: ControlState {
            field_index: record.index,
            input: InputKind::Text,
            value: text_value(&record.value),
            checked: false,
        },
        options: Vec::new(),
        placeholder: Some(format!("Enter {}", record.name)),
    }
}
