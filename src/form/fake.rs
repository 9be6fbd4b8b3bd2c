//! In-memory field handles for protocol-level tests

use super::{Capabilities, FieldHandle, FieldOpError, FieldResult, FormDocument, Selection};

#[derive(Debug, Clone, Default)]
pub struct FakeField {
    pub name: String,
    pub caps: Capabilities,
    pub text: Option<String>,
    pub checked: bool,
    pub options: Vec<String>,
    pub selected: Vec<String>,
    pub multiselect: bool,
    pub editable: bool,
    /// Every read-side operation fails
    pub fail_reads: bool,
    /// Every write-side operation fails
    pub fail_writes: bool,
    /// Count of mutating calls that reached this field
    pub writes: usize,
    pub appearance_updates: usize,
}

impl FakeField {
    pub fn with_caps(name: &str, caps: Capabilities) -> Self {
        Self {
            name: name.to_string(),
            caps,
            ..Self::default()
        }
    }

    pub fn text(name: &str, value: Option<&str>) -> Self {
        Self {
            text: value.map(str::to_string),
            ..Self::with_caps(
                name,
                Capabilities::GET_TEXT | Capabilities::SET_TEXT | Capabilities::UPDATE_APPEARANCES,
            )
        }
    }

    pub fn checkbox(name: &str, checked: bool) -> Self {
        Self {
            checked,
            ..Self::with_caps(
                name,
                Capabilities::CHECK
                    | Capabilities::UNCHECK
                    | Capabilities::IS_CHECKED
                    | Capabilities::UPDATE_APPEARANCES,
            )
        }
    }

    pub fn radio(name: &str, options: &[&str], selected: Option<&str>) -> Self {
        Self {
            options: options.iter().map(|s| s.to_string()).collect(),
            selected: selected.into_iter().map(str::to_string).collect(),
            ..Self::with_caps(
                name,
                Capabilities::OPTIONS
                    | Capabilities::SELECT
                    | Capabilities::GET_SELECTED
                    | Capabilities::UPDATE_APPEARANCES,
            )
        }
    }

    pub fn dropdown(name: &str, options: &[&str], selected: Option<&str>, multiselect: bool) -> Self {
        Self {
            multiselect,
            ..Self::radio(name, options, selected).add(
                Capabilities::IS_EDITABLE | Capabilities::IS_MULTISELECT,
            )
        }
    }

    pub fn add(mut self, caps: Capabilities) -> Self {
        self.caps |= caps;
        self
    }

    fn read<T>(&self, value: T) -> FieldResult<T> {
        if self.fail_reads {
            Err(FieldOpError::Malformed {
                reason: "read failure".to_string(),
            })
        } else {
            Ok(value)
        }
    }

    fn write(&mut self) -> FieldResult<()> {
        if self.fail_writes {
            return Err(FieldOpError::Malformed {
                reason: "write failure".to_string(),
            });
        }
        self.writes += 1;
        Ok(())
    }
}

impl FieldHandle for FakeField {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn get_text(&self) -> FieldResult<Option<String>> {
        self.read(self.text.clone())
    }

    fn set_text(&mut self, text: &str) -> FieldResult<()> {
        self.write()?;
        self.text = Some(text.to_string());
        Ok(())
    }

    fn is_checked(&self) -> FieldResult<bool> {
        self.read(self.checked)
    }

    fn check(&mut self) -> FieldResult<()> {
        self.write()?;
        self.checked = true;
        Ok(())
    }

    fn uncheck(&mut self) -> FieldResult<()> {
        self.write()?;
        self.checked = false;
        Ok(())
    }

    fn options(&self) -> FieldResult<Vec<String>> {
        self.read(self.options.clone())
    }

    fn selected(&self) -> FieldResult<Selection> {
        let selection = match self.selected.len() {
            0 => Selection::None,
            1 => Selection::One(self.selected[0].clone()),
            _ => Selection::Many(self.selected.clone()),
        };
        self.read(selection)
    }

    fn select(&mut self, option: &str) -> FieldResult<()> {
        if !self.editable && !self.options.iter().any(|o| o == option) {
            return Err(FieldOpError::UnknownOption {
                option: option.to_string(),
            });
        }
        self.write()?;
        self.selected = vec![option.to_string()];
        Ok(())
    }

    fn is_editable(&self) -> FieldResult<bool> {
        self.read(self.editable)
    }

    fn is_multiselect(&self) -> FieldResult<bool> {
        self.read(self.multiselect)
    }

    fn update_appearances(&mut self) -> FieldResult<()> {
        self.appearance_updates += 1;
        Ok(())
    }
}

/// Document over a plain vector of fake fields; `save` dumps a debug string
#[derive(Debug, Default)]
pub struct FakeDocument {
    pub fields: Vec<FakeField>,
    pub fail_save: bool,
}

impl FakeDocument {
    pub fn new(fields: Vec<FakeField>) -> Self {
        Self {
            fields,
            fail_save: false,
        }
    }
}

impl FormDocument for FakeDocument {
    type Field<'a> = &'a mut FakeField;

    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field(&mut self, index: usize) -> Option<Self::Field<'_>> {
        self.fields.get_mut(index)
    }

    fn save(&mut self) -> crate::Result<Vec<u8>> {
        if self.fail_save {
            return Err(crate::Error::Serialize {
                reason: "disk full".to_string(),
            });
        }
        let dump: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}={:?}/{}/{:?}", f.name, f.text, f.checked, f.selected))
            .collect();
        Ok(dump.join("\n").into_bytes())
    }
}
