//! AcroForm access over lopdf
//!
//! Walks the catalog's `/AcroForm /Fields` tree and exposes each terminal
//! field through the [`FieldHandle`] capability protocol. The PDF field type
//! only decides which capabilities a handle reports; callers never see it.
//! See ISO 32000-1:2008, Section 12.7 - Interactive Forms.

use super::text::{decode_object, encode_text_string};
use crate::error::{Error, Result};
use crate::form::{Capabilities, FieldHandle, FieldOpError, FieldResult, FormDocument, Selection};
use bitflags::bitflags;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Upper bound on reference chains and field tree depth
const MAX_DEPTH: usize = 32;

const OFF: &[u8] = b"Off";
const DEFAULT_ON: &[u8] = b"Yes";

bitflags! {
    /// Field flags (/Ff) this adapter looks at.
    ///
    /// ISO 32000-1 Tables 221, 226, 228 and 230.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        const READ_ONLY = 1 << 0;
        const REQUIRED = 1 << 1;
        const NO_EXPORT = 1 << 2;
        /// Tx: multiple lines
        const MULTILINE = 1 << 12;
        /// Tx: password
        const PASSWORD = 1 << 13;
        /// Btn: at least one radio must stay on
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Btn: radio button
        const RADIO = 1 << 15;
        /// Btn: push button
        const PUSHBUTTON = 1 << 16;
        /// Ch: combo box, otherwise list box
        const COMBO = 1 << 17;
        /// Ch: user may enter custom text
        const EDIT = 1 << 18;
        /// Ch: multiple selections allowed
        const MULTI_SELECT = 1 << 21;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Text,
    Checkbox,
    Radio,
    PushButton,
    Choice,
    Signature,
    Other,
}

impl FieldType {
    fn from_parts(ft: Option<&[u8]>, flags: FieldFlags) -> Self {
        match ft {
            Some(b"Tx") => FieldType::Text,
            Some(b"Btn") if flags.contains(FieldFlags::PUSHBUTTON) => FieldType::PushButton,
            Some(b"Btn") if flags.contains(FieldFlags::RADIO) => FieldType::Radio,
            Some(b"Btn") => FieldType::Checkbox,
            Some(b"Ch") => FieldType::Choice,
            Some(b"Sig") => FieldType::Signature,
            _ => FieldType::Other,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            FieldType::Text => {
                Capabilities::GET_TEXT | Capabilities::SET_TEXT | Capabilities::UPDATE_APPEARANCES
            }
            FieldType::Checkbox => {
                Capabilities::CHECK
                    | Capabilities::UNCHECK
                    | Capabilities::IS_CHECKED
                    | Capabilities::UPDATE_APPEARANCES
            }
            FieldType::Radio => {
                Capabilities::OPTIONS
                    | Capabilities::SELECT
                    | Capabilities::GET_SELECTED
                    | Capabilities::UPDATE_APPEARANCES
            }
            FieldType::PushButton => Capabilities::UPDATE_APPEARANCES,
            FieldType::Choice => {
                Capabilities::OPTIONS
                    | Capabilities::SELECT
                    | Capabilities::GET_SELECTED
                    | Capabilities::IS_EDITABLE
                    | Capabilities::IS_MULTISELECT
                    | Capabilities::UPDATE_APPEARANCES
            }
            FieldType::Signature | FieldType::Other => Capabilities::empty(),
        }
    }
}

/// A terminal field found while walking the field tree
#[derive(Debug, Clone)]
struct FieldEntry {
    id: ObjectId,
    name: String,
    field_type: FieldType,
    flags: FieldFlags,
    /// Widget annotations; the field itself when field and widget are merged
    widgets: Vec<ObjectId>,
}

/// A parsed PDF document together with its enumerated form fields
pub struct AcroForm {
    doc: Document,
    fields: Vec<FieldEntry>,
}

impl std::fmt::Debug for AcroForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcroForm")
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl AcroForm {
    /// Parse PDF bytes and enumerate the form fields
    pub fn load(data: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(data).map_err(|e| Error::InvalidPdf {
            reason: e.to_string(),
        })?;

        if doc.is_encrypted() {
            return Err(Error::PasswordRequired);
        }

        Ok(Self::from_document(doc))
    }

    /// Enumerate the form fields of an already parsed document
    pub fn from_document(doc: Document) -> Self {
        let fields = enumerate_fields(&doc);
        tracing::debug!(fields = fields.len(), "enumerated form fields");
        Self { doc, fields }
    }

    /// Fully qualified names of all fields, in enumeration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

impl FormDocument for AcroForm {
    type Field<'a> = AcroField<'a> where Self: 'a;

    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field(&mut self, index: usize) -> Option<AcroField<'_>> {
        let entry = self.fields.get(index)?;
        Some(AcroField {
            doc: &mut self.doc,
            entry,
        })
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        // save_to allocates object ids on the document it writes; keep ours stable
        let mut doc = self.doc.clone();
        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::Serialize {
                reason: e.to_string(),
            })?;
        Ok(output)
    }
}

/// Handle to one field of an [`AcroForm`]
pub struct AcroField<'a> {
    doc: &'a mut Document,
    entry: &'a FieldEntry,
}

impl AcroField<'_> {
    fn doc(&self) -> &Document {
        &*self.doc
    }

    /// Look up an inheritable field attribute, walking /Parent links
    fn inherited(&self, key: &[u8]) -> Option<&Object> {
        let doc = self.doc();
        let mut dict = doc.get_dictionary(self.entry.id).ok()?;
        for _ in 0..MAX_DEPTH {
            if let Ok(value) = dict.get(key) {
                return resolve(doc, value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn value(&self) -> Option<&Object> {
        self.inherited(b"V")
    }

    fn set_field_key(&mut self, key: &str, value: Object) -> FieldResult<()> {
        self.doc
            .get_dictionary_mut(self.entry.id)
            .map_err(pdf_err)?
            .set(key, value);
        Ok(())
    }

    fn widget_on_state(&self, widget: ObjectId) -> Option<Vec<u8>> {
        let doc = self.doc();
        let dict = doc.get_dictionary(widget).ok()?;
        let ap = resolve_dict(doc, dict.get(b"AP").ok()?)?;
        let normal = resolve_dict(doc, ap.get(b"N").ok()?)?;
        normal
            .iter()
            .map(|(key, _)| key)
            .find(|key| key.as_slice() != OFF)
            .cloned()
    }

    fn value_name(&self) -> Option<Vec<u8>> {
        match self.value()? {
            Object::Name(name) if name.as_slice() != OFF => Some(name.clone()),
            _ => None,
        }
    }

    /// Point every widget's /AS at `state` when it is that widget's on
    /// state, and at /Off otherwise.
    fn sync_widget_states(&mut self, state: Option<&[u8]>) -> FieldResult<()> {
        let states: Vec<(ObjectId, Vec<u8>)> = self
            .entry
            .widgets
            .iter()
            .map(|&widget| {
                let on = self
                    .widget_on_state(widget)
                    .unwrap_or_else(|| DEFAULT_ON.to_vec());
                let next = match state {
                    Some(s) if s == on.as_slice() => on,
                    _ => OFF.to_vec(),
                };
                (widget, next)
            })
            .collect();

        for (widget, next) in states {
            self.doc
                .get_dictionary_mut(widget)
                .map_err(pdf_err)?
                .set("AS", Object::Name(next));
        }
        Ok(())
    }

    fn checkbox_on_state(&self) -> Vec<u8> {
        self.entry
            .widgets
            .iter()
            .find_map(|&w| self.widget_on_state(w))
            .unwrap_or_else(|| DEFAULT_ON.to_vec())
    }

    fn radio_options(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entry
            .widgets
            .iter()
            .filter_map(|&w| self.widget_on_state(w))
            .filter(|state| seen.insert(state.clone()))
            .map(|state| String::from_utf8_lossy(&state).into_owned())
            .collect()
    }

    fn choice_options(&self) -> FieldResult<Vec<String>> {
        let Some(opt) = self.inherited(b"Opt") else {
            return Ok(Vec::new());
        };
        let Object::Array(items) = opt else {
            return Err(FieldOpError::Malformed {
                reason: "/Opt is not an array".to_string(),
            });
        };

        let doc = self.doc();
        Ok(items
            .iter()
            .filter_map(|item| match resolve(doc, item)? {
                Object::Array(pair) => pair.first().and_then(|o| resolve(doc, o)),
                other => Some(other),
            })
            .filter_map(decode_object)
            .collect())
    }

    fn need_appearances(&mut self) -> FieldResult<()> {
        set_need_appearances(self.doc)
    }
}

impl FieldHandle for AcroField<'_> {
    fn name(&self) -> String {
        self.entry.name.clone()
    }

    fn capabilities(&self) -> Capabilities {
        self.entry.field_type.capabilities()
    }

    fn get_text(&self) -> FieldResult<Option<String>> {
        if self.entry.field_type != FieldType::Text {
            return Err(FieldOpError::unsupported("get_text"));
        }
        match self.value() {
            None | Some(Object::Null) => Ok(None),
            Some(obj) => decode_object(obj).map(Some).ok_or_else(|| FieldOpError::Malformed {
                reason: "text value is not a string".to_string(),
            }),
        }
    }

    fn set_text(&mut self, text: &str) -> FieldResult<()> {
        if self.entry.field_type != FieldType::Text {
            return Err(FieldOpError::unsupported("set_text"));
        }

        // Same text keeps the stored bytes and their encoding
        if self.value().and_then(decode_object).as_deref() == Some(text) {
            return Ok(());
        }

        if let Some(max) = self.inherited(b"MaxLen").and_then(|o| o.as_i64().ok()) {
            let len = text.chars().count();
            if max >= 0 && len > max as usize {
                return Err(FieldOpError::TooLong {
                    len,
                    max: max as usize,
                });
            }
        }

        self.set_field_key("V", encode_text_string(text))
    }

    fn is_checked(&self) -> FieldResult<bool> {
        if self.entry.field_type != FieldType::Checkbox {
            return Err(FieldOpError::unsupported("is_checked"));
        }
        if self.value().is_some() {
            return Ok(self.value_name().is_some());
        }
        // No /V: fall back to the first widget's appearance state
        let doc = self.doc();
        let checked = self
            .entry
            .widgets
            .first()
            .and_then(|&w| doc.get_dictionary(w).ok())
            .and_then(|d| d.get(b"AS").ok())
            .map(|state| matches!(state, Object::Name(n) if n.as_slice() != OFF))
            .unwrap_or(false);
        Ok(checked)
    }

    fn check(&mut self) -> FieldResult<()> {
        if self.entry.field_type != FieldType::Checkbox {
            return Err(FieldOpError::unsupported("check"));
        }
        let on = self.checkbox_on_state();
        self.set_field_key("V", Object::Name(on.clone()))?;
        self.sync_widget_states(Some(&on))
    }

    fn uncheck(&mut self) -> FieldResult<()> {
        if self.entry.field_type != FieldType::Checkbox {
            return Err(FieldOpError::unsupported("uncheck"));
        }
        self.set_field_key("V", Object::Name(OFF.to_vec()))?;
        self.sync_widget_states(None)
    }

    fn options(&self) -> FieldResult<Vec<String>> {
        match self.entry.field_type {
            FieldType::Radio => Ok(self.radio_options()),
            FieldType::Choice => self.choice_options(),
            _ => Err(FieldOpError::unsupported("options")),
        }
    }

    fn selected(&self) -> FieldResult<Selection> {
        match self.entry.field_type {
            FieldType::Radio => Ok(self
                .value_name()
                .map(|n| Selection::One(String::from_utf8_lossy(&n).into_owned()))
                .unwrap_or(Selection::None)),
            FieldType::Choice => {
                let doc = self.doc();
                Ok(match self.value() {
                    None | Some(Object::Null) => Selection::None,
                    Some(Object::Array(items)) => Selection::Many(
                        items
                            .iter()
                            .filter_map(|o| resolve(doc, o))
                            .filter_map(decode_object)
                            .collect(),
                    ),
                    Some(other) => decode_object(other)
                        .map(Selection::One)
                        .unwrap_or(Selection::None),
                })
            }
            _ => Err(FieldOpError::unsupported("selected")),
        }
    }

    fn select(&mut self, option: &str) -> FieldResult<()> {
        match self.entry.field_type {
            FieldType::Radio => {
                if !self.radio_options().iter().any(|o| o == option) {
                    return Err(FieldOpError::UnknownOption {
                        option: option.to_string(),
                    });
                }
                let state = option.as_bytes().to_vec();
                self.set_field_key("V", Object::Name(state.clone()))?;
                self.sync_widget_states(Some(&state))
            }
            FieldType::Choice => {
                let options = self.choice_options()?;
                let position = options.iter().position(|o| o == option);
                if position.is_none() && !self.entry.flags.contains(FieldFlags::EDIT) {
                    return Err(FieldOpError::UnknownOption {
                        option: option.to_string(),
                    });
                }

                self.set_field_key("V", encode_text_string(option))?;
                match position {
                    Some(i) => self.set_field_key("I", Object::Array(vec![Object::Integer(i as i64)])),
                    None => {
                        self.doc
                            .get_dictionary_mut(self.entry.id)
                            .map_err(pdf_err)?
                            .remove(b"I");
                        Ok(())
                    }
                }
            }
            _ => Err(FieldOpError::unsupported("select")),
        }
    }

    fn is_editable(&self) -> FieldResult<bool> {
        match self.entry.field_type {
            FieldType::Choice => Ok(self.entry.flags.contains(FieldFlags::EDIT)),
            _ => Err(FieldOpError::unsupported("is_editable")),
        }
    }

    fn is_multiselect(&self) -> FieldResult<bool> {
        match self.entry.field_type {
            FieldType::Choice => Ok(self.entry.flags.contains(FieldFlags::MULTI_SELECT)),
            _ => Err(FieldOpError::unsupported("is_multiselect")),
        }
    }

    fn update_appearances(&mut self) -> FieldResult<()> {
        match self.entry.field_type {
            FieldType::Checkbox | FieldType::Radio => {
                let state = self.value_name();
                self.sync_widget_states(state.as_deref())
            }
            FieldType::Text | FieldType::Choice => self.need_appearances(),
            FieldType::PushButton => Ok(()),
            FieldType::Signature | FieldType::Other => {
                Err(FieldOpError::unsupported("update_appearances"))
            }
        }
    }
}

fn pdf_err(e: lopdf::Error) -> FieldOpError {
    FieldOpError::Malformed {
        reason: e.to_string(),
    }
}

/// Follow references until a direct object is reached
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

fn root_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").ok()?.as_reference().ok()
}

fn acroform_dict(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_dictionary(root_id(doc)?).ok()?;
    resolve_dict(doc, catalog.get(b"AcroForm").ok()?)
}

fn set_need_appearances(doc: &mut Document) -> FieldResult<()> {
    let malformed = |reason: &str| FieldOpError::Malformed {
        reason: reason.to_string(),
    };

    let root = root_id(doc).ok_or_else(|| malformed("document has no catalog"))?;
    let acroform_ref = match doc.get_dictionary(root).map_err(pdf_err)?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(_) => None,
        Err(_) => return Err(malformed("catalog has no /AcroForm")),
    };

    let acroform = match acroform_ref {
        Some(id) => doc.get_dictionary_mut(id).map_err(pdf_err)?,
        None => doc
            .get_dictionary_mut(root)
            .map_err(pdf_err)?
            .get_mut(b"AcroForm")
            .and_then(Object::as_dict_mut)
            .map_err(pdf_err)?,
    };
    acroform.set("NeedAppearances", Object::Boolean(true));
    Ok(())
}

/// Attributes a field node passes down to its kids
#[derive(Clone, Copy, Default)]
struct Inherited<'a> {
    name: Option<&'a str>,
    ft: Option<&'a [u8]>,
    flags: Option<u32>,
}

fn enumerate_fields(doc: &Document) -> Vec<FieldEntry> {
    let mut fields = Vec::new();

    let Some(acroform) = acroform_dict(doc) else {
        return fields;
    };
    let Some(Object::Array(roots)) = acroform.get(b"Fields").ok().and_then(|o| resolve(doc, o))
    else {
        return fields;
    };

    let mut visited = HashSet::new();
    for root in roots {
        match root {
            Object::Reference(id) => {
                walk_field(doc, *id, Inherited::default(), 0, &mut visited, &mut fields)
            }
            _ => tracing::warn!("skipping direct (non-indirect) field object"),
        }
    }

    fields
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    parent: Inherited<'_>,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<FieldEntry>,
) {
    if depth >= MAX_DEPTH || !visited.insert(id) {
        tracing::warn!(object = ?id, "field tree cycle or excessive depth");
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        tracing::warn!(object = ?id, "field object is not a dictionary");
        return;
    };

    let partial = dict
        .get(b"T")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(decode_object);
    let name = match (parent.name, partial) {
        (Some(p), Some(t)) => Some(format!("{}.{}", p, t)),
        (None, Some(t)) => Some(t),
        (Some(p), None) => Some(p.to_string()),
        (None, None) => None,
    };

    let ft = dict
        .get(b"FT")
        .ok()
        .and_then(|o| match resolve(doc, o)? {
            Object::Name(n) => Some(n.as_slice()),
            _ => None,
        })
        .or(parent.ft);
    let flags = dict
        .get(b"Ff")
        .ok()
        .and_then(|o| resolve(doc, o)?.as_i64().ok())
        .map(|v| v as u32)
        .or(parent.flags);

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| arr.iter().filter_map(|k| k.as_reference().ok()).collect())
        .unwrap_or_default();

    let child_fields: Vec<ObjectId> = kids
        .iter()
        .copied()
        .filter(|&k| {
            doc.get_dictionary(k)
                .map(|d| d.has(b"T"))
                .unwrap_or(false)
        })
        .collect();

    if !child_fields.is_empty() {
        let inherited = Inherited {
            name: name.as_deref(),
            ft,
            flags,
        };
        for kid in child_fields {
            walk_field(doc, kid, inherited, depth + 1, visited, out);
        }
        return;
    }

    let flags = FieldFlags::from_bits_retain(flags.unwrap_or(0));
    let widgets = if kids.is_empty() { vec![id] } else { kids };
    let name = name.unwrap_or_else(|| format!("unnamed_{}", out.len()));

    out.push(FieldEntry {
        id,
        name,
        field_type: FieldType::from_parts(ft, flags),
        flags,
        widgets,
    });
}
