//! Field kind inference from capability sets
//!
//! A handle's concrete type is never consulted. Capability sets overlap
//! (dropdowns and radio groups both enumerate options), so the rules below
//! are tried in order and the first match wins.

use super::{Capabilities, FieldHandle, FieldKind};

/// What the rules look at: the capability set plus the multiselect probe,
/// which is only taken when the handle can answer it.
#[derive(Debug, Clone, Copy)]
struct Probe {
    caps: Capabilities,
    multiselect: bool,
}

type Rule = fn(&Probe) -> bool;

fn is_checkbox(p: &Probe) -> bool {
    p.caps.contains(Capabilities::CHECK | Capabilities::UNCHECK)
}

fn is_choice(p: &Probe) -> bool {
    p.caps
        .contains(Capabilities::OPTIONS | Capabilities::IS_EDITABLE)
}

fn is_multi_select_list(p: &Probe) -> bool {
    is_choice(p) && p.multiselect
}

fn is_radio_group(p: &Probe) -> bool {
    p.caps.contains(Capabilities::OPTIONS)
}

fn is_text(p: &Probe) -> bool {
    p.caps
        .contains(Capabilities::SET_TEXT | Capabilities::GET_TEXT)
}

fn is_button(p: &Probe) -> bool {
    p.caps.contains(Capabilities::UPDATE_APPEARANCES)
        && !p
            .caps
            .intersects(Capabilities::SET_TEXT | Capabilities::CHECK | Capabilities::OPTIONS)
}

/// Priority order is load-bearing: earlier rules shadow later ones.
const RULES: &[(FieldKind, Rule)] = &[
    (FieldKind::Checkbox, is_checkbox),
    (FieldKind::MultiSelectList, is_multi_select_list),
    (FieldKind::Dropdown, is_choice),
    (FieldKind::RadioGroup, is_radio_group),
    (FieldKind::Text, is_text),
    (FieldKind::Button, is_button),
];

/// Infer the kind of a field from the operations its handle supports.
pub fn classify<H: FieldHandle + ?Sized>(handle: &H) -> FieldKind {
    let caps = handle.capabilities();
    let multiselect = caps.contains(Capabilities::IS_MULTISELECT)
        && handle.is_multiselect().unwrap_or_else(|e| {
            tracing::warn!(field = %handle.name(), error = %e, "multiselect probe failed");
            false
        });
    let probe = Probe { caps, multiselect };

    let kind = RULES
        .iter()
        .find(|(_, rule)| rule(&probe))
        .map(|(kind, _)| *kind);

    match kind {
        Some(FieldKind::RadioGroup) if !caps.contains(Capabilities::SELECT) => {
            tracing::warn!(
                field = %handle.name(),
                ?caps,
                "ambiguous field: options without select, treating as read-only radio group"
            );
            FieldKind::RadioGroup
        }
        Some(kind) => kind,
        None => {
            tracing::warn!(field = %handle.name(), ?caps, "unknown field type, defaulting to text");
            FieldKind::UnknownDefaultsToText
        }
    }
}
