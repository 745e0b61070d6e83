use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{FieldDescriptor, FieldKind};

/// Separator used to store a multi-select value as a single string.
pub const MULTI_SELECT_SEPARATOR: &str = ", ";

/// Captured values of a session, keyed by field name, plus which field
/// indices count as filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValueStore {
    values: BTreeMap<String, String>,
    filled: BTreeSet<usize>,
}

impl FieldValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_name: &str) -> String {
        self.values.get(field_name).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, field_name: &str, value: impl Into<String>) {
        self.values.insert(field_name.to_string(), value.into());
    }

    pub fn is_filled(&self, index: usize) -> bool {
        self.filled.contains(&index)
    }

    pub fn mark_filled(&mut self, index: usize) {
        self.filled.insert(index);
    }

    pub fn mark_unfilled(&mut self, index: usize) {
        self.filled.remove(&index);
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Drops every value together with the filled set.
    pub fn clear_all(&mut self) {
        self.values.clear();
        self.filled.clear();
    }

    /// Applies the per-kind write policy for text typed into `field`.
    ///
    /// Skipped fields never receive an entry.
    pub fn write(&mut self, field: &FieldDescriptor, raw_text: &str) {
        if field.is_skipped() {
            return;
        }
        let value = normalize(&field.kind, raw_text);
        self.set(&field.name, value);
    }

    /// Writes the value of `field` at capture time: the typed text under the
    /// kind's policy, falling back to the configured default when empty.
    pub fn capture(&mut self, field: &FieldDescriptor, raw_text: &str) -> String {
        if field.is_skipped() {
            return String::new();
        }
        let mut value = normalize(&field.kind, raw_text);
        if value.is_empty() {
            value = field.default_value.clone();
        }
        self.set(&field.name, value.clone());
        value
    }

    /// Selected options of a multi-select field, in selection order.
    pub fn selected(&self, field_name: &str) -> Vec<String> {
        split_selection(&self.get(field_name))
    }

    /// Adds `option` to a multi-select value, or removes it when present.
    pub fn toggle(&mut self, field_name: &str, option: &str) {
        let mut selected = self.selected(field_name);
        if let Some(position) = selected.iter().position(|item| item == option) {
            selected.remove(position);
        } else {
            selected.push(option.to_string());
        }
        self.set(field_name, selected.join(MULTI_SELECT_SEPARATOR));
    }
}

pub fn split_selection(value: &str) -> Vec<String> {
    value
        .split(MULTI_SELECT_SEPARATOR)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize(kind: &FieldKind, raw_text: &str) -> String {
    match kind {
        FieldKind::Number => number_text(raw_text),
        FieldKind::Checkbox => {
            if raw_text.is_empty() {
                String::new()
            } else if raw_text.trim().eq_ignore_ascii_case("true") {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        _ => raw_text.to_string(),
    }
}

/// Keeps digits and the first decimal point.
pub fn number_text(raw_text: &str) -> String {
    let mut seen_point = false;
    raw_text
        .chars()
        .filter(|c| match c {
            '0'..='9' => true,
            '.' if !seen_point => {
                seen_point = true;
                true
            }
            _ => false,
        })
        .collect()
}
