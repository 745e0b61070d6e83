//! Conversion of a Notion database's `properties` object into form fields.

use serde_json::{Map, Value};

use super::{FieldDescriptor, FieldKind};

/// Builds the ordered field list for a database schema.
///
/// The title property comes first, the rest follow in response order.
/// Unsupported property types are kept so the template reflects the whole
/// database, but they are forced to [`Priority::Skip`](super::Priority::Skip).
pub fn fields_from_properties(properties: &Map<String, Value>) -> Vec<FieldDescriptor> {
    let mut titles = Vec::new();
    let mut others = Vec::new();

    for (name, property) in properties {
        let raw_kind = property
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let kind = FieldKind::parse(raw_kind);
        let priority = kind.default_priority();
        let options = if kind.is_enumerable() {
            Some(option_names(property, raw_kind))
        } else {
            None
        };

        let field = FieldDescriptor {
            name: name.clone(),
            kind,
            priority,
            default_value: String::new(),
            order: 0,
            options,
        };

        if field.kind == FieldKind::Title {
            titles.push(field);
        } else {
            others.push(field);
        }
    }

    titles
        .into_iter()
        .chain(others)
        .enumerate()
        .map(|(index, field)| field.with_order(index as i64))
        .collect()
}

/// Option names of every enumerable property in a schema, keyed by property name.
pub fn options_from_properties(properties: &Map<String, Value>) -> Vec<(String, Vec<String>)> {
    properties
        .iter()
        .filter_map(|(name, property)| {
            let raw_kind = property.get("type").and_then(Value::as_str)?;
            FieldKind::parse(raw_kind)
                .is_enumerable()
                .then(|| (name.clone(), option_names(property, raw_kind)))
        })
        .collect()
}

fn option_names(property: &Value, raw_kind: &str) -> Vec<String> {
    property
        .get(raw_kind)
        .and_then(|config| config.get("options"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
