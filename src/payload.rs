//! Conversion of captured string values into Notion's typed property objects.

use std::collections::BTreeMap;

use log::warn;
use serde_json::{json, Map, Value};

use crate::{
    dates::is_iso_date,
    errors::CaptureError,
    schema::{FieldDescriptor, FieldKind},
};

/// Serialized properties plus the fields that had to be left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializedPayload {
    pub properties: Map<String, Value>,
    pub omitted: Vec<CaptureError>,
}

/// Builds the `properties` object for a page. Empty values are skipped, and
/// values that cannot be represented are dropped with a warning rather than
/// failing the whole submission.
pub fn serialize(values: &BTreeMap<String, String>, fields: &[FieldDescriptor]) -> Map<String, Value> {
    let payload = serialize_report(values, fields);
    for problem in &payload.omitted {
        warn!("Omitting property from payload: {problem}");
    }
    payload.properties
}

pub fn serialize_report(
    values: &BTreeMap<String, String>,
    fields: &[FieldDescriptor],
) -> SerializedPayload {
    let mut payload = SerializedPayload::default();

    for field in fields {
        let Some(value) = values.get(&field.name).filter(|value| !value.is_empty()) else {
            continue;
        };

        match property_value(&field.kind, value) {
            Some(property) => {
                payload.properties.insert(field.name.clone(), property);
            }
            None => payload.omitted.push(CaptureError::ParseFailure {
                field: field.name.clone(),
                value: value.clone(),
            }),
        }
    }

    payload
}

fn property_value(kind: &FieldKind, value: &str) -> Option<Value> {
    let property = match kind {
        FieldKind::Title => json!({ "title": [text_block(value)] }),
        FieldKind::Text => json!({ "rich_text": [text_block(value)] }),
        FieldKind::Number => {
            let number = value.trim().parse::<f64>().ok().filter(|n| n.is_finite())?;
            json!({ "number": number })
        }
        FieldKind::Url => json!({ "url": value }),
        FieldKind::Email => json!({ "email": value }),
        FieldKind::Date => {
            if !is_iso_date(value) {
                return None;
            }
            json!({ "date": { "start": value } })
        }
        FieldKind::Checkbox => json!({ "checkbox": value == "true" }),
        FieldKind::Select => json!({ "select": { "name": value } }),
        FieldKind::Status => json!({ "status": { "name": value } }),
        FieldKind::MultiSelect => {
            let options: Vec<Value> = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| json!({ "name": name }))
                .collect();
            json!({ "multi_select": options })
        }
        FieldKind::Unsupported(_) => return None,
    };
    Some(property)
}

fn text_block(content: &str) -> Value {
    json!({ "text": { "content": content } })
}

/// Request body for `POST /pages`.
pub fn page_body(database_id: &str, properties: Map<String, Value>) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::values::FieldValueStore;
    use crate::schema::Priority;
    use pretty_assertions::assert_eq;

    fn field(name: &str, kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor::new(name, kind, Priority::Optional)
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn every_supported_kind_maps_to_its_shape() {
        let fields = vec![
            field("Name", FieldKind::Title),
            field("Notes", FieldKind::Text),
            field("Points", FieldKind::Number),
            field("Link", FieldKind::Url),
            field("Mail", FieldKind::Email),
            field("Due", FieldKind::Date),
            field("Done", FieldKind::Checkbox),
            field("Kind", FieldKind::Select),
            field("State", FieldKind::Status),
        ];
        let properties = serialize(
            &values(&[
                ("Name", "Launch"),
                ("Notes", "ship it"),
                ("Points", "3.5"),
                ("Link", "https://example.com"),
                ("Mail", "a@b.co"),
                ("Due", "2026-10-23"),
                ("Done", "true"),
                ("Kind", "Bug"),
                ("State", "Todo"),
            ]),
            &fields,
        );

        assert_eq!(
            Value::Object(properties),
            json!({
                "Name": { "title": [{ "text": { "content": "Launch" } }] },
                "Notes": { "rich_text": [{ "text": { "content": "ship it" } }] },
                "Points": { "number": 3.5 },
                "Link": { "url": "https://example.com" },
                "Mail": { "email": "a@b.co" },
                "Due": { "date": { "start": "2026-10-23" } },
                "Done": { "checkbox": true },
                "Kind": { "select": { "name": "Bug" } },
                "State": { "status": { "name": "Todo" } }
            })
        );
    }

    #[test]
    fn multi_select_round_trips_through_value_store() {
        let tags = field("Tags", FieldKind::MultiSelect);
        let mut store = FieldValueStore::new();
        store.toggle("Tags", "A");
        store.toggle("Tags", "B");
        let properties = serialize(store.values(), std::slice::from_ref(&tags));
        assert_eq!(
            properties["Tags"],
            json!({ "multi_select": [{ "name": "A" }, { "name": "B" }] })
        );
    }

    #[test]
    fn empty_and_unparseable_values_are_omitted() {
        let fields = vec![
            field("Name", FieldKind::Title),
            field("Points", FieldKind::Number),
            field("Due", FieldKind::Date),
            field("Owner", FieldKind::Unsupported("people".into())),
        ];
        let report = serialize_report(
            &values(&[
                ("Name", ""),
                ("Points", "."),
                ("Due", "next friday"),
                ("Owner", "me"),
            ]),
            &fields,
        );
        assert!(report.properties.is_empty());
        let omitted: Vec<_> = report
            .omitted
            .iter()
            .map(|err| match err {
                CaptureError::ParseFailure { field, .. } => field.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(omitted, vec!["Points", "Due", "Owner"]);
    }

    #[test]
    fn checkbox_false_is_still_sent() {
        let properties = serialize(
            &values(&[("Done", "false")]),
            &[field("Done", FieldKind::Checkbox)],
        );
        assert_eq!(properties["Done"], json!({ "checkbox": false }));
    }

    #[test]
    fn page_body_wraps_parent_and_properties() {
        let mut properties = Map::new();
        properties.insert("Name".into(), json!({ "title": [] }));
        let body = page_body("db-1", properties);
        assert_eq!(body["parent"]["database_id"], "db-1");
        assert!(body["properties"]["Name"].is_object());
    }
}
