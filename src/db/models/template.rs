//! Row shapes of the `templates` and `template_fields` tables.

use anyhow::Result;

use crate::{
    db::helpers::{decode_options, parse_priority},
    schema::{FieldDescriptor, FieldKind, TemplateSchema},
};

#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub database_id: String,
}

impl TemplateRow {
    pub fn into_schema(self, fields: Vec<FieldDescriptor>) -> TemplateSchema {
        TemplateSchema {
            id: self.id,
            name: self.name,
            database_id: self.database_id,
            fields,
        }
    }
}

/// One stored field. `kind` keeps the remote type name so unsupported kinds
/// survive a round trip.
#[derive(Debug, Clone)]
pub struct FieldRow {
    pub name: String,
    pub kind: String,
    pub priority: String,
    pub default_value: String,
    pub order_index: i64,
    pub options: Option<String>,
}

impl FieldRow {
    pub fn into_descriptor(self) -> Result<FieldDescriptor> {
        Ok(FieldDescriptor {
            kind: FieldKind::parse(&self.kind),
            priority: parse_priority(&self.priority, "priority")?,
            options: decode_options(self.options, "options")?,
            name: self.name,
            default_value: self.default_value,
            order: self.order_index,
        })
    }
}
