use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Semantic type of a form field, mirroring the Notion property types the
/// capture form knows how to edit and serialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FieldKind {
    Title,
    Text,
    Number,
    Email,
    Url,
    Date,
    Checkbox,
    Select,
    MultiSelect,
    Status,
    /// Any remote property type the form cannot edit (formula, relation, people, ...).
    Unsupported(String),
}

impl FieldKind {
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Title => "title",
            FieldKind::Text => "rich_text",
            FieldKind::Number => "number",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Date => "date",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select => "select",
            FieldKind::MultiSelect => "multi_select",
            FieldKind::Status => "status",
            FieldKind::Unsupported(raw) => raw.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "title" => FieldKind::Title,
            "rich_text" | "text" => FieldKind::Text,
            "number" => FieldKind::Number,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "date" => FieldKind::Date,
            "checkbox" => FieldKind::Checkbox,
            "select" => FieldKind::Select,
            "multi_select" => FieldKind::MultiSelect,
            "status" => FieldKind::Status,
            other => FieldKind::Unsupported(other.to_string()),
        }
    }

    /// Kinds whose value is picked from a remote option list.
    pub fn is_enumerable(&self) -> bool {
        matches!(
            self,
            FieldKind::Select | FieldKind::MultiSelect | FieldKind::Status
        )
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FieldKind::Unsupported(_))
    }

    pub fn default_priority(&self) -> Priority {
        match self {
            // Every Notion page carries exactly one title property.
            FieldKind::Title => Priority::Mandatory,
            FieldKind::Unsupported(_) => Priority::Skip,
            _ => Priority::Optional,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FieldKind {
    fn from(value: String) -> Self {
        FieldKind::parse(&value)
    }
}

impl From<FieldKind> for String {
    fn from(value: FieldKind) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Mandatory,
    Optional,
    Skip,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Mandatory => "mandatory",
            Priority::Optional => "optional",
            Priority::Skip => "skip",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mandatory" | "required" => Some(Priority::Mandatory),
            "optional" => Some(Priority::Optional),
            "skip" => Some(Priority::Skip),
            _ => None,
        }
    }
}

/// One field of a capture template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub priority: Priority,
    #[serde(default)]
    pub default_value: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind, priority: Priority) -> Self {
        Self {
            name: name.into(),
            kind,
            priority,
            default_value: String::new(),
            order: 0,
            options: None,
        }
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = default_value.into();
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_mandatory(&self) -> bool {
        self.priority == Priority::Mandatory
    }

    pub fn is_skipped(&self) -> bool {
        self.priority == Priority::Skip || !self.kind.is_supported()
    }
}

/// A named, ordered field schema bound to one Notion database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSchema {
    pub id: String,
    pub name: String,
    pub database_id: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TemplateSchema {
    /// Fields shown in the form: everything not skipped, in `order`.
    pub fn active_fields(&self) -> Vec<FieldDescriptor> {
        let mut fields: Vec<FieldDescriptor> = self
            .fields
            .iter()
            .filter(|field| !field.is_skipped())
            .cloned()
            .collect();
        fields.sort_by_key(|field| field.order);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_wire_names() {
        for raw in [
            "title",
            "rich_text",
            "number",
            "email",
            "url",
            "date",
            "checkbox",
            "select",
            "multi_select",
            "status",
        ] {
            let kind = FieldKind::parse(raw);
            assert!(kind.is_supported(), "{raw} should be supported");
            assert_eq!(kind.as_str(), raw);
        }
        assert_eq!(FieldKind::parse("text"), FieldKind::Text);
        assert_eq!(
            FieldKind::parse("formula"),
            FieldKind::Unsupported("formula".into())
        );
    }

    #[test]
    fn default_priorities_follow_kind() {
        assert_eq!(FieldKind::Title.default_priority(), Priority::Mandatory);
        assert_eq!(FieldKind::Date.default_priority(), Priority::Optional);
        assert_eq!(FieldKind::Status.default_priority(), Priority::Optional);
        assert_eq!(
            FieldKind::Unsupported("people".into()).default_priority(),
            Priority::Skip
        );
    }

    #[test]
    fn active_fields_drop_skipped_and_sort_by_order() {
        let template = TemplateSchema {
            id: "t1".into(),
            name: "Tasks".into(),
            database_id: "db".into(),
            fields: vec![
                FieldDescriptor::new("Due", FieldKind::Date, Priority::Optional).with_order(2),
                FieldDescriptor::new("Hidden", FieldKind::Text, Priority::Skip).with_order(1),
                FieldDescriptor::new("Name", FieldKind::Title, Priority::Mandatory).with_order(0),
            ],
        };
        let names: Vec<_> = template
            .active_fields()
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, vec!["Name", "Due"]);
    }

    #[test]
    fn kind_serializes_as_wire_name() {
        let field = FieldDescriptor::new("Tags", FieldKind::MultiSelect, Priority::Optional);
        let value = serde_json::to_value(&field).expect("json");
        assert_eq!(value["kind"], "multi_select");
        assert_eq!(value["priority"], "optional");
    }
}
