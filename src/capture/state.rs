use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    notion::PageRef,
    schema::{FieldDescriptor, FieldKind, Priority, TemplateSchema},
};

use super::values::FieldValueStore;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "index", rename_all = "camelCase")]
pub enum CaptureState {
    SelectingTemplate,
    EditingField(usize),
    /// Validation passed and the page submission is in flight.
    Finishing,
}

impl Default for CaptureState {
    fn default() -> Self {
        CaptureState::SelectingTemplate
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SubmissionStatus {
    Idle,
    InFlight,
    Succeeded(PageRef),
    Failed(String),
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        SubmissionStatus::Idle
    }
}

/// Mutable state of one popup session.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub session_id: Uuid,
    pub template: Option<TemplateSchema>,
    /// The template's non-skip fields; `active_field_index` points into this.
    pub fields: Vec<FieldDescriptor>,
    pub active_field_index: Option<usize>,
    pub values: FieldValueStore,
    pub raw_input_text: String,
    /// Highlighted template result or option, depending on the state.
    pub highlighted: usize,
    pub validation_failed: bool,
    pub invalid_fields: BTreeSet<usize>,
    pub submission: SubmissionStatus,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            template: None,
            fields: Vec::new(),
            active_field_index: None,
            values: FieldValueStore::new(),
            raw_input_text: String::new(),
            highlighted: 0,
            validation_failed: false,
            invalid_fields: BTreeSet::new(),
            submission: SubmissionStatus::Idle,
        }
    }

    /// Starts editing `template`, keeping the session id.
    pub fn begin(&mut self, template: TemplateSchema) {
        self.fields = template.active_fields();
        self.template = Some(template);
        self.values.clear_all();
        self.active_field_index = Some(0);
        self.raw_input_text.clear();
        self.highlighted = 0;
        self.validation_failed = false;
        self.invalid_fields.clear();
        self.submission = SubmissionStatus::Idle;
    }

    /// Discards everything and starts over under a fresh session id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn database_id(&self) -> Option<&str> {
        self.template
            .as_ref()
            .map(|template| template.database_id.as_str())
    }

    pub fn active_field(&self) -> Option<&FieldDescriptor> {
        self.active_field_index
            .and_then(|index| self.fields.get(index))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: String,
    pub kind: FieldKind,
    pub priority: Priority,
    pub value: String,
    pub filled: bool,
    pub invalid: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionRow {
    pub name: String,
    pub highlighted: bool,
    pub selected: bool,
}

/// Read model published to renderers after every event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSnapshot {
    pub session_id: Uuid,
    pub state: CaptureState,
    pub input_text: String,
    pub templates: Vec<TemplateRow>,
    pub template_name: Option<String>,
    pub fields: Vec<FieldView>,
    pub options: Vec<OptionRow>,
    pub date_preview: Option<String>,
    pub validation_failed: bool,
    pub submission: SubmissionStatus,
}

impl CaptureSnapshot {
    pub fn active_field(&self) -> Option<&FieldView> {
        self.fields.iter().find(|field| field.active)
    }
}
