use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    dates::DateRecognizer,
    errors::CaptureError,
    log_debug, log_error, log_info, log_warn,
    notion::PageRef,
    payload,
    schema::{FieldKind, TemplateSchema},
};

use super::{
    filter::{filter_options, filter_templates, wrap_index},
    keys::KeyInput,
    options::{OptionCache, OptionMap},
    state::{
        CaptureSession, CaptureSnapshot, CaptureState, FieldView, OptionRow, SubmissionStatus,
        TemplateRow,
    },
};

const ENABLE_LOGS: bool = true;

/// Inputs to the capture state machine: UI events and completions of the
/// requests it issued.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// The hotkey fired and the popup should appear.
    Open,
    Key(KeyInput),
    /// The text box content was replaced wholesale (edits, deletions, paste).
    SetText(String),
    /// Click on the n-th filtered template result.
    SelectTemplate(usize),
    /// Click on the n-th filtered option of the active field.
    ClickOption(usize),
    TemplatesChanged(Vec<TemplateSchema>),
    OptionsLoaded {
        session_id: Uuid,
        database_id: String,
        options: OptionMap,
    },
    SubmissionFinished {
        session_id: Uuid,
        outcome: Result<PageRef, CaptureError>,
    },
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureCommand {
    FetchOptions {
        session_id: Uuid,
        database_id: String,
    },
    Submit {
        session_id: Uuid,
        database_id: String,
        properties: Map<String, Value>,
    },
    ShowPopup,
    ClosePopup,
}

/// Where "today" comes from when resolving relative dates.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

pub struct CaptureController {
    templates: Vec<TemplateSchema>,
    state: CaptureState,
    session: CaptureSession,
    options: OptionCache,
    recognizer: DateRecognizer,
    clock: Clock,
}

impl CaptureController {
    pub fn new(templates: Vec<TemplateSchema>, recognizer: DateRecognizer) -> Self {
        Self {
            templates,
            state: CaptureState::SelectingTemplate,
            session: CaptureSession::new(),
            options: OptionCache::default(),
            recognizer,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Applies one event and returns the side effects it requires.
    pub fn apply(&mut self, event: CaptureEvent) -> Vec<CaptureCommand> {
        match event {
            CaptureEvent::Open => vec![CaptureCommand::ShowPopup],
            CaptureEvent::Key(KeyInput::Escape) => self.close(),
            CaptureEvent::TemplatesChanged(templates) => {
                self.templates = templates;
                if self.state == CaptureState::SelectingTemplate {
                    self.session.highlighted = 0;
                }
                Vec::new()
            }
            CaptureEvent::OptionsLoaded {
                session_id,
                database_id,
                options,
            } => {
                self.options_loaded(session_id, &database_id, options);
                Vec::new()
            }
            CaptureEvent::SubmissionFinished {
                session_id,
                outcome,
            } => self.submission_finished(session_id, outcome),
            event => match self.state {
                CaptureState::SelectingTemplate => self.apply_selecting(event),
                CaptureState::EditingField(index) => self.apply_editing(index, event),
                CaptureState::Finishing => {
                    log_debug!("Ignoring {event:?} while the submission is in flight");
                    Vec::new()
                }
            },
        }
    }

    fn apply_selecting(&mut self, event: CaptureEvent) -> Vec<CaptureCommand> {
        match event {
            CaptureEvent::Key(KeyInput::Text(text)) => {
                self.session.raw_input_text.push_str(&text);
                self.session.highlighted = 0;
                Vec::new()
            }
            CaptureEvent::SetText(text) => {
                self.session.raw_input_text = text;
                self.session.highlighted = 0;
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Up) => {
                self.move_template_highlight(-1);
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Down) => {
                self.move_template_highlight(1);
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Enter) => self.commit_filtered_template(self.session.highlighted),
            CaptureEvent::SelectTemplate(position) => self.commit_filtered_template(position),
            _ => Vec::new(),
        }
    }

    fn apply_editing(&mut self, index: usize, event: CaptureEvent) -> Vec<CaptureCommand> {
        match event {
            CaptureEvent::Key(KeyInput::Text(text)) => {
                let mut updated = self.session.raw_input_text.clone();
                updated.push_str(&text);
                self.text_changed(index, updated);
                Vec::new()
            }
            CaptureEvent::SetText(text) => {
                self.text_changed(index, text);
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Up) => {
                self.move_option_highlight(index, -1);
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Down) => {
                self.move_option_highlight(index, 1);
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Tab) => {
                self.tab_forward(index);
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::ShiftTab) => {
                self.capture_field(index);
                let len = self.session.fields.len();
                self.focus_field(wrap_index(index, -1, len));
                Vec::new()
            }
            CaptureEvent::Key(KeyInput::Enter) => self.enter(index, None),
            CaptureEvent::ClickOption(position) => self.enter(index, Some(position)),
            CaptureEvent::Key(KeyInput::CmdEnter) => self.finish(index),
            _ => Vec::new(),
        }
    }

    fn close(&mut self) -> Vec<CaptureCommand> {
        log_info!("Capture session {} closed without submitting", self.session.session_id);
        self.reset_session();
        vec![CaptureCommand::ClosePopup]
    }

    fn reset_session(&mut self) {
        self.session.reset();
        self.options.clear();
        self.state = CaptureState::SelectingTemplate;
    }

    fn filtered_templates(&self) -> Vec<&TemplateSchema> {
        filter_templates(&self.templates, &self.session.raw_input_text)
    }

    fn move_template_highlight(&mut self, delta: isize) {
        let count = self.filtered_templates().len();
        self.session.highlighted = wrap_index(self.session.highlighted, delta, count);
    }

    fn commit_filtered_template(&mut self, position: usize) -> Vec<CaptureCommand> {
        let Some(template) = self.filtered_templates().get(position).map(|t| (*t).clone()) else {
            return Vec::new();
        };
        self.commit_template(template)
    }

    /// Starts editing `template` at its first field and requests its options.
    pub fn commit_template(&mut self, template: TemplateSchema) -> Vec<CaptureCommand> {
        if template.active_fields().is_empty() {
            log_warn!("Template '{}' has no editable fields", template.name);
            return Vec::new();
        }

        let database_id = template.database_id.clone();
        log_info!(
            "Session {} committed template '{}' ({database_id})",
            self.session.session_id,
            template.name
        );

        self.session.begin(template);
        self.options.invalidate(&database_id);
        self.state = CaptureState::EditingField(0);

        vec![CaptureCommand::FetchOptions {
            session_id: self.session.session_id,
            database_id,
        }]
    }

    fn options_loaded(&mut self, session_id: Uuid, database_id: &str, options: OptionMap) {
        if session_id != self.session.session_id || self.session.database_id() != Some(database_id)
        {
            log_debug!("Discarding stale options for database {database_id}");
            return;
        }

        self.options.store(database_id, options);

        let Some(first) = self.session.fields.first().cloned() else {
            return;
        };
        if !first.kind.is_enumerable() || !self.session.values.get(&first.name).is_empty() {
            return;
        }
        if let Some(seed) = self.options.options(database_id, &first.name).first().cloned() {
            self.session.values.set(&first.name, seed);
            self.session.values.mark_filled(0);
        }
    }

    fn field_options(&self, index: usize) -> Vec<String> {
        let (Some(database_id), Some(field)) =
            (self.session.database_id(), self.session.fields.get(index))
        else {
            return Vec::new();
        };
        filter_options(
            self.options.options(database_id, &field.name),
            &self.session.raw_input_text,
        )
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    fn text_changed(&mut self, index: usize, text: String) {
        let Some(field) = self.session.fields.get(index).cloned() else {
            return;
        };

        if field.kind.is_enumerable() {
            self.session.raw_input_text = text;
            self.session.highlighted = 0;
            return;
        }

        self.session.values.write(&field, &text);
        self.session.raw_input_text = match field.kind {
            // The box mirrors what the number policy kept.
            FieldKind::Number => self.session.values.get(&field.name),
            _ => text,
        };
        self.session.values.mark_unfilled(index);
        if !self.session.raw_input_text.is_empty() {
            self.session.invalid_fields.remove(&index);
            if self.session.invalid_fields.is_empty() {
                self.session.validation_failed = false;
            }
        }
    }

    fn move_option_highlight(&mut self, index: usize, delta: isize) {
        let kind_enumerable = self
            .session
            .fields
            .get(index)
            .map(|field| field.kind.is_enumerable())
            .unwrap_or(false);
        if !kind_enumerable {
            return;
        }
        let count = self.field_options(index).len();
        self.session.highlighted = wrap_index(self.session.highlighted, delta, count);
    }

    /// Stores the value of field `index` from the current input and updates
    /// the filled set. Returns the captured value.
    fn capture_field(&mut self, index: usize) -> String {
        let Some(field) = self.session.fields.get(index).cloned() else {
            return String::new();
        };
        let text = self.session.raw_input_text.clone();

        let value = if field.kind.is_enumerable() {
            let database_id = self.session.database_id().unwrap_or_default().to_string();
            let free_text = self.options.options(&database_id, &field.name).is_empty();
            if free_text && !text.trim().is_empty() {
                if field.kind == FieldKind::MultiSelect {
                    if !self.session.values.selected(&field.name).contains(&text) {
                        self.session.values.toggle(&field.name, &text);
                    }
                } else {
                    self.session.values.set(&field.name, text);
                }
            }
            let current = self.session.values.get(&field.name);
            if current.is_empty() && !field.default_value.is_empty() {
                self.session.values.set(&field.name, field.default_value.clone());
            }
            self.session.values.get(&field.name)
        } else {
            let captured = self.session.values.capture(&field, &text);
            self.normalize_date(index, captured)
        };

        if value.is_empty() {
            self.session.values.mark_unfilled(index);
        } else {
            self.session.values.mark_filled(index);
            self.session.invalid_fields.remove(&index);
        }
        value
    }

    /// Date fields hold `YYYY-MM-DD` whenever the text is recognisable.
    fn normalize_date(&mut self, index: usize, value: String) -> String {
        let Some(field) = self.session.fields.get(index) else {
            return value;
        };
        if field.kind != FieldKind::Date || value.is_empty() {
            return value;
        }
        match self.recognizer.recognize_formatted(&value, self.clock.today()) {
            Some(date) => {
                let name = field.name.clone();
                self.session.values.set(&name, date.clone());
                date
            }
            None => {
                log_debug!("No date recognised in '{value}'");
                value
            }
        }
    }

    fn focus_field(&mut self, index: usize) {
        self.state = CaptureState::EditingField(index);
        self.session.active_field_index = Some(index);
        self.session.highlighted = 0;
        self.session.raw_input_text = match self.session.fields.get(index) {
            Some(field) if !field.kind.is_enumerable() => self.session.values.get(&field.name),
            _ => String::new(),
        };
    }

    fn tab_forward(&mut self, index: usize) {
        let value = self.capture_field(index);
        let mandatory = self
            .session
            .fields
            .get(index)
            .map(|field| field.is_mandatory())
            .unwrap_or(false);

        if mandatory && value.is_empty() {
            self.session.validation_failed = true;
            self.session.invalid_fields.insert(index);
            return;
        }

        let len = self.session.fields.len();
        self.focus_field(wrap_index(index, 1, len));
    }

    fn enter(&mut self, index: usize, clicked: Option<usize>) -> Vec<CaptureCommand> {
        let Some(field) = self.session.fields.get(index).cloned() else {
            return Vec::new();
        };

        if !field.kind.is_enumerable() {
            self.capture_field(index);
            return self.advance_or_finish(index);
        }

        let options = self.field_options(index);
        let position = clicked.unwrap_or(self.session.highlighted);
        let chosen = if options.is_empty() {
            let typed = self.session.raw_input_text.trim().to_string();
            (!typed.is_empty()).then_some(typed)
        } else {
            options.get(position).cloned()
        };

        match (field.kind == FieldKind::MultiSelect, chosen) {
            (true, Some(option)) => {
                self.session.values.toggle(&field.name, &option);
                if self.session.values.get(&field.name).is_empty() {
                    self.session.values.mark_unfilled(index);
                } else {
                    self.session.values.mark_filled(index);
                    self.session.invalid_fields.remove(&index);
                }
                self.session.raw_input_text.clear();
                self.session.highlighted = 0;
                Vec::new()
            }
            (false, Some(option)) => {
                self.session.values.set(&field.name, option);
                self.session.values.mark_filled(index);
                self.session.invalid_fields.remove(&index);
                self.session.raw_input_text.clear();
                self.advance_or_finish(index)
            }
            (_, None) => {
                self.capture_field(index);
                self.advance_or_finish(index)
            }
        }
    }

    fn advance_or_finish(&mut self, index: usize) -> Vec<CaptureCommand> {
        if index + 1 >= self.session.fields.len() {
            self.finish(index)
        } else {
            self.focus_field(index + 1);
            Vec::new()
        }
    }

    /// Validates mandatory fields and, when they are all present, fills
    /// defaults and requests the submission.
    fn finish(&mut self, index: usize) -> Vec<CaptureCommand> {
        self.capture_field(index);

        let missing: Vec<usize> = self
            .session
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| {
                field.is_mandatory()
                    && self.session.values.get(&field.name).is_empty()
                    && field.default_value.is_empty()
            })
            .map(|(position, _)| position)
            .collect();

        if !missing.is_empty() {
            let error = CaptureError::ValidationFailure {
                fields: missing
                    .iter()
                    .map(|&position| self.session.fields[position].name.clone())
                    .collect(),
            };
            log_info!("Finishing refused: {error}");
            self.session.validation_failed = true;
            for position in missing {
                self.session.values.mark_unfilled(position);
                self.session.invalid_fields.insert(position);
            }
            return Vec::new();
        }

        self.fill_defaults();

        let Some(database_id) = self.session.database_id().map(str::to_string) else {
            return Vec::new();
        };
        let properties = payload::serialize(self.session.values.values(), &self.session.fields);

        self.session.validation_failed = false;
        self.session.invalid_fields.clear();
        self.session.submission = SubmissionStatus::InFlight;
        self.state = CaptureState::Finishing;

        log_info!(
            "Submitting {} properties to database {database_id}",
            properties.len()
        );
        vec![CaptureCommand::Submit {
            session_id: self.session.session_id,
            database_id,
            properties,
        }]
    }

    fn fill_defaults(&mut self) {
        for position in 0..self.session.fields.len() {
            let field = self.session.fields[position].clone();
            if !self.session.values.get(&field.name).is_empty() {
                self.session.values.mark_filled(position);
                continue;
            }
            if field.default_value.is_empty() {
                continue;
            }
            let captured = self.session.values.capture(&field, "");
            self.normalize_date(position, captured);
            self.session.values.mark_filled(position);
        }
    }

    fn submission_finished(
        &mut self,
        session_id: Uuid,
        outcome: Result<PageRef, CaptureError>,
    ) -> Vec<CaptureCommand> {
        if session_id != self.session.session_id || self.state != CaptureState::Finishing {
            log_debug!("Discarding stale submission result for session {session_id}");
            return Vec::new();
        }

        match outcome {
            Ok(page) => {
                log_info!("Created page {} for session {session_id}", page.id);
                self.reset_session();
                self.session.submission = SubmissionStatus::Succeeded(page);
                vec![CaptureCommand::ClosePopup]
            }
            Err(err) => {
                if err.is_network() {
                    log_warn!("Submission for session {session_id} failed, values kept: {err}");
                } else {
                    log_error!("Submission for session {session_id} returned an unreadable response: {err}");
                }
                self.session.submission = SubmissionStatus::Failed(err.to_string());
                let index = self.session.active_field_index.unwrap_or(0);
                self.state = CaptureState::EditingField(index);
                Vec::new()
            }
        }
    }

    /// Builds the render model for the current state.
    pub fn snapshot(&self) -> CaptureSnapshot {
        let session = &self.session;
        let editing = matches!(self.state, CaptureState::EditingField(_));

        let templates = if self.state == CaptureState::SelectingTemplate {
            self.filtered_templates()
                .into_iter()
                .enumerate()
                .map(|(position, template)| TemplateRow {
                    id: template.id.clone(),
                    name: template.name.clone(),
                    highlighted: position == session.highlighted,
                })
                .collect()
        } else {
            Vec::new()
        };

        let fields = session
            .fields
            .iter()
            .enumerate()
            .map(|(position, field)| FieldView {
                name: field.name.clone(),
                kind: field.kind.clone(),
                priority: field.priority,
                value: session.values.get(&field.name),
                filled: session.values.is_filled(position),
                invalid: session.invalid_fields.contains(&position),
                active: editing && session.active_field_index == Some(position),
            })
            .collect();

        let (options, date_preview) = match (self.state, session.active_field()) {
            (CaptureState::EditingField(index), Some(field)) if field.kind.is_enumerable() => {
                let selected = session.values.selected(&field.name);
                let current = session.values.get(&field.name);
                let rows = self
                    .field_options(index)
                    .into_iter()
                    .enumerate()
                    .map(|(position, name)| OptionRow {
                        highlighted: position == session.highlighted,
                        selected: if field.kind == FieldKind::MultiSelect {
                            selected.contains(&name)
                        } else {
                            current == name
                        },
                        name,
                    })
                    .collect();
                (rows, None)
            }
            (CaptureState::EditingField(_), Some(field)) if field.kind == FieldKind::Date => (
                Vec::new(),
                self.recognizer
                    .recognize_formatted(&session.raw_input_text, self.clock.today()),
            ),
            _ => (Vec::new(), None),
        };

        CaptureSnapshot {
            session_id: session.session_id,
            state: self.state,
            input_text: session.raw_input_text.clone(),
            templates,
            template_name: session.template.as_ref().map(|t| t.name.clone()),
            fields,
            options,
            date_preview,
            validation_failed: session.validation_failed,
            submission: session.submission.clone(),
        }
    }
}
