//! Window-level capabilities the capture runtime needs from the host app.

use std::sync::{Mutex, PoisonError};

use crate::capture::{CaptureSnapshot, CaptureState, SubmissionStatus};

/// The popup surface. Implementations own the platform window; the capture
/// engine only asks for it to be shown, hidden or focused.
pub trait AppShell: Send + Sync + 'static {
    fn show_popup(&self);
    fn hide_popup(&self);
    fn bring_to_front(&self);
}

/// Shell for the terminal driver. "Window" transitions are printed to stdout.
#[derive(Debug, Default)]
pub struct TerminalShell;

impl AppShell for TerminalShell {
    fn show_popup(&self) {
        println!("[popup shown]");
    }

    fn hide_popup(&self) {
        println!("[popup hidden]");
    }

    fn bring_to_front(&self) {}
}

impl TerminalShell {
    /// Plain-text rendering of a snapshot.
    pub fn render(&self, snapshot: &CaptureSnapshot) -> String {
        let mut lines = Vec::new();

        match snapshot.state {
            CaptureState::SelectingTemplate => {
                lines.push(format!("template> {}", snapshot.input_text));
                if snapshot.templates.is_empty() {
                    lines.push("  (no matching templates)".to_string());
                }
                for row in &snapshot.templates {
                    let marker = if row.highlighted { '>' } else { ' ' };
                    lines.push(format!(" {marker} {}", row.name));
                }
            }
            CaptureState::EditingField(_) | CaptureState::Finishing => {
                if let Some(name) = &snapshot.template_name {
                    lines.push(format!("[{name}]"));
                }
                for field in &snapshot.fields {
                    let marker = if field.active { '>' } else { ' ' };
                    let status = if field.invalid {
                        "!"
                    } else if field.filled {
                        "*"
                    } else {
                        " "
                    };
                    lines.push(format!(
                        " {marker}{status} {} ({}, {}): {}",
                        field.name,
                        field.kind,
                        field.priority.as_str(),
                        field.value
                    ));
                }
                if snapshot.state == CaptureState::Finishing {
                    lines.push("  submitting...".to_string());
                } else {
                    lines.push(format!("input> {}", snapshot.input_text));
                }
                for option in &snapshot.options {
                    let marker = if option.highlighted { '>' } else { ' ' };
                    let check = if option.selected { "[x]" } else { "[ ]" };
                    lines.push(format!("   {marker} {check} {}", option.name));
                }
                if let Some(date) = &snapshot.date_preview {
                    lines.push(format!("   date: {date}"));
                }
                if snapshot.validation_failed {
                    lines.push("  mandatory fields are missing".to_string());
                }
            }
        }

        match &snapshot.submission {
            SubmissionStatus::Succeeded(page) => match &page.url {
                Some(url) => lines.push(format!("  created {url}")),
                None => lines.push(format!("  created page {}", page.id)),
            },
            SubmissionStatus::Failed(reason) => lines.push(format!("  submission failed: {reason}")),
            SubmissionStatus::Idle | SubmissionStatus::InFlight => {}
        }

        lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCall {
    Show,
    Hide,
    BringToFront,
}

/// Shell that remembers every call, for driving the runtime headlessly.
#[derive(Debug, Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<ShellCall>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: ShellCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl AppShell for RecordingShell {
    fn show_popup(&self) {
        self.record(ShellCall::Show);
    }

    fn hide_popup(&self) {
        self.record(ShellCall::Hide);
    }

    fn bring_to_front(&self) {
        self.record(ShellCall::BringToFront);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capture::{CaptureController, CaptureEvent, KeyInput},
        dates::DateRecognizer,
        schema::{FieldDescriptor, FieldKind, Priority, TemplateSchema},
    };

    #[test]
    fn renders_template_results_with_highlight() {
        let controller = CaptureController::new(
            vec![TemplateSchema {
                id: "t".into(),
                name: "Tasks".into(),
                database_id: "db".into(),
                fields: vec![FieldDescriptor::new(
                    "Title",
                    FieldKind::Title,
                    Priority::Mandatory,
                )],
            }],
            DateRecognizer::default(),
        );
        let rendered = TerminalShell.render(&controller.snapshot());
        assert!(rendered.contains("template> "));
        assert!(rendered.contains(" > Tasks"));
    }

    #[test]
    fn renders_active_field_and_validation() {
        let mut controller = CaptureController::new(
            vec![TemplateSchema {
                id: "t".into(),
                name: "Tasks".into(),
                database_id: "db".into(),
                fields: vec![FieldDescriptor::new(
                    "Title",
                    FieldKind::Title,
                    Priority::Mandatory,
                )],
            }],
            DateRecognizer::default(),
        );
        controller.apply(CaptureEvent::Key(KeyInput::Enter));
        controller.apply(CaptureEvent::Key(KeyInput::Tab));

        let rendered = TerminalShell.render(&controller.snapshot());
        assert!(rendered.contains("[Tasks]"));
        assert!(rendered.contains(" >! Title (title, mandatory): "));
        assert!(rendered.contains("mandatory fields are missing"));
    }

    #[test]
    fn recording_shell_keeps_call_order() {
        let shell = RecordingShell::new();
        shell.show_popup();
        shell.bring_to_front();
        shell.hide_popup();
        assert_eq!(
            shell.calls(),
            vec![ShellCall::Show, ShellCall::BringToFront, ShellCall::Hide]
        );
    }
}
