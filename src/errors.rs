use thiserror::Error;

/// Failures surfaced by the capture engine. None of them end the session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    #[error("{context} failed{}: {message}", status_suffix(.status))]
    NetworkFailure {
        context: String,
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    #[error("mandatory fields are empty: {}", .fields.join(", "))]
    ValidationFailure { fields: Vec<String> },
    #[error("cannot parse value '{value}' for field '{field}'")]
    ParseFailure { field: String, value: String },
    #[error("malformed response from {context}: {message}")]
    Decode { context: String, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!(" with status {status}"),
        None => String::new(),
    }
}

impl CaptureError {
    pub fn network(context: impl Into<String>, message: impl Into<String>) -> Self {
        CaptureError::NetworkFailure {
            context: context.into(),
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        CaptureError::Decode {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, CaptureError::NetworkFailure { .. })
    }
}
