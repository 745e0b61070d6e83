//! The quick-capture form engine: value storage, option lookup, the session
//! state machine and the async runtime that drives it.

pub mod controller;
pub mod filter;
pub mod keys;
pub mod options;
pub mod runtime;
pub mod state;
pub mod values;

pub use controller::{CaptureCommand, CaptureController, CaptureEvent, Clock};
pub use keys::KeyInput;
pub use options::{OptionCache, OptionMap, OptionProvider};
pub use runtime::{spawn_runtime, CaptureHandle};
pub use state::{
    CaptureSession, CaptureSnapshot, CaptureState, FieldView, OptionRow, SubmissionStatus,
    TemplateRow,
};
pub use values::FieldValueStore;
