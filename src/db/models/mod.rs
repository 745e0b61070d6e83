pub mod template;

pub use template::{FieldRow, TemplateRow};
