pub mod field;
pub mod properties;

pub use field::{FieldDescriptor, FieldKind, Priority, TemplateSchema};
pub use properties::{fields_from_properties, options_from_properties};
