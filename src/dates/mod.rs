mod phrases;
pub mod recognizer;

pub use recognizer::{format_date, is_iso_date, DateOrder, DateRecognizer, DATE_FORMAT};
