use anyhow::{anyhow, Context, Result};

use crate::schema::Priority;

pub fn parse_priority(value: &str, field: &str) -> Result<Priority> {
    Priority::parse(value).ok_or_else(|| anyhow!("{field} has unknown priority {value}"))
}

/// Option lists are stored as a JSON array; `NULL` means "not enumerable".
pub fn encode_options(options: Option<&Vec<String>>) -> Result<Option<String>> {
    options
        .map(|options| serde_json::to_string(options).context("failed to encode options"))
        .transpose()
}

pub fn decode_options(value: Option<String>, field: &str) -> Result<Option<Vec<String>>> {
    match value {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {field}"))
            .map(Some),
        None => Ok(None),
    }
}
