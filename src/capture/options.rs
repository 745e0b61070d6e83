use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{log_debug, log_warn, notion::NotionBackend, schema::options_from_properties};

const ENABLE_LOGS: bool = true;

/// Option names per field name.
pub type OptionMap = BTreeMap<String, Vec<String>>;

/// Fetches selectable options for the enumerable fields of a database.
pub struct OptionProvider<B> {
    backend: Arc<B>,
}

impl<B: NotionBackend> OptionProvider<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Single shot, no retry. Failures are logged and yield an empty map so
    /// enumerable fields fall back to free text.
    pub async fn fetch_options(&self, database_id: &str) -> OptionMap {
        match self.backend.fetch_database(database_id).await {
            Ok(database) => options_from_database(&database),
            Err(err) => {
                log_warn!("Option fetch for database {database_id} failed: {err}");
                OptionMap::new()
            }
        }
    }
}

pub fn options_from_database(database: &Value) -> OptionMap {
    let Some(properties) = database.get("properties").and_then(Value::as_object) else {
        log_warn!("Database response has no properties object; no options available");
        return OptionMap::new();
    };
    options_from_properties(properties).into_iter().collect()
}

/// Options fetched during the current session, keyed by database id.
#[derive(Debug, Default)]
pub struct OptionCache {
    entries: BTreeMap<String, OptionMap>,
}

impl OptionCache {
    pub fn store(&mut self, database_id: &str, options: OptionMap) {
        log_debug!(
            "Caching options for {} fields of database {database_id}",
            options.len()
        );
        self.entries.insert(database_id.to_string(), options);
    }

    pub fn invalidate(&mut self, database_id: &str) {
        self.entries.remove(database_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Options of one field; empty until the fetch completes.
    pub fn options(&self, database_id: &str, field_name: &str) -> &[String] {
        self.entries
            .get(database_id)
            .and_then(|options| options.get(field_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
