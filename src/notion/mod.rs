pub mod client;

pub use client::{
    page_ref, ClientConfig, NotionBackend, NotionClient, PageRef, DEFAULT_API_BASE_URL,
    DEFAULT_NOTION_VERSION,
};

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use serde_json::Value;

use crate::{
    db::Database,
    schema::{fields_from_properties, TemplateSchema},
};

/// Reads a database schema from Notion and stores it as a new template.
///
/// Without an explicit `name` the database's own title is used.
pub async fn import_template<B: NotionBackend>(
    backend: &B,
    db: &Database,
    database_id: &str,
    name: Option<String>,
) -> Result<TemplateSchema> {
    let database = backend
        .fetch_database(database_id)
        .await
        .with_context(|| format!("failed to fetch database {database_id}"))?;

    let properties = database
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("database {database_id} response has no properties"))?;

    let fields = fields_from_properties(properties);
    if fields.iter().all(|field| field.is_skipped()) {
        bail!("database {database_id} has no properties that can be captured");
    }

    let name = name
        .filter(|name| !name.trim().is_empty())
        .or_else(|| database_title(&database))
        .unwrap_or_else(|| database_id.to_string());

    let template = db
        .insert_template(name, database_id.to_string(), fields)
        .await?;
    info!(
        "Imported template '{}' with {} fields",
        template.name,
        template.fields.len()
    );
    Ok(template)
}

/// Concatenated plain text of the database title, when it has one.
fn database_title(database: &Value) -> Option<String> {
    let title: String = database
        .get("title")?
        .as_array()?
        .iter()
        .filter_map(|block| block.get("plain_text").and_then(Value::as_str))
        .collect();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
