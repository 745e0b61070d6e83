use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    db::{
        connection::Database,
        helpers::encode_options,
        models::{FieldRow, TemplateRow},
    },
    schema::{FieldDescriptor, FieldKind, Priority, TemplateSchema},
};

fn row_to_template(row: &Row) -> rusqlite::Result<TemplateRow> {
    Ok(TemplateRow {
        id: row.get("id")?,
        name: row.get("name")?,
        database_id: row.get("database_id")?,
    })
}

fn row_to_field(row: &Row) -> rusqlite::Result<FieldRow> {
    Ok(FieldRow {
        name: row.get("name")?,
        kind: row.get("kind")?,
        priority: row.get("priority")?,
        default_value: row.get("default_value")?,
        order_index: row.get("order_index")?,
        options: row.get("options")?,
    })
}

fn load_fields(conn: &Connection, template_id: &str) -> Result<Vec<FieldDescriptor>> {
    let mut stmt = conn.prepare(
        "SELECT name, kind, priority, default_value, order_index, options
         FROM template_fields
         WHERE template_id = ?1
         ORDER BY order_index ASC",
    )?;

    let mut rows = stmt.query(params![template_id])?;
    let mut fields = Vec::new();
    while let Some(row) = rows.next()? {
        fields.push(row_to_field(row)?.into_descriptor()?);
    }
    Ok(fields)
}

fn load_template(conn: &Connection, template_id: &str) -> Result<Option<TemplateSchema>> {
    let row = conn
        .query_row(
            "SELECT id, name, database_id FROM templates WHERE id = ?1",
            params![template_id],
            row_to_template,
        )
        .optional()?;

    match row {
        Some(row) => {
            let fields = load_fields(conn, &row.id)?;
            Ok(Some(row.into_schema(fields)))
        }
        None => Ok(None),
    }
}

fn touch_template(conn: &Connection, template_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE templates SET updated_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), template_id],
    )?;
    Ok(())
}

impl Database {
    /// Stores a template and its fields in one transaction.
    pub async fn insert_template(
        &self,
        name: String,
        database_id: String,
        fields: Vec<FieldDescriptor>,
    ) -> Result<TemplateSchema> {
        self.execute(move |conn| {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now().to_rfc3339();

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO templates (id, name, database_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, name, database_id, now],
            )
            .context("failed to insert template")?;

            for field in &fields {
                tx.execute(
                    "INSERT INTO template_fields
                         (template_id, name, kind, priority, default_value, order_index, options)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        id,
                        field.name,
                        field.kind.as_str(),
                        field.priority.as_str(),
                        field.default_value,
                        field.order,
                        encode_options(field.options.as_ref())?,
                    ],
                )
                .with_context(|| format!("failed to insert field {}", field.name))?;
            }
            tx.commit()?;

            load_template(conn, &id)?.ok_or_else(|| anyhow!("Template not found after insert"))
        })
        .await
    }

    /// All templates, ordered by name.
    pub async fn list_templates(&self) -> Result<Vec<TemplateSchema>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, database_id
                 FROM templates
                 ORDER BY name COLLATE NOCASE ASC, created_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_template(row)?);
            }
            drop(rows);

            let mut templates = Vec::with_capacity(records.len());
            for record in records {
                let fields = load_fields(conn, &record.id)?;
                templates.push(record.into_schema(fields));
            }
            Ok(templates)
        })
        .await
    }

    pub async fn get_template(&self, template_id: &str) -> Result<Option<TemplateSchema>> {
        let template_id = template_id.to_string();
        self.execute(move |conn| load_template(conn, &template_id))
            .await
    }

    /// Changes a field's priority, and its default value when one is given.
    pub async fn update_field(
        &self,
        template_id: &str,
        field_name: &str,
        priority: Priority,
        default_value: Option<String>,
    ) -> Result<TemplateSchema> {
        let template_id = template_id.to_string();
        let field_name = field_name.to_string();
        self.execute(move |conn| {
            let kind: Option<String> = conn
                .query_row(
                    "SELECT kind FROM template_fields WHERE template_id = ?1 AND name = ?2",
                    params![template_id, field_name],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(kind) = kind else {
                bail!("Template {template_id} has no field named {field_name}");
            };
            if priority != Priority::Skip && !FieldKind::parse(&kind).is_supported() {
                bail!("Field {field_name} has unsupported type {kind} and can only be skipped");
            }

            conn.execute(
                "UPDATE template_fields
                 SET priority = ?1,
                     default_value = COALESCE(?2, default_value)
                 WHERE template_id = ?3 AND name = ?4",
                params![priority.as_str(), default_value, template_id, field_name],
            )?;
            touch_template(conn, &template_id)?;

            load_template(conn, &template_id)?.ok_or_else(|| anyhow!("Template not found after update"))
        })
        .await
    }

    pub async fn rename_template(&self, template_id: &str, name: &str) -> Result<()> {
        let template_id = template_id.to_string();
        let name = name.trim().to_string();
        self.execute(move |conn| {
            if name.is_empty() {
                bail!("Template name cannot be empty");
            }
            let rows_affected = conn.execute(
                "UPDATE templates SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, Utc::now().to_rfc3339(), template_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("Template not found"));
            }
            Ok(())
        })
        .await
    }

    /// Deletes a template; its fields go with it.
    pub async fn delete_template(&self, template_id: &str) -> Result<()> {
        let template_id = template_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM templates WHERE id = ?1", params![template_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Template not found"));
            }
            Ok(())
        })
        .await
    }
}
