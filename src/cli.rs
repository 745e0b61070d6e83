use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    capture::{spawn_runtime, CaptureController, CaptureEvent, KeyInput},
    dates::DateRecognizer,
    db::Database,
    notion::{import_template, NotionClient},
    schema::{Priority, TemplateSchema},
    settings::SettingsStore,
    shell::TerminalShell,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Quick capture into Notion databases",
    long_about = "Manages capture templates bound to Notion databases and runs the capture form in a terminal"
)]
pub struct Cli {
    /// Log at debug level (same as CAPTUREBAR_DEBUG=1).
    #[arg(long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List stored templates and their fields.
    Templates,
    /// Create a template from a Notion database schema.
    Import {
        /// Notion database id.
        #[arg(long, value_name = "ID")]
        database: String,
        /// Template name (defaults to the database title).
        #[arg(long)]
        name: Option<String>,
    },
    /// Change how a field is treated by the form.
    SetPriority {
        #[arg(long, value_name = "ID")]
        template: String,
        #[arg(long, value_name = "NAME")]
        field: String,
        #[arg(long, value_enum)]
        priority: Priority,
        /// Value used when the field is left empty.
        #[arg(long)]
        default: Option<String>,
    },
    /// Rename a template.
    Rename {
        #[arg(long, value_name = "ID")]
        template: String,
        #[arg(long)]
        name: String,
    },
    /// Delete a template.
    Delete {
        #[arg(long, value_name = "ID")]
        template: String,
    },
    /// Store the Notion integration token in settings.json.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Run the capture form against stdin, one key token or text per line.
    Capture,
}

/// Long-lived services shared by every command.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
}

pub async fn dispatch(command: Command, state: &AppState) -> Result<()> {
    match command {
        Command::Templates => list_templates(state).await,
        Command::Import { database, name } => {
            let client = notion_client(state)?;
            let template = import_template(&client, &state.db, &database, name).await?;
            println!("{}", describe(&template));
            Ok(())
        }
        Command::SetPriority {
            template,
            field,
            priority,
            default,
        } => {
            let template = state
                .db
                .update_field(&template, &field, priority, default)
                .await?;
            println!("{}", describe(&template));
            Ok(())
        }
        Command::Rename { template, name } => {
            state.db.rename_template(&template, &name).await?;
            println!("renamed {template} to {name}");
            Ok(())
        }
        Command::Delete { template } => {
            state.db.delete_template(&template).await?;
            println!("deleted {template}");
            Ok(())
        }
        Command::Login { token } => {
            let mut settings = state.settings.get();
            settings.access_token = Some(token.trim().to_string());
            state.settings.update(settings)?;
            println!("token saved");
            Ok(())
        }
        Command::Capture => capture(state).await,
    }
}

fn notion_client(state: &AppState) -> Result<NotionClient> {
    NotionClient::new(state.settings.get().client_config()?)
}

fn describe(template: &TemplateSchema) -> String {
    let mut lines = vec![format!(
        "{}  {}  (database {})",
        template.id, template.name, template.database_id
    )];
    for field in &template.fields {
        let default = if field.default_value.is_empty() {
            String::new()
        } else {
            format!(" default={}", field.default_value)
        };
        lines.push(format!(
            "    {:<24} {:<14} {}{default}",
            field.name,
            field.kind.as_str(),
            field.priority.as_str()
        ));
    }
    lines.join("\n")
}

async fn list_templates(state: &AppState) -> Result<()> {
    let templates = state.db.list_templates().await?;
    if templates.is_empty() {
        println!("no templates; import one with `capturebar import --database <id>`");
    }
    for template in &templates {
        println!("{}", describe(template));
    }
    Ok(())
}

async fn capture(state: &AppState) -> Result<()> {
    let settings = state.settings.get();
    let client = Arc::new(NotionClient::new(settings.client_config()?)?);

    let templates = state.db.list_templates().await?;
    if templates.is_empty() {
        warn!("No templates stored; the form has nothing to offer");
    }

    let controller = CaptureController::new(templates, DateRecognizer::new(settings.date_order));
    let shell = Arc::new(TerminalShell);
    let handle = spawn_runtime(controller, client, shell.clone());

    let mut snapshots = handle.subscribe();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            println!("{}\n", shell.render(&snapshot));
        }
    });

    handle.send(CaptureEvent::Open)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        handle.send(CaptureEvent::Key(KeyInput::from_token(&line)))?;
    }

    handle.shutdown().await?;
    printer.await.context("snapshot printer panicked")?;
    Ok(())
}
