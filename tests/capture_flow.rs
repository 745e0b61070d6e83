use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use capturebar_lib::{
    capture::{
        spawn_runtime, CaptureController, CaptureEvent, CaptureHandle, CaptureSnapshot,
        CaptureState, Clock, KeyInput, SubmissionStatus,
    },
    dates::DateRecognizer,
    db::Database,
    errors::CaptureError,
    notion::{import_template, NotionBackend, PageRef},
    schema::{Priority, TemplateSchema},
    shell::{RecordingShell, ShellCall},
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tokio::{sync::watch, time::timeout};

/// In-memory stand-in for the Notion API.
struct FakeNotion {
    database: Value,
    fail_submissions: bool,
    pages: Mutex<Vec<Map<String, Value>>>,
}

impl FakeNotion {
    fn new(fail_submissions: bool) -> Self {
        Self {
            database: json!({
                "object": "database",
                "title": [{ "plain_text": "Launch plan" }],
                "properties": {
                    "Due": { "type": "date", "date": {} },
                    "Estimate": { "type": "number", "number": {} },
                    "Title": { "type": "title", "title": {} },
                    "Area": {
                        "type": "select",
                        "select": { "options": [{ "name": "Product" }, { "name": "Ops" }] }
                    },
                    "Assignee": { "type": "people", "people": {} }
                }
            }),
            fail_submissions,
            pages: Mutex::new(Vec::new()),
        }
    }

    fn pages(&self) -> Vec<Map<String, Value>> {
        self.pages.lock().expect("pages lock").clone()
    }
}

impl NotionBackend for FakeNotion {
    async fn fetch_database(&self, _database_id: &str) -> Result<Value, CaptureError> {
        Ok(self.database.clone())
    }

    async fn create_page(
        &self,
        _database_id: &str,
        properties: Map<String, Value>,
    ) -> Result<PageRef, CaptureError> {
        if self.fail_submissions {
            return Err(CaptureError::NetworkFailure {
                context: "create page".into(),
                status: Some(502),
                code: None,
                message: "bad gateway".into(),
            });
        }
        self.pages.lock().expect("pages lock").push(properties);
        Ok(PageRef {
            id: "page-42".into(),
            url: None,
        })
    }
}

fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

async fn imported_template(dir: &TempDir, backend: &FakeNotion) -> (Database, TemplateSchema) {
    let db = Database::new(dir.path().join("store.sqlite3")).expect("database");
    let template = import_template(backend, &db, "db-launch", None)
        .await
        .expect("import");
    (db, template)
}

fn start(
    template: TemplateSchema,
    backend: Arc<FakeNotion>,
    shell: Arc<RecordingShell>,
) -> (CaptureHandle, watch::Receiver<CaptureSnapshot>) {
    let controller = CaptureController::new(vec![template], DateRecognizer::default())
        .with_clock(Clock::Fixed(friday()));
    let handle = spawn_runtime(controller, backend, shell);
    let snapshots = handle.subscribe();
    (handle, snapshots)
}

fn press(handle: &CaptureHandle, keys: impl IntoIterator<Item = KeyInput>) {
    for key in keys {
        handle.send(CaptureEvent::Key(key)).expect("runtime alive");
    }
}

fn text(value: &str) -> KeyInput {
    KeyInput::Text(value.into())
}

async fn wait_until(
    snapshots: &mut watch::Receiver<CaptureSnapshot>,
    condition: impl FnMut(&CaptureSnapshot) -> bool,
) -> CaptureSnapshot {
    timeout(Duration::from_secs(5), snapshots.wait_for(condition))
        .await
        .expect("condition reached in time")
        .expect("runtime alive")
        .clone()
}

#[tokio::test]
async fn imported_template_captures_a_page() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeNotion::new(false));
    let (db, template) = imported_template(&dir, &backend).await;

    // Field order is the title first, then the database's own order.
    let names: Vec<_> = template.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Title", "Due", "Estimate", "Area", "Assignee"]);

    let template = db
        .update_field(&template.id, "Area", Priority::Optional, Some("Ops".into()))
        .await
        .expect("set default");

    let shell = Arc::new(RecordingShell::new());
    let (handle, mut snapshots) = start(template, backend.clone(), shell.clone());

    handle.send(CaptureEvent::Open).expect("runtime alive");
    press(
        &handle,
        [
            text("launch"),
            KeyInput::Enter,
            text("Launch"),
            KeyInput::Enter,
            text("next friday"),
            KeyInput::Tab,
            text("12a3.4b"),
        ],
    );

    let snapshot = wait_until(&mut snapshots, |s| {
        s.fields.iter().any(|f| f.name == "Estimate" && f.value == "123.4")
    })
    .await;
    assert_eq!(snapshot.input_text, "123.4");
    assert!(snapshot.fields.iter().all(|f| f.name != "Assignee"));

    press(&handle, [KeyInput::CmdEnter]);
    let done = wait_until(&mut snapshots, |s| {
        matches!(s.submission, SubmissionStatus::Succeeded(_))
    })
    .await;
    assert_eq!(done.state, CaptureState::SelectingTemplate);

    handle.shutdown().await.expect("shutdown");

    let pages = backend.pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(
        Value::Object(pages[0].clone()),
        json!({
            "Title": { "title": [{ "text": { "content": "Launch" } }] },
            "Due": { "date": { "start": "2026-10-23" } },
            "Estimate": { "number": 123.4 },
            "Area": { "select": { "name": "Ops" } }
        })
    );
    assert_eq!(
        shell.calls(),
        vec![ShellCall::Show, ShellCall::BringToFront, ShellCall::Hide]
    );
}

#[tokio::test]
async fn empty_title_blocks_submission() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeNotion::new(false));
    let (_db, template) = imported_template(&dir, &backend).await;

    let (handle, mut snapshots) = start(template, backend.clone(), Arc::new(RecordingShell::new()));
    press(&handle, [KeyInput::Enter, KeyInput::CmdEnter]);

    let snapshot = wait_until(&mut snapshots, |s| s.validation_failed).await;
    assert_eq!(snapshot.state, CaptureState::EditingField(0));
    let title = snapshot.fields.iter().find(|f| f.name == "Title").expect("title");
    assert!(title.invalid);

    handle.shutdown().await.expect("shutdown");
    assert!(backend.pages().is_empty());
}

#[tokio::test]
async fn failed_submission_keeps_values_for_retry() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeNotion::new(true));
    let (_db, template) = imported_template(&dir, &backend).await;

    let shell = Arc::new(RecordingShell::new());
    let (handle, mut snapshots) = start(template, backend.clone(), shell.clone());
    press(
        &handle,
        [KeyInput::Enter, text("Launch"), KeyInput::CmdEnter],
    );

    let snapshot = wait_until(&mut snapshots, |s| {
        matches!(s.submission, SubmissionStatus::Failed(_))
    })
    .await;
    assert_eq!(snapshot.state, CaptureState::EditingField(0));
    let title = snapshot.fields.iter().find(|f| f.name == "Title").expect("title");
    assert_eq!(title.value, "Launch");
    match &snapshot.submission {
        SubmissionStatus::Failed(reason) => assert!(reason.contains("bad gateway")),
        other => panic!("unexpected status {other:?}"),
    }

    handle.shutdown().await.expect("shutdown");
    assert!(shell.calls().is_empty());
}
