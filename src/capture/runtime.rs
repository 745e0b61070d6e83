use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender},
        watch,
    },
    task::JoinHandle,
};

use crate::{log_debug, log_info, notion::NotionBackend, shell::AppShell};

use super::{
    controller::{CaptureCommand, CaptureController, CaptureEvent},
    options::OptionProvider,
    state::CaptureSnapshot,
};

const ENABLE_LOGS: bool = true;

/// Handle to a running capture loop.
pub struct CaptureHandle {
    events: UnboundedSender<CaptureEvent>,
    snapshots: watch::Receiver<CaptureSnapshot>,
    task: JoinHandle<()>,
}

impl CaptureHandle {
    pub fn send(&self, event: CaptureEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| anyhow!("capture runtime has stopped"))
    }

    /// Receiver that is notified after every processed event.
    pub fn subscribe(&self) -> watch::Receiver<CaptureSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stops accepting events and waits until in-flight requests have been
    /// applied.
    pub async fn shutdown(self) -> Result<()> {
        let Self { events, task, .. } = self;
        drop(events);
        task.await.context("capture runtime task panicked")
    }
}

/// Moves `controller` onto its own task and starts processing events.
pub fn spawn_runtime<B, S>(
    controller: CaptureController,
    backend: Arc<B>,
    shell: Arc<S>,
) -> CaptureHandle
where
    B: NotionBackend,
    S: AppShell,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

    let runtime = CaptureRuntime {
        controller,
        options: Arc::new(OptionProvider::new(backend.clone())),
        backend,
        shell,
        events: event_tx.downgrade(),
        snapshots: snapshot_tx,
    };
    let task = tokio::spawn(runtime.run(event_rx));

    CaptureHandle {
        events: event_tx,
        snapshots: snapshot_rx,
        task,
    }
}

struct CaptureRuntime<B, S> {
    controller: CaptureController,
    options: Arc<OptionProvider<B>>,
    backend: Arc<B>,
    shell: Arc<S>,
    // Weak so the loop ends once every handle and in-flight request is gone.
    events: WeakUnboundedSender<CaptureEvent>,
    snapshots: watch::Sender<CaptureSnapshot>,
}

impl<B, S> CaptureRuntime<B, S>
where
    B: NotionBackend,
    S: AppShell,
{
    async fn run(mut self, mut events: UnboundedReceiver<CaptureEvent>) {
        log_info!("Capture runtime started");
        while let Some(event) = events.recv().await {
            for command in self.controller.apply(event) {
                self.execute(command);
            }
            self.snapshots.send_replace(self.controller.snapshot());
        }
        log_info!("Capture runtime stopped");
    }

    fn execute(&self, command: CaptureCommand) {
        match command {
            CaptureCommand::ShowPopup => {
                self.shell.show_popup();
                self.shell.bring_to_front();
            }
            CaptureCommand::ClosePopup => self.shell.hide_popup(),
            CaptureCommand::FetchOptions {
                session_id,
                database_id,
            } => {
                let Some(reply) = self.events.upgrade() else {
                    return;
                };
                let provider = self.options.clone();
                tokio::spawn(async move {
                    let options = provider.fetch_options(&database_id).await;
                    if reply
                        .send(CaptureEvent::OptionsLoaded {
                            session_id,
                            database_id,
                            options,
                        })
                        .is_err()
                    {
                        log_debug!("Runtime gone before options arrived");
                    }
                });
            }
            CaptureCommand::Submit {
                session_id,
                database_id,
                properties,
            } => {
                let Some(reply) = self.events.upgrade() else {
                    return;
                };
                let backend = self.backend.clone();
                tokio::spawn(async move {
                    let outcome = backend.create_page(&database_id, properties).await;
                    if reply
                        .send(CaptureEvent::SubmissionFinished {
                            session_id,
                            outcome,
                        })
                        .is_err()
                    {
                        log_debug!("Runtime gone before submission finished");
                    }
                });
            }
        }
    }
}
