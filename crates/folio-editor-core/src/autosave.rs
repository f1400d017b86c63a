//! Background saving for an editing session.
//!
//! Changes are coalesced on a trailing edge: every change restarts the quiet window and the
//! latest document is written once the window passes without another change. A failed save
//! keeps the unsaved document around until the next change or an explicit [`Autosaver::retry`];
//! the editor's in-memory tree is never touched.

use std::sync::Arc;
use std::time::Duration;

use folio_common::doc::Document;
use folio_common::lifecycle;
use folio_common::store::PostStore;
use n0_future::task::{self, JoinHandle};
use smol_str::SmolStr;
use tokio::sync::{mpsc, watch};

use crate::editor::{Change, ChangeOrigin};

/// Shown next to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    /// Last save succeeded; `at` is the post's new modification time.
    Saved { at: i64 },
    Failed { message: String },
}

#[derive(Debug)]
enum Command {
    Changed(Document),
    Flush,
    Retry,
    Close,
}

pub struct Autosaver {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    worker: JoinHandle<()>,
}

impl std::fmt::Debug for Autosaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosaver")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl Autosaver {
    /// Start saving post `id` into `store`, one write per `quiet` window.
    pub fn spawn(store: Arc<dyn PostStore>, id: impl Into<SmolStr>, quiet: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let worker = Worker {
            store,
            id: id.into(),
            quiet,
            status: status_tx,
            unsaved: None,
        };
        Self {
            commands,
            status,
            worker: task::spawn(worker.run(rx)),
        }
    }

    /// Queue `doc` as the latest content, restarting the quiet window.
    pub fn schedule(&self, doc: Document) {
        let _ = self.commands.send(Command::Changed(doc));
    }

    /// Save whatever is queued now instead of waiting for the window.
    pub fn flush(&self) {
        let _ = self.commands.send(Command::Flush);
    }

    /// Try the last failed save again.
    pub fn retry(&self) {
        let _ = self.commands.send(Command::Retry);
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// A change listener for [`PostEditor::on_change`](crate::PostEditor::on_change) that
    /// schedules every edit. Content resets are skipped: they already came from storage.
    pub fn listener(&self) -> impl Fn(&Document, &Change) + Send + Sync + 'static {
        let commands = self.commands.clone();
        move |doc, change| {
            if change.origin != ChangeOrigin::Reset {
                let _ = commands.send(Command::Changed(doc.clone()));
            }
        }
    }

    /// Write anything still queued and stop. Listeners handed out earlier go quiet.
    pub async fn close(self) {
        let _ = self.commands.send(Command::Close);
        if let Err(err) = self.worker.await {
            tracing::warn!(error = %err, "autosave worker ended abnormally");
        }
    }
}

struct Worker {
    store: Arc<dyn PostStore>,
    id: SmolStr,
    quiet: Duration,
    status: watch::Sender<SaveStatus>,
    /// Content whose last save failed.
    unsaved: Option<Document>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut pending: Option<Document> = None;
        loop {
            let command = if pending.is_some() {
                match tokio::time::timeout(self.quiet, commands.recv()).await {
                    Ok(Some(command)) => command,
                    Ok(None) => break,
                    Err(_) => {
                        if let Some(doc) = pending.take() {
                            self.save(doc).await;
                        }
                        continue;
                    }
                }
            } else {
                match commands.recv().await {
                    Some(command) => command,
                    None => break,
                }
            };

            match command {
                Command::Changed(doc) => {
                    self.unsaved = None;
                    pending = Some(doc);
                }
                Command::Flush => {
                    if let Some(doc) = pending.take() {
                        self.save(doc).await;
                    }
                }
                Command::Retry => {
                    if let Some(doc) = pending.take().or_else(|| self.unsaved.take()) {
                        self.save(doc).await;
                    }
                }
                Command::Close => break,
            }
        }

        if let Some(doc) = pending.take().or_else(|| self.unsaved.take()) {
            self.save(doc).await;
        }
    }

    #[tracing::instrument(skip_all, fields(id = %self.id))]
    async fn save(&mut self, doc: Document) {
        self.status.send_replace(SaveStatus::Saving);
        match lifecycle::save_content(&*self.store, &self.id, doc.clone()).await {
            Ok(post) => {
                tracing::info!("autosaved post");
                self.status.send_replace(SaveStatus::Saved {
                    at: post.metadata.last_modified_at,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "autosave failed, keeping changes for retry");
                self.unsaved = Some(doc);
                self.status.send_replace(SaveStatus::Failed {
                    message: err.to_string(),
                });
            }
        }
    }
}
