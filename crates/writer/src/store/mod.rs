//! SQLite store
//!
//! One blocking connection lives on a dedicated thread fed by an ordered
//! command channel, so commits happen in the order they were requested.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use rusqlite::Connection;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

mod migrations;
mod readings;

pub use migrations::CURRENT_SCHEMA_VERSION;
pub use readings::StoredReading;

use crate::error::WriterError;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DatabaseInner {
    fn take_worker(&self) -> Option<JoinHandle<()>> {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take()
    }

    fn stop(&self, handle: JoinHandle<()>) {
        if let Err(err) = self.sender.send(DbCommand::Shutdown) {
            error!(error = %err, "failed to send shutdown to database thread");
        }
        if handle.join().is_err() {
            error!("database thread panicked");
        }
    }
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        if let Some(handle) = self.take_worker() {
            self.stop(handle);
        }
    }
}

/// Handle to the readings database
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Open (or create) the database and bring its schema up to date
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WriterError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| WriterError::Open {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), WriterError>>();
        let path_for_thread = path.clone();

        let worker = thread::Builder::new()
            .name("sensor-ingest-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(WriterError::Open {
                            path: path_for_thread,
                            message: err.to_string(),
                        }));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!(error = %err, "failed to enable WAL mode");
                }

                if ready_tx.send(run_migrations(&mut conn)).is_err() {
                    error!("database initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                debug!("database thread shutting down");
            })
            .map_err(|e| WriterError::Worker(format!("failed to spawn database thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| WriterError::Worker("database thread exited before ready".into()))??;

        info!(path = %path.display(), schema = CURRENT_SCHEMA_VERSION, "database opened");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Run a task on the database thread and wait for its result
    pub async fn execute<F, T>(&self, task: F) -> Result<T, WriterError>
    where
        F: FnOnce(&mut Connection) -> Result<T, WriterError> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("database caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|_| WriterError::Worker("database is closed".into()))?;

        reply_rx
            .await
            .map_err(|_| WriterError::Worker("database thread terminated unexpectedly".into()))?
    }

    /// Stop the database thread after queued tasks finish.
    ///
    /// Later calls to [`execute`](Self::execute) fail with
    /// [`WriterError::Worker`].
    pub async fn shutdown(&self) -> Result<(), WriterError> {
        let Some(handle) = self.inner.take_worker() else {
            return Ok(());
        };

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.stop(handle))
            .await
            .map_err(|e| WriterError::Worker(format!("database shutdown task failed: {e}")))?;

        info!(path = %self.path.display(), "database closed");
        Ok(())
    }
}
