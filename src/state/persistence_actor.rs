//! Persistence actor for bank snapshots
//!
//! Disk I/O runs on its own task so a slow or failing write never holds up
//! MIDI routing. The routing loop takes a snapshot of the registry (a plain
//! owned value, consistent by construction since the loop is the only
//! writer) and hands it over with [`PersistenceActorHandle::save_snapshot`].
//!
//! # Write strategy
//!
//! - Saves queued while a write is in progress collapse into the newest one.
//! - A snapshot equal to the last one written is skipped, so the periodic
//!   save costs nothing while the surface is idle.
//! - A failed write is logged; the next periodic save retries with fresh data.
//!
//! # Example
//!
//! ```ignore
//! use xtouch_banks::state::persistence_actor::PersistenceActor;
//!
//! let handle = PersistenceActor::spawn("./banks.json");
//! let restored = handle.load_snapshot().await?;
//! handle.save_snapshot(registry.to_snapshot()).await?;
//! handle.flush().await?;
//! handle.shutdown();
//! ```

use super::persistence::RegistrySnapshot;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace};

/// Commands sent to the persistence actor
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Write a snapshot (coalesced with any newer queued save)
    Save(RegistrySnapshot),
    /// Read the snapshot currently on disk
    Load(oneshot::Sender<Result<Option<RegistrySnapshot>>>),
    /// Reply once every save received before this command is on disk
    Flush(oneshot::Sender<Result<()>>),
    /// Stop the actor
    Shutdown,
}

/// Persistence actor that owns the snapshot file
pub struct PersistenceActor {
    path: PathBuf,
    command_rx: mpsc::Receiver<PersistenceCommand>,
    /// Command pulled off the channel while coalescing saves
    deferred: Option<PersistenceCommand>,
    /// Last snapshot successfully written
    last_written: Option<RegistrySnapshot>,
    /// Error of the most recent write attempt, reported by the next flush
    last_error: Option<String>,
    write_count: u64,
}

/// Handle to communicate with the persistence actor
///
/// This handle is cheap to clone and can be shared across tasks.
#[derive(Clone)]
pub struct PersistenceActorHandle {
    cmd_tx: mpsc::Sender<PersistenceCommand>,
}

impl PersistenceActor {
    /// Spawn a persistence actor writing to `path`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> PersistenceActorHandle {
        let path = path.into();
        info!("Persistence actor using snapshot file: {}", path.display());

        let (cmd_tx, command_rx) = mpsc::channel(100);

        let actor = PersistenceActor {
            path,
            command_rx,
            deferred: None,
            last_written: None,
            last_error: None,
            write_count: 0,
        };

        tokio::spawn(actor.run());

        PersistenceActorHandle { cmd_tx }
    }

    /// Main actor run loop
    async fn run(mut self) {
        debug!("Persistence actor started");

        loop {
            let cmd = match self.deferred.take() {
                Some(cmd) => cmd,
                None => match self.command_rx.recv().await {
                    Some(cmd) => cmd,
                    None => {
                        debug!("Persistence actor channel closed");
                        return;
                    }
                },
            };

            match cmd {
                PersistenceCommand::Save(snapshot) => {
                    let snapshot = self.coalesce(snapshot);
                    self.write(snapshot).await;
                }
                PersistenceCommand::Load(response_tx) => {
                    trace!("Received load command");
                    let result = RegistrySnapshot::load_from_file(&self.path).await;
                    // Best-effort send, receiver may have dropped
                    let _ = response_tx.send(result);
                }
                PersistenceCommand::Flush(response_tx) => {
                    trace!("Received flush command");
                    let result = match self.last_error.take() {
                        Some(e) => Err(anyhow::anyhow!("Last snapshot write failed: {}", e)),
                        None => Ok(()),
                    };
                    let _ = response_tx.send(result);
                }
                PersistenceCommand::Shutdown => {
                    info!(
                        "Persistence actor shutdown complete (total writes: {})",
                        self.write_count
                    );
                    return;
                }
            }
        }
    }

    /// Replace `snapshot` with the newest save queued directly behind it
    ///
    /// Stops at the first other command and defers it, so a flush or load
    /// still observes every save sent before it.
    fn coalesce(&mut self, mut snapshot: RegistrySnapshot) -> RegistrySnapshot {
        while let Ok(cmd) = self.command_rx.try_recv() {
            match cmd {
                PersistenceCommand::Save(newer) => {
                    trace!("Coalescing queued snapshot");
                    snapshot = newer;
                }
                other => {
                    self.deferred = Some(other);
                    break;
                }
            }
        }
        snapshot
    }

    async fn write(&mut self, snapshot: RegistrySnapshot) {
        if self.last_written.as_ref() == Some(&snapshot) {
            trace!("Snapshot unchanged, skipping write");
            return;
        }

        match snapshot.save_to_file(&self.path).await {
            Ok(()) => {
                self.write_count += 1;
                self.last_error = None;
                self.last_written = Some(snapshot);
                trace!("Snapshot written (write #{})", self.write_count);
            }
            Err(e) => {
                error!("Failed to write snapshot to {}: {:#}", self.path.display(), e);
                self.last_error = Some(format!("{:#}", e));
            }
        }
    }
}

impl PersistenceActorHandle {
    /// Queue a snapshot for writing
    ///
    /// # Errors
    ///
    /// Returns an error if the actor has shut down.
    pub async fn save_snapshot(&self, snapshot: RegistrySnapshot) -> Result<()> {
        self.cmd_tx
            .send(PersistenceCommand::Save(snapshot))
            .await
            .context("Failed to send save command: actor shut down")
    }

    /// Load the snapshot currently on disk
    ///
    /// # Returns
    ///
    /// - `Ok(Some(snapshot))` if a snapshot file exists
    /// - `Ok(None)` if no snapshot has been saved yet
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array,
    /// or if the actor has shut down.
    pub async fn load_snapshot(&self) -> Result<Option<RegistrySnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(PersistenceCommand::Load(tx))
            .await
            .context("Failed to send load command: actor shut down")?;

        rx.await.context("Failed to receive load response")?
    }

    /// Wait until every snapshot queued so far has been written
    ///
    /// # Errors
    ///
    /// Returns the error of the last write if it failed, or an error if the
    /// actor has shut down.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(PersistenceCommand::Flush(tx))
            .await
            .context("Failed to send flush command: actor shut down")?;

        rx.await.context("Failed to receive flush response")?
    }

    /// Signal the actor to shut down
    ///
    /// Fire-and-forget; call [`flush`](Self::flush) first to make sure
    /// queued snapshots reach the disk.
    pub fn shutdown(&self) {
        // Best-effort send, ignore errors if already shut down
        let _ = self.cmd_tx.try_send(PersistenceCommand::Shutdown);
    }
}
