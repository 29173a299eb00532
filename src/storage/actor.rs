//! Writer actor with dedicated connection and MPSC channel.
//!
//! Single-writer pattern: one thread owns the write connection and processes
//! commands from a bounded channel. Each sample is inserted as soon as it is
//! received and acknowledged with its assigned id.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use duckdb::Connection;
use tokio::sync::oneshot;

use crate::storage::StorageError;
use crate::storage::schema::init_schema;
use crate::storage::types::MetricSample;

// =============================================================================
// Commands
// =============================================================================

/// Reply channel for an insert.
pub type InsertAck = oneshot::Sender<Result<i64, StorageError>>;

/// Commands sent to the writer actor.
#[derive(Debug)]
pub enum Command {
    /// Insert one sample (immediate insert, acknowledged with the new id).
    InsertSample { sample: MetricSample, ack: InsertAck },
    /// Force checkpoint.
    Checkpoint,
    /// Graceful shutdown.
    Shutdown,
}

// =============================================================================
// Actor
// =============================================================================

/// Database writer actor.
pub struct DbActor {
    conn: Connection,
    rx: Receiver<Command>,
    last_checkpoint: Instant,
    checkpoint_interval: Duration,
}

impl DbActor {
    /// Spawn the writer actor thread.
    ///
    /// Returns a tuple of:
    /// - `JoinHandle<()>`: Handle to the actor thread
    /// - `SyncSender<Command>`: Channel sender for commands
    /// - `Connection`: A cloneable connection for creating reader connections via `try_clone()`
    pub fn spawn(
        db_path: &Path,
        channel_capacity: usize,
        checkpoint_interval: Duration,
    ) -> Result<(JoinHandle<()>, SyncSender<Command>, Connection), StorageError> {
        let (tx, rx) = mpsc::sync_channel(channel_capacity);
        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;

        // Connections from try_clone() share the same database instance, so
        // readers see committed inserts immediately.
        let reader_conn = conn.try_clone()?;

        let mut actor = DbActor {
            conn,
            rx,
            last_checkpoint: Instant::now(),
            checkpoint_interval,
        };
        let handle = thread::Builder::new()
            .name("chainwatch-db-writer".to_string())
            .spawn(move || actor.run())
            .map_err(|e| StorageError::Internal(format!("failed to spawn writer thread: {e}")))?;

        Ok((handle, tx, reader_conn))
    }

    fn run(&mut self) {
        tracing::info!("DbActor started");

        loop {
            let deadline = self.last_checkpoint + self.checkpoint_interval;
            let timeout = deadline.saturating_duration_since(Instant::now());

            match self.rx.recv_timeout(timeout) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break; // Shutdown requested
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Channel disconnected, shutting down");
                    let _ = self.checkpoint();
                    break;
                }
            }

            if self.last_checkpoint.elapsed() >= self.checkpoint_interval {
                if let Err(e) = self.checkpoint() {
                    tracing::error!(error = %e, "Periodic checkpoint failed");
                }
            }
        }

        tracing::info!("DbActor stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::InsertSample { sample, ack } => {
                let result = self.insert_sample(&sample);
                if let Err(e) = &result {
                    tracing::error!(error = %e, source = %sample.source, "Sample insert failed");
                }
                // Receiver may have given up waiting; the row is stored either way.
                let _ = ack.send(result);
            }
            Command::Checkpoint => {
                if let Err(e) = self.checkpoint() {
                    tracing::error!(error = %e, "Checkpoint failed");
                }
            }
            Command::Shutdown => {
                tracing::info!("DbActor shutting down");
                let _ = self.checkpoint();
                return true;
            }
        }
        false
    }

    fn insert_sample(&self, s: &MetricSample) -> Result<i64, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"INSERT INTO metrics ("timestamp", value, source) VALUES (?, ?, ?) RETURNING id"#,
        )?;
        let id = stmt.query_row(
            duckdb::params![s.timestamp.timestamp_micros(), s.value, &s.source],
            |row| row.get(0),
        )?;

        tracing::debug!(id, source = %s.source, value = s.value, "Sample inserted");
        Ok(id)
    }

    fn checkpoint(&mut self) -> Result<(), StorageError> {
        self.last_checkpoint = Instant::now();
        self.conn.execute_batch("CHECKPOINT;")?;
        tracing::debug!("Checkpoint completed");
        Ok(())
    }
}
