//! Buffered audit log sink.
//!
//! # Data Flow
//! ```text
//! proxy handlers
//!     → enqueue(environment, line)      (in-memory append, no I/O)
//!     → per-environment Vec<String> buffers
//!
//! flush task (every flush_interval):
//!     → take_batch(environment)         (atomic swap for an empty Vec)
//!     → append batch to <dir>/<env>/log_<DD_MM_YYYY>.txt
//! ```
//!
//! # Design Decisions
//! - `enqueue` never blocks on I/O; callers are on the request hot path
//! - Drain is a single `mem::take` under the map's shard guard, with no
//!   await point between read and clear: appends racing a flush land in the
//!   fresh buffer, never lost, never duplicated
//! - Write failures are reported and the batch dropped; the sink and the
//!   proxy keep running
//! - Each environment's buffer is independent; no cross-environment locking

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Append-only, per-environment batched audit log writer.
pub struct LogSink {
    buffers: DashMap<String, Vec<String>>,
    directory: PathBuf,
    echo: bool,
}

impl LogSink {
    /// Create a sink rooted at `directory`. Nothing is written until the
    /// first flush.
    pub fn new(directory: impl Into<PathBuf>, echo: bool) -> Self {
        Self {
            buffers: DashMap::new(),
            directory: directory.into(),
            echo,
        }
    }

    /// Append a serialized entry to an environment's buffer.
    pub fn enqueue(&self, environment: &str, line: String) {
        if self.echo {
            tracing::info!(target: "audit", environment = %environment, "{}", line);
        }
        self.buffers
            .entry(environment.to_string())
            .or_default()
            .push(line);
    }

    /// Atomically take the environment's buffered lines, leaving an empty
    /// buffer in their place. The swap happens while the shard guard is
    /// held, so no concurrent append can fall between read and clear.
    fn take_batch(&self, environment: &str) -> Vec<String> {
        self.buffers
            .get_mut(environment)
            .map(|mut buffer| std::mem::take(&mut *buffer))
            .unwrap_or_default()
    }

    /// Drain every non-empty environment buffer and persist each batch.
    pub async fn flush_once(&self) {
        let environments: Vec<String> =
            self.buffers.iter().map(|entry| entry.key().clone()).collect();

        for environment in environments {
            let batch = self.take_batch(&environment);
            if batch.is_empty() {
                continue;
            }
            if let Err(error) = self.append_batch(&environment, &batch).await {
                tracing::error!(
                    environment = %environment,
                    dropped = batch.len(),
                    error = %error,
                    "failed to persist audit batch"
                );
            }
        }
    }

    /// Append a batch, newline-joined, to the environment's daily file.
    async fn append_batch(&self, environment: &str, batch: &[String]) -> std::io::Result<()> {
        let path = self.log_file_path(environment);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut payload = batch.join("\n");
        payload.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            environment = %environment,
            entries = batch.len(),
            path = %path.display(),
            "audit batch persisted"
        );
        Ok(())
    }

    /// Today's log file for an environment: `<dir>/<env>/log_<DD_MM_YYYY>.txt`.
    pub fn log_file_path(&self, environment: &str) -> PathBuf {
        let date = chrono::Local::now().format("%d_%m_%Y");
        self.directory
            .join(environment)
            .join(format!("log_{date}.txt"))
    }

    /// Number of buffered (unflushed) entries for an environment.
    pub fn pending(&self, environment: &str) -> usize {
        self.buffers
            .get(environment)
            .map(|buffer| buffer.len())
            .unwrap_or(0)
    }

    /// Flush on a fixed interval until shutdown, then flush one final time.
    pub async fn run_flush_loop(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
                _ = shutdown.recv() => {
                    self.flush_once().await;
                    tracing::debug!("audit flush loop stopped");
                    break;
                }
            }
        }
    }
}

/// Read all persisted lines for an environment's daily file, for tests and
/// tooling. Missing file means no lines.
pub async fn read_persisted_lines(sink: &LogSink, environment: &str) -> Vec<String> {
    match tokio::fs::read_to_string(sink.log_file_path(environment)).await {
        Ok(content) => content.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}
