//! Result log sink: a bounded queue drained by a single consumer into a
//! size-rotated append-only file

use crate::engine::StopFlag;
use crate::error::SinkError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

/// Producer handle shared by the checker workers
///
/// Sends block when the queue is full, so a slow disk applies backpressure
/// instead of dropping records. A send failing because the sink is already
/// gone only happens during the shutdown race and is ignored.
#[derive(Debug, Clone)]
pub struct LogHandle {
    tx: Sender<String>,
    verbose: bool,
}

impl LogHandle {
    /// Create a handle over the producer side of the log queue
    pub fn new(tx: Sender<String>, verbose: bool) -> Self {
        Self { tx, verbose }
    }

    /// Enqueue a record unconditionally
    pub fn log(&self, msg: String) {
        let _ = self.tx.send(msg);
    }

    /// Enqueue a record only when verbose tracing is enabled
    pub fn log_verbose(&self, msg: String) {
        if self.verbose {
            let _ = self.tx.send(msg);
        }
    }
}

/// Append-only log file with size-triggered shift rotation
///
/// Owns the file handle and all rotation state; constructed once per run and
/// handed to the sink thread. Rotation shifts `name` to `name.1`, `name.1`
/// to `name.2` and so on, deleting anything beyond `backup_count`.
#[derive(Debug)]
pub struct LogSink {
    folder: PathBuf,
    file_name: String,
    file: File,
    written: u64,
    max_file_size: u64,
    backup_count: usize,
}

impl LogSink {
    /// Create the output directory (fresh per run) and open the active file
    pub fn create(config: &crate::config::OutputConfig) -> Result<Self, SinkError> {
        let folder = config.folder.clone();

        // A previous run's results are stale; start from an empty directory.
        let _ = fs::remove_dir_all(&folder);
        fs::create_dir_all(&folder).map_err(|source| SinkError::CreateDir {
            path: folder.display().to_string(),
            source,
        })?;

        let path = folder.join(&config.file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            folder,
            file_name: config.file_name.clone(),
            file,
            written: 0,
            max_file_size: config.max_file_size,
            backup_count: config.backup_count,
        })
    }

    /// Append one record, rotating first if it would overflow the active file
    pub fn append(&mut self, msg: &str) -> Result<(), SinkError> {
        let record_len = msg.len() as u64 + 1;
        if self.written > 0 && self.written + record_len > self.max_file_size {
            self.rotate()?;
        }

        writeln!(self.file, "{}", msg)?;
        self.written += record_len;
        Ok(())
    }

    /// Path of the backup file at the given rotation slot
    fn backup_path(&self, slot: usize) -> PathBuf {
        self.folder.join(format!("{}.{}", self.file_name, slot))
    }

    /// Shift-rotate the backups and reopen a fresh active file
    fn rotate(&mut self) -> Result<(), SinkError> {
        self.file.flush().map_err(SinkError::Rotate)?;

        let last = self.backup_path(self.backup_count);
        if last.exists() {
            fs::remove_file(&last).map_err(SinkError::Rotate)?;
        }
        for slot in (1..self.backup_count).rev() {
            let from = self.backup_path(slot);
            if from.exists() {
                fs::rename(&from, self.backup_path(slot + 1)).map_err(SinkError::Rotate)?;
            }
        }

        let active = self.folder.join(&self.file_name);
        fs::rename(&active, self.backup_path(1)).map_err(SinkError::Rotate)?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active)
            .map_err(SinkError::Rotate)?;
        self.written = 0;

        debug!("rotated result log");
        Ok(())
    }

    /// Drain the log queue until it is closed and empty
    ///
    /// The receiver returns `Disconnected` only once every producer has
    /// dropped its sender AND all buffered records were delivered, so a match
    /// record racing shutdown is never lost. On a write failure the sink
    /// raises the stop flag and keeps consuming (discarding) so producers
    /// blocked on a full queue are not deadlocked; the error surfaces when
    /// the sink thread is joined.
    pub fn run(
        mut self,
        rx: Receiver<String>,
        poll_interval: Duration,
        stop: StopFlag,
    ) -> Result<u64, SinkError> {
        debug!("log sink started");

        let mut records = 0u64;
        let mut failure: Option<SinkError> = None;

        loop {
            match rx.recv_timeout(poll_interval) {
                Ok(msg) => {
                    if failure.is_some() {
                        continue;
                    }
                    match self.append(&msg) {
                        Ok(()) => records += 1,
                        Err(e) => {
                            error!("result log write failed, aborting search: {}", e);
                            stop.set();
                            failure = Some(e);
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!("log sink exited after {} records", records);

        match failure {
            Some(e) => Err(e),
            None => {
                self.file.flush()?;
                Ok(records)
            }
        }
    }
}
