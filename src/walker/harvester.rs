//! Error harvester
//!
//! A dedicated thread drains the error stream while producers and workers
//! run, so a burst of failures never blocks a worker. The stream closes
//! when the last [`ErrorSink`] is dropped; [`ErrorHarvester::finish`] must
//! therefore be called only after the producer and every worker have been
//! joined.

use crate::error::{ErrorRecord, ErrorReport, WorkerError};
use crate::walker::pool::RunStats;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Handle for reporting non-fatal errors
#[derive(Clone)]
pub struct ErrorSink {
    sender: Sender<ErrorRecord>,
    stats: Arc<RunStats>,
}

impl ErrorSink {
    /// Report one error record
    pub fn report(&self, record: ErrorRecord) {
        self.stats.record_error();
        if let Err(e) = self.sender.send(record) {
            // Only possible if the harvester thread died
            warn!(record = %e.into_inner(), "Error harvester gone; record dropped");
        }
    }
}

/// Collects every [`ErrorRecord`] of a run on its own thread
pub struct ErrorHarvester {
    handle: JoinHandle<Vec<ErrorRecord>>,
    sink: ErrorSink,
}

impl ErrorHarvester {
    /// Spawn the harvester thread with a buffer of `capacity` records
    pub fn spawn(capacity: usize, stats: Arc<RunStats>) -> Result<Self, WorkerError> {
        let (sender, receiver) = bounded(capacity.max(1));

        let handle = thread::Builder::new()
            .name("error-harvester".into())
            .spawn(move || harvest(receiver))
            .map_err(|e| WorkerError::InitFailed {
                role: "error-harvester",
                id: 0,
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle,
            sink: ErrorSink { sender, stats },
        })
    }

    /// Get a sink for a producer or worker
    pub fn sink(&self) -> ErrorSink {
        self.sink.clone()
    }

    /// Close our end of the stream and collect everything reported
    ///
    /// Blocks until every other sink has been dropped.
    pub fn finish(self) -> Result<ErrorReport, WorkerError> {
        let Self { handle, sink } = self;
        drop(sink);

        match handle.join() {
            Ok(records) => Ok(ErrorReport::new(records)),
            Err(_) => Err(WorkerError::Panicked {
                role: "error-harvester",
                id: 0,
            }),
        }
    }
}

fn harvest(receiver: Receiver<ErrorRecord>) -> Vec<ErrorRecord> {
    let mut records = Vec::new();
    for record in receiver {
        debug!(context = %record.context, message = %record.message, "Error collected");
        records.push(record);
    }
    records
}
