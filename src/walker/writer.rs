//! Single-writer result sink
//!
//! Workers send finished manifest lines over a channel to one
//! `manifest-writer` thread which owns the output. Lines therefore reach the
//! output whole, never interleaved.

use crate::error::{GhashError, Result, WorkerError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, BufWriter, Write};
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Handle for sending result lines to the writer
#[derive(Clone)]
pub struct ResultSink {
    sender: Sender<String>,
}

impl ResultSink {
    /// Queue one line (without trailing newline)
    pub fn write_line(&self, line: String) -> std::result::Result<(), WorkerError> {
        self.sender.send(line).map_err(|_| WorkerError::QueueClosed)
    }
}

/// Writer thread owning the output stream
pub struct ResultWriter<W> {
    handle: JoinHandle<io::Result<W>>,
    sink: ResultSink,
}

impl<W> ResultWriter<W>
where
    W: Write + Send + 'static,
{
    /// Spawn the writer thread over `out`
    pub fn spawn(out: W, channel_size: usize) -> std::result::Result<Self, WorkerError> {
        let (sender, receiver) = bounded(channel_size.max(1));

        let handle = thread::Builder::new()
            .name("manifest-writer".into())
            .spawn(move || writer_thread(out, receiver))
            .map_err(|e| WorkerError::InitFailed {
                role: "manifest-writer",
                id: 0,
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle,
            sink: ResultSink { sender },
        })
    }

    pub fn sink(&self) -> ResultSink {
        self.sink.clone()
    }

    /// Wait for all queued lines to be written and return the output
    ///
    /// Blocks until every other [`ResultSink`] has been dropped.
    pub fn finish(self) -> Result<W> {
        let Self { handle, sink } = self;
        drop(sink);

        match handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(GhashError::Worker(WorkerError::Panicked {
                role: "manifest-writer",
                id: 0,
            })),
        }
    }
}

fn writer_thread<W: Write>(out: W, receiver: Receiver<String>) -> io::Result<W> {
    let mut out = BufWriter::new(out);
    let mut failure: Option<io::Error> = None;

    // Keep draining after a failure so workers never block on a full channel
    for line in receiver {
        if failure.is_some() {
            continue;
        }
        if let Err(e) = writeln!(out, "{}", line) {
            warn!(error = %e, "Manifest write failed");
            failure = Some(e);
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }

    out.flush()?;
    out.into_inner().map_err(|e| e.into_error())
}
