//! Where reports go once a result has been classified.

use std::io::{self, Write};

use flume::{Receiver, Sender};
use thiserror::Error;

use thermo_types::Report;

const SEPARATOR: &str = "--------------------------------------------------";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
    #[error("report receiver disconnected")]
    Disconnected,
}

/// Best-effort consumer of reports. There is no acknowledgment.
pub trait ReportSink: Send + 'static {
    fn emit(&mut self, report: &Report) -> Result<(), SinkError>;
}

impl<K: ReportSink + ?Sized> ReportSink for Box<K> {
    fn emit(&mut self, report: &Report) -> Result<(), SinkError> {
        (**self).emit(report)
    }
}

/// Line-oriented text output in the serial console format.
pub struct LineSink<W: Write + Send + 'static> {
    out: W,
}

impl LineSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> ReportSink for LineSink<W> {
    fn emit(&mut self, report: &Report) -> Result<(), SinkError> {
        writeln!(self.out, "Predicted: {} (Confidence: {:.2})", report.label(), report.confidence())?;
        writeln!(self.out, "{}", SEPARATOR)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Forwards reports over a channel.
pub struct ChannelSink {
    tx: Sender<Report>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<Report>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl ReportSink for ChannelSink {
    fn emit(&mut self, report: &Report) -> Result<(), SinkError> {
        self.tx.send(report.clone()).map_err(|_| SinkError::Disconnected)
    }
}
