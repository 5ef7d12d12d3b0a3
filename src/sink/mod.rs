//! Video output sinks.
//!
//! A sink owns at most one open session at a time, matching the recording
//! policy's single-session invariant. The sink never decides anything: it
//! opens, appends, and closes exactly when the driver tells it to.

mod memory;
mod mjpeg;

use anyhow::Result;

use crate::frame::Frame;
use crate::recorder::SessionSpec;

pub use memory::{MemorySink, SinkEvent};
pub use mjpeg::MjpegSink;

/// A stateful session writer: open a file for a session, append frames,
/// close it.
pub trait VideoSink {
    /// Open the session's output file. Opening while a session is already
    /// open is an error.
    fn open(&mut self, spec: &SessionSpec) -> Result<()>;

    /// Append one frame to the open session.
    fn append(&mut self, frame: &Frame) -> Result<()>;

    /// Close the open session, flushing buffered output.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}
