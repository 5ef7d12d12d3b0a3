use std::path::PathBuf;

use anyhow::{anyhow, Result};

use super::VideoSink;
use crate::frame::Frame;
use crate::recorder::SessionSpec;

/// What happened to the sink, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Opened(PathBuf),
    Appended,
    Closed(PathBuf),
}

/// In-memory sink for tests: records the call sequence and can inject
/// failures to exercise the driver's error path.
#[derive(Default)]
pub struct MemorySink {
    open: Option<PathBuf>,
    events: Vec<SinkEvent>,
    fail_next_open: bool,
    fail_next_append: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    pub fn fail_next_open(&mut self) {
        self.fail_next_open = true;
    }

    pub fn fail_next_append(&mut self) {
        self.fail_next_append = true;
    }

    /// Count of sessions opened minus sessions closed; 0 or 1 when the
    /// single-session invariant holds.
    pub fn open_balance(&self) -> i64 {
        self.events.iter().fold(0i64, |acc, event| match event {
            SinkEvent::Opened(_) => acc + 1,
            SinkEvent::Closed(_) => acc - 1,
            SinkEvent::Appended => acc,
        })
    }
}

impl VideoSink for MemorySink {
    fn open(&mut self, spec: &SessionSpec) -> Result<()> {
        if self.fail_next_open {
            self.fail_next_open = false;
            return Err(anyhow!("injected open failure"));
        }
        if self.open.is_some() {
            return Err(anyhow!("session already open"));
        }
        self.open = Some(spec.path.clone());
        self.events.push(SinkEvent::Opened(spec.path.clone()));
        Ok(())
    }

    fn append(&mut self, _frame: &Frame) -> Result<()> {
        if self.fail_next_append {
            self.fail_next_append = false;
            return Err(anyhow!("injected append failure"));
        }
        if self.open.is_none() {
            return Err(anyhow!("append without an open session"));
        }
        self.events.push(SinkEvent::Appended);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.open.take() {
            Some(path) => {
                self.events.push(SinkEvent::Closed(path));
                Ok(())
            }
            None => Err(anyhow!("close without an open session")),
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}
