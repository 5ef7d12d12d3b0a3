//! Frame ingestion sources.
//!
//! Sources produce `Frame` instances for the polling loop:
//! - `CameraSource`: local camera devices (feature: ingest-v4l2), with a
//!   synthetic `stub://` backend for tests and the demo
//!
//! "No frame available" is a normal outcome (`Ok(None)`), not an error: the
//! loop treats it as a skipped tick with no state transition.

mod camera;

use anyhow::Result;

use crate::frame::Frame;

pub use camera::{CameraConfig, CameraSource, CameraStats};

/// A source of frames.
pub trait FrameSource {
    /// Capture the next frame, or `None` when no frame is available this
    /// tick.
    fn try_next_frame(&mut self) -> Result<Option<Frame>>;

    /// Frame dimensions, queried once at startup and stable for the process
    /// lifetime.
    fn frame_size(&self) -> (u32, u32);

    /// Whether the source is currently delivering frames.
    fn is_healthy(&self) -> bool;
}
