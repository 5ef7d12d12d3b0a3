//! OCULUS - presence-triggered video recorder.
//!
//! The recorder continuously samples frames from a camera, runs presence
//! detection on each frame, and writes to a video file only while something
//! of interest is in view plus a trailing grace period. Manual commands
//! force recording on or off, overriding the automatic policy.
//!
//! # Architecture
//!
//! The core is `recorder::RecordingController`, a pure decision state
//! machine: per frame it consumes a boolean presence signal and a timestamp
//! and answers with the exact I/O to perform (open/write/close/discard).
//! All actual I/O lives at the boundaries and is driven by the daemon:
//!
//! - `ingest`: frame sources (V4L2 devices, synthetic stub)
//! - `detect`: presence detector backends, OR-combined per frame
//! - `sink`: session file writers
//! - `display`: best-effort live view
//! - `config`: daemon configuration

pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod recorder;
pub mod sink;

pub use config::{CameraSettings, OculusdConfig};
pub use detect::{
    DetectionKind, DetectionResult, DetectorBackend, DetectorSet, MotionBackend, ScriptedBackend,
};
pub use display::{AsciiDisplay, Display, NullDisplay};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, CameraStats, FrameSource};
pub use recorder::{
    RecordingController, SessionSpec, StartAction, StopAction, TickAction, DEFAULT_GRACE_SECS,
    DEFAULT_RECORD_FPS,
};
pub use sink::{MemorySink, MjpegSink, SinkEvent, VideoSink};
