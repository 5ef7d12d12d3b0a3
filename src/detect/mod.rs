//! Presence detection.
//!
//! Detectors are black-box oracles: pixels flow in, a yes/no presence signal
//! flows out. The recording policy never looks inside them. The reference
//! deployment runs a face detector and a body detector and ORs their
//! results; `DetectorSet` models that combination.

mod backend;
mod backends;
mod result;
mod set;

pub use backend::{DetectionKind, DetectorBackend};
pub use backends::{MotionBackend, ScriptedBackend};
pub use result::DetectionResult;
pub use set::{known_backends, DetectorSet};
