use anyhow::Result;

use crate::detect::result::DetectionResult;

/// What a backend looks for in a frame.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionKind {
    Face,
    Body,
    Motion,
}

/// Presence detector backend.
///
/// Implementations must treat the pixel slice as read-only and ephemeral:
/// a backend may keep derived state between frames (previous-frame grids,
/// hashes) but never the pixels themselves.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend looks for this kind of presence.
    fn supports(&self, kind: DetectionKind) -> bool;

    /// Run detection on one frame of packed RGB pixels.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
