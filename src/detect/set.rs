use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::backends::MotionBackend;
use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Backend names `DetectorSet::from_names` understands.
pub fn known_backends() -> &'static [&'static str] {
    &["motion"]
}

/// A set of detector backends run together on every frame.
///
/// Presence is the OR of all backends (the reference deployment ORs a face
/// detector and a body detector); the reported confidence is the maximum of
/// the detecting backends. A backend error is surfaced, not swallowed: the
/// caller decides whether the tick is skipped or the run aborts.
pub struct DetectorSet {
    backends: Vec<Box<dyn DetectorBackend>>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Build a set from configured backend names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut set = Self::new();
        for name in names {
            match name.as_ref() {
                "motion" => set.push(MotionBackend::new()),
                other => {
                    return Err(anyhow!(
                        "unknown detector backend '{}' (known: {})",
                        other,
                        known_backends().join(", ")
                    ))
                }
            }
        }
        if set.is_empty() {
            return Err(anyhow!("at least one detector backend is required"));
        }
        Ok(set)
    }

    pub fn push<B: DetectorBackend + 'static>(&mut self, backend: B) {
        self.backends.push(Box::new(backend));
    }

    pub fn with<B: DetectorBackend + 'static>(mut self, backend: B) -> Self {
        self.push(backend);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn warm_up(&mut self) -> Result<()> {
        for backend in &mut self.backends {
            backend.warm_up()?;
        }
        Ok(())
    }

    /// Run every backend on the frame and OR the results.
    pub fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let mut combined = DetectionResult::absent();
        for backend in &mut self.backends {
            let result = backend.detect(frame.pixels(), frame.width, frame.height)?;
            if result.presence_detected {
                combined.presence_detected = true;
                combined.confidence = combined.confidence.max(result.confidence);
            }
        }
        Ok(combined)
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::ScriptedBackend;
    use std::time::SystemTime;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, SystemTime::UNIX_EPOCH).unwrap()
    }

    #[test]
    fn presence_is_or_of_backends() {
        let mut set = DetectorSet::new()
            .with(ScriptedBackend::new(vec![false, false]))
            .with(ScriptedBackend::new(vec![false, true]));

        let first = set.detect(&frame()).unwrap();
        assert!(!first.presence_detected);

        let second = set.detect(&frame()).unwrap();
        assert!(second.presence_detected);
        assert_eq!(second.confidence, 0.9);
    }

    #[test]
    fn from_names_rejects_unknown() {
        assert!(DetectorSet::from_names(&["motion"]).is_ok());
        assert!(DetectorSet::from_names(&["sonar"]).is_err());
        assert!(DetectorSet::from_names::<&str>(&[]).is_err());
    }
}
