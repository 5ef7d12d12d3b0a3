use anyhow::Result;

use crate::detect::backend::{DetectionKind, DetectorBackend};
use crate::detect::result::DetectionResult;

/// Scripted backend for tests and the demo: replays a fixed presence
/// sequence, one entry per frame, then repeats the final entry.
pub struct ScriptedBackend {
    script: Vec<bool>,
    cursor: usize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<bool>) -> Self {
        Self { script, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.script.len().saturating_sub(self.cursor)
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, _kind: DetectionKind) -> bool {
        true
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        let presence = match self.script.get(self.cursor) {
            Some(step) => {
                self.cursor += 1;
                *step
            }
            None => self.script.last().copied().unwrap_or(false),
        };
        Ok(if presence {
            DetectionResult::presence(0.9)
        } else {
            DetectionResult::absent()
        })
    }
}
