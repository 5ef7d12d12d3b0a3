//! Live frame display.
//!
//! Best-effort and fire-and-forget: `show` never blocks the decision
//! pipeline and never fails it, so the trait returns nothing. Headless
//! deployments use `NullDisplay`; `AsciiDisplay` renders a coarse luminance
//! preview to stderr for terminal runs.

use crate::frame::Frame;

pub trait Display {
    fn show(&mut self, frame: &Frame);
}

/// No-op display for headless runs.
pub struct NullDisplay;

impl Display for NullDisplay {
    fn show(&mut self, _frame: &Frame) {}
}

const RAMP: &[u8] = b" .:-=+*#%@";

/// Terminal preview: samples the frame onto a character grid, one ramp
/// character per cell, throttled to every Nth frame.
pub struct AsciiDisplay {
    cols: u32,
    rows: u32,
    every: u64,
    shown: u64,
}

impl AsciiDisplay {
    pub fn new() -> Self {
        Self {
            cols: 64,
            rows: 16,
            every: 20,
            shown: 0,
        }
    }

    /// Render every `every`th frame instead of the default.
    pub fn with_every(mut self, every: u64) -> Self {
        self.every = every.max(1);
        self
    }
}

impl Default for AsciiDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AsciiDisplay {
    fn show(&mut self, frame: &Frame) {
        self.shown += 1;
        if self.shown % self.every != 0 {
            return;
        }
        if frame.width == 0 || frame.height == 0 {
            return;
        }

        let pixels = frame.pixels();
        let mut out = String::with_capacity((self.cols as usize + 1) * self.rows as usize);
        for row in 0..self.rows {
            let sy = (row as u64 * frame.height as u64 / self.rows as u64) as usize;
            for col in 0..self.cols {
                let sx = (col as u64 * frame.width as u64 / self.cols as u64) as usize;
                let idx = (sy * frame.width as usize + sx) * 3;
                let luma = (pixels[idx] as u16 + pixels[idx + 1] as u16 + pixels[idx + 2] as u16)
                    / 3;
                let ramp_idx = (luma as usize * (RAMP.len() - 1)) / 255;
                out.push(RAMP[ramp_idx] as char);
            }
            out.push('\n');
        }
        eprint!("{}", out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn ascii_display_throttles() {
        let frame = Frame::new(vec![128; 64 * 48 * 3], 64, 48, SystemTime::UNIX_EPOCH).unwrap();
        let mut display = AsciiDisplay::new().with_every(1_000_000);
        // Nothing to assert beyond "does not panic on a valid frame".
        for _ in 0..10 {
            display.show(&frame);
        }
    }
}
