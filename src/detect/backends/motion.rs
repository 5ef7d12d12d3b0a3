use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::detect::backend::{DetectionKind, DetectorBackend};
use crate::detect::result::DetectionResult;

/// Cells per side of the downsampled luminance grid.
const GRID: u32 = 16;

/// CPU motion backend.
///
/// Downsamples each frame to a coarse luminance grid and compares it against
/// the previous frame's grid; a mean absolute delta above the threshold is
/// treated as presence. A frame hash short-circuits the comparison when the
/// pixels are byte-identical to the previous frame.
pub struct MotionBackend {
    threshold: f32,
    last_hash: Option<[u8; 32]>,
    last_grid: Option<[u8; (GRID * GRID) as usize]>,
}

impl MotionBackend {
    pub fn new() -> Self {
        Self {
            // Mean luminance delta, normalized 0..1. Tuned against the
            // synthetic camera; real scenes sit well above this when a
            // person crosses the view.
            threshold: 0.02,
            last_hash: None,
            last_grid: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    fn luminance_grid(pixels: &[u8], width: u32, height: u32) -> [u8; (GRID * GRID) as usize] {
        let mut grid = [0u8; (GRID * GRID) as usize];
        for gy in 0..GRID {
            let sy = (gy as u64 * height as u64 / GRID as u64) as u32;
            for gx in 0..GRID {
                let sx = (gx as u64 * width as u64 / GRID as u64) as u32;
                let idx = (sy as usize * width as usize + sx as usize) * 3;
                let r = pixels[idx] as u16;
                let g = pixels[idx + 1] as u16;
                let b = pixels[idx + 2] as u16;
                grid[(gy * GRID + gx) as usize] = ((r + g + b) / 3) as u8;
            }
        }
        grid
    }
}

impl Default for MotionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for MotionBackend {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn supports(&self, kind: DetectionKind) -> bool {
        matches!(kind, DetectionKind::Motion)
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected || width == 0 || height == 0 {
            return Err(anyhow!(
                "motion backend: {} bytes for {}x{} RGB (expected {})",
                pixels.len(),
                width,
                height,
                expected
            ));
        }

        let current_hash: [u8; 32] = Sha256::digest(pixels).into();
        if self.last_hash == Some(current_hash) {
            return Ok(DetectionResult::absent());
        }
        self.last_hash = Some(current_hash);

        let grid = Self::luminance_grid(pixels, width, height);
        let result = match self.last_grid {
            Some(prev) => {
                let total: u32 = grid
                    .iter()
                    .zip(prev.iter())
                    .map(|(a, b)| a.abs_diff(*b) as u32)
                    .sum();
                let score = total as f32 / (GRID * GRID) as f32 / 255.0;
                if score >= self.threshold {
                    DetectionResult::presence(score.min(1.0))
                } else {
                    DetectionResult::absent()
                }
            }
            // First frame: nothing to compare against.
            None => DetectionResult::absent(),
        };
        self.last_grid = Some(grid);
        Ok(result)
    }
}
