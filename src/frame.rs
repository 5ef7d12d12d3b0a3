//! Frame container shared by ingest, detection, and output.

use std::time::SystemTime;

use anyhow::{anyhow, Result};

/// One captured frame: packed RGB24 pixels plus dimensions and capture time.
///
/// Produced by ingest sources; detectors read the pixel slice, the sink
/// encodes it, the display samples it.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: SystemTime,
}

impl Frame {
    /// Create a frame. The pixel buffer must be exactly `width * height * 3`
    /// bytes of packed RGB.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, captured_at: SystemTime) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer size mismatch: {} bytes for {}x{} RGB (expected {})",
                pixels.len(),
                width,
                height,
                expected
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            captured_at,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_size() {
        let err = Frame::new(vec![0u8; 10], 2, 2, SystemTime::UNIX_EPOCH);
        assert!(err.is_err());

        let ok = Frame::new(vec![0u8; 12], 2, 2, SystemTime::UNIX_EPOCH);
        assert!(ok.is_ok());
    }
}
