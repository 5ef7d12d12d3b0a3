use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::VideoSink;
use crate::frame::Frame;
use crate::recorder::SessionSpec;

const DEFAULT_QUALITY: u8 = 85;

/// Motion-JPEG session writer.
///
/// Each session becomes one `.mjpeg` file: the frames JPEG-encoded and
/// concatenated, the format players and ffmpeg accept as an MJPEG stream.
/// The container carries no timing; the session's fps lives in its
/// `SessionSpec` and is the daemon's polling cadence.
pub struct MjpegSink {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    frames_written: u64,
    quality: u8,
}

impl MjpegSink {
    pub fn new() -> Self {
        Self {
            writer: None,
            path: None,
            frames_written: 0,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Default for MjpegSink {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSink for MjpegSink {
    fn open(&mut self, spec: &SessionSpec) -> Result<()> {
        if let Some(path) = &self.path {
            return Err(anyhow!(
                "session already open at {} while opening {}",
                path.display(),
                spec.path.display()
            ));
        }
        if let Some(dir) = spec.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create output directory {}", dir.display()))?;
            }
        }
        let file = File::create(&spec.path)
            .with_context(|| format!("create session file {}", spec.path.display()))?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(spec.path.clone());
        self.frames_written = 0;
        Ok(())
    }

    fn append(&mut self, frame: &Frame) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("append without an open session"))?;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .write_image(
                frame.pixels(),
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .context("encode frame as jpeg")?;
        writer.write_all(&jpeg).context("write frame")?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| anyhow!("close without an open session"))?;
        let path = self.path.take();
        writer.flush().context("flush session file")?;
        if let Some(path) = path {
            log::debug!(
                "MjpegSink: closed {} ({} frames)",
                path.display(),
                self.frames_written
            );
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}
