//! Camera frame source.
//!
//! `CameraSource` serves frames from a local device node (e.g. /dev/video0,
//! feature: ingest-v4l2) or from a synthetic generator when the device is a
//! `stub://` path. The synthetic backend simulates a scene with periodic
//! presence episodes and an occasional dropped frame, so the full pipeline
//! (including skipped ticks) can run without hardware.

use anyhow::{anyhow, Result};
use std::time::SystemTime;

#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;
#[cfg(feature = "ingest-v4l2")]
use std::time::{Duration, Instant};

use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g. "/dev/video0") or "stub://..." for synthetic.
    pub device: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera0".to_string(),
            target_fps: 20,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("camera frame size must be non-zero"));
        }
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            })
        } else {
            #[cfg(feature = "ingest-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCamera::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                Err(anyhow!(
                    "camera device ingestion requires the ingest-v4l2 feature"
                ))
            }
        }
    }

    /// Connect to the camera.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }
}

impl FrameSource for CameraSource {
    fn try_next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.try_next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.try_next_frame(),
        }
    }

    fn frame_size(&self) -> (u32, u32) {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.frame_size(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.frame_size(),
        }
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.is_healthy(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests and the demo
// ----------------------------------------------------------------------------

/// Ticks per presence/absence phase of the synthetic scene.
const EPISODE_TICKS: u64 = 32;

/// Every Nth tick delivers no frame, exercising the skipped-tick path.
const DROP_EVERY: u64 = 50;

struct SyntheticCamera {
    config: CameraConfig,
    tick_count: u64,
    frames_captured: u64,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            tick_count: 0,
            frames_captured: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic, {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn try_next_frame(&mut self) -> Result<Option<Frame>> {
        self.tick_count += 1;
        if self.tick_count % DROP_EVERY == 0 {
            return Ok(None);
        }

        let pixels = self.render();
        self.frames_captured += 1;
        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            SystemTime::now(),
        )
        .map(Some)
    }

    /// Render the synthetic scene: a static gradient background, with a
    /// bright block sweeping across the view during presence episodes.
    fn render(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let mut pixels = vec![0u8; width * height * 3];

        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) * 3;
                let shade = ((x * 160 / width.max(1)) + 40) as u8;
                pixels[idx] = shade;
                pixels[idx + 1] = shade;
                pixels[idx + 2] = shade / 2;
            }
        }

        let phase = self.tick_count % EPISODE_TICKS;
        let in_episode = (self.tick_count / EPISODE_TICKS) % 2 == 1;
        if in_episode {
            let block_w = width / 8;
            let block_h = height / 2;
            let max_x = width.saturating_sub(block_w);
            let x0 = (phase as usize * max_x) / EPISODE_TICKS as usize;
            let y0 = height / 4;
            for y in y0..(y0 + block_h).min(height) {
                for x in x0..(x0 + block_w).min(width) {
                    let idx = (y * width + x) * 3;
                    pixels[idx] = 250;
                    pixels[idx + 1] = 250;
                    pixels[idx + 2] = 250;
                }
            }
        }

        pixels
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frames_captured,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// V4L2 device camera
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceCamera {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frames_captured: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceCamera {
    fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frames_captured: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera device {}", self.config.device))?;
        let mut format = device.format().context("read camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read camera format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn try_next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera device not connected")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture camera frame")
            })?;

        let expected = self.active_width as usize * self.active_height as usize * 3;
        if buf.len() < expected {
            // Short buffer: the driver delivered a partial frame. Skip the
            // tick rather than feeding garbage downstream.
            log::debug!(
                "CameraSource: short frame ({} of {} bytes), skipping tick",
                buf.len(),
                expected
            );
            return Ok(None);
        }

        self.frames_captured += 1;
        self.last_frame_at = Some(Instant::now());

        Frame::new(
            buf[..expected].to_vec(),
            self.active_width,
            self.active_height,
            SystemTime::now(),
        )
        .map(Some)
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.active_width, self.active_height)
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frames_captured,
            device: self.config.device.clone(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}
