use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::known_backends;

const DEFAULT_CAMERA_DEVICE: &str = "stub://camera0";
const DEFAULT_CAMERA_FPS: u32 = 20;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_OUTPUT_DIR: &str = "recordings";
const DEFAULT_RECORD_FPS: u32 = 20;
const DEFAULT_GRACE_SECS: u64 = 5;
const DEFAULT_DETECTOR: &str = "motion";

#[derive(Debug, Deserialize, Default)]
struct OculusdConfigFile {
    camera: Option<CameraConfigFile>,
    output: Option<OutputConfigFile>,
    detection: Option<DetectionConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<String>,
    fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    grace_secs: Option<u64>,
    backends: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct OculusdConfig {
    pub camera: CameraSettings,
    pub output_dir: PathBuf,
    pub record_fps: u32,
    pub grace: Duration,
    pub detectors: Vec<String>,
    pub display: bool,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl OculusdConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OCULUS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: OculusdConfigFile) -> Self {
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let output_dir = file
            .output
            .as_ref()
            .and_then(|output| output.dir.clone())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
        let record_fps = file
            .output
            .and_then(|output| output.fps)
            .unwrap_or(DEFAULT_RECORD_FPS);
        let grace = Duration::from_secs(
            file.detection
                .as_ref()
                .and_then(|detection| detection.grace_secs)
                .unwrap_or(DEFAULT_GRACE_SECS),
        );
        let detectors = file
            .detection
            .and_then(|detection| detection.backends)
            .unwrap_or_else(|| vec![DEFAULT_DETECTOR.to_string()]);
        let display = file
            .display
            .and_then(|display| display.enabled)
            .unwrap_or(false);
        Self {
            camera,
            output_dir: PathBuf::from(output_dir),
            record_fps,
            grace,
            detectors,
            display,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("OCULUS_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(fps) = std::env::var("OCULUS_TARGET_FPS") {
            let fps: u32 = fps
                .parse()
                .map_err(|_| anyhow!("OCULUS_TARGET_FPS must be an integer"))?;
            self.camera.target_fps = fps;
        }
        if let Ok(dir) = std::env::var("OCULUS_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(grace) = std::env::var("OCULUS_GRACE_SECS") {
            let seconds: u64 = grace
                .parse()
                .map_err(|_| anyhow!("OCULUS_GRACE_SECS must be an integer number of seconds"))?;
            self.grace = Duration::from_secs(seconds);
        }
        if let Ok(detectors) = std::env::var("OCULUS_DETECTORS") {
            let parsed = split_csv(&detectors);
            if !parsed.is_empty() {
                self.detectors = parsed;
            }
        }
        if let Ok(display) = std::env::var("OCULUS_DISPLAY") {
            self.display = matches!(display.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera frame size must be non-zero"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output dir must not be empty"));
        }
        if self.record_fps == 0 {
            return Err(anyhow!("output fps must be greater than zero"));
        }
        if self.grace.is_zero() {
            return Err(anyhow!("grace_secs must be greater than zero"));
        }
        for name in &self.detectors {
            if !known_backends().contains(&name.as_str()) {
                return Err(anyhow!(
                    "unknown detector backend '{}' (known: {})",
                    name,
                    known_backends().join(", ")
                ));
            }
        }
        if self.detectors.is_empty() {
            return Err(anyhow!("at least one detector backend is required"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<OculusdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
