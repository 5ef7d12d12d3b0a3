//! oculusd - presence-triggered recording daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured camera
//! 2. Runs the configured presence detectors on each frame
//! 3. Feeds the presence signal into the recording controller
//! 4. Performs exactly the sink I/O the controller decides
//! 5. Shows each frame on the live display (best-effort)
//! 6. Closes any open session explicitly on shutdown
//!
//! Manual control: creating `<output_dir>/.record` forces recording on;
//! removing it forces recording off. Both commands are idempotent, so the
//! per-tick re-issue is safe.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use oculus::{
    AsciiDisplay, CameraConfig, CameraSource, DetectorSet, Display, FrameSource, MjpegSink,
    NullDisplay, OculusdConfig, RecordingController, StartAction, StopAction, TickAction,
    VideoSink,
};

#[derive(Parser, Debug)]
#[command(name = "oculusd", version, about = "Presence-triggered video recorder daemon")]
struct Args {
    /// Config file path (same as OCULUS_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Camera device (e.g. /dev/video0, or stub://camera0 for synthetic).
    #[arg(long)]
    camera: Option<String>,
    /// Output directory for session files.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("OCULUS_CONFIG", path);
    }
    let mut cfg = OculusdConfig::load()?;
    if let Some(camera) = args.camera {
        cfg.camera.device = camera;
    }
    if let Some(dir) = args.output_dir {
        cfg.output_dir = dir;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install shutdown handler")?;
    }

    let mut source = CameraSource::new(CameraConfig {
        device: cfg.camera.device.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;
    source.connect()?;
    let (width, height) = source.frame_size();

    let mut detectors = DetectorSet::from_names(&cfg.detectors)?;
    detectors.warm_up()?;

    let mut controller = RecordingController::new(&cfg.output_dir, width, height)
        .with_fps(cfg.record_fps)
        .with_grace(cfg.grace);
    let mut sink = MjpegSink::new();
    let mut display: Box<dyn Display> = if cfg.display {
        Box::new(AsciiDisplay::new())
    } else {
        Box::new(NullDisplay)
    };

    let manual_flag = cfg.output_dir.join(".record");
    let tick = Duration::from_millis(1_000 / cfg.camera.target_fps.max(1) as u64);
    let mut last_health_log = Instant::now();

    log::info!(
        "oculusd running. camera={} output={} detectors={:?} grace={}s",
        cfg.camera.device,
        cfg.output_dir.display(),
        detectors.names(),
        cfg.grace.as_secs()
    );

    while running.load(Ordering::SeqCst) {
        let tick_started = Instant::now();

        if let Err(e) = apply_manual_control(&manual_flag, &mut controller, &mut sink) {
            log::error!("manual control failed: {} (aborting session)", e);
            abort_session(&mut controller, &mut sink);
        }

        match source.try_next_frame() {
            Ok(Some(frame)) => {
                match detectors.detect(&frame) {
                    Ok(detection) => {
                        let action =
                            controller.on_frame(detection.presence_detected, frame.captured_at);
                        if let Err(e) = perform(&mut sink, &action, &frame) {
                            log::error!("sink failure: {} (aborting session)", e);
                            abort_session(&mut controller, &mut sink);
                        }
                    }
                    Err(e) => log::warn!("detector failure: {} (tick skipped)", e),
                }
                display.show(&frame);
            }
            // No frame this tick: skipped, no state transition.
            Ok(None) => {}
            Err(e) => log::warn!("frame acquisition failed: {} (tick skipped)", e),
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "camera health={} frames={} device={} recording={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.device,
                controller.is_recording()
            );
            last_health_log = Instant::now();
        }

        let budget = tick.saturating_sub(tick_started.elapsed());
        if !budget.is_zero() {
            std::thread::sleep(budget);
        }
    }

    // Shutdown: the controller never closes on its own; close explicitly.
    if let Some(spec) = controller.abort_session() {
        if sink.is_open() {
            sink.close()?;
        }
        log::info!("recording stopped on shutdown: {}", spec.path.display());
    }
    log::info!("oculusd stopped");
    Ok(())
}

/// Map the control file onto the idempotent manual start/stop commands.
fn apply_manual_control(
    manual_flag: &std::path::Path,
    controller: &mut RecordingController,
    sink: &mut MjpegSink,
) -> Result<()> {
    if manual_flag.exists() {
        match controller.start_manual(SystemTime::now()) {
            StartAction::OpenSession { session, replaces } => {
                if let Some(old) = replaces {
                    sink.close()?;
                    log::info!("recording stopped (replaced): {}", old.path.display());
                }
                sink.open(&session)?;
                log::info!("manual recording started: {}", session.path.display());
            }
            StartAction::AlreadyRecording => {}
        }
    } else {
        match controller.stop_manual() {
            StopAction::Closed(spec) => {
                sink.close()?;
                log::info!("manual recording stopped: {}", spec.path.display());
            }
            StopAction::NotRecording => {}
        }
    }
    Ok(())
}

/// Perform the I/O a tick decision asks for.
fn perform(sink: &mut MjpegSink, action: &TickAction, frame: &oculus::Frame) -> Result<()> {
    match action {
        TickAction::OpenAndWrite(spec) => {
            sink.open(spec)?;
            log::info!("recording started: {}", spec.path.display());
            sink.append(frame)
        }
        TickAction::Write => sink.append(frame),
        TickAction::CloseAndDiscard(spec) => {
            sink.close()?;
            log::info!("recording stopped: {}", spec.path.display());
            Ok(())
        }
        TickAction::Discard => Ok(()),
    }
}

/// Recovery after a sink failure: drop the session and return to idle; the
/// next presence episode opens a fresh file.
fn abort_session(controller: &mut RecordingController, sink: &mut MjpegSink) {
    if sink.is_open() {
        if let Err(e) = sink.close() {
            log::warn!("close after failure also failed: {}", e);
        }
    }
    controller.abort_session();
}
