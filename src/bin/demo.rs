//! demo - scripted end-to-end run of the recording pipeline
//!
//! Drives the synthetic camera and a scripted presence detector through the
//! recording controller with one-second scripted timestamps, so a short
//! grace period elapses without sleeping. Prints the per-tick action trace,
//! exercises both manual commands, and lists the session files it wrote.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use oculus::{
    CameraConfig, CameraSource, DetectorSet, FrameSource, MjpegSink, RecordingController,
    ScriptedBackend, StartAction, StopAction, TickAction, VideoSink,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory for demo session files.
    #[arg(long, default_value = "demo_out")]
    out: String,
    /// Grace period in seconds applied after presence is lost.
    #[arg(long, default_value_t = 2)]
    grace_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.grace_secs == 0 {
        return Err(anyhow!("grace-secs must be >= 1"));
    }

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)?;

    stage("connect synthetic camera");
    let mut source = CameraSource::new(CameraConfig {
        device: "stub://demo".to_string(),
        target_fps: 20,
        width: 320,
        height: 240,
    })?;
    source.connect()?;
    let (width, height) = source.frame_size();

    stage("build scripted detector");
    // Quiet start, one presence episode, then quiet long enough for the
    // grace period to expire.
    let script = [vec![false; 3], vec![true; 6], vec![false; 16]].concat();
    let mut detectors = DetectorSet::new().with(ScriptedBackend::new(script));

    let mut controller = RecordingController::new(&out_dir, width, height)
        .with_grace(Duration::from_secs(args.grace_secs));
    let mut sink = MjpegSink::new();

    stage("run automatic policy");
    let t0 = SystemTime::now();
    for tick in 0..16u64 {
        let Some(frame) = source.try_next_frame()? else {
            println!("tick {:>2} no frame -> skipped", tick);
            continue;
        };
        let detection = detectors.detect(&frame)?;
        let now = t0 + Duration::from_secs(tick);
        let action = controller.on_frame(detection.presence_detected, now);
        describe(tick, detection.presence_detected, &action);
        match &action {
            TickAction::OpenAndWrite(spec) => {
                sink.open(spec)?;
                sink.append(&frame)?;
            }
            TickAction::Write => sink.append(&frame)?,
            TickAction::CloseAndDiscard(_) => sink.close()?,
            TickAction::Discard => {}
        }
    }

    stage("manual override");
    let manual_at = t0 + Duration::from_secs(20);
    match controller.start_manual(manual_at) {
        StartAction::OpenSession { session, replaces } => {
            if replaces.is_some() {
                sink.close()?;
            }
            sink.open(&session)?;
            println!("manual start -> open {}", session.path.display());
        }
        StartAction::AlreadyRecording => println!("manual start -> already recording"),
    }
    if controller.start_manual(manual_at + Duration::from_secs(1)) == StartAction::AlreadyRecording
    {
        println!("second manual start -> no-op");
    }

    for tick in 0..5u64 {
        let Some(frame) = source.try_next_frame()? else {
            continue;
        };
        // Under manual recording every frame is written, presence or not.
        let action = controller.on_frame(false, manual_at + Duration::from_secs(2 + tick));
        if action == TickAction::Write {
            sink.append(&frame)?;
        }
    }

    match controller.stop_manual() {
        StopAction::Closed(spec) => {
            sink.close()?;
            println!("manual stop -> close {}", spec.path.display());
        }
        StopAction::NotRecording => println!("manual stop -> not recording"),
    }
    if controller.stop_manual() == StopAction::NotRecording {
        println!("second manual stop -> no-op");
    }

    stage("session files");
    let mut entries: Vec<_> = fs::read_dir(&out_dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let meta = entry.metadata()?;
        println!("{} ({} bytes)", entry.path().display(), meta.len());
    }

    Ok(())
}

fn stage(name: &str) {
    println!("==> {}", name);
}

fn describe(tick: u64, presence: bool, action: &TickAction) {
    let what = match action {
        TickAction::OpenAndWrite(spec) => format!("open {}", spec.path.display()),
        TickAction::Write => "write".to_string(),
        TickAction::CloseAndDiscard(spec) => format!("close {}", spec.path.display()),
        TickAction::Discard => "discard".to_string(),
    };
    println!("tick {:>2} presence={} -> {}", tick, presence, what);
}
