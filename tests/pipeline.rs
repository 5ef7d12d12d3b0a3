//! End-to-end pipeline runs against stub I/O: synthetic camera, scripted
//! detector, memory and mjpeg sinks.

use std::time::{Duration, SystemTime};

use oculus::{
    CameraConfig, CameraSource, DetectorSet, Frame, FrameSource, MemorySink, MjpegSink,
    RecordingController, ScriptedBackend, SinkEvent, TickAction, VideoSink,
};

fn camera() -> CameraSource {
    let mut source = CameraSource::new(CameraConfig {
        device: "stub://pipeline".to_string(),
        target_fps: 20,
        width: 64,
        height: 48,
    })
    .expect("synthetic camera");
    source.connect().expect("connect");
    source
}

/// The daemon's action glue, minus logging.
fn perform(sink: &mut dyn VideoSink, action: &TickAction, frame: &Frame) -> anyhow::Result<()> {
    match action {
        TickAction::OpenAndWrite(spec) => {
            sink.open(spec)?;
            sink.append(frame)
        }
        TickAction::Write => sink.append(frame),
        TickAction::CloseAndDiscard(_) => sink.close(),
        TickAction::Discard => Ok(()),
    }
}

#[test]
fn one_presence_episode_produces_one_session() {
    let mut source = camera();
    let (width, height) = source.frame_size();

    let script = [vec![false; 2], vec![true; 4], vec![false; 10]].concat();
    let mut detectors = DetectorSet::new().with(ScriptedBackend::new(script));
    let mut controller = RecordingController::new("out", width, height)
        .with_grace(Duration::from_secs(3));
    let mut sink = MemorySink::new();

    let t0 = SystemTime::UNIX_EPOCH;
    for tick in 0..16u64 {
        let Some(frame) = source.try_next_frame().expect("frame") else {
            continue;
        };
        let detection = detectors.detect(&frame).expect("detect");
        let action = controller.on_frame(detection.presence_detected, t0 + Duration::from_secs(tick));
        perform(&mut sink, &action, &frame).expect("sink");
        assert!(sink.open_balance() == 0 || sink.open_balance() == 1);
    }

    // ticks 0-1 discard; 2 opens; 3-5 write; 6-8 write through grace;
    // 9 closes (3s after grace start at 6); rest discard.
    let events = sink.events();
    let opened = events
        .iter()
        .filter(|e| matches!(e, SinkEvent::Opened(_)))
        .count();
    let closed = events
        .iter()
        .filter(|e| matches!(e, SinkEvent::Closed(_)))
        .count();
    let appended = events
        .iter()
        .filter(|e| matches!(e, SinkEvent::Appended))
        .count();
    assert_eq!(opened, 1);
    assert_eq!(closed, 1);
    assert_eq!(appended, 7);
    assert!(matches!(events.first(), Some(SinkEvent::Opened(_))));
    assert!(matches!(events.last(), Some(SinkEvent::Closed(_))));
}

#[test]
fn sink_failure_aborts_session_and_recovers() {
    let mut source = camera();
    let (width, height) = source.frame_size();

    let mut controller = RecordingController::new("out", width, height)
        .with_grace(Duration::from_secs(2));
    let mut sink = MemorySink::new();

    let t0 = SystemTime::UNIX_EPOCH;
    let frame = loop {
        if let Some(frame) = source.try_next_frame().expect("frame") {
            break frame;
        }
    };

    // Open a session, then fail the next write.
    let action = controller.on_frame(true, t0);
    perform(&mut sink, &action, &frame).expect("open");
    sink.fail_next_append();

    let action = controller.on_frame(true, t0 + Duration::from_secs(1));
    let err = perform(&mut sink, &action, &frame);
    assert!(err.is_err());

    // Daemon recovery: close what is open, forget the session.
    if sink.is_open() {
        sink.close().expect("close after failure");
    }
    assert!(controller.abort_session().is_some());
    assert!(!controller.is_recording());

    // The next presence episode opens a fresh session.
    let action = controller.on_frame(true, t0 + Duration::from_secs(10));
    assert!(matches!(action, TickAction::OpenAndWrite(_)));
    perform(&mut sink, &action, &frame).expect("reopen");
    assert_eq!(sink.open_balance(), 1);
}

#[test]
fn mjpeg_sink_writes_a_playable_session_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = camera();
    let (width, height) = source.frame_size();

    let mut controller = RecordingController::new(dir.path(), width, height);
    let mut sink = MjpegSink::new();

    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let mut written = 0u64;
    let mut session_path = None;
    for tick in 0..3u64 {
        let Some(frame) = source.try_next_frame().expect("frame") else {
            continue;
        };
        let action = controller.on_frame(true, t0 + Duration::from_secs(tick));
        if let TickAction::OpenAndWrite(spec) = &action {
            session_path = Some(spec.path.clone());
        }
        perform(&mut sink, &action, &frame).expect("sink");
        written += 1;
    }
    sink.close().expect("close");

    let path = session_path.expect("session opened");
    assert_eq!(path.extension().unwrap(), "mjpeg");
    let bytes = std::fs::read(&path).expect("read session file");
    assert!(!bytes.is_empty());

    // Every frame starts with a JPEG SOI marker.
    let soi = [0xFFu8, 0xD8, 0xFF];
    let soi_count = bytes.windows(3).filter(|w| *w == soi).count() as u64;
    assert_eq!(soi_count, written);
    assert_eq!(sink.frames_written(), written);
}

#[test]
fn manual_flow_through_memory_sink() {
    let mut source = camera();
    let (width, height) = source.frame_size();
    let mut controller = RecordingController::new("out", width, height);
    let mut sink = MemorySink::new();

    let t0 = SystemTime::UNIX_EPOCH;
    match controller.start_manual(t0) {
        oculus::StartAction::OpenSession { session, replaces } => {
            assert!(replaces.is_none());
            sink.open(&session).expect("open");
        }
        oculus::StartAction::AlreadyRecording => panic!("fresh controller"),
    }

    for tick in 1..=4u64 {
        let Some(frame) = source.try_next_frame().expect("frame") else {
            continue;
        };
        let action = controller.on_frame(false, t0 + Duration::from_secs(tick));
        perform(&mut sink, &action, &frame).expect("sink");
    }

    match controller.stop_manual() {
        oculus::StopAction::Closed(_) => sink.close().expect("close"),
        oculus::StopAction::NotRecording => panic!("manual session was open"),
    }

    assert_eq!(sink.open_balance(), 0);
    let appended = sink
        .events()
        .iter()
        .filter(|e| matches!(e, SinkEvent::Appended))
        .count();
    assert_eq!(appended, 4);
}
