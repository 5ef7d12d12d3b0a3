//! Recording decision state machine.
//!
//! `RecordingController` consumes one `(presence, timestamp)` pair per frame
//! plus manual start/stop commands, and answers with the exact I/O the caller
//! must perform. It owns no file handles and touches no devices; the daemon
//! performs sink and display I/O in response to the returned actions, which
//! keeps the policy testable without a camera or a filesystem.
//!
//! Automatic policy:
//! - presence in `Idle` opens a session and writes the frame
//! - absence in `Active` starts the grace timer but keeps writing
//! - absence past the grace period closes the session
//! - re-detection during grace cancels the timer without closing
//!
//! Manual recording suspends the automatic policy entirely: every frame is
//! written until `stop_manual`, and a manual start displaces any session the
//! automatic policy had open.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};

/// Trailing seconds of recording after presence is lost.
pub const DEFAULT_GRACE_SECS: u64 = 5;

/// Frame rate stamped into session metadata.
pub const DEFAULT_RECORD_FPS: u32 = 20;

const DEFAULT_EXTENSION: &str = "mjpeg";

/// Metadata for one open output file.
///
/// Created when a recording interval starts, handed back to the caller when
/// it ends. At most one session is open at any time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSpec {
    /// Output path, `<dir>/DD-MM-YYYY-HH-MM-SS.<ext>` from the open time.
    /// Collisions within the same second are not deduplicated.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub opened_at: SystemTime,
}

/// Per-frame decision. The caller performs exactly this I/O and nothing else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickAction {
    /// Open the described session, then write the frame to it.
    OpenAndWrite(SessionSpec),
    /// Write the frame to the already-open session.
    Write,
    /// Close the session; the frame is not written.
    CloseAndDiscard(SessionSpec),
    /// No session, nothing written.
    Discard,
}

/// Outcome of a manual start command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartAction {
    /// Open the described session. If `replaces` is set, the automatic
    /// policy had a session open; close it first.
    OpenSession {
        session: SessionSpec,
        replaces: Option<SessionSpec>,
    },
    /// A manual session is already open; nothing to do.
    AlreadyRecording,
}

/// Outcome of a manual stop command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopAction {
    /// Close the described session.
    Closed(SessionSpec),
    /// No manual session was open; nothing to do.
    NotRecording,
}

/// Whether presence is currently treated as ongoing for recording purposes.
///
/// The grace timestamp only exists while in `GracePeriod`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DetectionState {
    Idle,
    Active,
    GracePeriod { since: SystemTime },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Automatic,
    ManualRecording,
}

/// The recording decision state machine.
///
/// Exclusively owned and mutated by the polling loop; `now` is expected to be
/// non-decreasing but a backwards clock is tolerated (elapsed grace time
/// clamps to zero). No method panics or fails: the controller is a total
/// function over its inputs.
pub struct RecordingController {
    output_dir: PathBuf,
    extension: String,
    width: u32,
    height: u32,
    fps: u32,
    grace: Duration,
    state: DetectionState,
    mode: Mode,
    session: Option<SessionSpec>,
}

impl RecordingController {
    pub fn new(output_dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            width,
            height,
            fps: DEFAULT_RECORD_FPS,
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
            state: DetectionState::Idle,
            mode: Mode::Automatic,
            session: None,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// The currently open session, if any.
    pub fn session(&self) -> Option<&SessionSpec> {
        self.session.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_manual(&self) -> bool {
        self.mode == Mode::ManualRecording
    }

    /// Decide what to do with the current frame.
    ///
    /// Called at most once per frame. Under manual recording the automatic
    /// policy is suspended and every frame is written.
    pub fn on_frame(&mut self, presence: bool, now: SystemTime) -> TickAction {
        if self.mode == Mode::ManualRecording {
            return TickAction::Write;
        }

        match (self.state, presence) {
            (DetectionState::Idle, true) => {
                let session = self.new_session(now);
                self.state = DetectionState::Active;
                self.session = Some(session.clone());
                TickAction::OpenAndWrite(session)
            }
            (DetectionState::Active, true) => TickAction::Write,
            (DetectionState::GracePeriod { .. }, true) => {
                self.state = DetectionState::Active;
                TickAction::Write
            }
            (DetectionState::Idle, false) => TickAction::Discard,
            (DetectionState::Active, false) => {
                self.state = DetectionState::GracePeriod { since: now };
                TickAction::Write
            }
            (DetectionState::GracePeriod { since }, false) => {
                // duration_since fails when the clock went backwards;
                // treat that as zero elapsed rather than closing early.
                let elapsed = now.duration_since(since).unwrap_or(Duration::ZERO);
                if elapsed >= self.grace {
                    self.state = DetectionState::Idle;
                    match self.session.take() {
                        Some(spec) => TickAction::CloseAndDiscard(spec),
                        None => TickAction::Discard,
                    }
                } else {
                    TickAction::Write
                }
            }
        }
    }

    /// Force recording on. Idempotent: a second start while a manual session
    /// is open is a no-op, so a double command cannot leak a file handle.
    ///
    /// Any session the automatic policy had open (active or mid-grace) is
    /// displaced: its spec is returned in `replaces` so the caller closes it
    /// before opening the new one, and automatic state resets to idle.
    pub fn start_manual(&mut self, now: SystemTime) -> StartAction {
        if self.mode == Mode::ManualRecording {
            return StartAction::AlreadyRecording;
        }

        let replaces = self.session.take();
        self.state = DetectionState::Idle;
        self.mode = Mode::ManualRecording;
        let session = self.new_session(now);
        self.session = Some(session.clone());
        StartAction::OpenSession { session, replaces }
    }

    /// Force recording off. Idempotent: stopping with no manual session open
    /// is a no-op, not an error.
    pub fn stop_manual(&mut self) -> StopAction {
        if self.mode != Mode::ManualRecording {
            return StopAction::NotRecording;
        }

        self.mode = Mode::Automatic;
        self.state = DetectionState::Idle;
        match self.session.take() {
            Some(spec) => StopAction::Closed(spec),
            None => StopAction::NotRecording,
        }
    }

    /// Forget the current session without emitting a close action.
    ///
    /// Used after a sink failure (the file is already unusable) and on
    /// shutdown. Resets to idle/automatic; the next presence episode opens a
    /// fresh session.
    pub fn abort_session(&mut self) -> Option<SessionSpec> {
        self.mode = Mode::Automatic;
        self.state = DetectionState::Idle;
        self.session.take()
    }

    fn new_session(&self, now: SystemTime) -> SessionSpec {
        let name = format!("{}.{}", session_stamp(now), self.extension);
        SessionSpec {
            path: self.output_dir.join(name),
            width: self.width,
            height: self.height,
            fps: self.fps,
            opened_at: now,
        }
    }
}

/// `DD-MM-YYYY-HH-MM-SS` in local time, the recorder's historical filename
/// format.
pub fn session_stamp(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format("%d-%m-%Y-%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RecordingController {
        RecordingController::new("out", 640, 480)
    }

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn presence_opens_then_writes() {
        let mut rc = controller();
        let action = rc.on_frame(true, t(0));
        let TickAction::OpenAndWrite(spec) = action else {
            panic!("expected open, got {:?}", action);
        };
        assert_eq!(spec.width, 640);
        assert_eq!(spec.height, 480);
        assert_eq!(spec.fps, DEFAULT_RECORD_FPS);
        assert!(rc.is_recording());

        assert_eq!(rc.on_frame(true, t(1)), TickAction::Write);
        assert!(rc.session().is_some());
    }

    #[test]
    fn absence_in_idle_discards() {
        let mut rc = controller();
        assert_eq!(rc.on_frame(false, t(0)), TickAction::Discard);
        assert!(!rc.is_recording());
    }

    #[test]
    fn grace_period_boundary() {
        let mut rc = controller();
        assert!(matches!(rc.on_frame(true, t(0)), TickAction::OpenAndWrite(_)));

        // Grace starts at t=1; every tick strictly inside 5s keeps writing.
        assert_eq!(rc.on_frame(false, t(1)), TickAction::Write);
        let base = t(1);
        for millis in [1_000u64, 2_000, 3_000, 4_000, 4_900] {
            let now = base + Duration::from_millis(millis);
            assert_eq!(rc.on_frame(false, now), TickAction::Write, "at +{}ms", millis);
        }

        // Exactly 5s closes once, then idle discards.
        let action = rc.on_frame(false, base + Duration::from_secs(5));
        assert!(matches!(action, TickAction::CloseAndDiscard(_)));
        assert!(!rc.is_recording());
        assert_eq!(rc.on_frame(false, t(7)), TickAction::Discard);
    }

    #[test]
    fn redetection_cancels_grace_without_reopening() {
        let mut rc = controller();
        let TickAction::OpenAndWrite(opened) = rc.on_frame(true, t(0)) else {
            panic!("expected open");
        };
        assert_eq!(rc.on_frame(false, t(1)), TickAction::Write);
        assert_eq!(rc.on_frame(true, t(3)), TickAction::Write);
        // Same session spans the whole interval.
        assert_eq!(rc.session(), Some(&opened));

        // A fresh absence restarts the timer from scratch.
        assert_eq!(rc.on_frame(false, t(4)), TickAction::Write);
        assert_eq!(rc.on_frame(false, t(8)), TickAction::Write);
        assert!(matches!(rc.on_frame(false, t(9)), TickAction::CloseAndDiscard(_)));
    }

    #[test]
    fn backwards_clock_clamps_grace() {
        let mut rc = controller();
        rc.on_frame(true, t(10));
        assert_eq!(rc.on_frame(false, t(12)), TickAction::Write);
        // Clock regression: elapsed clamps to zero, session stays open.
        assert_eq!(rc.on_frame(false, t(5)), TickAction::Write);
        assert!(rc.is_recording());
        assert!(matches!(rc.on_frame(false, t(17)), TickAction::CloseAndDiscard(_)));
    }

    #[test]
    fn manual_start_is_idempotent() {
        let mut rc = controller();
        let first = rc.start_manual(t(0));
        assert!(matches!(
            first,
            StartAction::OpenSession { replaces: None, .. }
        ));
        assert_eq!(rc.start_manual(t(1)), StartAction::AlreadyRecording);
        assert!(rc.is_manual());
        assert!(rc.is_recording());
    }

    #[test]
    fn manual_stop_is_idempotent() {
        let mut rc = controller();
        assert_eq!(rc.stop_manual(), StopAction::NotRecording);

        rc.start_manual(t(0));
        assert!(matches!(rc.stop_manual(), StopAction::Closed(_)));
        assert_eq!(rc.stop_manual(), StopAction::NotRecording);
        assert!(!rc.is_recording());
    }

    #[test]
    fn manual_start_replaces_automatic_session() {
        let mut rc = controller();
        let TickAction::OpenAndWrite(auto_spec) = rc.on_frame(true, t(0)) else {
            panic!("expected open");
        };

        let StartAction::OpenSession { session, replaces } = rc.start_manual(t(2)) else {
            panic!("expected manual open");
        };
        assert_eq!(replaces, Some(auto_spec));
        assert_ne!(Some(&session), replaces.as_ref());
        assert_eq!(rc.session(), Some(&session));
    }

    #[test]
    fn manual_start_mid_grace_replaces_and_clears_timer() {
        let mut rc = controller();
        rc.on_frame(true, t(0));
        rc.on_frame(false, t(1));

        let StartAction::OpenSession { replaces, .. } = rc.start_manual(t(2)) else {
            panic!("expected manual open");
        };
        assert!(replaces.is_some());

        // The old grace timer must not fire into the manual session.
        assert_eq!(rc.on_frame(false, t(30)), TickAction::Write);
        assert!(rc.is_recording());
    }

    #[test]
    fn manual_mode_suppresses_automatic_policy() {
        let mut rc = controller();
        rc.start_manual(t(0));
        for (i, presence) in [true, false, false, true, false, false, false]
            .into_iter()
            .enumerate()
        {
            let action = rc.on_frame(presence, t(1 + i as u64 * 10));
            assert_eq!(action, TickAction::Write, "tick {}", i);
        }
        assert!(matches!(rc.stop_manual(), StopAction::Closed(_)));
        // Automatic policy resumes from idle.
        assert_eq!(rc.on_frame(false, t(100)), TickAction::Discard);
        assert!(matches!(rc.on_frame(true, t(101)), TickAction::OpenAndWrite(_)));
    }

    #[test]
    fn abort_forgets_session_without_close_action() {
        let mut rc = controller();
        rc.on_frame(true, t(0));
        assert!(rc.abort_session().is_some());
        assert!(!rc.is_recording());
        assert!(rc.abort_session().is_none());
        // Next presence opens a fresh session.
        assert!(matches!(rc.on_frame(true, t(5)), TickAction::OpenAndWrite(_)));
    }

    #[test]
    fn session_filename_from_open_timestamp() {
        let mut rc = controller();
        let action = rc.on_frame(true, t(86_400));
        let TickAction::OpenAndWrite(spec) = action else {
            panic!("expected open");
        };
        let name = spec.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".mjpeg"));
        // DD-MM-YYYY-HH-MM-SS is 19 characters.
        assert_eq!(name.len(), "02-01-1970-00-00-00.mjpeg".len());
        assert_eq!(spec.path.parent().unwrap(), std::path::Path::new("out"));
    }
}
