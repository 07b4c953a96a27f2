//! Recording engine
//!
//! Owns at most one live session. The capture adapter feeds a bounded channel;
//! a single consumer thread turns notifications into actions under the
//! session lock.

use crate::anchor::{AnchorCapturer, ANCHOR_SIZE};
use crate::capture::{CaptureSink, InputCapture};
use crate::coalescer::KeyCoalescer;
use crate::error::{RecorderError, Result};
use crate::events::*;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use deskrec_core::{MouseButton, ScreenCapture};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Env var overriding where session directories are created
pub const RECORDINGS_DIR_ENV: &str = "DESKREC_RECORDINGS_DIR";

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Parent of the per-session directories
    pub recordings_dir: PathBuf,
    /// Idle gap in ms that closes a typing run
    pub key_group_timeout_ms: u64,
    /// Side of the square anchor captured around each click
    pub anchor_size: u32,
    /// Confidence stored on recorded image clicks
    pub default_confidence: f32,
    /// Capacity of the capture channel; overflow is dropped
    pub channel_capacity: usize,
    /// How often the consumer checks for an idle typing run, in ms
    pub idle_tick_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            recordings_dir: default_recordings_dir(),
            key_group_timeout_ms: 700,
            anchor_size: ANCHOR_SIZE,
            default_confidence: DEFAULT_CONFIDENCE,
            channel_capacity: 1024,
            idle_tick_ms: 50,
        }
    }
}

impl RecorderConfig {
    pub fn recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }

    pub fn key_group_timeout(mut self, timeout: Duration) -> Self {
        self.key_group_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn anchor_size(mut self, size: u32) -> Self {
        self.anchor_size = size;
        self
    }

    pub fn idle_tick(mut self, tick: Duration) -> Self {
        self.idle_tick_ms = tick.as_millis() as u64;
        self
    }

    fn key_timeout(&self) -> Duration {
        Duration::from_millis(self.key_group_timeout_ms)
    }

    fn tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms.max(1))
    }
}

/// `$DESKREC_RECORDINGS_DIR`, else `$HOME/.deskrec/recordings`, else a
/// relative `recordings` directory
pub fn default_recordings_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(RECORDINGS_DIR_ENV) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".deskrec").join("recordings"),
        None => PathBuf::from("recordings"),
    }
}

/// Directory name of a session started at `at`
pub fn session_dir_name(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Log and key buffer of the live session; only touched under its mutex
#[derive(Debug)]
struct SessionLog {
    actions: Vec<Action>,
    keys: KeyCoalescer,
}

impl SessionLog {
    fn flush_keys(&mut self) {
        if let Some(run) = self.keys.flush() {
            self.actions.push(run);
        }
    }
}

struct ActiveSession {
    label: Option<String>,
    dir: PathBuf,
    started_at: DateTime<Utc>,
    log: Arc<Mutex<SessionLog>>,
    stop_tx: Sender<()>,
    worker: thread::JoinHandle<()>,
}

/// Records clicks and typed text into an ordered action log
pub struct Recorder {
    config: RecorderConfig,
    anchors: AnchorCapturer,
    capture: Mutex<Box<dyn InputCapture>>,
    recording: Arc<AtomicBool>,
    session: Mutex<Option<ActiveSession>>,
}

impl Recorder {
    pub fn new(
        config: RecorderConfig,
        screen: Arc<dyn ScreenCapture>,
        capture: Box<dyn InputCapture>,
    ) -> Self {
        let anchors = AnchorCapturer::new(screen, config.anchor_size);
        Self {
            config,
            anchors,
            capture: Mutex::new(capture),
            recording: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Begin a fresh session in a new timestamped directory
    pub fn start(&self, label: Option<String>) -> Result<SessionStatus> {
        let mut slot = self.session.lock();
        if slot.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let started_at = Utc::now();
        let dir = self.config.recordings_dir.join(session_dir_name(started_at));
        std::fs::create_dir_all(&dir)?;

        let (tx, rx) = bounded(self.config.channel_capacity.max(1));
        let (stop_tx, stop_rx) = bounded(1);
        let log = Arc::new(Mutex::new(SessionLog {
            actions: Vec::new(),
            keys: KeyCoalescer::new(self.config.key_timeout()),
        }));

        let consumer = Consumer {
            log: log.clone(),
            anchors: self.anchors.clone(),
            dir: dir.clone(),
            confidence: self.config.default_confidence,
        };
        let tick = self.config.tick();
        let worker = thread::Builder::new()
            .name("deskrec-consumer".into())
            .spawn(move || consumer.run(rx, stop_rx, tick))?;

        self.recording.store(true, Ordering::SeqCst);
        let sink = CaptureSink::new(tx, self.recording.clone());
        if let Err(e) = self.capture.lock().attach(sink) {
            self.recording.store(false, Ordering::SeqCst);
            let _ = stop_tx.send(());
            let _ = worker.join();
            return Err(e.into());
        }

        info!(label = ?label, dir = %dir.display(), "recording started");
        *slot = Some(ActiveSession {
            label: label.clone(),
            dir: dir.clone(),
            started_at,
            log,
            stop_tx,
            worker,
        });

        Ok(SessionStatus {
            status: SessionState::Recording,
            label,
            dir: Some(dir),
            events: 0,
        })
    }

    /// End the live session and return its frozen log
    pub fn stop(&self) -> Result<RecordedSession> {
        let session = self.session.lock().take().ok_or(RecorderError::NotRecording)?;

        self.recording.store(false, Ordering::SeqCst);
        self.capture.lock().detach();
        let _ = session.stop_tx.send(());
        session
            .worker
            .join()
            .map_err(|_| RecorderError::WorkerPanicked)?;

        let events = {
            let mut log = session.log.lock();
            log.flush_keys();
            std::mem::take(&mut log.actions)
        };
        info!(
            label = ?session.label,
            events = events.len(),
            dir = %session.dir.display(),
            "recording stopped"
        );

        Ok(RecordedSession {
            label: session.label,
            dir: session.dir,
            started_at: session.started_at,
            events,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn status(&self) -> SessionStatus {
        match self.session.lock().as_ref() {
            Some(s) => SessionStatus {
                status: SessionState::Recording,
                label: s.label.clone(),
                dir: Some(s.dir.clone()),
                events: s.log.lock().actions.len(),
            },
            None => SessionStatus {
                status: SessionState::Idle,
                label: None,
                dir: None,
                events: 0,
            },
        }
    }

    /// Copy of the live log; empty when idle. The pending run is not included.
    pub fn snapshot(&self) -> Vec<Action> {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.log.lock().actions.clone())
            .unwrap_or_default()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.session.get_mut().is_some() {
            if let Err(e) = self.stop() {
                warn!("failed to stop recording on drop: {}", e);
            }
        }
    }
}

/// Consumer side of one session
struct Consumer {
    log: Arc<Mutex<SessionLog>>,
    anchors: AnchorCapturer,
    dir: PathBuf,
    confidence: f32,
}

impl Consumer {
    fn run(self, rx: Receiver<CapturedInput>, stop_rx: Receiver<()>, tick: Duration) {
        debug!("consumer started");
        loop {
            select! {
                recv(rx) -> msg => match msg {
                    Ok(input) => self.handle(input),
                    Err(_) => break,
                },
                recv(stop_rx) -> _ => break,
                default(tick) => self.idle_check(&rx),
            }
        }

        // Notifications queued before the stop signal still count
        for input in rx.try_iter() {
            self.handle(input);
        }
        debug!("consumer exited");
    }

    /// Close a finished typing run. Skipped while input is queued, since a
    /// queued key may still belong to the run.
    fn idle_check(&self, rx: &Receiver<CapturedInput>) {
        if !rx.is_empty() {
            return;
        }
        let mut log = self.log.lock();
        if let Some(run) = log.keys.flush_if_idle(Instant::now()) {
            debug!("idle flush");
            log.actions.push(run);
        }
    }

    fn handle(&self, input: CapturedInput) {
        match input {
            CapturedInput::Key { key, at } => {
                let mut log = self.log.lock();
                if let Some(run) = log.keys.push(&key, at) {
                    log.actions.push(run);
                }
            }
            CapturedInput::Click { x, y, button, pressed: true, .. } => self.click(x, y, button),
            CapturedInput::Click { .. } => {}
        }
    }

    fn click(&self, x: i32, y: i32, button: MouseButton) {
        self.log.lock().flush_keys();

        let image_path = self.anchors.capture(x, y, &self.dir);
        debug!(x, y, ?button, anchor = ?image_path, "click");

        self.log.lock().actions.push(Action::ClickImage {
            x: Some(x),
            y: Some(y),
            button,
            image_path,
            confidence: self.confidence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrec_core::{Region, Result as CoreResult};
    use image::RgbaImage;
    use std::path::Path;

    struct NoScreen;

    impl ScreenCapture for NoScreen {
        fn capture_region(&self, region: Region) -> CoreResult<RgbaImage> {
            Ok(RgbaImage::new(region.width, region.height))
        }

        fn locate(&self, _: &Path, _: f32) -> CoreResult<Option<Region>> {
            Ok(None)
        }
    }

    fn consumer(timeout: Duration) -> Consumer {
        Consumer {
            log: Arc::new(Mutex::new(SessionLog {
                actions: Vec::new(),
                keys: KeyCoalescer::new(timeout),
            })),
            anchors: AnchorCapturer::new(Arc::new(NoScreen), ANCHOR_SIZE),
            dir: PathBuf::from("."),
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    fn key(c: char, at: Instant) -> CapturedInput {
        CapturedInput::Key { key: KeyInput::Char(c), at }
    }

    #[test]
    fn idle_check_waits_for_queued_keys() {
        let timeout = Duration::from_millis(100);
        let c = consumer(timeout);
        let (tx, rx) = bounded(8);

        // 'a' typed long ago, 'b' followed it within the timeout but is still queued
        let t0 = Instant::now() - Duration::from_secs(1);
        c.handle(key('a', t0));
        tx.send(key('b', t0 + Duration::from_millis(50))).unwrap();

        c.idle_check(&rx);
        assert!(c.log.lock().actions.is_empty());

        for input in rx.try_iter() {
            c.handle(input);
        }
        c.idle_check(&rx);
        assert_eq!(c.log.lock().actions, vec![Action::type_text("ab")]);
    }

    #[test]
    fn idle_check_flushes_when_queue_is_empty() {
        let c = consumer(Duration::from_millis(100));
        let (_tx, rx) = bounded::<CapturedInput>(8);

        c.handle(key('x', Instant::now() - Duration::from_secs(1)));
        c.idle_check(&rx);
        assert_eq!(c.log.lock().actions, vec![Action::type_text("x")]);
    }
}
