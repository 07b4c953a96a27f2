//! Global input capture
//!
//! The OS listener runs on its own thread and pushes [`CapturedInput`] into a
//! bounded channel through a [`CaptureSink`]. It never waits on the consumer:
//! when the channel is full the notification is dropped.

use crate::events::{CapturedInput, KeyInput};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender, TrySendError};
use deskrec_core::{Error, MouseButton, Result};
use parking_lot::Mutex;
use rdev::{Button, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Source of raw mouse and keyboard notifications
pub trait InputCapture: Send {
    /// Start delivering notifications into `sink`
    fn attach(&mut self, sink: CaptureSink) -> Result<()>;

    /// Stop delivering notifications. Safe to call when not attached.
    fn detach(&mut self);
}

/// Producer end handed to an [`InputCapture`]
#[derive(Debug, Clone)]
pub struct CaptureSink {
    tx: Sender<CapturedInput>,
    recording: Arc<AtomicBool>,
}

impl CaptureSink {
    pub fn new(tx: Sender<CapturedInput>, recording: Arc<AtomicBool>) -> Self {
        Self { tx, recording }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn click(&self, x: i32, y: i32, button: MouseButton, pressed: bool) {
        self.send(CapturedInput::Click {
            x,
            y,
            button,
            pressed,
            at: Instant::now(),
        });
    }

    pub fn key(&self, key: KeyInput) {
        self.send(CapturedInput::Key { key, at: Instant::now() });
    }

    fn send(&self, input: CapturedInput) {
        if !self.is_recording() {
            return;
        }
        match self.tx.try_send(input) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(?dropped, "input channel full, dropping notification");
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("input channel closed");
            }
        }
    }
}

/// Blocking event loop handing every OS event to the callback. Returns only
/// when the hook fails or ends.
pub type ListenFn =
    dyn Fn(Box<dyn FnMut(Event)>) -> std::result::Result<(), String> + Send + Sync;

/// How long a fresh listener gets to fail before it counts as running
const STARTUP_GRACE: Duration = Duration::from_millis(200);

/// System-wide hook through `rdev::listen`
///
/// `rdev` offers no way to stop a listener, so one thread is spawned on the
/// first attach and kept for as long as the hook runs. Detaching just
/// unplugs the sink it forwards to. A hook that dies is respawned on the
/// next attach.
pub struct RdevCapture {
    slot: Arc<Mutex<Option<CaptureSink>>>,
    listening: Arc<AtomicBool>,
    listen: Arc<ListenFn>,
}

impl RdevCapture {
    pub fn new() -> Self {
        Self::with_listener(|callback| rdev::listen(callback).map_err(|e| format!("{:?}", e)))
    }

    /// Capture through a custom event loop instead of the OS hook
    pub fn with_listener<F>(listen: F) -> Self
    where
        F: Fn(Box<dyn FnMut(Event)>) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        Self {
            slot: Arc::new(Mutex::new(None)),
            listening: Arc::new(AtomicBool::new(false)),
            listen: Arc::new(listen),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Spawn the hook thread and wait out the startup grace period. Hooks
    /// that cannot be installed (no display, missing permission) fail fast,
    /// and that failure is returned here.
    fn spawn_listener(&self) -> Result<()> {
        let slot = self.slot.clone();
        let listening = self.listening.clone();
        let listen = self.listen.clone();
        let (failed_tx, failed_rx) = bounded::<String>(1);

        listening.store(true, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("deskrec-listen".into())
            .spawn(move || {
                let mut cursor = (0.0_f64, 0.0_f64);
                let callback = move |event: Event| {
                    if let EventType::MouseMove { x, y } = event.event_type {
                        cursor = (x, y);
                        return;
                    }
                    let guard = slot.lock();
                    let Some(sink) = guard.as_ref() else {
                        return;
                    };
                    match event.event_type {
                        EventType::ButtonPress(b) => {
                            sink.click(cursor.0 as i32, cursor.1 as i32, map_button(b), true)
                        }
                        EventType::ButtonRelease(b) => {
                            sink.click(cursor.0 as i32, cursor.1 as i32, map_button(b), false)
                        }
                        EventType::KeyPress(key) => sink.key(key_input(key, event.name.as_deref())),
                        _ => {}
                    }
                };
                info!("input listener started");
                let reason = match listen(Box::new(callback)) {
                    Ok(()) => "listener returned".to_string(),
                    Err(e) => e,
                };
                listening.store(false, Ordering::SeqCst);
                error!("input listener stopped: {}", reason);
                let _ = failed_tx.try_send(reason);
            });

        if let Err(e) = spawned {
            self.listening.store(false, Ordering::SeqCst);
            return Err(Error::capture_failed(format!("failed to spawn input listener: {e}")));
        }

        match failed_rx.recv_timeout(STARTUP_GRACE) {
            Ok(reason) => Err(Error::capture_failed(format!("input listener failed: {reason}"))),
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::capture_failed("input listener exited"))
            }
        }
    }
}

impl Default for RdevCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCapture for RdevCapture {
    fn attach(&mut self, sink: CaptureSink) -> Result<()> {
        *self.slot.lock() = Some(sink);
        if !self.is_listening() {
            if let Err(e) = self.spawn_listener() {
                self.slot.lock().take();
                return Err(e);
            }
        }
        Ok(())
    }

    fn detach(&mut self) {
        self.slot.lock().take();
    }
}

fn map_button(button: Button) -> MouseButton {
    match button {
        Button::Right => MouseButton::Right,
        Button::Middle => MouseButton::Middle,
        Button::Left | Button::Unknown(_) => MouseButton::Left,
    }
}

/// Classify a key press. Named editing keys win over whatever text the
/// platform reports for them.
pub fn key_input(key: Key, name: Option<&str>) -> KeyInput {
    match key {
        Key::Space => return KeyInput::Space,
        Key::Return | Key::KpReturn => return KeyInput::Enter,
        Key::Tab => return KeyInput::Tab,
        Key::Backspace => return KeyInput::Backspace,
        _ => {}
    }

    let mut chars = name.unwrap_or_default().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => KeyInput::Char(c),
        _ => KeyInput::Other(format!("{:?}", key)),
    }
}
