//! Playback of recorded actions against the live desktop

use crate::events::{Action, DEFAULT_CONFIDENCE};
use deskrec_core::{Error, ErrorCode, InputInjector, MouseButton, Region, ScreenCapture};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Playback timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Pause between typed characters, in ms
    pub type_interval_ms: u64,
    /// Pause between screen polls while waiting for an image, in ms
    pub poll_interval_ms: u64,
    /// Wait timeout when an action carries none, in ms
    pub default_wait_timeout_ms: u64,
    /// Match threshold when a wait carries none
    pub default_confidence: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            type_interval_ms: 10,
            poll_interval_ms: 250,
            default_wait_timeout_ms: 10_000,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl PlaybackConfig {
    pub fn type_interval(mut self, interval: Duration) -> Self {
        self.type_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn default_wait_timeout(mut self, timeout: Duration) -> Self {
        self.default_wait_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Untyped request to run one action: `{"type": ..., "data": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl RunPayload {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Decode into a typed action
    pub fn to_action(&self) -> deskrec_core::Result<Action> {
        if !Action::TAGS.contains(&self.kind.as_str()) {
            return Err(Error::unknown_action(&self.kind));
        }
        let mut object = match &self.data {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(Error::invalid_payload(
                    &self.kind,
                    format!("data must be an object, got {other}"),
                ))
            }
        };
        object.insert("type".into(), Value::String(self.kind.clone()));
        serde_json::from_value(Value::Object(object))
            .map_err(|e| Error::invalid_payload(&self.kind, e))
    }
}

/// Result of running one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub ok: bool,
    /// Image clicks only: whether the anchor was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    /// Waits only: where the image appeared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// What the failing action was looking for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            matched: None,
            location: None,
            error: None,
            code: None,
            context: None,
        }
    }

    pub fn matched(matched: bool) -> Self {
        Self {
            matched: Some(matched),
            ..Self::success()
        }
    }

    pub fn found(location: Region) -> Self {
        Self {
            location: Some(location),
            ..Self::success()
        }
    }

    /// Named kinds report their kind string, anything else its message
    pub fn failure(err: Error) -> Self {
        let error = if err.code.is_named_kind() {
            err.code.as_str().to_string()
        } else {
            err.message
        };
        Self {
            ok: false,
            matched: None,
            location: None,
            error: Some(error),
            code: Some(err.code),
            context: err.context,
        }
    }
}

impl From<deskrec_core::Result<Outcome>> for Outcome {
    fn from(result: deskrec_core::Result<Outcome>) -> Self {
        result.unwrap_or_else(Outcome::failure)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStats {
    pub actions: usize,
    pub clicks: usize,
    pub matched: usize,
    pub fallbacks: usize,
    pub text_chars: usize,
    pub waits: usize,
    /// Index and outcome of the action that stopped the replay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<(usize, Outcome)>,
}

/// Executes actions through the screen and input capabilities
pub struct Player {
    screen: Arc<dyn ScreenCapture>,
    input: Arc<dyn InputInjector>,
    config: PlaybackConfig,
}

impl Player {
    pub fn new(
        screen: Arc<dyn ScreenCapture>,
        input: Arc<dyn InputInjector>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            screen,
            input,
            config,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Run one action. Never panics and never returns an error; failures
    /// are reported in the outcome.
    pub fn run(&self, action: &Action) -> Outcome {
        debug!(action = action.tag(), "run");
        let outcome: Outcome = match action {
            Action::Click { x, y, button } => self.click(*x, *y, *button).into(),
            Action::ClickImage {
                x,
                y,
                button,
                image_path,
                confidence,
            } => self
                .click_image(image_path.as_deref(), (*x).zip(*y), *button, *confidence)
                .into(),
            Action::TypeText { value } => self.type_text(value).into(),
            Action::WaitForImage {
                image_path,
                timeout_ms,
                confidence,
            } => self
                .wait_for_image(
                    image_path,
                    timeout_ms.unwrap_or(self.config.default_wait_timeout_ms),
                    confidence.unwrap_or(self.config.default_confidence),
                )
                .into(),
        };
        if !outcome.ok {
            warn!(action = action.tag(), error = ?outcome.error, "action failed");
        }
        outcome
    }

    /// Decode and run an untyped payload
    pub fn run_payload(&self, payload: &RunPayload) -> Outcome {
        match payload.to_action() {
            Ok(action) => self.run(&action),
            Err(e) => {
                warn!(kind = %payload.kind, error = %e, "rejected payload");
                Outcome::failure(e)
            }
        }
    }

    /// Replay a log in order, stopping at the first failure
    pub fn play(&self, actions: &[Action]) -> ReplayStats {
        let mut stats = ReplayStats::default();

        for (i, action) in actions.iter().enumerate() {
            let outcome = self.run(action);
            if !outcome.ok {
                stats.failed = Some((i, outcome));
                break;
            }
            stats.actions += 1;

            match action {
                Action::Click { .. } => stats.clicks += 1,
                Action::ClickImage { .. } => {
                    stats.clicks += 1;
                    match outcome.matched {
                        Some(true) => stats.matched += 1,
                        _ => stats.fallbacks += 1,
                    }
                }
                Action::TypeText { value } => stats.text_chars += value.chars().count(),
                Action::WaitForImage { .. } => stats.waits += 1,
            }
        }

        info!(
            actions = stats.actions,
            total = actions.len(),
            failed = stats.failed.is_some(),
            "replay finished"
        );
        stats
    }

    fn click(&self, x: i32, y: i32, button: MouseButton) -> deskrec_core::Result<Outcome> {
        self.input.click(x, y, button)?;
        Ok(Outcome::success())
    }

    fn click_image(
        &self,
        image_path: Option<&Path>,
        fallback: Option<(i32, i32)>,
        button: MouseButton,
        confidence: f32,
    ) -> deskrec_core::Result<Outcome> {
        let found = match image_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::action_failed(
                        "desktop_click_image",
                        format!("reference image missing: {}", path.display()),
                    ));
                }
                self.screen.locate(path, confidence)?
            }
            None => None,
        };

        if let Some(region) = found {
            let (cx, cy) = region.center();
            debug!(x = cx, y = cy, "anchor matched");
            self.input.click(cx, cy, button)?;
            return Ok(Outcome::matched(true));
        }

        match fallback {
            Some((x, y)) => {
                debug!(x, y, "anchor not found, using recorded coordinates");
                self.input.click(x, y, button)?;
                Ok(Outcome::matched(false))
            }
            None => Err(Error::image_not_found(image_path).with_context(json!({
                "imagePath": image_path,
                "confidence": confidence,
            }))),
        }
    }

    fn type_text(&self, text: &str) -> deskrec_core::Result<Outcome> {
        let interval = Duration::from_millis(self.config.type_interval_ms);
        self.input.type_text(text, interval)?;
        Ok(Outcome::success())
    }

    fn wait_for_image(
        &self,
        image_path: &Path,
        timeout_ms: u64,
        confidence: f32,
    ) -> deskrec_core::Result<Outcome> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::timeout("desktop_wait_for_image", timeout_ms).with_context(
                    json!({ "imagePath": image_path, "timeoutMs": timeout_ms }),
                ));
            }
            if let Some(region) = self.screen.locate(image_path, confidence)? {
                debug!(?region, "image appeared");
                return Ok(Outcome::found(region));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(interval.min(remaining));
        }
    }
}
