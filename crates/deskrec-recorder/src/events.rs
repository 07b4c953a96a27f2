//! Action log model
//!
//! Actions serialize as flat JSON objects tagged by `type`, one per line in a
//! saved log. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use deskrec_core::MouseButton;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

pub const DEFAULT_CONFIDENCE: f32 = 0.8;

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

/// One replayable unit of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Click at fixed coordinates
    #[serde(rename = "desktop_click")]
    Click {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
    },

    /// Click on an anchor image, falling back to `x`/`y` when it is not on screen
    #[serde(rename = "desktop_click_image", rename_all = "camelCase")]
    ClickImage {
        #[serde(default)]
        x: Option<i32>,
        #[serde(default)]
        y: Option<i32>,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        image_path: Option<PathBuf>,
        #[serde(default = "default_confidence")]
        confidence: f32,
    },

    /// Literal text, typed one character at a time
    #[serde(rename = "desktop_type")]
    TypeText {
        #[serde(default)]
        value: String,
    },

    /// Block until an image shows up on screen. Playback only.
    #[serde(rename = "desktop_wait_for_image", rename_all = "camelCase")]
    WaitForImage {
        image_path: PathBuf,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        confidence: Option<f32>,
    },
}

impl Action {
    /// Wire tags of every known action
    pub const TAGS: [&'static str; 4] = [
        "desktop_click",
        "desktop_click_image",
        "desktop_type",
        "desktop_wait_for_image",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Action::Click { .. } => Self::TAGS[0],
            Action::ClickImage { .. } => Self::TAGS[1],
            Action::TypeText { .. } => Self::TAGS[2],
            Action::WaitForImage { .. } => Self::TAGS[3],
        }
    }

    pub fn type_text(value: impl Into<String>) -> Self {
        Action::TypeText { value: value.into() }
    }
}

/// A key press as seen by the capture adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character, already layout- and shift-resolved
    Char(char),
    Space,
    Enter,
    Tab,
    Backspace,
    /// Any other named key; ignored by coalescing
    Other(String),
}

impl KeyInput {
    /// Character this key contributes to a text run
    pub fn as_char(&self) -> Option<char> {
        match self {
            KeyInput::Char(c) => Some(*c),
            KeyInput::Space => Some(' '),
            KeyInput::Enter => Some('\n'),
            KeyInput::Tab => Some('\t'),
            KeyInput::Backspace | KeyInput::Other(_) => None,
        }
    }
}

/// Raw notification from the capture adapter, stamped when it was observed
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedInput {
    Click {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
        at: Instant,
    },
    Key {
        key: KeyInput,
        at: Instant,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
}

/// Returned by `Recorder::start` and `Recorder::status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub status: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Actions logged so far
    pub events: usize,
}

/// A stopped session: the frozen, ordered action log and where its anchors live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub events: Vec<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn click_image_wire_shape() {
        let action = Action::ClickImage {
            x: Some(50),
            y: Some(60),
            button: MouseButton::Left,
            image_path: Some(PathBuf::from("/tmp/s/click_1.png")),
            confidence: 0.8,
        };
        let v = serde_json::to_value(&action).unwrap();
        assert_eq!(v["type"], "desktop_click_image");
        assert_eq!(v["x"], 50);
        assert_eq!(v["y"], 60);
        assert_eq!(v["button"], "left");
        assert_eq!(v["imagePath"], "/tmp/s/click_1.png");
        assert!((v["confidence"].as_f64().unwrap() - 0.8).abs() < 1e-6);

        let missing = Action::ClickImage {
            x: Some(1),
            y: Some(2),
            button: MouseButton::Right,
            image_path: None,
            confidence: 0.8,
        };
        let v = serde_json::to_value(&missing).unwrap();
        assert_eq!(v["imagePath"], json!(null));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let a: Action = serde_json::from_value(json!({"type": "desktop_click_image", "imagePath": "a.png"})).unwrap();
        assert_eq!(
            a,
            Action::ClickImage {
                x: None,
                y: None,
                button: MouseButton::Left,
                image_path: Some(PathBuf::from("a.png")),
                confidence: DEFAULT_CONFIDENCE,
            }
        );

        let t: Action = serde_json::from_value(json!({"type": "desktop_type"})).unwrap();
        assert_eq!(t, Action::type_text(""));

        let w: Action = serde_json::from_value(json!({"type": "desktop_wait_for_image", "imagePath": "b.png", "timeoutMs": 500})).unwrap();
        assert_eq!(
            w,
            Action::WaitForImage {
                image_path: PathBuf::from("b.png"),
                timeout_ms: Some(500),
                confidence: None,
            }
        );
    }

    #[test]
    fn tags_match_serialized_type() {
        let actions = [
            Action::Click { x: 1, y: 2, button: MouseButton::Right },
            Action::type_text("x"),
        ];
        for a in actions {
            let v = serde_json::to_value(&a).unwrap();
            assert_eq!(v["type"], a.tag());
        }
    }

    #[test]
    fn key_input_characters() {
        assert_eq!(KeyInput::Space.as_char(), Some(' '));
        assert_eq!(KeyInput::Enter.as_char(), Some('\n'));
        assert_eq!(KeyInput::Tab.as_char(), Some('\t'));
        assert_eq!(KeyInput::Char('q').as_char(), Some('q'));
        assert_eq!(KeyInput::Backspace.as_char(), None);
        assert_eq!(KeyInput::Other("F5".into()).as_char(), None);
    }
}
