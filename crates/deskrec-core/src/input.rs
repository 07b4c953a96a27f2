//! Keyboard and mouse input injection
//!
//! `InputInjector` is the seam playback drives; `RdevInput` is the
//! cross-platform implementation on top of `rdev::simulate`.

use crate::error::{Error, Result};
use crate::geometry::MouseButton;
use rdev::{simulate, Button, EventType, Key};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Pause between the synthetic events of a single click or keystroke
const EVENT_GAP: Duration = Duration::from_millis(10);

/// Move/click the pointer and type literal text
pub trait InputInjector: Send + Sync {
    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<()>;

    /// Type `text` one character at a time, pausing `interval` after each.
    fn type_text(&self, text: &str, interval: Duration) -> Result<()>;
}

/// Injects input through `rdev` (X11, Windows SendInput, macOS CGEvent)
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevInput;

impl RdevInput {
    pub fn new() -> Self {
        Self
    }

    fn send(&self, event: &EventType) -> Result<()> {
        simulate(event).map_err(|e| Error::action_failed("inject", format!("{:?} ({:?})", event, e)))?;
        // Let the OS pick up the event before the next one
        thread::sleep(EVENT_GAP);
        Ok(())
    }

    fn key(&self, key: Key, shift: bool) -> Result<()> {
        if shift {
            self.send(&EventType::KeyPress(Key::ShiftLeft))?;
        }
        self.send(&EventType::KeyPress(key))?;
        self.send(&EventType::KeyRelease(key))?;
        if shift {
            self.send(&EventType::KeyRelease(Key::ShiftLeft))?;
        }
        Ok(())
    }
}

impl InputInjector for RdevInput {
    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        let btn = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        self.send(&EventType::MouseMove { x: x as f64, y: y as f64 })?;
        self.send(&EventType::ButtonPress(btn))?;
        self.send(&EventType::ButtonRelease(btn))?;
        Ok(())
    }

    fn type_text(&self, text: &str, interval: Duration) -> Result<()> {
        for c in text.chars() {
            match char_to_key(c) {
                Some((key, shift)) => self.key(key, shift)?,
                None => debug!(?c, "no key mapping, skipped"),
            }
            thread::sleep(interval);
        }
        Ok(())
    }
}

/// Convert char to (key, needs_shift) on a US layout
pub fn char_to_key(c: char) -> Option<(Key, bool)> {
    let upper = c.is_ascii_uppercase();
    Some(match c {
        'a' | 'A' => (Key::KeyA, upper),
        'b' | 'B' => (Key::KeyB, upper),
        'c' | 'C' => (Key::KeyC, upper),
        'd' | 'D' => (Key::KeyD, upper),
        'e' | 'E' => (Key::KeyE, upper),
        'f' | 'F' => (Key::KeyF, upper),
        'g' | 'G' => (Key::KeyG, upper),
        'h' | 'H' => (Key::KeyH, upper),
        'i' | 'I' => (Key::KeyI, upper),
        'j' | 'J' => (Key::KeyJ, upper),
        'k' | 'K' => (Key::KeyK, upper),
        'l' | 'L' => (Key::KeyL, upper),
        'm' | 'M' => (Key::KeyM, upper),
        'n' | 'N' => (Key::KeyN, upper),
        'o' | 'O' => (Key::KeyO, upper),
        'p' | 'P' => (Key::KeyP, upper),
        'q' | 'Q' => (Key::KeyQ, upper),
        'r' | 'R' => (Key::KeyR, upper),
        's' | 'S' => (Key::KeyS, upper),
        't' | 'T' => (Key::KeyT, upper),
        'u' | 'U' => (Key::KeyU, upper),
        'v' | 'V' => (Key::KeyV, upper),
        'w' | 'W' => (Key::KeyW, upper),
        'x' | 'X' => (Key::KeyX, upper),
        'y' | 'Y' => (Key::KeyY, upper),
        'z' | 'Z' => (Key::KeyZ, upper),
        '0' | ')' => (Key::Num0, c == ')'),
        '1' | '!' => (Key::Num1, c == '!'),
        '2' | '@' => (Key::Num2, c == '@'),
        '3' | '#' => (Key::Num3, c == '#'),
        '4' | '$' => (Key::Num4, c == '$'),
        '5' | '%' => (Key::Num5, c == '%'),
        '6' | '^' => (Key::Num6, c == '^'),
        '7' | '&' => (Key::Num7, c == '&'),
        '8' | '*' => (Key::Num8, c == '*'),
        '9' | '(' => (Key::Num9, c == '('),
        ' ' => (Key::Space, false),
        '\n' => (Key::Return, false),
        '\t' => (Key::Tab, false),
        '-' | '_' => (Key::Minus, c == '_'),
        '=' | '+' => (Key::Equal, c == '+'),
        '[' | '{' => (Key::LeftBracket, c == '{'),
        ']' | '}' => (Key::RightBracket, c == '}'),
        '\\' | '|' => (Key::BackSlash, c == '|'),
        ';' | ':' => (Key::SemiColon, c == ':'),
        '\'' | '"' => (Key::Quote, c == '"'),
        ',' | '<' => (Key::Comma, c == '<'),
        '.' | '>' => (Key::Dot, c == '>'),
        '/' | '?' => (Key::Slash, c == '?'),
        '`' | '~' => (Key::BackQuote, c == '~'),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_carry_shift_for_uppercase() {
        assert_eq!(char_to_key('h'), Some((Key::KeyH, false)));
        assert_eq!(char_to_key('H'), Some((Key::KeyH, true)));
    }

    #[test]
    fn shifted_symbols_share_base_key() {
        assert_eq!(char_to_key('?'), Some((Key::Slash, true)));
        assert_eq!(char_to_key('/'), Some((Key::Slash, false)));
        assert_eq!(char_to_key('\n'), Some((Key::Return, false)));
    }

    #[test]
    fn unmapped_chars() {
        assert_eq!(char_to_key('é'), None);
        assert_eq!(char_to_key('\u{8}'), None);
    }
}
