//! Keystroke coalescing into text runs

use crate::events::{Action, KeyInput};
use std::time::{Duration, Instant};

/// Default idle gap that separates two typing bursts
pub const KEY_GROUP_TIMEOUT: Duration = Duration::from_millis(700);

/// Pending characters not yet flushed into the log
///
/// Every key notification is timestamped; a gap longer than the idle timeout
/// closes the current run before the new key is applied. Backspace edits the
/// pending run only.
#[derive(Debug)]
pub struct KeyCoalescer {
    chars: String,
    last_key: Option<Instant>,
    timeout: Duration,
}

impl KeyCoalescer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            chars: String::new(),
            last_key: None,
            timeout,
        }
    }

    /// Apply one key press. Returns the run closed by an idle gap, if any.
    pub fn push(&mut self, key: &KeyInput, at: Instant) -> Option<Action> {
        let closed = match self.last_key {
            Some(last) if at.saturating_duration_since(last) > self.timeout => self.flush(),
            _ => None,
        };
        self.last_key = Some(at);

        match key {
            KeyInput::Backspace => {
                self.chars.pop();
            }
            other => {
                if let Some(c) = other.as_char() {
                    self.chars.push(c);
                }
            }
        }
        closed
    }

    /// Close the pending run into a text action. Empty runs produce nothing.
    pub fn flush(&mut self) -> Option<Action> {
        if self.chars.is_empty() {
            return None;
        }
        Some(Action::type_text(std::mem::take(&mut self.chars)))
    }

    /// Close the pending run if the last key is older than the timeout.
    pub fn flush_if_idle(&mut self, now: Instant) -> Option<Action> {
        match self.last_key {
            Some(last) if now.saturating_duration_since(last) > self.timeout => self.flush(),
            _ => None,
        }
    }

    pub fn pending(&self) -> &str {
        &self.chars
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for KeyCoalescer {
    fn default() -> Self {
        Self::new(KEY_GROUP_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Feed keys at the given offsets, collecting every flushed run
    fn feed(c: &mut KeyCoalescer, t0: Instant, keys: &[(u64, KeyInput)]) -> Vec<Action> {
        keys.iter()
            .filter_map(|(offset, key)| c.push(key, t0 + ms(*offset)))
            .collect()
    }

    #[test]
    fn fast_burst_is_one_run() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        let out = feed(
            &mut c,
            t0,
            &[
                (0, KeyInput::Char('h')),
                (100, KeyInput::Char('e')),
                (200, KeyInput::Char('y')),
                (300, KeyInput::Space),
                (400, KeyInput::Char('!')),
            ],
        );
        assert!(out.is_empty());
        assert_eq!(c.flush(), Some(Action::type_text("hey !")));
        assert_eq!(c.flush(), None);
    }

    #[test]
    fn idle_gap_splits_runs() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        let out = feed(
            &mut c,
            t0,
            &[
                (0, KeyInput::Char('a')),
                (200, KeyInput::Char('b')),
                (1000, KeyInput::Char('c')),
                (1100, KeyInput::Enter),
            ],
        );
        assert_eq!(out, vec![Action::type_text("ab")]);
        assert_eq!(c.flush(), Some(Action::type_text("c\n")));
    }

    #[test]
    fn gap_equal_to_timeout_does_not_split() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        let out = feed(&mut c, t0, &[(0, KeyInput::Char('a')), (700, KeyInput::Char('b'))]);
        assert!(out.is_empty());
        assert_eq!(c.pending(), "ab");
    }

    #[test]
    fn backspace_edits_pending_run() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        feed(
            &mut c,
            t0,
            &[
                (0, KeyInput::Char('c')),
                (50, KeyInput::Char('a')),
                (100, KeyInput::Char('x')),
                (150, KeyInput::Backspace),
                (200, KeyInput::Char('t')),
            ],
        );
        assert_eq!(c.flush(), Some(Action::type_text("cat")));
    }

    #[test]
    fn backspace_on_empty_run_never_reaches_flushed_text() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        let out = feed(
            &mut c,
            t0,
            &[
                (0, KeyInput::Char('o')),
                (100, KeyInput::Char('k')),
                // gap closes "ok", then backspace hits an empty run
                (2000, KeyInput::Backspace),
                (2100, KeyInput::Backspace),
            ],
        );
        assert_eq!(out, vec![Action::type_text("ok")]);
        assert_eq!(c.pending(), "");
        assert_eq!(c.flush(), None);
    }

    #[test]
    fn backspace_can_empty_a_run() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        feed(&mut c, t0, &[(0, KeyInput::Char('x')), (50, KeyInput::Backspace)]);
        assert_eq!(c.flush(), None);
    }

    #[test]
    fn other_keys_are_ignored_but_still_timed() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        let out = feed(
            &mut c,
            t0,
            &[
                (0, KeyInput::Char('a')),
                (500, KeyInput::Other("ShiftLeft".into())),
                // 1000ms after 'a' but only 500ms after the shift press
                (1000, KeyInput::Char('b')),
            ],
        );
        assert!(out.is_empty());
        assert_eq!(c.flush(), Some(Action::type_text("ab")));
    }

    #[test]
    fn idle_check_flushes_only_after_timeout() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::new(ms(300));
        c.push(&KeyInput::Char('z'), t0);
        assert_eq!(c.flush_if_idle(t0 + ms(200)), None);
        assert_eq!(c.flush_if_idle(t0 + ms(301)), Some(Action::type_text("z")));
        assert_eq!(c.flush_if_idle(t0 + ms(900)), None);
    }

    #[test]
    fn first_key_never_flushes() {
        let t0 = Instant::now();
        let mut c = KeyCoalescer::default();
        assert_eq!(c.push(&KeyInput::Tab, t0 + ms(10_000)), None);
        assert_eq!(c.pending(), "\t");
    }
}
