//! deskrec-recorder - Desktop recording with screenshot anchors
//!
//! Records clicks and typed text into an ordered action log. Every click
//! carries a small screenshot of its surroundings so playback can find the
//! target again after the layout moves.
//!
//! - [`Recorder`]: live session state machine fed by an [`InputCapture`]
//! - [`Player`]: runs one action, or a whole log, against the desktop
//! - [`SessionStorage`]: JSON lines next to the anchor images

pub mod anchor;
pub mod capture;
pub mod coalescer;
pub mod error;
pub mod events;
pub mod recorder;
pub mod replay;
pub mod storage;

pub use anchor::AnchorCapturer;
pub use capture::{CaptureSink, InputCapture, RdevCapture};
pub use coalescer::KeyCoalescer;
pub use error::RecorderError;
pub use events::*;
pub use recorder::{Recorder, RecorderConfig};
pub use replay::{Outcome, PlaybackConfig, Player, ReplayStats, RunPayload};
pub use storage::{SessionInfo, SessionStorage};

pub mod prelude {
    pub use crate::capture::{CaptureSink, InputCapture, RdevCapture};
    pub use crate::error::RecorderError;
    pub use crate::events::*;
    pub use crate::recorder::{Recorder, RecorderConfig};
    pub use crate::replay::{Outcome, PlaybackConfig, Player, ReplayStats, RunPayload};
    pub use crate::storage::{SessionInfo, SessionStorage};
}
