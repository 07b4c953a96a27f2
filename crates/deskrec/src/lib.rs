//! # deskrec
//!
//! Record clicks and typing on the desktop, replay them later even after
//! windows have moved.
//!
//! Every recorded click keeps a small screenshot of its surroundings. On
//! replay the screenshot is searched on the live screen and the click lands
//! on the match; the recorded coordinates are only a fallback.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deskrec::prelude::*;
//! use std::sync::Arc;
//!
//! let screen = Arc::new(XcapScreen::new());
//! let recorder = Recorder::new(
//!     RecorderConfig::default(),
//!     screen.clone(),
//!     Box::new(RdevCapture::new()),
//! );
//! recorder.start(Some("login".into()))?;
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! let session = recorder.stop()?;
//!
//! let player = Player::new(screen, Arc::new(RdevInput::new()), PlaybackConfig::default());
//! let stats = player.play(&session.events);
//! println!("{} actions replayed", stats.actions);
//! # Ok::<(), anyhow::Error>(())
//! ```

// Re-export core primitives
pub use deskrec_core::*;

pub use deskrec_recorder as recorder;

pub use deskrec_recorder::{
    Action, Outcome, PlaybackConfig, Player, RdevCapture, RecordedSession, Recorder,
    RecorderConfig, RecorderError, ReplayStats, RunPayload, SessionStatus, SessionStorage,
};

/// Prelude - import everything you need
pub mod prelude {
    pub use deskrec_core::prelude::*;
    pub use deskrec_recorder::prelude::*;
}
