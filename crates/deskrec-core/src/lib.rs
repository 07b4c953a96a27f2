//! deskrec-core - Desktop primitives for anchored record/replay
//!
//! Capability seams the recorder and player are written against, plus
//! the default implementations:
//!
//! - **Screen capture**: `ScreenCapture`, backed by `xcap` on the primary monitor
//! - **Image location**: normalized cross-correlation in [`matching`]
//! - **Input injection**: `InputInjector`, backed by `rdev::simulate`

pub mod error;
pub mod geometry;
pub mod input;
pub mod matching;
pub mod screen;

pub use error::{Error, ErrorCode, Result};
pub use geometry::{MouseButton, Region};
pub use input::{InputInjector, RdevInput};
pub use screen::{ScreenCapture, XcapScreen};

pub mod prelude {
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::geometry::{MouseButton, Region};
    pub use crate::input::{InputInjector, RdevInput};
    pub use crate::screen::{ScreenCapture, XcapScreen};
}
