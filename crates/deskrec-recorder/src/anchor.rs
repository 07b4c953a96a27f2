//! Screenshot anchors saved around each click

use deskrec_core::{Region, ScreenCapture};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Side length in pixels of a square anchor
pub const ANCHOR_SIZE: u32 = 120;

/// Grabs the square around a click and writes it into the session directory
#[derive(Clone)]
pub struct AnchorCapturer {
    screen: Arc<dyn ScreenCapture>,
    size: u32,
}

impl AnchorCapturer {
    pub fn new(screen: Arc<dyn ScreenCapture>, size: u32) -> Self {
        Self { screen, size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Save the anchor for a click at `(x, y)` as `click_<ms>.png` under `dir`.
    ///
    /// Failures are logged and yield `None`; the click is still recorded.
    pub fn capture(&self, x: i32, y: i32, dir: &Path) -> Option<PathBuf> {
        let region = Region::around(x, y, self.size);
        let path = dir.join(format!("click_{}.png", chrono::Utc::now().timestamp_millis()));

        let image = match self.screen.capture_region(region) {
            Ok(image) => image,
            Err(e) => {
                warn!(x, y, error = %e, "anchor capture failed");
                return None;
            }
        };
        if let Err(e) = image.save(&path) {
            warn!(path = %path.display(), error = %e, "failed to write anchor");
            return None;
        }
        debug!(path = %path.display(), ?region, "anchor saved");
        Some(path)
    }
}

impl std::fmt::Debug for AnchorCapturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorCapturer").field("size", &self.size).finish()
    }
}
