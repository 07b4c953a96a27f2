//! Screen geometry shared by capture, matching and playback

use serde::{Deserialize, Serialize};

/// Axis-aligned screen rectangle, serialized as `{left, top, width, height}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// Square of side `size` centered on a point, clamped so the top-left
    /// corner never goes negative.
    pub fn around(x: i32, y: i32, size: u32) -> Self {
        let half = (size / 2) as i32;
        Self {
            left: (x - half).max(0),
            top: (y - half).max(0),
            width: size,
            height: size,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + (self.width / 2) as i32,
            self.top + (self.height / 2) as i32,
        )
    }

    pub fn right(&self) -> i32 {
        self.left + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height as i32
    }

    /// Intersection with another region, `None` when they do not overlap.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Region::new(left, top, (right - left) as u32, (bottom - top) as u32))
    }
}

/// Mouse button as recorded and replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    #[serde(alias = "Button.left")]
    Left,
    #[serde(alias = "Button.right")]
    Right,
    #[serde(alias = "Button.middle")]
    Middle,
}
