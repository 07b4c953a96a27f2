//! Screen capture and on-screen image location

use crate::error::{Error, Result};
use crate::geometry::Region;
use crate::matching;
use image::{imageops, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Grab screen regions and locate reference images on the live screen
pub trait ScreenCapture: Send + Sync {
    /// Raster of `region` in screen coordinates. Parts outside the screen
    /// are clipped.
    fn capture_region(&self, region: Region) -> Result<RgbaImage>;

    /// Bounding box of the best match for the image at `template`, or
    /// `None` when nothing reaches `confidence`.
    fn locate(&self, template: &Path, confidence: f32) -> Result<Option<Region>>;
}

/// Primary-monitor capture through `xcap`
///
/// Regions are in logical screen coordinates; the monitor scale factor maps
/// them onto captured pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreen;

struct Frame {
    image: RgbaImage,
    bounds: Region,
    scale: f32,
}

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }

    fn primary_monitor() -> Result<xcap::Monitor> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| Error::capture_failed(format!("failed to get monitors: {e}")))?;
        for monitor in monitors {
            match monitor.is_primary() {
                Ok(true) => return Ok(monitor),
                Ok(false) => continue,
                Err(e) => {
                    return Err(Error::capture_failed(format!(
                        "error checking monitor primary status: {e}"
                    )))
                }
            }
        }
        Err(Error::capture_failed("could not find primary monitor"))
    }

    fn grab(&self) -> Result<Frame> {
        let monitor = Self::primary_monitor()?;
        let attr = |e: xcap::XCapError| Error::capture_failed(format!("monitor attribute: {e}"));
        let bounds = Region::new(
            monitor.x().map_err(attr)?,
            monitor.y().map_err(attr)?,
            monitor.width().map_err(attr)?,
            monitor.height().map_err(attr)?,
        );
        let scale = monitor.scale_factor().map_err(attr)?.max(1.0);
        let image = monitor
            .capture_image()
            .map_err(|e| Error::capture_failed(format!("failed to capture screen: {e}")))?;
        Ok(Frame { image, bounds, scale })
    }
}

impl ScreenCapture for XcapScreen {
    fn capture_region(&self, region: Region) -> Result<RgbaImage> {
        let frame = self.grab()?;
        let visible = region
            .intersect(&frame.bounds)
            .ok_or_else(|| Error::capture_failed(format!("{:?} is off screen", region)))?;

        let px = |v: i32| (v as f32 * frame.scale) as u32;
        let x = px(visible.left - frame.bounds.left);
        let y = px(visible.top - frame.bounds.top);
        let w = (visible.width as f32 * frame.scale) as u32;
        let h = (visible.height as f32 * frame.scale) as u32;
        Ok(imageops::crop_imm(&frame.image, x, y, w, h).to_image())
    }

    fn locate(&self, template: &Path, confidence: f32) -> Result<Option<Region>> {
        let needle = image::open(template)?.to_luma8();
        let frame = self.grab()?;
        let haystack = imageops::grayscale(&frame.image);

        let Some(found) = matching::find(&haystack, &needle, confidence) else {
            debug!(template = %template.display(), confidence, "no match");
            return Ok(None);
        };
        debug!(template = %template.display(), score = found.score, "matched");

        let logical = |v: i32| (v as f32 / frame.scale) as i32;
        Ok(Some(Region::new(
            frame.bounds.left + logical(found.region.left),
            frame.bounds.top + logical(found.region.top),
            (found.region.width as f32 / frame.scale) as u32,
            (found.region.height as f32 / frame.scale) as u32,
        )))
    }
}
