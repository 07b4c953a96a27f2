//! Capability doubles shared by the integration tests. None touch a display.
#![allow(dead_code)]

use deskrec_core::{Error, InputInjector, MouseButton, Region, Result, ScreenCapture};
use deskrec_recorder::{CaptureSink, InputCapture, KeyInput};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Screen that answers `locate` from a script and paints solid regions
#[derive(Default)]
pub struct MockScreen {
    /// Answers for successive `locate` calls; `None` once exhausted
    pub located: Mutex<VecDeque<Option<Region>>>,
    pub locate_calls: Mutex<Vec<(PathBuf, f32, Instant)>>,
    pub captures: Mutex<Vec<Region>>,
    pub fail_capture: bool,
}

impl MockScreen {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn finding(regions: impl IntoIterator<Item = Option<Region>>) -> Arc<Self> {
        Arc::new(Self {
            located: Mutex::new(regions.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail_capture: true,
            ..Self::default()
        })
    }

    pub fn locate_count(&self) -> usize {
        self.locate_calls.lock().len()
    }
}

impl ScreenCapture for MockScreen {
    fn capture_region(&self, region: Region) -> Result<RgbaImage> {
        self.captures.lock().push(region);
        if self.fail_capture {
            return Err(Error::capture_failed("display unavailable"));
        }
        Ok(RgbaImage::from_pixel(region.width, region.height, Rgba([200, 100, 50, 255])))
    }

    fn locate(&self, template: &Path, confidence: f32) -> Result<Option<Region>> {
        self.locate_calls
            .lock()
            .push((template.to_path_buf(), confidence, Instant::now()));
        Ok(self.located.lock().pop_front().flatten())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Injected {
    Click(i32, i32, MouseButton),
    Text(String, Duration),
}

/// Injector that records instead of moving anything
#[derive(Default)]
pub struct MockInput {
    pub injected: Mutex<Vec<Injected>>,
    pub fail: bool,
}

impl MockInput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn clicks(&self) -> Vec<(i32, i32, MouseButton)> {
        self.injected
            .lock()
            .iter()
            .filter_map(|i| match i {
                Injected::Click(x, y, b) => Some((*x, *y, *b)),
                _ => None,
            })
            .collect()
    }
}

impl InputInjector for MockInput {
    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        if self.fail {
            return Err(Error::action_failed("click", "injection refused"));
        }
        self.injected.lock().push(Injected::Click(x, y, button));
        Ok(())
    }

    fn type_text(&self, text: &str, interval: Duration) -> Result<()> {
        if self.fail {
            return Err(Error::action_failed("type", "injection refused"));
        }
        self.injected.lock().push(Injected::Text(text.to_string(), interval));
        Ok(())
    }
}

/// Capture adapter driven by the test through the attached sink
#[derive(Clone, Default)]
pub struct ManualCapture {
    sink: Arc<Mutex<Option<CaptureSink>>>,
    pub attaches: Arc<Mutex<usize>>,
}

impl ManualCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self, key: KeyInput) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.key(key);
        }
    }

    pub fn chars(&self, text: &str) {
        for c in text.chars() {
            self.key(KeyInput::Char(c));
        }
    }

    /// Press and release
    pub fn click(&self, x: i32, y: i32, button: MouseButton) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.click(x, y, button, true);
            sink.click(x, y, button, false);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.sink.lock().is_some()
    }
}

impl InputCapture for ManualCapture {
    fn attach(&mut self, sink: CaptureSink) -> Result<()> {
        *self.sink.lock() = Some(sink);
        *self.attaches.lock() += 1;
        Ok(())
    }

    fn detach(&mut self) {
        self.sink.lock().take();
    }
}
