// src/capture.rs
// Frame acquisition: a background producer sampling the screen at a
// fixed rate, a synchronous fallback grab, and a combinator chaining
// the two.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use image::{GrayImage, RgbImage, RgbaImage};
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::geometry::PixelRect;

/// A single captured raster, 3 bytes per pixel in BGR order, plus the
/// absolute screen region it was captured from. Created once per
/// analysis cycle and discarded afterwards.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// BGR bytes, row-major, `width * height * 3` long.
    pub data: Vec<u8>,
    pub region: PixelRect,
}

impl Frame {
    pub fn from_rgba(img: &RgbaImage, region: PixelRect) -> Self {
        let (width, height) = img.dimensions();
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for px in img.pixels() {
            data.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Self {
            width,
            height,
            data,
            region,
        }
    }

    fn bgr_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y * self.width + x) * 3) as usize;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }

    /// Grayscale view of the whole frame.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let (b, g, r) = self.bgr_at(x, y);
            let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
            image::Luma([luma as u8])
        })
    }

    /// Grayscale crop of a rectangle given in frame-relative pixels.
    pub fn view_gray(&self, rect: &PixelRect) -> Option<GrayImage> {
        if rect.x.saturating_add(rect.w) > self.width
            || rect.y.saturating_add(rect.h) > self.height
            || rect.w == 0
            || rect.h == 0
        {
            return None;
        }
        Some(GrayImage::from_fn(rect.w, rect.h, |x, y| {
            let (b, g, r) = self.bgr_at(rect.x + x, rect.y + y);
            let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
            image::Luma([luma as u8])
        }))
    }

    /// Crop a sub-frame given in absolute screen coordinates.
    pub fn crop_absolute(&self, rect: &PixelRect) -> Option<Frame> {
        let rx = rect.x.checked_sub(self.region.x)?;
        let ry = rect.y.checked_sub(self.region.y)?;
        if rx.saturating_add(rect.w) > self.width || ry.saturating_add(rect.h) > self.height {
            return None;
        }
        let mut data = Vec::with_capacity((rect.w * rect.h * 3) as usize);
        for y in ry..ry + rect.h {
            let start = ((y * self.width + rx) * 3) as usize;
            let end = start + (rect.w * 3) as usize;
            data.extend_from_slice(&self.data[start..end]);
        }
        Some(Frame {
            width: rect.w,
            height: rect.h,
            data,
            region: *rect,
        })
    }

    /// Persist the frame as a PNG for offline inspection. Side channel
    /// only; never part of the decision path.
    pub fn save_png(&self, path: &std::path::Path) -> Result<(), image::ImageError> {
        let rgb = RgbImage::from_fn(self.width, self.height, |x, y| {
            let (b, g, r) = self.bgr_at(x, y);
            image::Rgb([r, g, b])
        });
        rgb.save(path)
    }
}

/// A source of single frames for a requested screen region.
pub trait FrameSource {
    fn capture(&self, region: &PixelRect) -> Result<Frame, CaptureError>;
}

/// Background producer: samples the primary monitor at a fixed target
/// rate on its own thread, keeping only the latest frame. Runs
/// independently of the agent loop's polling cadence.
pub struct CaptureProducer {
    slot: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureProducer {
    pub fn start(target_fps: u32) -> Self {
        let slot: Arc<Mutex<Option<Frame>>> = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let interval = Duration::from_millis(1000 / target_fps.max(1) as u64);

        let thread_slot = slot.clone();
        let thread_stop = stop.clone();
        let thread = std::thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match grab_primary_monitor() {
                    Ok(frame) => {
                        if let Ok(mut latest) = thread_slot.lock() {
                            *latest = Some(frame);
                        }
                    }
                    Err(e) => debug!(error = %e, "producer capture failed, will retry"),
                }
                std::thread::sleep(interval);
            }
        });

        Self {
            slot,
            stop,
            thread: Some(thread),
        }
    }

    /// Non-blocking handle for pulling the latest frame.
    pub fn source(&self) -> LatestFrameSource {
        LatestFrameSource {
            slot: self.slot.clone(),
        }
    }

    /// Stop the producer thread and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureProducer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn grab_primary_monitor() -> Result<Frame, CaptureError> {
    let monitors = xcap::Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| CaptureError::Backend("no monitors found".into()))?;

    let img = monitor
        .capture_image()
        .map_err(|e| CaptureError::Backend(e.to_string()))?;
    let region = PixelRect::new(
        monitor.x().max(0) as u32,
        monitor.y().max(0) as u32,
        img.width(),
        img.height(),
    );
    Ok(Frame::from_rgba(&img, region))
}

/// Pulls the latest producer frame, cropped to the requested region.
/// Never waits for a new frame: either one is ready or this fails and
/// the caller falls back.
pub struct LatestFrameSource {
    slot: Arc<Mutex<Option<Frame>>>,
}

impl FrameSource for LatestFrameSource {
    fn capture(&self, region: &PixelRect) -> Result<Frame, CaptureError> {
        let latest = self
            .slot
            .lock()
            .map_err(|_| CaptureError::Unavailable)?
            .clone();
        let frame = latest.ok_or(CaptureError::Unavailable)?;
        frame
            .crop_absolute(region)
            .ok_or(CaptureError::OutOfBounds {
                rect: *region,
                width: frame.width,
                height: frame.height,
            })
    }
}

/// Synchronous fallback: one full-screen grab via the generic
/// screenshot API, cropped to the requested region.
#[derive(Default)]
pub struct SnapshotSource;

impl SnapshotSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for SnapshotSource {
    fn capture(&self, region: &PixelRect) -> Result<Frame, CaptureError> {
        let screens =
            screenshots::Screen::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
        let screen = screens
            .iter()
            .find(|s| {
                let di = s.display_info;
                let (x, y) = (region.x as i32, region.y as i32);
                x >= di.x
                    && x < di.x + di.width as i32
                    && y >= di.y
                    && y < di.y + di.height as i32
            })
            .or_else(|| screens.first())
            .ok_or_else(|| CaptureError::Backend("no screens found".into()))?;

        let shot = screen
            .capture()
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        let buffer = RgbaImage::from_raw(shot.width(), shot.height(), shot.rgba().to_vec())
            .ok_or_else(|| CaptureError::Backend("screenshot buffer size mismatch".into()))?;

        let screen_region = PixelRect::new(
            screen.display_info.x.max(0) as u32,
            screen.display_info.y.max(0) as u32,
            buffer.width(),
            buffer.height(),
        );
        let full = Frame::from_rgba(&buffer, screen_region);
        full.crop_absolute(region).ok_or(CaptureError::OutOfBounds {
            rect: *region,
            width: full.width,
            height: full.height,
        })
    }
}

/// Primary source with graceful degradation to a fallback. Both failing
/// yields `CaptureError::Unavailable`.
pub struct FallbackChain<P, S> {
    primary: P,
    fallback: S,
}

impl<P: FrameSource, S: FrameSource> FallbackChain<P, S> {
    pub fn new(primary: P, fallback: S) -> Self {
        Self { primary, fallback }
    }
}

impl<P: FrameSource, S: FrameSource> FrameSource for FallbackChain<P, S> {
    fn capture(&self, region: &PixelRect) -> Result<Frame, CaptureError> {
        match self.primary.capture(region) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                debug!(error = %e, "primary capture unavailable, falling back");
                self.fallback.capture(region).map_err(|e| {
                    warn!(error = %e, "fallback capture failed");
                    CaptureError::Unavailable
                })
            }
        }
    }
}
