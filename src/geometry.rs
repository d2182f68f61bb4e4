// src/geometry.rs
// Conversion between window-relative and absolute pixel regions.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Center point, useful for nearest-anchor comparisons.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }
}

/// A region of interest within a table window, in one of two coordinate
/// spaces. The space is chosen explicitly per entry; a layout mixing
/// spaces for the same table size class is rejected at startup rather
/// than silently misread (see `TableLayout::validate`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum RegionOfInterest {
    /// Window-relative coordinates, each component in [0, 1].
    Fractional { x: f64, y: f64, w: f64, h: f64 },
    /// Raw pixel coordinates.
    Absolute { x: u32, y: u32, w: u32, h: u32 },
}

impl RegionOfInterest {
    pub fn is_fractional(&self) -> bool {
        matches!(self, RegionOfInterest::Fractional { .. })
    }

    /// Resolve this region against a window of `width` x `height` pixels.
    ///
    /// Fractional components are scaled by the window dimension and
    /// truncated; absolute regions pass through unchanged. Either way the
    /// result must stay inside the window bounds.
    pub fn resolve(&self, width: u32, height: u32) -> Result<PixelRect, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::BadWindowSize { width, height });
        }

        let rect = match *self {
            RegionOfInterest::Fractional { x, y, w, h } => PixelRect {
                x: (x * width as f64) as u32,
                y: (y * height as f64) as u32,
                w: (w * width as f64) as u32,
                h: (h * height as f64) as u32,
            },
            RegionOfInterest::Absolute { x, y, w, h } => PixelRect { x, y, w, h },
        };

        if rect.x.saturating_add(rect.w) > width || rect.y.saturating_add(rect.h) > height {
            return Err(GeometryError::OutOfBounds {
                rect,
                width,
                height,
            });
        }

        Ok(rect)
    }
}
