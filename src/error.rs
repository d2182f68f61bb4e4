// src/error.rs
// Error taxonomy for the perception/decision pipeline.
//
// Recognition misses (template not found, OCR came back empty) and chart
// lookup misses are NOT errors and never appear here; they degrade to
// Option::None / default labels downstream.

use std::path::PathBuf;

use crate::geometry::PixelRect;

/// Bad or missing configuration. Components fall back to an empty/safe
/// state and the process keeps running.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("layout for table size '{0}' mixes fractional and absolute regions")]
    MixedCoordinateSpaces(String),

    #[error("layout for table size '{0}' defines no seats")]
    EmptyLayout(String),
}

/// Region geometry failure: either the window dimensions are unusable or
/// the resolved rectangle leaves the frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("window dimensions must be positive, got {width}x{height}")]
    BadWindowSize { width: u32, height: u32 },

    #[error("region {rect:?} exceeds frame bounds {width}x{height}")]
    OutOfBounds {
        rect: PixelRect,
        width: u32,
        height: u32,
    },
}

/// Both the primary producer and the synchronous fallback failed to
/// deliver a frame. The current cycle is abandoned, the loop goes back
/// to idle.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no frame available from any capture source")]
    Unavailable,

    #[error("screen capture backend failed: {0}")]
    Backend(String),

    #[error("capture region {rect:?} exceeds screen bounds {width}x{height}")]
    OutOfBounds {
        rect: PixelRect,
        width: u32,
        height: u32,
    },
}
