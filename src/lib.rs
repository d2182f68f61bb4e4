//! Screen-observing preflop advisor for online poker tables.
//!
//! The pipeline: a foreground-window probe decides when a table is in
//! front, a frame source grabs its pixels, template matching and OCR
//! turn the pixels into a [`analyzer::TableObservation`], and a chart
//! lookup turns the observation into a recommendation string. The
//! [`agent::AgentLoop`] ties the stages together behind a polling loop.

pub mod agent;
pub mod analyzer;
pub mod capture;
pub mod charts;
pub mod config;
pub mod decision;
pub mod error;
pub mod geometry;
pub mod hand;
pub mod ocr;
pub mod templates;
pub mod window;

pub use agent::{AgentLoop, FocusGate, LoopState};
pub use analyzer::{TableAnalyzer, TableObservation};
pub use capture::{CaptureProducer, FallbackChain, Frame, FrameSource, SnapshotSource};
pub use charts::ChartStore;
pub use config::{AgentConfig, TableLayout};
pub use decision::DecisionEngine;
pub use error::{CaptureError, ConfigError, GeometryError};
pub use geometry::{PixelRect, RegionOfInterest};
pub use hand::{canonicalize, Card, CardPair};
pub use templates::{TemplateKey, TemplateLibrary};
pub use window::{ForegroundProbe, ForegroundWindow, SystemProbe, WindowHandle};
