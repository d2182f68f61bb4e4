// src/config.rs
// Agent configuration and table layout, both plain JSON files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::RegionOfInterest;

/// Seat-position labels clockwise from the dealer button, per table
/// size class.
const RING_6MAX: [&str; 6] = ["BTN", "SB", "BB", "UTG", "HJ", "CO"];
const RING_9MAX: [&str; 9] = [
    "BTN", "SB", "BB", "UTG", "UTG+1", "UTG+2", "MP", "HJ", "CO",
];

fn default_window_titles() -> Vec<String> {
    vec![
        "Rush & Cash".to_string(),
        "Spin & Go".to_string(),
        "Tournament".to_string(),
    ]
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_throttle_ms() -> (u64, u64) {
    (800, 2500)
}

fn default_game_type() -> String {
    "CashGame".to_string()
}

fn default_chart_type() -> String {
    "100BB 6-Max GTO".to_string()
}

fn default_match_threshold() -> f32 {
    0.8
}

fn default_capture_fps() -> u32 {
    10
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_chart_dir() -> PathBuf {
    PathBuf::from("poker_charts")
}

fn default_layout_path() -> PathBuf {
    PathBuf::from("layout.json")
}

/// Process-wide agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Case-sensitive substrings; the foreground window is in scope iff
    /// its title contains any of them.
    #[serde(default = "default_window_titles")]
    pub window_titles: Vec<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Uniform range for the randomized post-decision delay.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: (u64, u64),

    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,

    #[serde(default = "default_layout_path")]
    pub layout_path: PathBuf,

    #[serde(default = "default_game_type")]
    pub game_type: String,

    #[serde(default = "default_chart_type")]
    pub chart_type: String,

    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,

    #[serde(default = "default_capture_fps")]
    pub capture_fps: u32,

    /// When set, every captured frame is also written there as a PNG
    /// for offline inspection.
    #[serde(default)]
    pub frame_dump_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            window_titles: default_window_titles(),
            poll_interval_ms: default_poll_interval_ms(),
            throttle_ms: default_throttle_ms(),
            template_dir: default_template_dir(),
            chart_dir: default_chart_dir(),
            layout_path: default_layout_path(),
            game_type: default_game_type(),
            chart_type: default_chart_type(),
            match_threshold: default_match_threshold(),
            capture_fps: default_capture_fps(),
            frame_dump_dir: None,
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One seat's geometry. Seat 0 of a layout is the hero's chair; seats
/// are listed clockwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatLayout {
    pub name: String,
    /// Anchor point used by the nearest-seat dealer-button heuristic.
    pub anchor: RegionOfInterest,
    /// Where this seat's bet amount is rendered.
    pub bet_region: RegionOfInterest,
}

/// Static geometry of one table skin, defined at startup and immutable
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableLayout {
    /// Table size class, e.g. "6max" or "9max".
    pub table_size: String,
    /// Hero's hole-card region; split in half for the two cards.
    pub hero_cards: RegionOfInterest,
    pub seats: Vec<SeatLayout>,
}

impl TableLayout {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout: TableLayout =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        layout.validate()?;
        Ok(layout)
    }

    /// Reject layouts that mix fractional and absolute regions within
    /// one table size class. A pixel tuple silently read as fractions
    /// puts every region in the wrong place; better to refuse at
    /// startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seats.is_empty() {
            return Err(ConfigError::EmptyLayout(self.table_size.clone()));
        }
        let mut rois = vec![self.hero_cards];
        for seat in &self.seats {
            rois.push(seat.anchor);
            rois.push(seat.bet_region);
        }
        let fractional = rois.iter().filter(|r| r.is_fractional()).count();
        if fractional != 0 && fractional != rois.len() {
            return Err(ConfigError::MixedCoordinateSpaces(self.table_size.clone()));
        }
        Ok(())
    }

    /// Position labels clockwise from the button for this table size
    /// class, or `None` for an unknown class.
    pub fn position_ring(&self) -> Option<&'static [&'static str]> {
        match self.table_size.as_str() {
            "6max" => Some(&RING_6MAX),
            "9max" => Some(&RING_9MAX),
            _ => None,
        }
    }
}
