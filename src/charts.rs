// src/charts.rs
// Preflop chart storage: an on-disk directory of JSON charts addressed
// through an index file, with loaded charts cached in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, warn};

/// One preflop chart: situation -> scenario -> canonical hand -> action.
///
/// Situations are e.g. "Raise First In (RFI)" or "Facing Raise";
/// scenarios are a position ("UTG") or a position pair ("BB_vs_BTN").
#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    pub charts: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

impl Chart {
    /// Two-level lookup. `None` means "not covered", which the decision
    /// layer treats as a fold.
    pub fn action(&self, situation: &str, scenario: &str, hand: &str) -> Option<&str> {
        self.charts
            .get(situation)?
            .get(scenario)?
            .get(hand)
            .map(String::as_str)
    }
}

/// `index.json` at the chart root: game type -> chart type -> relative
/// chart file path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartIndex {
    #[serde(flatten)]
    entries: HashMap<String, HashMap<String, String>>,
}

impl ChartIndex {
    /// A missing or malformed index degrades to an empty one; every
    /// lookup then reports "no chart available" instead of aborting the
    /// agent.
    fn load(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "chart index unreadable, using empty index");
                return Self::default();
            }
        };
        match serde_json::from_str(&json) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "chart index malformed, using empty index");
                Self::default()
            }
        }
    }

    pub fn relative_path(&self, game_type: &str, chart_type: &str) -> Option<&str> {
        self.entries
            .get(game_type)?
            .get(chart_type)
            .map(String::as_str)
    }
}

/// Chart directory handle. Charts are parsed once and shared via `Arc`;
/// repeated decisions against the same chart never re-read the file.
pub struct ChartStore {
    root: PathBuf,
    index: ChartIndex,
    cache: Mutex<HashMap<PathBuf, Arc<Chart>>>,
}

impl ChartStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index = ChartIndex::load(&root.join("index.json"));
        Self {
            root,
            index,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Absolute path of the chart mapped to this game and chart type,
    /// if the index knows one.
    pub fn chart_path(&self, game_type: &str, chart_type: &str) -> Option<PathBuf> {
        self.index
            .relative_path(game_type, chart_type)
            .map(|rel| self.root.join(rel))
    }

    /// Load (or fetch from cache) the chart at `path`. `None` covers
    /// both unreadable and malformed files.
    pub fn load_chart(&self, path: &Path) -> Option<Arc<Chart>> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(chart) = cache.get(path) {
            return Some(Arc::clone(chart));
        }

        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "chart file unreadable");
                return None;
            }
        };
        let chart: Chart = match serde_json::from_str(&json) {
            Ok(chart) => chart,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "chart file malformed");
                return None;
            }
        };

        debug!(path = %path.display(), situations = chart.charts.len(), "chart loaded");
        let chart = Arc::new(chart);
        cache.insert(path.to_path_buf(), Arc::clone(&chart));
        Some(chart)
    }

    /// Drop any cached copy of `path`, forcing a re-read on next use.
    pub fn invalidate(&self, path: &Path) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CHART: &str = r#"{
        "charts": {
            "Raise First In (RFI)": {
                "UTG": { "AKs": "Raise", "72o": "Fold" }
            },
            "Facing Raise": {
                "BB_vs_BTN": { "AKs": "3-Bet" }
            }
        }
    }"#;

    fn store_with_chart() -> (tempfile::TempDir, ChartStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let index = r#"{ "CashGame": { "100BB 6-Max GTO": "gto_6max.json" } }"#;
        std::fs::write(dir.path().join("index.json"), index).unwrap();
        let chart_path = dir.path().join("gto_6max.json");
        std::fs::write(&chart_path, SAMPLE_CHART).unwrap();
        let store = ChartStore::open(dir.path());
        (dir, store, chart_path)
    }

    #[test]
    fn index_resolves_chart_path() {
        let (_dir, store, chart_path) = store_with_chart();
        assert_eq!(
            store.chart_path("CashGame", "100BB 6-Max GTO"),
            Some(chart_path)
        );
        assert_eq!(store.chart_path("CashGame", "50BB"), None);
        assert_eq!(store.chart_path("Tournament", "100BB 6-Max GTO"), None);
    }

    #[test]
    fn missing_index_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChartStore::open(dir.path());
        assert_eq!(store.chart_path("CashGame", "100BB 6-Max GTO"), None);
    }

    #[test]
    fn malformed_index_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), "{oops").unwrap();
        let store = ChartStore::open(dir.path());
        assert_eq!(store.chart_path("CashGame", "100BB 6-Max GTO"), None);
    }

    #[test]
    fn chart_lookup_walks_both_levels() {
        let (_dir, store, chart_path) = store_with_chart();
        let chart = store.load_chart(&chart_path).unwrap();
        assert_eq!(
            chart.action("Raise First In (RFI)", "UTG", "AKs"),
            Some("Raise")
        );
        assert_eq!(chart.action("Facing Raise", "BB_vs_BTN", "AKs"), Some("3-Bet"));
        assert_eq!(chart.action("Raise First In (RFI)", "UTG", "T2o"), None);
        assert_eq!(chart.action("Raise First In (RFI)", "CO", "AKs"), None);
        assert_eq!(chart.action("Facing 3-Bet", "UTG", "AKs"), None);
    }

    #[test]
    fn loaded_charts_are_cached() {
        let (_dir, store, chart_path) = store_with_chart();
        let first = store.load_chart(&chart_path).unwrap();
        let second = store.load_chart(&chart_path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_forces_reload() {
        let (_dir, store, chart_path) = store_with_chart();
        let first = store.load_chart(&chart_path).unwrap();
        store.invalidate(&chart_path);
        std::fs::write(
            &chart_path,
            r#"{ "charts": { "Raise First In (RFI)": { "UTG": { "AKs": "Call" } } } }"#,
        )
        .unwrap();
        let second = store.load_chart(&chart_path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            second.action("Raise First In (RFI)", "UTG", "AKs"),
            Some("Call")
        );
    }

    #[test]
    fn unreadable_or_malformed_chart_yields_none() {
        let (_dir, store, _chart_path) = store_with_chart();
        assert!(store.load_chart(Path::new("/nonexistent/chart.json")).is_none());

        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not a chart").unwrap();
        assert!(store.load_chart(&bad).is_none());
    }
}
