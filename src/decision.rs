// src/decision.rs
// Maps a table observation onto a preflop chart recommendation.

use tracing::debug;

use crate::analyzer::TableObservation;
use crate::charts::ChartStore;
use crate::hand;

/// Advice strings surfaced when no chart action applies. Chart misses
/// fail closed: anything not explicitly in range is a fold.
pub const NO_CHART: &str = "No chart available";
pub const LOAD_ERROR: &str = "Chart load error";
pub const INVALID_HAND: &str = "Invalid hand";
pub const FOLD_DEFAULT: &str = "Fold (not in range)";

/// Chart situation names, matching the keys inside the chart files.
pub const RFI: &str = "Raise First In (RFI)";
pub const FACING_RAISE: &str = "Facing Raise";

/// Stateless preflop advisor over a chart store.
pub struct DecisionEngine<'a> {
    store: &'a ChartStore,
    game_type: String,
    chart_type: String,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(store: &'a ChartStore, game_type: &str, chart_type: &str) -> Self {
        Self {
            store,
            game_type: game_type.to_string(),
            chart_type: chart_type.to_string(),
        }
    }

    /// Produce advice for one observation. Always returns a displayable
    /// string; distinct fallback labels separate "chart missing" from
    /// "chart broken" from "hand unreadable" from an in-chart fold.
    pub fn decide(&self, obs: &TableObservation) -> String {
        let Some(path) = self.store.chart_path(&self.game_type, &self.chart_type) else {
            return NO_CHART.to_string();
        };
        let Some(chart) = self.store.load_chart(&path) else {
            return LOAD_ERROR.to_string();
        };

        let Some(hand_key) = obs
            .hand
            .as_ref()
            .and_then(|pair| hand::canonicalize(&pair.notation()))
        else {
            return INVALID_HAND.to_string();
        };

        // Without a known hero position no chart row applies.
        let Some(position) = obs.position.as_deref() else {
            return FOLD_DEFAULT.to_string();
        };

        let (situation, scenario) = match obs.actions_before.last() {
            None => (RFI, position.to_string()),
            Some(raise) => (FACING_RAISE, format!("{}_vs_{}", position, raise.position)),
        };
        debug!(%situation, %scenario, %hand_key, "chart lookup");

        chart
            .action(situation, &scenario, &hand_key)
            .map(str::to_string)
            .unwrap_or_else(|| FOLD_DEFAULT.to_string())
    }
}
