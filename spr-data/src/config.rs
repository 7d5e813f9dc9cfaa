//! Comparison settings and screen kinds.

use serde::{Deserialize, Serialize};
use spr_api::model::RankingSnapshot;

/// Number of most recent years in a trend series.
pub const DEFAULT_TREND_WINDOW: usize = 5;

/// Snapshot requests in flight at once while composing trends.
pub const DEFAULT_FAN_OUT_LIMIT: usize = 4;

/// A per-school metric reported by the results service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    #[default]
    Average,
    SuccessRate,
}

impl Metric {
    pub fn value_of(self, row: &RankingSnapshot) -> f64 {
        match self {
            Metric::Average => row.average,
            Metric::SuccessRate => row.success_rate,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Average => "Moyenne générale",
            Metric::SuccessRate => "Taux de réussite (%)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonConfig {
    pub trend_window: usize,
    pub fan_out_limit: usize,
    pub trend_metric: Metric,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_TREND_WINDOW,
            fan_out_limit: DEFAULT_FAN_OUT_LIMIT,
            trend_metric: Metric::Average,
        }
    }
}

/// Screens that host a comparison. Each allows a different number of
/// schools to be selected side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonScreen {
    /// A director compares their school against up to two others.
    DirectorCompare,
    /// An inspector compares up to three schools.
    #[default]
    InspectorCompare,
    /// The public ranking page.
    Rankings,
}

impl ComparisonScreen {
    pub fn max_selection(self) -> usize {
        match self {
            ComparisonScreen::DirectorCompare => 2,
            ComparisonScreen::InspectorCompare => 3,
            ComparisonScreen::Rankings => 3,
        }
    }
}
