//! Summary block for a snapshot.
//!
//! The service's global statistics are year-wide. When the filter is finer
//! than that the summary is recomputed from the snapshot rows, using plain
//! per-school means rather than population-weighted ones.

use crate::filter::Granularity;
use log::debug;
use serde::Serialize;
use spr_api::model::{AggregateSummary, RankingSnapshot};

/// Where a surfaced summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Remote,
    Recomputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfacedSummary {
    pub summary: AggregateSummary,
    pub source: SummarySource,
}

/// Unweighted summary of `rows`. All zeros for an empty list.
pub fn recompute(rows: &[RankingSnapshot]) -> AggregateSummary {
    if rows.is_empty() {
        return AggregateSummary::default();
    }
    let n = rows.len() as f64;
    AggregateSummary {
        overall_average: rows.iter().map(|r| r.average).sum::<f64>() / n,
        overall_success_rate: rows.iter().map(|r| r.success_rate).sum::<f64>() / n,
        entity_count: rows.len(),
        population_count: rows.iter().map(|r| r.population).sum(),
    }
}

/// Pick the summary to show for a snapshot taken at `granularity`.
///
/// A year-only filter shows the remote summary unchanged. Any finer filter,
/// or a missing remote summary, shows the recomputed one.
pub fn surface(
    granularity: Granularity,
    rows: &[RankingSnapshot],
    remote: Option<AggregateSummary>,
) -> SurfacedSummary {
    match (granularity, remote) {
        (Granularity::YearOnly, Some(summary)) => {
            debug!("Year-only filter; using global statistics");
            SurfacedSummary {
                summary,
                source: SummarySource::Remote,
            }
        }
        (Granularity::YearOnly, None) => {
            debug!("Global statistics unavailable; recomputing from {} rows", rows.len());
            SurfacedSummary {
                summary: recompute(rows),
                source: SummarySource::Recomputed,
            }
        }
        (Granularity::Filtered, _) => SurfacedSummary {
            summary: recompute(rows),
            source: SummarySource::Recomputed,
        },
    }
}
