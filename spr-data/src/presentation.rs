//! Table rows and chart series for the dashboards.
//!
//! Everything here takes its inputs by reference and builds new values.
//! Colours come from a fixed palette indexed by selection order, so the
//! same selection always renders with the same colours.

use crate::catalog::ReferenceCatalog;
use crate::config::Metric;
use crate::filter::SortKey;
use crate::snapshot::GenderSnapshots;
use crate::trend::TrendSeries;
use serde::Serialize;
use spr_api::model::{Gender, RankingSnapshot, RegionPath, SchoolId, YearId};
use std::cmp::Ordering;

/// Ranks 1 through this value get the podium tier.
pub const PODIUM_RANK: u32 = 3;

const PALETTE: &[(u8, u8, u8)] = &[
    (59, 130, 246),
    (239, 68, 68),
    (16, 185, 129),
    (245, 158, 11),
    (139, 92, 246),
    (236, 72, 153),
];

/// Colour of the `index`-th series. Wraps around the palette.
pub fn series_color(index: usize) -> String {
    let (r, g, b) = PALETTE[index % PALETTE.len()];
    format!("rgba({}, {}, {}, 1)", r, g, b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTier {
    Podium,
    Standard,
}

impl RankTier {
    pub fn of(rank: u32) -> Self {
        if (1..=PODIUM_RANK).contains(&rank) {
            RankTier::Podium
        } else {
            RankTier::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub rank: u32,
    pub entity_id: SchoolId,
    pub name: String,
    pub region: String,
    pub average: f64,
    pub success_rate: f64,
    pub principal_category: String,
    pub tier: RankTier,
}

/// Table rows in `sort` order. Rank values are the service's.
pub fn ranking_rows(
    rows: &[RankingSnapshot],
    catalog: &ReferenceCatalog,
    sort: SortKey,
) -> Vec<RankingRow> {
    let mut table: Vec<RankingRow> = rows
        .iter()
        .map(|row| {
            let entity = catalog.entity(row.entity_id);
            let region = match entity {
                Some(e) => e.region.to_string(),
                None => RegionPath {
                    province: String::new(),
                    city: row.city.clone(),
                    commune: row.commune.clone(),
                }
                .to_string(),
            };
            let principal_category = if row.principal_category.is_empty() {
                entity
                    .and_then(|e| e.principal_category.clone())
                    .unwrap_or_default()
            } else {
                row.principal_category.clone()
            };
            let name = match (row.name.is_empty(), entity) {
                (true, Some(e)) => e.name.clone(),
                _ => row.name.clone(),
            };
            RankingRow {
                rank: row.rank,
                entity_id: row.entity_id,
                name,
                region,
                average: row.average,
                success_rate: row.success_rate,
                principal_category,
                tier: RankTier::of(row.rank),
            }
        })
        .collect();

    table.sort_by(|a, b| compare_rows(a, b, sort));
    table
}

fn compare_rows(a: &RankingRow, b: &RankingRow, sort: SortKey) -> Ordering {
    let primary = match sort {
        SortKey::Rank => Ordering::Equal,
        SortKey::Average => b.average.total_cmp(&a.average),
        SortKey::SuccessRate => b.success_rate.total_cmp(&a.success_rate),
    };
    primary.then(a.rank.cmp(&b.rank))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    /// `None` serializes as `null`: no value for that label.
    pub data: Vec<Option<f64>>,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// One bar group per school, one dataset per metric.
pub fn snapshot_chart(rows: &[RankingSnapshot], metrics: &[Metric]) -> ChartData {
    let rows: Vec<&RankingSnapshot> = rows.iter().collect();
    metric_chart(&rows, metrics)
}

/// Like [`snapshot_chart`] but limited to the selected schools, in
/// selection order. An empty selection charts every row.
pub fn comparison_chart(
    rows: &[RankingSnapshot],
    selection: &[SchoolId],
    metrics: &[Metric],
) -> ChartData {
    let picked: Vec<&RankingSnapshot> = if selection.is_empty() {
        rows.iter().collect()
    } else {
        selection
            .iter()
            .filter_map(|id| rows.iter().find(|row| row.entity_id == *id))
            .collect()
    };
    metric_chart(&picked, metrics)
}

fn metric_chart(rows: &[&RankingSnapshot], metrics: &[Metric]) -> ChartData {
    ChartData {
        labels: rows.iter().map(|row| row.name.clone()).collect(),
        datasets: metrics
            .iter()
            .enumerate()
            .map(|(i, metric)| Dataset {
                label: metric.label().to_string(),
                data: rows.iter().map(|row| Some(metric.value_of(row))).collect(),
                color: series_color(i),
            })
            .collect(),
    }
}

/// Line chart of trend series.
///
/// Labels are the union of every series' years, oldest first, so a series
/// with fewer points has `null` where it has no value.
pub fn trend_chart(series: &[TrendSeries], catalog: &ReferenceCatalog) -> ChartData {
    let mut years: Vec<(YearId, &str)> = Vec::new();
    for point in series.iter().flat_map(|s| s.points.iter()) {
        if !years.iter().any(|(id, _)| *id == point.year_id) {
            years.push((point.year_id, point.label.as_str()));
        }
    }
    years.sort_by_key(|(id, _)| catalog.year_position(*id).unwrap_or(usize::MAX));

    let datasets = series
        .iter()
        .enumerate()
        .map(|(i, s)| Dataset {
            label: s.name.clone(),
            data: years
                .iter()
                .map(|(id, _)| s.points.iter().find(|p| p.year_id == *id).map(|p| p.value))
                .collect(),
            color: series_color(i),
        })
        .collect();

    ChartData {
        labels: years.iter().map(|(_, label)| label.to_string()).collect(),
        datasets,
    }
}

/// Grouped bars of `metric` by gender for the selected schools.
pub fn gender_chart(
    split: &GenderSnapshots,
    selection: &[SchoolId],
    catalog: &ReferenceCatalog,
    metric: Metric,
) -> ChartData {
    let labels = selection
        .iter()
        .map(|id| {
            catalog
                .entity(*id)
                .map(|e| e.name.clone())
                .or_else(|| {
                    Gender::ALL
                        .iter()
                        .flat_map(|g| split.get(*g))
                        .find(|row| row.entity_id == *id)
                        .map(|row| row.name.clone())
                })
                .unwrap_or_else(|| format!("#{}", id))
        })
        .collect();

    let datasets = Gender::ALL
        .iter()
        .enumerate()
        .map(|(i, gender)| {
            let rows = split.get(*gender);
            Dataset {
                label: gender.label().to_string(),
                data: selection
                    .iter()
                    .map(|id| {
                        rows.iter()
                            .find(|row| row.entity_id == *id)
                            .map(|row| metric.value_of(row))
                    })
                    .collect(),
                color: series_color(i),
            }
        })
        .collect();

    ChartData { labels, datasets }
}

/// A value of the reference school against the mean of its peers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub value: f64,
    pub peers_mean: Option<f64>,
    /// `value - peers_mean`.
    pub delta: Option<f64>,
}

impl Gap {
    fn new(value: f64, peers: &[f64]) -> Self {
        let peers_mean = if peers.is_empty() {
            None
        } else {
            Some(peers.iter().sum::<f64>() / peers.len() as f64)
        };
        Self {
            value,
            peers_mean,
            delta: peers_mean.map(|mean| value - mean),
        }
    }
}

/// Where one school stands among the schools it is compared with.
///
/// For `rank` a negative delta means a better placing than the peers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativePosition {
    pub entity_id: SchoolId,
    pub average: Gap,
    pub success_rate: Gap,
    pub rank: Gap,
}

/// Position of `reference` against the `compared` schools present in
/// `rows`. `None` when the reference school has no row.
pub fn relative_position(
    rows: &[RankingSnapshot],
    reference: SchoolId,
    compared: &[SchoolId],
) -> Option<RelativePosition> {
    let own = rows.iter().find(|row| row.entity_id == reference)?;
    let peers: Vec<&RankingSnapshot> = compared
        .iter()
        .filter(|id| **id != reference)
        .filter_map(|id| rows.iter().find(|row| row.entity_id == *id))
        .collect();

    let of = |f: fn(&RankingSnapshot) -> f64| -> Vec<f64> {
        peers.iter().map(|row| f(*row)).collect()
    };
    Some(RelativePosition {
        entity_id: reference,
        average: Gap::new(own.average, &of(|r| r.average)),
        success_rate: Gap::new(own.success_rate, &of(|r| r.success_rate)),
        rank: Gap::new(own.rank as f64, &of(|r| r.rank as f64)),
    })
}
