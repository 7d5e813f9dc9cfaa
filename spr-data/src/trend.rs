//! Multi-year series for the selected schools.
//!
//! The window walks back from the selected year one calendar year at a
//! time. A year missing from the catalog produces no point. Within a year
//! that exists, a school missing from the snapshot scores 0 and a failed
//! snapshot query drops that year's point for every school.

use crate::catalog::ReferenceCatalog;
use crate::config::{ComparisonConfig, Metric};
use crate::filter::SnapshotFilter;
use crate::snapshot::SnapshotFetcher;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use serde::Serialize;
use spr_api::model::{RankingSnapshot, SchoolId, SchoolYear, YearId};
use spr_api::ResultsService;
use spr_utils::years::start_year;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year_id: YearId,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub entity_id: SchoolId,
    pub name: String,
    /// Oldest first. Lengths may differ between schools.
    pub points: Vec<TrendPoint>,
}

/// Catalog years of the trend window ending at `selected`, oldest first.
pub fn trend_window<'c>(
    catalog: &'c ReferenceCatalog,
    selected: YearId,
    window: usize,
) -> Vec<&'c SchoolYear> {
    let Some(year) = catalog.year(selected) else {
        return Vec::new();
    };

    let mut years: Vec<&SchoolYear> = match start_year(&year.label) {
        Some(start) => (0..window)
            .filter_map(|offset| {
                let target = start - offset as i32;
                let found = catalog.year_starting(target);
                if found.is_none() {
                    debug!("No school year starting in {} in the catalog", target);
                }
                found
            })
            .collect(),
        None if !catalog.has_dated_years() => {
            let Some(position) = catalog.year_position(selected) else {
                return Vec::new();
            };
            (0..window)
                .filter_map(|offset| position.checked_sub(offset))
                .filter_map(|index| catalog.years().get(index))
                .collect()
        }
        None => vec![year],
    };
    years.reverse();
    years
}

/// Build one series per entity from per-year snapshot results.
///
/// `results` holds the snapshot (or its failure) of every window year.
pub fn compose_series(
    catalog: &ReferenceCatalog,
    window: &[&SchoolYear],
    results: &HashMap<YearId, spr_api::Result<Vec<RankingSnapshot>>>,
    entities: &[SchoolId],
    metric: Metric,
) -> Vec<TrendSeries> {
    entities
        .iter()
        .map(|&entity_id| {
            let mut name = catalog.entity(entity_id).map(|e| e.name.clone());
            let mut points = Vec::with_capacity(window.len());

            for year in window {
                let rows = match results.get(&year.id) {
                    Some(Ok(rows)) => rows,
                    Some(Err(e)) => {
                        warn!(
                            "Trend point for school {} in {} omitted: {}",
                            entity_id, year.label, e
                        );
                        continue;
                    }
                    None => continue,
                };
                let value = match rows.iter().find(|row| row.entity_id == entity_id) {
                    Some(row) => {
                        if name.is_none() {
                            name = Some(row.name.clone());
                        }
                        metric.value_of(row)
                    }
                    None => 0.0,
                };
                points.push(TrendPoint {
                    year_id: year.id,
                    label: year.label.clone(),
                    value,
                });
            }

            TrendSeries {
                entity_id,
                name: name.unwrap_or_else(|| format!("#{}", entity_id)),
                points,
            }
        })
        .collect()
}

pub struct TrendComposer<'a, S> {
    service: &'a S,
    catalog: &'a ReferenceCatalog,
    config: &'a ComparisonConfig,
}

impl<'a, S: ResultsService> TrendComposer<'a, S> {
    pub fn new(
        service: &'a S,
        catalog: &'a ReferenceCatalog,
        config: &'a ComparisonConfig,
    ) -> Self {
        Self {
            service,
            catalog,
            config,
        }
    }

    /// Series of `config.trend_metric` for each of `entities` over the
    /// window ending at `selected`. Every year is queried with the whole
    /// `filter`: region, class, option and gender.
    ///
    /// Each window year is fetched once, with at most
    /// `config.fan_out_limit` queries in flight.
    pub async fn compose(
        &self,
        selected: YearId,
        filter: &SnapshotFilter,
        entities: &[SchoolId],
    ) -> Vec<TrendSeries> {
        if entities.is_empty() {
            return Vec::new();
        }
        let window = trend_window(self.catalog, selected, self.config.trend_window);
        let fetcher = SnapshotFetcher::new(self.service, self.catalog);
        let fetcher = &fetcher;

        let results: HashMap<YearId, spr_api::Result<Vec<RankingSnapshot>>> =
            stream::iter(window.iter().map(|year| year.id))
                .map(|year| async move { (year, fetcher.try_fetch(year, filter).await) })
                .buffer_unordered(self.config.fan_out_limit.max(1))
                .collect()
                .await;

        debug!(
            "Composing trends for {} schools over {} years",
            entities.len(),
            window.len()
        );
        compose_series(
            self.catalog,
            &window,
            &results,
            entities,
            self.config.trend_metric,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{sample_catalog, year};
    use crate::snapshot::tests::ranking_row;
    use spr_api::memory::MemoryService;
    use spr_api::model::{AggregateSummary, ClassLevel, FilterSuggestion, SchoolRecord, StudyOption};
    use spr_api::SnapshotQuery;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn labels(series: &TrendSeries) -> Vec<&str> {
        series.points.iter().map(|p| p.label.as_str()).collect()
    }

    fn points(series: &TrendSeries) -> Vec<(YearId, f64)> {
        series.points.iter().map(|p| (p.year_id, p.value)).collect()
    }

    #[test]
    fn window_skips_years_missing_from_catalog() {
        // 2021-2022, 2023-2024, 2024-2025: 2022 and 2020 are absent.
        let catalog = sample_catalog();
        let window = trend_window(&catalog, 4, 5);
        let ids: Vec<YearId> = window.iter().map(|y| y.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);

        let short = trend_window(&catalog, 4, 2);
        assert_eq!(short.len(), 2);
        assert!(trend_window(&catalog, 99, 5).is_empty());
    }

    #[test]
    fn window_falls_back_to_catalog_position() {
        let catalog = ReferenceCatalog::from_parts(
            vec![year(1, "Première"), year(2, "Deuxième"), year(3, "Troisième")],
            vec![],
            vec![],
            vec![],
        );
        let ids: Vec<YearId> = trend_window(&catalog, 3, 2).iter().map(|y| y.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn sparse_catalog_gives_one_point_per_real_year() {
        let catalog = sample_catalog();
        let service = MemoryService::new()
            .with_rankings(
                SnapshotQuery::for_year(1),
                vec![ranking_row(1, "Kolwezi", 61.0, 70.0, 1, 100)],
            )
            .with_rankings(
                SnapshotQuery::for_year(3),
                vec![ranking_row(1, "Kolwezi", 64.0, 75.0, 1, 100)],
            )
            .with_rankings(
                SnapshotQuery::for_year(4),
                vec![ranking_row(1, "Kolwezi", 68.0, 80.0, 1, 100)],
            );
        let config = ComparisonConfig::default();
        let composer = TrendComposer::new(&service, &catalog, &config);
        let series = composer.compose(4, &SnapshotFilter::default(), &[1]).await;

        assert_eq!(series.len(), 1);
        assert_eq!(labels(&series[0]), vec!["2021-2022", "2023-2024", "2024-2025"]);
        let values: Vec<f64> = series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![61.0, 64.0, 68.0]);
        assert_eq!(series[0].name, "Institut Kolwezi");
    }

    #[tokio::test]
    async fn missing_entity_scores_zero_and_failed_year_is_omitted() {
        let catalog = sample_catalog();
        let service = MemoryService::new()
            .with_rankings(
                SnapshotQuery::for_year(3),
                vec![ranking_row(2, "Kolwezi", 55.0, 60.0, 1, 80)],
            )
            .with_rankings(
                SnapshotQuery::for_year(4),
                vec![
                    ranking_row(1, "Kolwezi", 70.0, 85.0, 1, 100),
                    ranking_row(2, "Kolwezi", 57.0, 66.0, 2, 80),
                ],
            )
            .fail_year(1);
        let config = ComparisonConfig {
            trend_metric: Metric::SuccessRate,
            ..Default::default()
        };
        let composer = TrendComposer::new(&service, &catalog, &config);
        let series = composer.compose(4, &SnapshotFilter::default(), &[1, 2]).await;

        assert_eq!(points(&series[0]), vec![(3, 0.0), (4, 85.0)]);
        assert_eq!(points(&series[1]), vec![(3, 60.0), (4, 66.0)]);
    }

    /// Counts concurrent ranking queries; each takes a simulated second.
    #[derive(Clone)]
    struct SlowService {
        inner: MemoryService,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl ResultsService for SlowService {
        async fn school_rankings(
            &self,
            query: SnapshotQuery,
        ) -> spr_api::Result<Vec<RankingSnapshot>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.school_rankings(query).await
        }

        async fn global_stats(&self, year: YearId) -> spr_api::Result<AggregateSummary> {
            self.inner.global_stats(year).await
        }

        async fn years(&self) -> spr_api::Result<Vec<SchoolYear>> {
            self.inner.years().await
        }

        async fn classes(&self) -> spr_api::Result<Vec<ClassLevel>> {
            self.inner.classes().await
        }

        async fn options(&self) -> spr_api::Result<Vec<StudyOption>> {
            self.inner.options().await
        }

        async fn schools(&self) -> spr_api::Result<Vec<SchoolRecord>> {
            self.inner.schools().await
        }

        async fn suggest_filters(&self, prompt: String) -> spr_api::Result<FilterSuggestion> {
            self.inner.suggest_filters(prompt).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_is_bounded_and_fetches_each_year_once() {
        let years: Vec<SchoolYear> = (0..8)
            .map(|i| year(i + 1, &format!("{}-{}", 2017 + i, 2018 + i)))
            .collect();
        let catalog = ReferenceCatalog::from_parts(years, vec![], vec![], vec![]);
        let service = SlowService {
            inner: MemoryService::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let config = ComparisonConfig {
            trend_window: 8,
            fan_out_limit: 3,
            ..Default::default()
        };
        let composer = TrendComposer::new(&service, &catalog, &config);
        let series = composer.compose(8, &SnapshotFilter::default(), &[1, 2, 3]).await;

        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|s| s.points.len() == 8));
        assert_eq!(service.calls.load(Ordering::SeqCst), 8);
        assert!(service.peak.load(Ordering::SeqCst) <= 3);
        assert!(service.peak.load(Ordering::SeqCst) > 1);
    }
}
