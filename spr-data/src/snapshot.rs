//! Single-year ranking snapshots and request generations.
//!
//! The results service only filters by city. Province and commune are
//! narrowed here from the catalog's region data; ranks are always the
//! service's and are never recomputed.

use crate::catalog::ReferenceCatalog;
use crate::filter::SnapshotFilter;
use log::{debug, warn};
use spr_api::model::{Gender, RankingSnapshot, YearId};
use spr_api::ResultsService;
use spr_utils::text::eq_ignore_case;

pub struct SnapshotFetcher<'a, S> {
    service: &'a S,
    catalog: &'a ReferenceCatalog,
}

/// Snapshots of one filter split by gender.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenderSnapshots {
    pub male: Vec<RankingSnapshot>,
    pub female: Vec<RankingSnapshot>,
}

impl GenderSnapshots {
    pub fn get(&self, gender: Gender) -> &[RankingSnapshot] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }
}

impl<'a, S: ResultsService> SnapshotFetcher<'a, S> {
    pub fn new(service: &'a S, catalog: &'a ReferenceCatalog) -> Self {
        Self { service, catalog }
    }

    /// Ranked rows for `year` under `filter`, or the service error.
    pub async fn try_fetch(
        &self,
        year: YearId,
        filter: &SnapshotFilter,
    ) -> spr_api::Result<Vec<RankingSnapshot>> {
        let rows = self.service.school_rankings(filter.query(year)).await?;
        Ok(self.narrow(rows, filter))
    }

    /// Ranked rows for `year` under `filter`. A failed query yields no rows.
    pub async fn fetch(&self, year: YearId, filter: &SnapshotFilter) -> Vec<RankingSnapshot> {
        match self.try_fetch(year, filter).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "Snapshot fetch failed for year {} ({:?}): {}",
                    year,
                    filter.query(year),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Boys' and girls' snapshots for the same filter, fetched together.
    pub async fn fetch_by_gender(&self, year: YearId, filter: &SnapshotFilter) -> GenderSnapshots {
        let male = SnapshotFilter {
            gender: Some(Gender::Male),
            ..filter.clone()
        };
        let female = SnapshotFilter {
            gender: Some(Gender::Female),
            ..filter.clone()
        };
        let (male, female) = futures::join!(self.fetch(year, &male), self.fetch(year, &female));
        GenderSnapshots { male, female }
    }

    fn narrow(&self, rows: Vec<RankingSnapshot>, filter: &SnapshotFilter) -> Vec<RankingSnapshot> {
        let region = &filter.region;
        if region.province.is_none() && region.commune.is_none() {
            return rows;
        }
        let before = rows.len();
        let rows: Vec<RankingSnapshot> = rows
            .into_iter()
            .filter(|row| {
                let province_ok = region
                    .province
                    .as_deref()
                    .map(|p| self.province_of(row).is_some_and(|rp| eq_ignore_case(rp, p)))
                    .unwrap_or(true);
                let commune_ok = region
                    .commune
                    .as_deref()
                    .map(|c| self.commune_of(row).is_some_and(|rc| eq_ignore_case(rc, c)))
                    .unwrap_or(true);
                province_ok && commune_ok
            })
            .collect();
        debug!("Narrowed snapshot from {} to {} rows", before, rows.len());
        rows
    }

    fn province_of<'r>(&'r self, row: &'r RankingSnapshot) -> Option<&'r str> {
        if let Some(entity) = self.catalog.entity(row.entity_id) {
            if !entity.region.province.is_empty() {
                return Some(entity.region.province.as_str());
            }
        }
        self.catalog
            .regions()
            .all_cities()
            .find(|(_, city)| eq_ignore_case(city, &row.city))
            .map(|(province, _)| province)
    }

    fn commune_of<'r>(&'r self, row: &'r RankingSnapshot) -> Option<&'r str> {
        if !row.commune.is_empty() {
            return Some(row.commune.as_str());
        }
        self.catalog
            .entity(row.entity_id)
            .map(|e| e.region.commune.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// Monotonic token identifying one filter change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A response labelled with whether it still answers the latest request.
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged<T> {
    Current(T),
    Stale {
        issued: Generation,
        current: Generation,
    },
}

impl<T> Tagged<T> {
    pub fn current(self) -> Option<T> {
        match self {
            Tagged::Current(value) => Some(value),
            Tagged::Stale { .. } => None,
        }
    }
}

/// Issues generations and tags responses against the latest one.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration {
    current: Generation,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; every response to an earlier one becomes stale.
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    pub fn tag<T>(&self, issued: Generation, value: T) -> Tagged<T> {
        if issued == self.current {
            Tagged::Current(value)
        } else {
            Tagged::Stale {
                issued,
                current: self.current,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::filter::RegionSelection;
    use spr_api::memory::MemoryService;
    use spr_api::SnapshotQuery;

    pub(crate) fn ranking_row(
        id: u32,
        city: &str,
        average: f64,
        success_rate: f64,
        rank: u32,
        population: u64,
    ) -> RankingSnapshot {
        RankingSnapshot {
            entity_id: id,
            name: format!("School {}", id),
            city: city.to_string(),
            commune: String::new(),
            average,
            success_rate,
            principal_category: String::new(),
            rank,
            population,
        }
    }

    fn year_rows() -> Vec<RankingSnapshot> {
        vec![
            ranking_row(3, "Lubumbashi", 75.0, 92.0, 1, 300),
            ranking_row(1, "Kolwezi", 70.0, 88.0, 2, 200),
            ranking_row(2, "Kolwezi", 62.0, 71.0, 3, 150),
        ]
    }

    #[tokio::test]
    async fn fetch_keeps_service_ranks() {
        let catalog = sample_catalog();
        let service = MemoryService::new().with_rankings(SnapshotQuery::for_year(4), year_rows());
        let fetcher = SnapshotFetcher::new(&service, &catalog);
        let rows = fetcher.fetch(4, &SnapshotFilter::default()).await;
        let ranks: Vec<u32> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failure_yields_empty() {
        let catalog = sample_catalog();
        let service = MemoryService::new()
            .with_rankings(SnapshotQuery::for_year(4), year_rows())
            .fail_year(4);
        let fetcher = SnapshotFetcher::new(&service, &catalog);
        assert!(fetcher.try_fetch(4, &SnapshotFilter::default()).await.is_err());
        assert!(fetcher.fetch(4, &SnapshotFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn province_and_commune_narrowed_locally() {
        let catalog = sample_catalog();
        let service = MemoryService::new().with_rankings(SnapshotQuery::for_year(4), year_rows());
        let fetcher = SnapshotFetcher::new(&service, &catalog);

        let province = SnapshotFilter {
            region: RegionSelection {
                province: Some("Lualaba".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let rows = fetcher.fetch(4, &province).await;
        let ids: Vec<u32> = rows.iter().map(|r| r.entity_id).collect();
        assert_eq!(ids, vec![1, 2]);
        // Ranks stay the province-wide service ranks.
        assert_eq!(rows[0].rank, 2);

        let commune = SnapshotFilter {
            region: RegionSelection {
                province: Some("Lualaba".into()),
                city: Some("Kolwezi".into()),
                commune: Some("Manika".into()),
            },
            ..Default::default()
        };
        let rows = fetcher.fetch(4, &commune).await;
        let ids: Vec<u32> = rows.iter().map(|r| r.entity_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn gender_snapshots_fetched_per_gender() {
        let catalog = sample_catalog();
        let base = SnapshotQuery::for_year(4);
        let service = MemoryService::new()
            .with_rankings(
                base.with_gender(Some(Gender::Male)),
                vec![ranking_row(1, "Kolwezi", 58.0, 70.0, 1, 90)],
            )
            .with_rankings(
                base.with_gender(Some(Gender::Female)),
                vec![ranking_row(1, "Kolwezi", 66.0, 82.0, 1, 110)],
            );
        let fetcher = SnapshotFetcher::new(&service, &catalog);
        let split = fetcher.fetch_by_gender(4, &SnapshotFilter::default()).await;
        assert_eq!(split.get(Gender::Male)[0].average, 58.0);
        assert_eq!(split.get(Gender::Female)[0].average, 66.0);
    }

    #[test]
    fn generations_mark_older_responses_stale() {
        let mut generations = RequestGeneration::new();
        let first = generations.advance();
        let second = generations.advance();
        assert!(second > first);
        assert_eq!(generations.tag(second, "b"), Tagged::Current("b"));
        assert_eq!(
            generations.tag(first, "a"),
            Tagged::Stale {
                issued: first,
                current: second
            }
        );
        assert_eq!(generations.tag(first, "a").current(), None);
    }
}
