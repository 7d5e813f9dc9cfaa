//! In-memory results service backed by fixture data.
//!
//! Used by tests and by the CLI's `--fixture` mode. Ranking fixtures are
//! keyed by the exact query; a query that only adds a city to a stored
//! year-wide ranking is answered by narrowing that ranking and re-ranking
//! the survivors, the way the real service ranks within a city.

use crate::error::{Result, ServiceError};
use crate::model::{
    AggregateSummary, ClassLevel, FilterSuggestion, RankingSnapshot, ReferenceList, SchoolRecord,
    SchoolYear, StudyOption, YearId,
};
use crate::service::{ResultsService, SnapshotQuery};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Ranking rows stored for one exact query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingFixture {
    pub query: SnapshotQuery,
    pub rows: Vec<RankingSnapshot>,
}

/// Global statistics stored for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStatsFixture {
    pub year: YearId,
    pub summary: AggregateSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryService {
    #[serde(default)]
    pub years: Vec<SchoolYear>,
    #[serde(default)]
    pub classes: Vec<ClassLevel>,
    #[serde(default)]
    pub options: Vec<StudyOption>,
    #[serde(default)]
    pub schools: Vec<SchoolRecord>,
    #[serde(default)]
    pub rankings: Vec<RankingFixture>,
    #[serde(default)]
    pub global_stats: Vec<GlobalStatsFixture>,
    #[serde(default)]
    pub suggestion: Option<FilterSuggestion>,
    /// Years whose ranking and statistics queries fail.
    #[serde(default)]
    pub unavailable_years: HashSet<YearId>,
    /// Reference lists whose loads fail.
    #[serde(default)]
    pub unavailable_lists: HashSet<ReferenceList>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON fixture.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON fixture file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_years(mut self, years: Vec<SchoolYear>) -> Self {
        self.years = years;
        self
    }

    pub fn with_classes(mut self, classes: Vec<ClassLevel>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_options(mut self, options: Vec<StudyOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_schools(mut self, schools: Vec<SchoolRecord>) -> Self {
        self.schools = schools;
        self
    }

    pub fn with_rankings(mut self, query: SnapshotQuery, rows: Vec<RankingSnapshot>) -> Self {
        self.rankings.retain(|fixture| fixture.query != query);
        self.rankings.push(RankingFixture { query, rows });
        self
    }

    pub fn with_global_stats(mut self, year: YearId, summary: AggregateSummary) -> Self {
        self.global_stats.retain(|fixture| fixture.year != year);
        self.global_stats.push(GlobalStatsFixture { year, summary });
        self
    }

    pub fn with_suggestion(mut self, suggestion: FilterSuggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    /// Make every ranking/statistics query for `year` fail.
    pub fn fail_year(mut self, year: YearId) -> Self {
        self.unavailable_years.insert(year);
        self
    }

    /// Make loading one reference list fail.
    pub fn fail_list(mut self, list: ReferenceList) -> Self {
        self.unavailable_lists.insert(list);
        self
    }

    fn check_year(&self, year: YearId) -> Result<()> {
        if self.unavailable_years.contains(&year) {
            return Err(ServiceError::Unavailable(format!("year {}", year)));
        }
        Ok(())
    }

    fn list<T: Clone>(&self, list: ReferenceList, items: &[T]) -> Result<Vec<T>> {
        if self.unavailable_lists.contains(&list) {
            return Err(ServiceError::Unavailable(list.to_string()));
        }
        Ok(items.to_vec())
    }

    fn find_rankings(&self, query: &SnapshotQuery) -> Vec<RankingSnapshot> {
        if let Some(fixture) = self.rankings.iter().find(|f| &f.query == query) {
            return fixture.rows.clone();
        }

        let city = match &query.city {
            Some(city) => city,
            None => return Vec::new(),
        };
        let wider = SnapshotQuery {
            city: None,
            ..query.clone()
        };
        let Some(fixture) = self.rankings.iter().find(|f| f.query == wider) else {
            return Vec::new();
        };

        debug!("Narrowing stored ranking for year {} to {}", query.year, city);
        let mut rows: Vec<RankingSnapshot> = fixture
            .rows
            .iter()
            .filter(|row| row.city.eq_ignore_ascii_case(city))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i as u32 + 1;
        }
        rows
    }
}

impl ResultsService for MemoryService {
    async fn school_rankings(&self, query: SnapshotQuery) -> Result<Vec<RankingSnapshot>> {
        self.check_year(query.year)?;
        Ok(self.find_rankings(&query))
    }

    async fn global_stats(&self, year: YearId) -> Result<AggregateSummary> {
        self.check_year(year)?;
        Ok(self
            .global_stats
            .iter()
            .find(|fixture| fixture.year == year)
            .map(|fixture| fixture.summary)
            .unwrap_or_default())
    }

    async fn years(&self) -> Result<Vec<SchoolYear>> {
        self.list(ReferenceList::Years, &self.years)
    }

    async fn classes(&self) -> Result<Vec<ClassLevel>> {
        self.list(ReferenceList::Classes, &self.classes)
    }

    async fn options(&self) -> Result<Vec<StudyOption>> {
        self.list(ReferenceList::Options, &self.options)
    }

    async fn schools(&self) -> Result<Vec<SchoolRecord>> {
        self.list(ReferenceList::Schools, &self.schools)
    }

    async fn suggest_filters(&self, _prompt: String) -> Result<FilterSuggestion> {
        self.suggestion
            .clone()
            .ok_or_else(|| ServiceError::Unavailable("filter suggestions".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn row(id: u32, city: &str, rank: u32) -> RankingSnapshot {
        RankingSnapshot {
            entity_id: id,
            name: format!("School {}", id),
            city: city.to_string(),
            commune: String::new(),
            average: 60.0,
            success_rate: 80.0,
            principal_category: String::new(),
            rank,
            population: 100,
        }
    }

    #[test]
    fn exact_query_returns_stored_rows() {
        let service = MemoryService::new().with_rankings(
            SnapshotQuery::for_year(1),
            vec![row(1, "Likasi", 1), row(2, "Kolwezi", 2)],
        );
        let rows = block_on(service.school_rankings(SnapshotQuery::for_year(1))).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn city_query_narrows_and_reranks() {
        let service = MemoryService::new().with_rankings(
            SnapshotQuery::for_year(1),
            vec![row(1, "Likasi", 1), row(2, "Kolwezi", 2), row(3, "Kolwezi", 3)],
        );
        let query = SnapshotQuery {
            city: Some("kolwezi".into()),
            ..SnapshotQuery::for_year(1)
        };
        let rows = block_on(service.school_rankings(query)).unwrap();
        let ranks: Vec<(u32, u32)> = rows.iter().map(|r| (r.entity_id, r.rank)).collect();
        assert_eq!(ranks, vec![(2, 1), (3, 2)]);
    }

    #[test]
    fn unknown_query_is_empty() {
        let service = MemoryService::new();
        let query = SnapshotQuery {
            class: Some(4),
            ..SnapshotQuery::for_year(1)
        };
        assert!(block_on(service.school_rankings(query)).unwrap().is_empty());
    }

    #[test]
    fn failure_injection() {
        let service = MemoryService::new()
            .fail_year(2)
            .fail_list(ReferenceList::Options);
        assert!(block_on(service.school_rankings(SnapshotQuery::for_year(2))).is_err());
        assert!(block_on(service.global_stats(2)).is_err());
        assert!(block_on(service.options()).is_err());
        assert!(block_on(service.years()).unwrap().is_empty());
    }

    #[test]
    fn sample_fixture_parses() {
        let service =
            MemoryService::from_json(include_str!("../../fixtures/lualaba-katanga.json")).unwrap();
        assert!(!service.years.is_empty());
        assert!(!service.schools.is_empty());
        assert!(!service.rankings.is_empty());
    }
}
