//! The query surface of the remote results service.

use crate::error::Result;
use crate::model::{
    AggregateSummary, ClassId, ClassLevel, FilterSuggestion, Gender, OptionId, RankingSnapshot,
    SchoolRecord, SchoolYear, StudyOption, YearId,
};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Parameters of one ranking query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotQuery {
    pub year: YearId,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub class: Option<ClassId>,
    #[serde(default)]
    pub option: Option<OptionId>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl SnapshotQuery {
    pub fn for_year(year: YearId) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    /// Same filters, different year.
    pub fn with_year(&self, year: YearId) -> Self {
        Self {
            year,
            ..self.clone()
        }
    }

    /// Same filters, different gender.
    pub fn with_gender(&self, gender: Option<Gender>) -> Self {
        Self {
            gender,
            ..self.clone()
        }
    }

    /// True when only the year is set, i.e. the granularity of the
    /// service's global statistics endpoint.
    pub fn is_year_only(&self) -> bool {
        self.city.is_none()
            && self.class.is_none()
            && self.option.is_none()
            && self.gender.is_none()
    }
}

/// Queries the comparison layer issues against the results service.
///
/// Statistics are computed by the service from raw student records; the
/// comparison layer only consumes them.
pub trait ResultsService {
    /// Ranked per-school metrics for one (year, filter) combination.
    fn school_rankings(
        &self,
        query: SnapshotQuery,
    ) -> impl Future<Output = Result<Vec<RankingSnapshot>>> + Send;

    /// Year-wide summary, unfiltered by region, class, option or gender.
    fn global_stats(&self, year: YearId) -> impl Future<Output = Result<AggregateSummary>> + Send;

    fn years(&self) -> impl Future<Output = Result<Vec<SchoolYear>>> + Send;

    fn classes(&self) -> impl Future<Output = Result<Vec<ClassLevel>>> + Send;

    fn options(&self) -> impl Future<Output = Result<Vec<StudyOption>>> + Send;

    fn schools(&self) -> impl Future<Output = Result<Vec<SchoolRecord>>> + Send;

    /// Best-effort filter extraction from free text.
    fn suggest_filters(
        &self,
        prompt: String,
    ) -> impl Future<Output = Result<FilterSuggestion>> + Send;
}
