//! One comparison screen: its catalog, filter and last rendered view.
//!
//! Every load is tagged with the generation current when it was issued.
//! Loads are never cancelled; an outcome that comes back after a newer
//! load was issued is dropped in [`ComparisonSession::finish_load`].

use crate::aggregate::{self, SurfacedSummary};
use crate::catalog::ReferenceCatalog;
use crate::config::{ComparisonConfig, ComparisonScreen, Metric};
use crate::filter::{FilterError, FilterState, Granularity, RegionLevel, SnapshotFilter, SortKey};
use crate::presentation::{
    comparison_chart, gender_chart, ranking_rows, relative_position, trend_chart, ChartData,
    RankingRow, RelativePosition,
};
use crate::selector::ToggleOutcome;
use crate::snapshot::{Generation, RequestGeneration, SnapshotFetcher, Tagged};
use crate::suggest::{self, ResolvedSuggestion};
use crate::trend::{TrendComposer, TrendSeries};
use log::{debug, info, warn};
use serde::Serialize;
use spr_api::model::{ClassId, Gender, OptionId, ReferenceList, SchoolId, SchoolYear, YearId};
use spr_api::ResultsService;
use std::sync::Arc;

/// Everything one screen renders for a loaded filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub year: SchoolYear,
    pub rows: Vec<RankingRow>,
    pub summary: SurfacedSummary,
    pub comparison: ChartData,
    pub trends: Vec<TrendSeries>,
    pub trend_chart: ChartData,
    /// First selected school against the other selected ones.
    pub relative: Option<RelativePosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "view", rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    /// The snapshot came back without rows (or failed).
    Empty,
    Ready(Box<DashboardView>),
    Error(String),
}

/// A load captured at issue time. Running it does not touch the session.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    generation: Generation,
    filter: SnapshotFilter,
    year: Option<YearId>,
    selection: Vec<SchoolId>,
    sort: SortKey,
    catalog: Arc<ReferenceCatalog>,
    config: ComparisonConfig,
}

/// The result of a [`LoadRequest`], to hand back to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    generation: Generation,
    view: ViewState,
}

impl LoadOutcome {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }
}

impl LoadRequest {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub async fn run<S: ResultsService>(self, service: &S) -> LoadOutcome {
        let view = self.build(service).await;
        LoadOutcome {
            generation: self.generation,
            view,
        }
    }

    async fn build<S: ResultsService>(&self, service: &S) -> ViewState {
        let catalog = self.catalog.as_ref();
        if !catalog.is_available(ReferenceList::Years) {
            return ViewState::Error("School years could not be loaded".to_string());
        }
        let Some(year) = self.year.and_then(|id| catalog.year(id)) else {
            return ViewState::Error("No school year selected".to_string());
        };

        let granularity = self.filter.granularity();
        let fetcher = SnapshotFetcher::new(service, catalog);
        let composer = TrendComposer::new(service, catalog, &self.config);
        let remote = async {
            if granularity != Granularity::YearOnly {
                return None;
            }
            match service.global_stats(year.id).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Global statistics failed for {}: {}", year.label, e);
                    None
                }
            }
        };

        let (rows, remote, trends) = futures::join!(
            fetcher.fetch(year.id, &self.filter),
            remote,
            composer.compose(year.id, &self.filter, &self.selection)
        );

        if rows.is_empty() {
            info!("No ranking rows for {}", year.label);
            return ViewState::Empty;
        }

        let relative = self
            .selection
            .first()
            .and_then(|reference| relative_position(&rows, *reference, &self.selection));

        ViewState::Ready(Box::new(DashboardView {
            year: year.clone(),
            rows: ranking_rows(&rows, catalog, self.sort),
            summary: aggregate::surface(granularity, &rows, remote),
            comparison: comparison_chart(
                &rows,
                &self.selection,
                &[Metric::Average, Metric::SuccessRate],
            ),
            trend_chart: trend_chart(&trends, catalog),
            trends,
            relative,
        }))
    }
}

pub struct ComparisonSession {
    screen: ComparisonScreen,
    catalog: Arc<ReferenceCatalog>,
    filter: FilterState,
    generations: RequestGeneration,
    view: ViewState,
    config: ComparisonConfig,
}

impl ComparisonSession {
    /// Load the reference lists and select the most recent year.
    pub async fn mount<S: ResultsService>(
        service: &S,
        screen: ComparisonScreen,
        config: ComparisonConfig,
    ) -> Self {
        let catalog = ReferenceCatalog::load(service).await;
        Self::with_catalog(catalog, screen, config)
    }

    pub fn with_catalog(
        catalog: ReferenceCatalog,
        screen: ComparisonScreen,
        config: ComparisonConfig,
    ) -> Self {
        let mut filter = FilterState::new(screen);
        let latest = catalog.latest_year().map(|y| y.id);
        if let Err(e) = filter.set_year(&catalog, latest) {
            debug!("No default year: {}", e);
        }
        Self {
            screen,
            catalog: Arc::new(catalog),
            filter,
            generations: RequestGeneration::new(),
            view: ViewState::Loading,
            config,
        }
    }

    pub fn screen(&self) -> ComparisonScreen {
        self.screen
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Every filter change makes in-flight loads stale, even before the
    /// next load is issued.
    fn filter_changed(&mut self) {
        self.generations.advance();
    }

    pub fn set_region(
        &mut self,
        level: RegionLevel,
        value: Option<&str>,
    ) -> Result<(), FilterError> {
        self.filter.set_region(&self.catalog, level, value)?;
        self.filter_changed();
        Ok(())
    }

    pub fn set_class(&mut self, class: Option<ClassId>) -> Result<(), FilterError> {
        self.filter.set_class(&self.catalog, class)?;
        self.filter_changed();
        Ok(())
    }

    pub fn set_option(&mut self, option: Option<OptionId>) -> Result<(), FilterError> {
        self.filter.set_option(&self.catalog, option)?;
        self.filter_changed();
        Ok(())
    }

    pub fn set_year(&mut self, year: Option<YearId>) -> Result<(), FilterError> {
        self.filter.set_year(&self.catalog, year)?;
        self.filter_changed();
        Ok(())
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) {
        self.filter.set_gender(gender);
        self.filter_changed();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.filter.set_sort(sort);
        self.filter_changed();
    }

    pub fn toggle_entity(&mut self, id: SchoolId) -> ToggleOutcome {
        let outcome = self.filter.toggle_entity(id);
        if outcome != ToggleOutcome::Full {
            self.filter_changed();
        }
        outcome
    }

    /// Resolve a free-text request into filters and apply what matches.
    pub async fn suggest<S: ResultsService>(
        &mut self,
        service: &S,
        prompt: &str,
    ) -> Option<ResolvedSuggestion> {
        let resolved = suggest::suggest(service, prompt, &mut self.filter, &self.catalog).await;
        if resolved.as_ref().is_some_and(|r| !r.is_empty()) {
            self.filter_changed();
        }
        resolved
    }

    /// Issue a load for the current filter. Earlier loads become stale.
    pub fn begin_load(&mut self) -> LoadRequest {
        let generation = self.generations.advance();
        self.view = ViewState::Loading;
        LoadRequest {
            generation,
            filter: self.filter.snapshot_filter(),
            year: self.filter.year(),
            selection: self.filter.selection().selected().to_vec(),
            sort: self.filter.sort(),
            catalog: Arc::clone(&self.catalog),
            config: self.config.clone(),
        }
    }

    /// Show `outcome` if it answers the latest load. Returns whether it did.
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> bool {
        match self.generations.tag(outcome.generation, outcome.view) {
            Tagged::Current(view) => {
                self.view = view;
                true
            }
            Tagged::Stale { issued, current } => {
                debug!(
                    "Discarding stale load {} (current is {})",
                    issued.value(),
                    current.value()
                );
                false
            }
        }
    }

    /// Load the current filter and show the result.
    pub async fn refresh<S: ResultsService>(&mut self, service: &S) -> &ViewState {
        let request = self.begin_load();
        let outcome = request.run(service).await;
        self.finish_load(outcome);
        &self.view
    }

    /// Boys' and girls' `metric` for the selected schools in the selected year.
    pub async fn gender_comparison<S: ResultsService>(
        &self,
        service: &S,
        metric: Metric,
    ) -> Option<ChartData> {
        let year = self.filter.year()?;
        let fetcher = SnapshotFetcher::new(service, &self.catalog);
        let split = fetcher
            .fetch_by_gender(year, &self.filter.snapshot_filter())
            .await;
        Some(gender_chart(
            &split,
            self.filter.selection().selected(),
            &self.catalog,
            metric,
        ))
    }
}
