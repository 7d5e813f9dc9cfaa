//! Filter and comparison flags shared by the subcommands.

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use clap::{Args, ValueEnum};
use log::{info, warn};
use spr_api::model::SchoolYear;
use spr_data::config::{DEFAULT_FAN_OUT_LIMIT, DEFAULT_TREND_WINDOW};
use spr_data::suggest::resolve_gender;
use spr_data::{ComparisonConfig, ComparisonSession, Metric, ReferenceCatalog, RegionLevel, SortKey};
use spr_utils::text::{contains_ignore_case, eq_ignore_case};
use spr_utils::years::{school_year_for_date, start_year};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum SortArg {
    #[default]
    Rank,
    Average,
    SuccessRate,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Rank => SortKey::Rank,
            SortArg::Average => SortKey::Average,
            SortArg::SuccessRate => SortKey::SuccessRate,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum MetricArg {
    #[default]
    Average,
    SuccessRate,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Average => Metric::Average,
            MetricArg::SuccessRate => Metric::SuccessRate,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// School year label (e.g. 2023-2024) or its start year; defaults to the current year
    #[arg(short, long)]
    pub year: Option<String>,

    /// Province name
    #[arg(long)]
    pub province: Option<String>,

    /// City name; the province is inferred when omitted
    #[arg(long)]
    pub city: Option<String>,

    /// Commune name (requires a city)
    #[arg(long)]
    pub commune: Option<String>,

    /// Class name, e.g. "4ème Humanités"
    #[arg(long)]
    pub class: Option<String>,

    /// Study option name (secondary classes only)
    #[arg(long)]
    pub option: Option<String>,

    /// Gender: M/F, garçons/filles
    #[arg(short, long)]
    pub gender: Option<String>,

    /// Display order of the ranking table
    #[arg(long, value_enum, default_value = "rank")]
    pub sort: SortArg,
}

#[derive(Args, Clone, Debug)]
pub struct ComparisonArgs {
    /// Number of school years in trend series
    #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
    pub window: usize,

    /// Ranking queries in flight at once while building trends
    #[arg(long, default_value_t = DEFAULT_FAN_OUT_LIMIT)]
    pub concurrency: usize,

    /// Metric tracked by trend series
    #[arg(long, value_enum, default_value = "average")]
    pub metric: MetricArg,
}

impl Default for ComparisonArgs {
    fn default() -> Self {
        Self {
            window: DEFAULT_TREND_WINDOW,
            concurrency: DEFAULT_FAN_OUT_LIMIT,
            metric: MetricArg::Average,
        }
    }
}

impl ComparisonArgs {
    pub fn config(&self) -> ComparisonConfig {
        ComparisonConfig {
            trend_window: self.window.max(1),
            fan_out_limit: self.concurrency.max(1),
            trend_metric: self.metric.into(),
        }
    }
}

/// Find a school year by label, start year or id.
pub fn find_year<'c>(catalog: &'c ReferenceCatalog, text: &str) -> Option<&'c SchoolYear> {
    catalog
        .year_by_label(text)
        .or_else(|| start_year(text).and_then(|start| catalog.year_starting(start)))
        .or_else(|| text.trim().parse().ok().and_then(|id| catalog.year(id)))
}

/// The year the current date falls in, if the catalog has it.
fn current_year(catalog: &ReferenceCatalog) -> Option<&SchoolYear> {
    let today = Local::now().date_naive();
    catalog.year_starting(school_year_for_date(&today))
}

fn by_name<'c, T>(items: &'c [T], text: &str, name: impl Fn(&T) -> &str) -> Option<&'c T> {
    items
        .iter()
        .find(|item| eq_ignore_case(name(*item), text))
        .or_else(|| items.iter().find(|item| contains_ignore_case(name(*item), text)))
}

impl FilterArgs {
    /// Apply every flag to the session's filter. Unknown values are errors.
    pub fn apply(&self, session: &mut ComparisonSession) -> anyhow::Result<()> {
        let catalog = session.catalog();
        let year = match &self.year {
            Some(text) => Some(
                find_year(catalog, text)
                    .ok_or_else(|| anyhow!("Unknown school year: {}", text))?
                    .id,
            ),
            None => current_year(catalog).map(|y| y.id),
        };
        let province = match (&self.province, &self.city) {
            (Some(province), _) => Some(province.clone()),
            (None, Some(city)) => catalog
                .regions()
                .all_cities()
                .find(|(_, c)| eq_ignore_case(c, city))
                .map(|(p, _)| p.to_string()),
            (None, None) => None,
        };
        let class = match &self.class {
            Some(text) => Some(
                by_name(catalog.classes(), text, |c| c.name.as_str())
                    .ok_or_else(|| anyhow!("Unknown class: {}", text))?
                    .id,
            ),
            None => None,
        };
        let option = match &self.option {
            Some(text) => Some(
                by_name(catalog.options(), text, |o| o.name.as_str())
                    .ok_or_else(|| anyhow!("Unknown option: {}", text))?
                    .id,
            ),
            None => None,
        };
        let gender = match &self.gender {
            Some(text) => {
                Some(resolve_gender(text).ok_or_else(|| anyhow!("Unknown gender: {}", text))?)
            }
            None => None,
        };

        match year {
            Some(year) => session.set_year(Some(year))?,
            None => warn!("Current school year not in the catalog; using the latest"),
        }
        if province.is_some() {
            session
                .set_region(RegionLevel::Province, province.as_deref())
                .context("Invalid province")?;
        }
        if let Some(city) = &self.city {
            session
                .set_region(RegionLevel::City, Some(city.as_str()))
                .context("Invalid city")?;
        }
        if let Some(commune) = &self.commune {
            session
                .set_region(RegionLevel::Commune, Some(commune.as_str()))
                .context("Invalid commune")?;
        }
        if class.is_some() {
            session.set_class(class)?;
        }
        if option.is_some() {
            if class.is_none() {
                bail!("--option requires a secondary --class");
            }
            session.set_option(option)?;
        }
        session.set_gender(gender);
        session.set_sort(self.sort.into());

        info!("Filter: {:?}", session.filter().snapshot_filter());
        Ok(())
    }
}
