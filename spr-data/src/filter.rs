//! The active filter selection of one comparison screen.
//!
//! Selectors cascade: province -> city -> commune, and class -> option.
//! Changing a parent clears every child that is no longer valid under it,
//! so a state read after any setter only holds consistent values.

use crate::catalog::ReferenceCatalog;
use crate::config::ComparisonScreen;
use crate::selector::{EntitySelector, ToggleOutcome};
use log::debug;
use serde::{Deserialize, Serialize};
use spr_api::model::{ClassId, Gender, OptionId, SchoolId, StudyOption, YearId};
use spr_api::SnapshotQuery;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown province: {0}")]
    UnknownProvince(String),

    #[error("{city} is not a city of the selected province")]
    UnknownCity { city: String },

    #[error("{commune} is not a commune of the selected city")]
    UnknownCommune { commune: String },

    #[error("Cannot choose a {0:?} before its parent region")]
    MissingParent(RegionLevel),

    #[error("Unknown class id: {0}")]
    UnknownClass(ClassId),

    #[error("Option {0} is not offered for the selected class")]
    OptionNotOffered(OptionId),

    #[error("Unknown school year id: {0}")]
    UnknownYear(YearId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionLevel {
    Province,
    City,
    Commune,
}

/// Display order of ranking rows. Never changes the rank values themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Rank,
    Average,
    SuccessRate,
}

/// How finely a filter narrows the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Only the year is fixed: the level of the service's global statistics.
    YearOnly,
    /// Region, class, option or gender narrows the snapshot further.
    Filtered,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionSelection {
    pub province: Option<String>,
    pub city: Option<String>,
    pub commune: Option<String>,
}

impl RegionSelection {
    pub fn is_empty(&self) -> bool {
        self.province.is_none() && self.city.is_none() && self.commune.is_none()
    }
}

/// The part of a filter that shapes a ranking query, year excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotFilter {
    pub region: RegionSelection,
    pub class: Option<ClassId>,
    pub option: Option<OptionId>,
    pub gender: Option<Gender>,
}

impl SnapshotFilter {
    /// The service query for `year`. Only the city is sent; province and
    /// commune are narrowed locally by the fetcher.
    pub fn query(&self, year: YearId) -> SnapshotQuery {
        SnapshotQuery {
            year,
            city: self.region.city.clone(),
            class: self.class,
            option: self.option,
            gender: self.gender,
        }
    }

    pub fn granularity(&self) -> Granularity {
        if self.region.is_empty()
            && self.class.is_none()
            && self.option.is_none()
            && self.gender.is_none()
        {
            Granularity::YearOnly
        } else {
            Granularity::Filtered
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    region: RegionSelection,
    class: Option<ClassId>,
    option: Option<OptionId>,
    year: Option<YearId>,
    gender: Option<Gender>,
    selection: EntitySelector,
    sort: SortKey,
}

impl FilterState {
    pub fn new(screen: ComparisonScreen) -> Self {
        Self {
            region: RegionSelection::default(),
            class: None,
            option: None,
            year: None,
            gender: None,
            selection: EntitySelector::new(screen.max_selection()),
            sort: SortKey::default(),
        }
    }

    /// Set one region level and clear every level below it.
    ///
    /// `None` clears the level. A value must belong to the currently
    /// selected parent; rejected values leave the state unchanged.
    pub fn set_region(
        &mut self,
        catalog: &ReferenceCatalog,
        level: RegionLevel,
        value: Option<&str>,
    ) -> Result<(), FilterError> {
        let regions = catalog.regions();
        let canonical = match (level, value) {
            (_, None) => None,
            (RegionLevel::Province, Some(name)) => Some(
                regions
                    .canonical_province(name)
                    .ok_or_else(|| FilterError::UnknownProvince(name.to_string()))?
                    .to_string(),
            ),
            (RegionLevel::City, Some(name)) => {
                let province = self
                    .region
                    .province
                    .as_deref()
                    .ok_or(FilterError::MissingParent(RegionLevel::City))?;
                Some(
                    regions
                        .canonical_city(province, name)
                        .ok_or_else(|| FilterError::UnknownCity {
                            city: name.to_string(),
                        })?
                        .to_string(),
                )
            }
            (RegionLevel::Commune, Some(name)) => {
                let (province, city) = match (&self.region.province, &self.region.city) {
                    (Some(p), Some(c)) => (p.as_str(), c.as_str()),
                    _ => return Err(FilterError::MissingParent(RegionLevel::Commune)),
                };
                Some(
                    regions
                        .canonical_commune(province, city, name)
                        .ok_or_else(|| FilterError::UnknownCommune {
                            commune: name.to_string(),
                        })?
                        .to_string(),
                )
            }
        };

        match level {
            RegionLevel::Province => {
                self.region.province = canonical;
                self.region.city = None;
                self.region.commune = None;
            }
            RegionLevel::City => {
                self.region.city = canonical;
                self.region.commune = None;
            }
            RegionLevel::Commune => {
                self.region.commune = canonical;
            }
        }
        Ok(())
    }

    /// Set the class. The option survives only if the new class offers it.
    pub fn set_class(
        &mut self,
        catalog: &ReferenceCatalog,
        class: Option<ClassId>,
    ) -> Result<(), FilterError> {
        if let Some(id) = class {
            if catalog.class(id).is_none() {
                return Err(FilterError::UnknownClass(id));
            }
        }
        self.class = class;

        if let Some(option) = self.option {
            let offered = class
                .map(|id| catalog.options_for_class(id).iter().any(|o| o.id == option))
                .unwrap_or(false);
            if !offered {
                debug!("Clearing option {} not offered by class {:?}", option, class);
                self.option = None;
            }
        }
        Ok(())
    }

    pub fn set_option(
        &mut self,
        catalog: &ReferenceCatalog,
        option: Option<OptionId>,
    ) -> Result<(), FilterError> {
        if let Some(id) = option {
            let offered = self
                .class
                .map(|class| catalog.options_for_class(class).iter().any(|o| o.id == id))
                .unwrap_or(false);
            if !offered {
                return Err(FilterError::OptionNotOffered(id));
            }
        }
        self.option = option;
        Ok(())
    }

    pub fn set_year(
        &mut self,
        catalog: &ReferenceCatalog,
        year: Option<YearId>,
    ) -> Result<(), FilterError> {
        if let Some(id) = year {
            if catalog.year(id).is_none() {
                return Err(FilterError::UnknownYear(id));
            }
        }
        self.year = year;
        Ok(())
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) {
        self.gender = gender;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    /// The only way to change the selected schools.
    pub fn toggle_entity(&mut self, id: SchoolId) -> ToggleOutcome {
        self.selection.toggle(id)
    }

    pub fn region(&self) -> &RegionSelection {
        &self.region
    }

    pub fn class(&self) -> Option<ClassId> {
        self.class
    }

    pub fn option(&self) -> Option<OptionId> {
        self.option
    }

    pub fn year(&self) -> Option<YearId> {
        self.year
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn selection(&self) -> &EntitySelector {
        &self.selection
    }

    /// Choices for a region level given the current parents.
    pub fn region_choices<'a>(
        &self,
        catalog: &'a ReferenceCatalog,
        level: RegionLevel,
    ) -> Vec<&'a str> {
        let regions = catalog.regions();
        match level {
            RegionLevel::Province => regions.provinces(),
            RegionLevel::City => regions.cities(self.region.province.as_deref()),
            RegionLevel::Commune => {
                regions.communes(self.region.province.as_deref(), self.region.city.as_deref())
            }
        }
    }

    /// Choices for the option selector; empty (disabled) unless the class
    /// is in the secondary tier.
    pub fn option_choices<'a>(&self, catalog: &'a ReferenceCatalog) -> &'a [StudyOption] {
        match self.class {
            Some(class) => catalog.options_for_class(class),
            None => &[],
        }
    }

    pub fn option_enabled(&self, catalog: &ReferenceCatalog) -> bool {
        !self.option_choices(catalog).is_empty()
    }

    pub fn snapshot_filter(&self) -> SnapshotFilter {
        SnapshotFilter {
            region: self.region.clone(),
            class: self.class,
            option: self.option,
            gender: self.gender,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.snapshot_filter().granularity()
    }

    /// The ranking query for the selected year, if one is selected.
    pub fn query(&self) -> Option<SnapshotQuery> {
        self.year.map(|year| self.snapshot_filter().query(year))
    }
}
