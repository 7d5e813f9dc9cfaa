//! Natural-language filter suggestions.
//!
//! The suggestion service returns loose strings. Each one is matched against
//! the catalog case-insensitively (a candidate matches when its label
//! contains the suggested text; the first candidate in catalog order wins).
//! Fields that match nothing, or that the filter state rejects, are dropped.

use crate::catalog::ReferenceCatalog;
use crate::filter::{FilterState, RegionLevel};
use log::{debug, info, warn};
use serde::Serialize;
use spr_api::model::{ClassId, FilterSuggestion, Gender, OptionId, YearId};
use spr_api::ResultsService;
use spr_utils::text::{contains_ignore_case, eq_ignore_case};

/// A suggestion resolved to catalog identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSuggestion {
    pub province: Option<String>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub year: Option<YearId>,
    pub class: Option<ClassId>,
    pub option: Option<OptionId>,
}

impl ResolvedSuggestion {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Gender named by `text`: a known alias or part of its display label.
pub fn resolve_gender(text: &str) -> Option<Gender> {
    Gender::ALL.into_iter().find(|gender| {
        gender.aliases().iter().any(|alias| eq_ignore_case(alias, text))
            || contains_ignore_case(gender.label(), text)
    })
}

/// Match each suggested field against the catalog.
pub fn resolve(suggestion: &FilterSuggestion, catalog: &ReferenceCatalog) -> ResolvedSuggestion {
    let mut resolved = ResolvedSuggestion::default();

    if let Some(text) = suggestion.city.as_deref() {
        if let Some((province, city)) = catalog
            .regions()
            .all_cities()
            .find(|(_, city)| contains_ignore_case(city, text))
        {
            resolved.province = Some(province.to_string());
            resolved.city = Some(city.to_string());
        }
    }
    resolved.gender = suggestion.gender.as_deref().and_then(resolve_gender);
    resolved.year = suggestion.year.as_deref().and_then(|text| {
        catalog
            .years()
            .iter()
            .find(|y| contains_ignore_case(&y.label, text))
            .map(|y| y.id)
    });
    resolved.class = suggestion.class.as_deref().and_then(|text| {
        catalog
            .classes()
            .iter()
            .find(|c| contains_ignore_case(&c.name, text))
            .map(|c| c.id)
    });
    resolved.option = suggestion.option.as_deref().and_then(|text| {
        catalog
            .options()
            .iter()
            .find(|o| contains_ignore_case(&o.name, text))
            .map(|o| o.id)
    });

    if resolved.is_empty() {
        debug!("No suggested filter matched the catalog: {:?}", suggestion);
    }
    resolved
}

/// Apply a resolved suggestion on top of the current filter.
///
/// Fields are applied parent first (year, region, gender, class, option) so
/// cascades run in order. A field the state rejects is skipped.
pub fn apply(resolved: &ResolvedSuggestion, filter: &mut FilterState, catalog: &ReferenceCatalog) {
    if let Some(year) = resolved.year {
        if let Err(e) = filter.set_year(catalog, Some(year)) {
            debug!("Ignoring suggested year: {}", e);
        }
    }
    if let (Some(province), Some(city)) = (&resolved.province, &resolved.city) {
        let region = filter
            .set_region(catalog, RegionLevel::Province, Some(province.as_str()))
            .and_then(|_| filter.set_region(catalog, RegionLevel::City, Some(city.as_str())));
        if let Err(e) = region {
            debug!("Ignoring suggested city: {}", e);
        }
    }
    if let Some(gender) = resolved.gender {
        filter.set_gender(Some(gender));
    }
    if let Some(class) = resolved.class {
        if let Err(e) = filter.set_class(catalog, Some(class)) {
            debug!("Ignoring suggested class: {}", e);
        }
    }
    if let Some(option) = resolved.option {
        if let Err(e) = filter.set_option(catalog, Some(option)) {
            debug!("Ignoring suggested option: {}", e);
        }
    }
}

/// Ask the service for filters matching `prompt` and apply them.
///
/// The service is optional: a failure leaves the filter unchanged.
pub async fn suggest<S: ResultsService>(
    service: &S,
    prompt: &str,
    filter: &mut FilterState,
    catalog: &ReferenceCatalog,
) -> Option<ResolvedSuggestion> {
    match service.suggest_filters(prompt.to_string()).await {
        Ok(suggestion) => {
            let resolved = resolve(&suggestion, catalog);
            info!("Applying suggested filters: {:?}", resolved);
            apply(&resolved, filter, catalog);
            Some(resolved)
        }
        Err(e) => {
            warn!("Filter suggestion failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::config::ComparisonScreen;
    use spr_api::memory::MemoryService;

    fn suggestion(json: &str) -> FilterSuggestion {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolves_each_field_case_insensitively() {
        let catalog = sample_catalog();
        let resolved = resolve(
            &suggestion(
                r#"{"ville": "kolwezi", "genre": "filles", "annee": "2023",
                    "classe": "4ème", "option": "bio"}"#,
            ),
            &catalog,
        );
        assert_eq!(resolved.province.as_deref(), Some("Lualaba"));
        assert_eq!(resolved.city.as_deref(), Some("Kolwezi"));
        assert_eq!(resolved.gender, Some(Gender::Female));
        assert_eq!(resolved.year, Some(3));
        assert_eq!(resolved.class, Some(12));
        assert_eq!(resolved.option, Some(2));
    }

    #[test]
    fn unmatched_fields_are_ignored() {
        let catalog = sample_catalog();
        let resolved = resolve(
            &suggestion(r#"{"ville": "Kinshasa", "genre": "x", "annee": "1999"}"#),
            &catalog,
        );
        assert!(resolved.is_empty());

        let mut filter = FilterState::new(ComparisonScreen::InspectorCompare);
        filter.set_year(&catalog, Some(4)).unwrap();
        let before = filter.clone();
        apply(&resolved, &mut filter, &catalog);
        assert_eq!(filter, before);
    }

    #[test]
    fn option_without_secondary_class_is_dropped() {
        let catalog = sample_catalog();
        let resolved = resolve(
            &suggestion(r#"{"classe": "7ème", "option": "math"}"#),
            &catalog,
        );
        assert_eq!(resolved.option, Some(1));

        let mut filter = FilterState::new(ComparisonScreen::InspectorCompare);
        apply(&resolved, &mut filter, &catalog);
        assert_eq!(filter.class(), Some(10));
        assert_eq!(filter.option(), None);
    }

    #[tokio::test]
    async fn suggest_applies_service_filters() {
        let catalog = sample_catalog();
        let service = MemoryService::new().with_suggestion(suggestion(
            r#"{"ville": "Lubumbashi", "genre": "M", "annee": "2024-2025"}"#,
        ));
        let mut filter = FilterState::new(ComparisonScreen::InspectorCompare);
        let resolved = suggest(&service, "garçons de Lubumbashi", &mut filter, &catalog).await;

        assert!(resolved.is_some());
        assert_eq!(filter.year(), Some(4));
        assert_eq!(filter.region().province.as_deref(), Some("Haut-Katanga"));
        assert_eq!(filter.region().city.as_deref(), Some("Lubumbashi"));
        assert_eq!(filter.gender(), Some(Gender::Male));
    }

    #[tokio::test]
    async fn service_failure_leaves_filter_unchanged() {
        let catalog = sample_catalog();
        let service = MemoryService::new();
        let mut filter = FilterState::new(ComparisonScreen::InspectorCompare);
        let before = filter.clone();
        assert!(suggest(&service, "anything", &mut filter, &catalog).await.is_none());
        assert_eq!(filter, before);
    }
}
