//! Reference lists loaded once per screen: years, classes, options,
//! schools and the region hierarchy.
//!
//! A list that fails to load stays empty and is recorded in
//! [`ReferenceCatalog::failures`]; selectors depending on it then have no
//! choices and render disabled.

use log::{info, warn};
use spr_api::model::{
    ClassId, ClassLevel, Entity, OptionId, ReferenceList, RegionPath, SchoolId, SchoolRecord,
    SchoolYear, StudyOption, YearId,
};
use spr_api::wire::ForeignRef;
use spr_api::ResultsService;
use spr_utils::text::{contains_ignore_case, eq_ignore_case};
use spr_utils::years::start_year;

/// Classes at or above this order number belong to the secondary tier
/// when their tier label does not say otherwise.
pub const SECONDARY_MIN_ORDER: u32 = 3;

/// Province -> city -> commune table for the provinces the portal covers.
const REGIONS: &[(&str, &[(&str, &[&str])])] = &[
    (
        "Haut-Katanga",
        &[
            (
                "Lubumbashi",
                &["Lubumbashi", "Kampemba", "Kenya", "Kamalondo", "Rwashi", "Annexe"],
            ),
            ("Likasi", &["Likasi", "Kikula", "Shituru", "Panda"]),
            ("Kambove", &["Kambove Centre"]),
        ],
    ),
    (
        "Lualaba",
        &[
            ("Kolwezi", &["Dilala", "Manika", "Kanina"]),
            ("Fungurume", &["Fungurume Centre"]),
        ],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityNode {
    pub name: String,
    pub communes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceNode {
    pub name: String,
    pub cities: Vec<CityNode>,
}

/// Static region lookup. A level has no choices until its parent is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionHierarchy {
    provinces: Vec<ProvinceNode>,
}

impl Default for RegionHierarchy {
    fn default() -> Self {
        let provinces = REGIONS
            .iter()
            .map(|(province, cities)| ProvinceNode {
                name: province.to_string(),
                cities: cities
                    .iter()
                    .map(|(city, communes)| CityNode {
                        name: city.to_string(),
                        communes: communes.iter().map(|c| c.to_string()).collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { provinces }
    }
}

impl RegionHierarchy {
    pub fn new(provinces: Vec<ProvinceNode>) -> Self {
        Self { provinces }
    }

    fn province(&self, name: &str) -> Option<&ProvinceNode> {
        self.provinces.iter().find(|p| eq_ignore_case(&p.name, name))
    }

    fn city(&self, province: &str, city: &str) -> Option<&CityNode> {
        self.province(province)?
            .cities
            .iter()
            .find(|c| eq_ignore_case(&c.name, city))
    }

    pub fn provinces(&self) -> Vec<&str> {
        self.provinces.iter().map(|p| p.name.as_str()).collect()
    }

    /// Cities of `province`; empty when no province is chosen.
    pub fn cities(&self, province: Option<&str>) -> Vec<&str> {
        province
            .and_then(|p| self.province(p))
            .map(|p| p.cities.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Communes of `city` within `province`; empty unless both are chosen.
    pub fn communes(&self, province: Option<&str>, city: Option<&str>) -> Vec<&str> {
        match (province, city) {
            (Some(p), Some(c)) => self
                .city(p, c)
                .map(|c| c.communes.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Canonical spelling of a province name.
    pub fn canonical_province(&self, name: &str) -> Option<&str> {
        self.province(name).map(|p| p.name.as_str())
    }

    /// Canonical spelling of a city within `province`.
    pub fn canonical_city(&self, province: &str, city: &str) -> Option<&str> {
        self.city(province, city).map(|c| c.name.as_str())
    }

    /// Canonical spelling of a commune within `province`/`city`.
    pub fn canonical_commune(&self, province: &str, city: &str, commune: &str) -> Option<&str> {
        self.city(province, city)?
            .communes
            .iter()
            .find(|c| eq_ignore_case(c, commune))
            .map(String::as_str)
    }

    /// (province, city) pairs in table order.
    pub fn all_cities(&self) -> impl Iterator<Item = (&str, &str)> {
        self.provinces.iter().flat_map(|p| {
            p.cities
                .iter()
                .map(move |c| (p.name.as_str(), c.name.as_str()))
        })
    }
}

/// Whether a class offers study options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassTier {
    Base,
    Secondary,
}

impl ClassTier {
    pub fn of(class: &ClassLevel) -> Self {
        match &class.tier_label {
            Some(label) if contains_ignore_case(label, "second") => ClassTier::Secondary,
            Some(label) if contains_ignore_case(label, "humanit") => ClassTier::Secondary,
            Some(label) if !label.trim().is_empty() => ClassTier::Base,
            _ if class.level_order >= SECONDARY_MIN_ORDER => ClassTier::Secondary,
            _ => ClassTier::Base,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    years: Vec<SchoolYear>,
    classes: Vec<ClassLevel>,
    options: Vec<StudyOption>,
    entities: Vec<Entity>,
    regions: RegionHierarchy,
    failures: Vec<ReferenceList>,
}

fn loaded<T>(
    list: ReferenceList,
    result: spr_api::Result<Vec<T>>,
    failures: &mut Vec<ReferenceList>,
) -> Vec<T> {
    match result {
        Ok(items) => {
            info!("Loaded {} {}", items.len(), list);
            items
        }
        Err(e) => {
            warn!("Reference list {} failed to load: {}", list, e);
            failures.push(list);
            Vec::new()
        }
    }
}

impl ReferenceCatalog {
    /// Load every reference list concurrently. Never fails; see [`Self::failures`].
    pub async fn load<S: ResultsService>(service: &S) -> Self {
        let (years, classes, options, schools) = futures::join!(
            service.years(),
            service.classes(),
            service.options(),
            service.schools()
        );
        let mut failures = Vec::new();
        let years = loaded(ReferenceList::Years, years, &mut failures);
        let classes = loaded(ReferenceList::Classes, classes, &mut failures);
        let options = loaded(ReferenceList::Options, options, &mut failures);
        let schools = loaded(ReferenceList::Schools, schools, &mut failures);

        let mut catalog = Self::from_parts(years, classes, options, schools);
        catalog.failures = failures;
        catalog
    }

    /// Build a catalog from already-loaded lists.
    pub fn from_parts(
        years: Vec<SchoolYear>,
        mut classes: Vec<ClassLevel>,
        mut options: Vec<StudyOption>,
        schools: Vec<SchoolRecord>,
    ) -> Self {
        classes.sort_by_key(|c| (c.level_order, c.id));
        options.sort_by(|a, b| a.name.cmp(&b.name));

        let entities = schools
            .into_iter()
            .map(|school| {
                let principal_category = school
                    .option_principale
                    .as_ref()
                    .and_then(|r| r.resolve(&options))
                    .map(|o| o.name.clone());
                Entity {
                    id: school.id,
                    name: school.nom,
                    code: school.code_ecole,
                    region: RegionPath {
                        province: school.province,
                        city: school.ville,
                        commune: school.commune,
                    },
                    principal_category,
                }
            })
            .collect();

        Self {
            years: chronological(years),
            classes,
            options,
            entities,
            regions: RegionHierarchy::default(),
            failures: Vec::new(),
        }
    }

    pub fn with_regions(mut self, regions: RegionHierarchy) -> Self {
        self.regions = regions;
        self
    }

    /// Lists that failed to load.
    pub fn failures(&self) -> &[ReferenceList] {
        &self.failures
    }

    pub fn is_available(&self, list: ReferenceList) -> bool {
        !self.failures.contains(&list)
    }

    /// Years, oldest first when labels carry a calendar year.
    pub fn years(&self) -> &[SchoolYear] {
        &self.years
    }

    pub fn year(&self, id: YearId) -> Option<&SchoolYear> {
        self.years.iter().find(|y| y.id == id)
    }

    pub fn year_by_label(&self, label: &str) -> Option<&SchoolYear> {
        self.years.iter().find(|y| eq_ignore_case(&y.label, label))
    }

    /// The year whose label starts in calendar year `start`.
    pub fn year_starting(&self, start: i32) -> Option<&SchoolYear> {
        self.years.iter().find(|y| start_year(&y.label) == Some(start))
    }

    pub fn year_position(&self, id: YearId) -> Option<usize> {
        self.years.iter().position(|y| y.id == id)
    }

    /// True when at least one year label carries a calendar year.
    pub fn has_dated_years(&self) -> bool {
        self.years.iter().any(|y| start_year(&y.label).is_some())
    }

    pub fn latest_year(&self) -> Option<&SchoolYear> {
        self.years.last()
    }

    pub fn classes(&self) -> &[ClassLevel] {
        &self.classes
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassLevel> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn options(&self) -> &[StudyOption] {
        &self.options
    }

    pub fn option(&self, id: OptionId) -> Option<&StudyOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Options offered in `class`: every option for secondary classes,
    /// none for the others.
    pub fn options_for_class(&self, class: ClassId) -> &[StudyOption] {
        match self.class(class).map(ClassTier::of) {
            Some(ClassTier::Secondary) => &self.options,
            _ => &[],
        }
    }

    pub fn resolve_option<'a>(
        &'a self,
        reference: &'a ForeignRef<StudyOption>,
    ) -> Option<&'a StudyOption> {
        reference.resolve(&self.options)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: SchoolId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Schools whose name or code contains `term`, case-insensitively.
    pub fn search_entities(&self, term: &str) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| contains_ignore_case(&e.name, term) || contains_ignore_case(&e.code, term))
            .collect()
    }

    pub fn regions(&self) -> &RegionHierarchy {
        &self.regions
    }
}

/// Order years by the calendar year in their label. Labels without one
/// keep their relative order after the dated ones.
fn chronological(mut years: Vec<SchoolYear>) -> Vec<SchoolYear> {
    years.sort_by_key(|y| match start_year(&y.label) {
        Some(start) => (0, start),
        None => (1, 0),
    });
    years
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use spr_api::memory::MemoryService;

    pub(crate) fn year(id: YearId, label: &str) -> SchoolYear {
        SchoolYear {
            id,
            label: label.to_string(),
        }
    }

    pub(crate) fn class(id: ClassId, name: &str, tier: Option<&str>, order: u32) -> ClassLevel {
        ClassLevel {
            id,
            name: name.to_string(),
            tier_label: tier.map(str::to_string),
            level_order: order,
        }
    }

    pub(crate) fn option(id: OptionId, name: &str) -> StudyOption {
        StudyOption {
            id,
            name: name.to_string(),
        }
    }

    pub(crate) fn school(
        id: SchoolId,
        name: &str,
        province: &str,
        city: &str,
        commune: &str,
    ) -> SchoolRecord {
        SchoolRecord {
            id,
            nom: name.to_string(),
            code_ecole: format!("S{:03}", id),
            province: province.to_string(),
            ville: city.to_string(),
            commune: commune.to_string(),
            option_principale: Some(ForeignRef::Id(1)),
        }
    }

    pub(crate) fn sample_catalog() -> ReferenceCatalog {
        ReferenceCatalog::from_parts(
            vec![year(3, "2023-2024"), year(1, "2021-2022"), year(4, "2024-2025")],
            vec![
                class(10, "7ème EB", Some("Base"), 1),
                class(11, "1ère Humanités", Some("Secondaire"), 3),
                class(12, "4ème Humanités", Some("Secondaire"), 6),
            ],
            vec![option(1, "Math-Physique"), option(2, "Biochimie")],
            vec![
                school(1, "Institut Kolwezi", "Lualaba", "Kolwezi", "Dilala"),
                school(2, "Lycée Mwangeji", "Lualaba", "Kolwezi", "Manika"),
                school(3, "IT Salama", "Haut-Katanga", "Lubumbashi", "Lubumbashi"),
            ],
        )
    }

    #[test]
    fn region_cascade_domains() {
        let regions = RegionHierarchy::default();
        assert!(regions.cities(None).is_empty());
        assert_eq!(regions.cities(Some("lualaba")), vec!["Kolwezi", "Fungurume"]);
        assert!(regions.communes(Some("Lualaba"), None).is_empty());
        assert_eq!(
            regions.communes(Some("Lualaba"), Some("Kolwezi")),
            vec!["Dilala", "Manika", "Kanina"]
        );
        assert!(regions.communes(Some("Haut-Katanga"), Some("Kolwezi")).is_empty());
    }

    #[test]
    fn years_sorted_chronologically() {
        let catalog = sample_catalog();
        let labels: Vec<&str> = catalog.years().iter().map(|y| y.label.as_str()).collect();
        assert_eq!(labels, vec!["2021-2022", "2023-2024", "2024-2025"]);
        assert_eq!(catalog.latest_year().unwrap().id, 4);
        assert_eq!(catalog.year_starting(2023).unwrap().id, 3);
        assert!(catalog.year_starting(2022).is_none());
    }

    #[test]
    fn class_tiers_drive_option_lists() {
        let catalog = sample_catalog();
        assert!(catalog.options_for_class(10).is_empty());
        assert_eq!(catalog.options_for_class(11).len(), 2);
        assert!(catalog.options_for_class(99).is_empty());

        let unlabeled = class(20, "3ème", None, 4);
        assert_eq!(ClassTier::of(&unlabeled), ClassTier::Secondary);
        let early = class(21, "1ère", None, 1);
        assert_eq!(ClassTier::of(&early), ClassTier::Base);
    }

    #[test]
    fn entities_resolve_principal_option() {
        let catalog = sample_catalog();
        let entity = catalog.entity(2).unwrap();
        assert_eq!(entity.principal_category.as_deref(), Some("Math-Physique"));
        assert_eq!(entity.region.city, "Kolwezi");
    }

    #[test]
    fn search_by_name_or_code() {
        let catalog = sample_catalog();
        assert_eq!(catalog.search_entities("salama").len(), 1);
        assert_eq!(catalog.search_entities("s00").len(), 3);
        assert!(catalog.search_entities("").is_empty());
    }

    #[tokio::test]
    async fn load_records_failed_lists() {
        let service = MemoryService::new()
            .with_years(vec![year(1, "2024-2025")])
            .fail_list(ReferenceList::Classes);
        let catalog = ReferenceCatalog::load(&service).await;
        assert_eq!(catalog.years().len(), 1);
        assert!(catalog.classes().is_empty());
        assert_eq!(catalog.failures(), &[ReferenceList::Classes]);
        assert!(!catalog.is_available(ReferenceList::Classes));
        assert!(catalog.is_available(ReferenceList::Years));
    }
}
