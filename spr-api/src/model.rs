//! Reference lists, ranking snapshots and aggregate summaries.
//!
//! Field names follow the results service's JSON (`libelle`, `moyenne`,
//! `tauxReussite`, ...) via serde renames so payloads decode directly.

use crate::wire::ForeignRef;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type SchoolId = u32;
pub type YearId = u32;
pub type ClassId = u32;
pub type OptionId = u32;

/// A school year from the reference catalog, e.g. `{ id: 4, libelle: "2023-2024" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolYear {
    pub id: YearId,
    #[serde(rename = "libelle")]
    pub label: String,
}

/// A class (grade) with its position in the curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLevel {
    pub id: ClassId,
    #[serde(rename = "nom")]
    pub name: String,
    /// Tier label as entered by administrators ("Secondaire", "Primaire", ...).
    #[serde(rename = "niveau", default)]
    pub tier_label: Option<String>,
    #[serde(rename = "numero_ordre")]
    pub level_order: u32,
}

/// A study option (track) offered in secondary classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyOption {
    pub id: OptionId,
    #[serde(rename = "nom")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Query-string code used by the results service.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Display label used on the dashboards.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Garçons",
            Gender::Female => "Filles",
        }
    }

    /// Words a free-text filter may use for this gender.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Gender::Male => &["m", "masculin", "garçons", "garcons", "male"],
            Gender::Female => &["f", "féminin", "feminin", "filles", "female"],
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Province / city / commune of a school.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPath {
    pub province: String,
    pub city: String,
    pub commune: String,
}

impl fmt::Display for RegionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.commune.is_empty(), self.city.is_empty()) {
            (false, false) => write!(f, "{}, {}", self.commune, self.city),
            (true, false) => f.write_str(&self.city),
            (false, true) => f.write_str(&self.commune),
            (true, true) => f.write_str(&self.province),
        }
    }
}

/// School record as returned by the schools endpoint.
///
/// `option_principale` arrives either as a bare option id or as an embedded
/// option object; see [`ForeignRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub id: SchoolId,
    pub nom: String,
    #[serde(default)]
    pub code_ecole: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub ville: String,
    #[serde(default)]
    pub commune: String,
    #[serde(default)]
    pub option_principale: Option<ForeignRef<StudyOption>>,
}

/// A comparable unit (a school), normalized from a [`SchoolRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: SchoolId,
    pub name: String,
    pub code: String,
    pub region: RegionPath,
    pub principal_category: Option<String>,
}

/// One row of a ranking query: the metrics of one school for one
/// (year, filter) combination. Ranks are assigned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    #[serde(rename = "id")]
    pub entity_id: SchoolId,
    #[serde(rename = "nom", default)]
    pub name: String,
    #[serde(rename = "ville", default)]
    pub city: String,
    #[serde(default)]
    pub commune: String,
    #[serde(rename = "moyenne")]
    pub average: f64,
    #[serde(rename = "tauxReussite")]
    pub success_rate: f64,
    #[serde(rename = "optionPrincipale", default)]
    pub principal_category: String,
    #[serde(rename = "rang")]
    pub rank: u32,
    #[serde(rename = "nombreEleves", default)]
    pub population: u64,
}

/// Summary statistics for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    #[serde(rename = "moyenneGenerale")]
    pub overall_average: f64,
    #[serde(rename = "tauxReussiteGlobal")]
    pub overall_success_rate: f64,
    #[serde(rename = "nombreEcoles")]
    pub entity_count: usize,
    #[serde(rename = "nombreEleves")]
    pub population_count: u64,
}

/// Filters suggested by the natural-language service. Every field is a
/// free string to be resolved against the reference lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSuggestion {
    #[serde(rename = "ville", default)]
    pub city: Option<String>,
    #[serde(rename = "genre", default)]
    pub gender: Option<String>,
    #[serde(rename = "annee", default)]
    pub year: Option<String>,
    #[serde(rename = "classe", default)]
    pub class: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
}

/// The small lookup lists loaded once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceList {
    Years,
    Classes,
    Options,
    Schools,
}

impl fmt::Display for ReferenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceList::Years => "years",
            ReferenceList::Classes => "classes",
            ReferenceList::Options => "options",
            ReferenceList::Schools => "schools",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_snapshot_decodes_service_payload() {
        let json = r#"{
            "id": 7, "nom": "IT Salama", "ville": "Lubumbashi", "commune": "Kampemba",
            "moyenne": 72.5, "tauxReussite": 91.0, "optionPrincipale": "Electronique",
            "rang": 1, "nombreEleves": 240
        }"#;
        let row: RankingSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(row.entity_id, 7);
        assert_eq!(row.rank, 1);
        assert_eq!(row.population, 240);
        assert_eq!(row.principal_category, "Electronique");
    }

    #[test]
    fn aggregate_summary_decodes_global_stats() {
        let json = r#"{"moyenneGenerale": 61.2, "tauxReussiteGlobal": 78.0, "nombreEcoles": 12, "nombreEleves": 3400}"#;
        let summary: AggregateSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.entity_count, 12);
        assert_eq!(summary.population_count, 3400);
    }

    #[test]
    fn region_path_display() {
        let region = RegionPath {
            province: "Lualaba".into(),
            city: "Kolwezi".into(),
            commune: "Dilala".into(),
        };
        assert_eq!(region.to_string(), "Dilala, Kolwezi");

        let province_only = RegionPath {
            province: "Lualaba".into(),
            ..Default::default()
        };
        assert_eq!(province_only.to_string(), "Lualaba");
    }

    #[test]
    fn gender_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"F\"");
        assert_eq!(Gender::Male.code(), "M");
    }
}
