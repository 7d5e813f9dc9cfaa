//! Normalization of loosely shaped payloads.
//!
//! The results service is inconsistent about two shapes:
//! - foreign keys arrive either as a raw id or as the embedded object
//! - suggested filters arrive either as an object or as a JSON-encoded string
//!
//! Both are folded into typed values here so nothing downstream inspects
//! the raw shape.

use crate::error::Result;
use crate::model::{FilterSuggestion, StudyOption};
use serde::{Deserialize, Serialize};

/// Anything with a stable numeric identifier.
pub trait Identified {
    fn id(&self) -> u32;
}

impl Identified for StudyOption {
    fn id(&self) -> u32 {
        self.id
    }
}

/// A reference to another record: either its id or the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignRef<T> {
    Id(u32),
    Embedded(T),
}

impl<T: Identified> ForeignRef<T> {
    /// The referenced id, whichever shape arrived.
    pub fn id(&self) -> u32 {
        match self {
            ForeignRef::Id(id) => *id,
            ForeignRef::Embedded(record) => record.id(),
        }
    }

    /// Resolve against a lookup table. Embedded records resolve to themselves.
    pub fn resolve<'a>(&'a self, table: &'a [T]) -> Option<&'a T> {
        match self {
            ForeignRef::Id(id) => table.iter().find(|record| record.id() == *id),
            ForeignRef::Embedded(record) => Some(record),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFilters {
    Object(FilterSuggestion),
    Encoded(String),
}

/// Response body of the filter-suggestion endpoint: `{ "filters": ... }`.
#[derive(Debug, Deserialize)]
pub struct SuggestionEnvelope {
    filters: RawFilters,
}

impl SuggestionEnvelope {
    /// Decode the filters, parsing the string form when needed.
    pub fn into_suggestion(self) -> Result<FilterSuggestion> {
        match self.filters {
            RawFilters::Object(suggestion) => Ok(suggestion),
            RawFilters::Encoded(text) => Ok(serde_json::from_str(&text)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchoolRecord;

    fn options() -> Vec<StudyOption> {
        vec![
            StudyOption { id: 1, name: "Math-Info".into() },
            StudyOption { id: 2, name: "Biochimie".into() },
        ]
    }

    #[test]
    fn foreign_ref_accepts_both_shapes() {
        let by_id: SchoolRecord =
            serde_json::from_str(r#"{"id": 1, "nom": "A", "option_principale": 2}"#).unwrap();
        let embedded: SchoolRecord = serde_json::from_str(
            r#"{"id": 2, "nom": "B", "option_principale": {"id": 1, "nom": "Math-Info"}}"#,
        )
        .unwrap();

        let table = options();
        let by_id_ref = by_id.option_principale.unwrap();
        assert_eq!(by_id_ref.id(), 2);
        assert_eq!(by_id_ref.resolve(&table).unwrap().name, "Biochimie");

        let embedded_ref = embedded.option_principale.unwrap();
        assert_eq!(embedded_ref.id(), 1);
        assert_eq!(embedded_ref.resolve(&[]).unwrap().name, "Math-Info");
    }

    #[test]
    fn dangling_id_does_not_resolve() {
        let dangling: ForeignRef<StudyOption> = ForeignRef::Id(99);
        assert!(dangling.resolve(&options()).is_none());
    }

    #[test]
    fn suggestion_envelope_object_and_string() {
        let object: SuggestionEnvelope =
            serde_json::from_str(r#"{"filters": {"ville": "Kolwezi", "annee": "2024"}}"#).unwrap();
        let object = object.into_suggestion().unwrap();
        assert_eq!(object.city.as_deref(), Some("Kolwezi"));
        assert_eq!(object.year.as_deref(), Some("2024"));

        let encoded: SuggestionEnvelope =
            serde_json::from_str(r#"{"filters": "{\"genre\": \"filles\"}"}"#).unwrap();
        let encoded = encoded.into_suggestion().unwrap();
        assert_eq!(encoded.gender.as_deref(), Some("filles"));
        assert!(encoded.city.is_none());
    }

    #[test]
    fn suggestion_envelope_rejects_garbage_string() {
        let garbage: SuggestionEnvelope =
            serde_json::from_str(r#"{"filters": "not json"}"#).unwrap();
        assert!(garbage.into_suggestion().is_err());
    }
}
