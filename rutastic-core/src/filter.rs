//! Route filter queries
//!
//! A [`RouteQuery`] is the full set of recognized filter fields for a route
//! search. The client keeps only the most recently executed query; it is the
//! key used to refresh the filtered route list after any mutation.

use crate::enums::{KudoOrdering, SkillLevel};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Separator that turns free text into a keyword list.
pub const KEYWORD_SEPARATOR: char = ';';

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Distance bounds in meters.
pub type DistanceRange = BoundRange;

/// Duration bounds in minutes.
pub type DurationRange = BoundRange;

impl BoundRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn between(min: u32, max: u32) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: u32) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(ValidationError::InvertedRange {
                field: field.to_string(),
                min,
                max,
            }),
            _ => Ok(()),
        }
    }
}

/// Filter applied to the route search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteQuery {
    /// Literal sentence, or `;`-separated keyword list, matched against
    /// title and description.
    pub text: Option<String>,
    /// Restrict to routes authored by this username.
    pub author: Option<String>,
    pub categories: BTreeSet<String>,
    pub distance: DistanceRange,
    pub duration: DurationRange,
    pub difficulty: Option<SkillLevel>,
    pub ordering: KudoOrdering,
    pub min_kudos: Option<i64>,
    pub hide_blocked: bool,
    /// Restrict to routes authored by the signed-in identity.
    pub only_mine: bool,
}

impl RouteQuery {
    /// The empty query: every route the backend is willing to list.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_distance(mut self, range: DistanceRange) -> Self {
        self.distance = range;
        self
    }

    pub fn with_duration(mut self, range: DurationRange) -> Self {
        self.duration = range;
        self
    }

    pub fn with_difficulty(mut self, difficulty: SkillLevel) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_ordering(mut self, ordering: KudoOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_min_kudos(mut self, min_kudos: i64) -> Self {
        self.min_kudos = Some(min_kudos);
        self
    }

    pub fn hiding_blocked(mut self) -> Self {
        self.hide_blocked = true;
        self
    }

    pub fn only_mine(mut self) -> Self {
        self.only_mine = true;
        self
    }

    /// Reject queries the backend could never satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.distance.validate("distance")?;
        self.duration.validate("duration")?;
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: "categories".to_string(),
                reason: "category names must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Search terms derived from `text`: a keyword list when the text contains
    /// the separator, otherwise the whole trimmed sentence. Blank text yields
    /// no terms.
    pub fn search_terms(&self) -> Vec<String> {
        let Some(text) = self.text.as_deref() else {
            return Vec::new();
        };
        if text.trim().is_empty() {
            return Vec::new();
        }
        if text.contains(KEYWORD_SEPARATOR) {
            text.split(KEYWORD_SEPARATOR)
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![text.trim().to_string()]
        }
    }

    /// Author filter with surrounding whitespace removed; blank counts as none.
    pub fn author_filter(&self) -> Option<&str> {
        self.author
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_query_is_valid() {
        assert!(RouteQuery::all().validate().is_ok());
    }

    #[test]
    fn test_inverted_distance_rejected() {
        let query = RouteQuery::all().with_distance(BoundRange::between(5_000, 1_000));
        assert!(matches!(
            query.validate(),
            Err(ValidationError::InvertedRange { ref field, min: 5_000, max: 1_000 }) if field == "distance"
        ));
    }

    #[test]
    fn test_inverted_duration_rejected() {
        let query = RouteQuery::all().with_duration(BoundRange::between(90, 30));
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_blank_category_rejected() {
        let query = RouteQuery::all().with_category("  ");
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_search_terms_literal_and_keywords() {
        let literal = RouteQuery::all().with_text("  lake loop ");
        assert_eq!(literal.search_terms(), vec!["lake loop".to_string()]);

        let keywords = RouteQuery::all().with_text("lake; forest ;;");
        assert_eq!(
            keywords.search_terms(),
            vec!["lake".to_string(), "forest".to_string()]
        );

        assert!(RouteQuery::all().with_text("   ").search_terms().is_empty());
    }

    #[test]
    fn test_author_filter_trims() {
        assert_eq!(RouteQuery::all().with_author(" ana ").author_filter(), Some("ana"));
        assert_eq!(RouteQuery::all().with_author("  ").author_filter(), None);
    }

    proptest! {
        #[test]
        fn ordered_ranges_always_validate(min in 0u32..100_000, span in 0u32..100_000) {
            let query = RouteQuery::all()
                .with_distance(BoundRange::between(min, min.saturating_add(span)))
                .with_duration(BoundRange::new(Some(min), None));
            prop_assert!(query.validate().is_ok());
        }

        #[test]
        fn range_contains_respects_bounds(min in 0u32..1_000, max in 1_000u32..2_000, value in 0u32..3_000) {
            let range = BoundRange::between(min, max);
            prop_assert_eq!(range.contains(value), value >= min && value <= max);
        }
    }
}
