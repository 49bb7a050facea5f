//! Entity types read from the backend

use crate::enums::SkillLevel;
use crate::error::ValidationError;
use crate::identity::{RouteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A route as listed by search, leaderboard and related-route endpoints.
///
/// Instances are only ever produced by a backend read; the client never edits
/// one after a write; it re-reads instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub id: RouteId,
    pub title: String,
    /// Meters.
    pub distance: u32,
    /// Meters of positive elevation gain.
    pub elevation: u32,
    /// Minutes.
    pub duration: u32,
    pub difficulty: SkillLevel,
    pub categories: BTreeSet<String>,
    pub author: String,
    /// Sum of all kudo modifiers cast on the route.
    pub kudos: i64,
    pub blocked: bool,
}

/// The author-editable fields of a route, sent as a whole on edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEdit {
    pub id: RouteId,
    pub title: String,
    /// Not part of listings; the editor supplies it.
    pub description: String,
    pub distance: u32,
    pub elevation: u32,
    pub duration: u32,
    pub difficulty: SkillLevel,
    pub categories: BTreeSet<String>,
}

impl RouteEdit {
    /// Start an edit from the route as last read.
    pub fn from_route(route: &RouteSummary, description: impl Into<String>) -> Self {
        Self {
            id: route.id,
            title: route.title.clone(),
            description: description.into(),
            distance: route.distance,
            elevation: route.elevation,
            duration: route.duration,
            difficulty: route.difficulty,
            categories: route.categories.clone(),
        }
    }

    /// Title, description and at least one category are required; distance
    /// and duration must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.id.is_valid() {
            return Err(ValidationError::InvalidRouteId { route_id: self.id });
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title", "must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description", "must not be empty"));
        }
        if self.categories.iter().all(|c| c.trim().is_empty()) {
            return Err(invalid("categories", "at least one category is required"));
        }
        if self.distance == 0 {
            return Err(invalid("distance", "must be > 0"));
        }
        if self.duration == 0 {
            return Err(invalid("duration", "must be > 0"));
        }
        Ok(())
    }

    /// Overwrite the editable fields of `route`.
    pub fn apply_to(&self, route: &mut RouteSummary) {
        route.title = self.title.clone();
        route.distance = self.distance;
        route.elevation = self.elevation;
        route.duration = self.duration;
        route.difficulty = self.difficulty;
        route.categories = self.categories.clone();
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Entry of an author leaderboard; `stat` is either a route count or an
/// average rating depending on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorStat {
    pub username: String,
    pub stat: f32,
}

/// One vote cast by a user on a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KudoEntry {
    pub username: String,
    pub route_id: RouteId,
    /// -1, 0 or +1.
    pub modifier: i8,
    pub submitted_at: Option<Timestamp>,
}

/// The current identity's own vote per route.
///
/// Always a complete mapping built from one vote-history read; there is no
/// operation that patches a single entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KudoOverlay {
    entries: BTreeMap<RouteId, i8>,
}

impl KudoOverlay {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fold a vote history into an overlay. Later entries for the same route
    /// replace earlier ones.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a KudoEntry>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.route_id, entry.modifier.clamp(-1, 1)))
            .collect();
        Self { entries }
    }

    /// The identity's modifier for `route_id`, 0 when it never voted.
    pub fn modifier_for(&self, route_id: RouteId) -> i8 {
        self.entries.get(&route_id).copied().unwrap_or(0)
    }

    pub fn get(&self, route_id: RouteId) -> Option<i8> {
        self.entries.get(&route_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouteId, i8)> + '_ {
        self.entries.iter().map(|(id, modifier)| (*id, *modifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(route: i64, modifier: i8) -> KudoEntry {
        KudoEntry {
            username: "ana".to_string(),
            route_id: RouteId::new(route),
            modifier,
            submitted_at: None,
        }
    }

    #[test]
    fn test_overlay_folds_history() {
        let history = vec![entry(1, 1), entry(2, -1), entry(3, 0)];
        let overlay = KudoOverlay::from_entries(&history);
        assert_eq!(overlay.len(), 3);
        assert_eq!(overlay.modifier_for(RouteId::new(1)), 1);
        assert_eq!(overlay.modifier_for(RouteId::new(2)), -1);
        assert_eq!(overlay.get(RouteId::new(3)), Some(0));
        assert_eq!(overlay.get(RouteId::new(9)), None);
        assert_eq!(overlay.modifier_for(RouteId::new(9)), 0);
    }

    #[test]
    fn test_overlay_last_entry_wins() {
        let history = vec![entry(5, 1), entry(5, -1)];
        let overlay = KudoOverlay::from_entries(&history);
        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay.modifier_for(RouteId::new(5)), -1);
    }

    fn summary() -> RouteSummary {
        RouteSummary {
            id: RouteId::new(4),
            title: "Ruta del bosque".to_string(),
            distance: 2_400,
            elevation: 240,
            duration: 50,
            difficulty: SkillLevel::Medium,
            categories: ["trail".to_string()].into_iter().collect(),
            author: "leo".to_string(),
            kudos: 5,
            blocked: false,
        }
    }

    #[test]
    fn test_route_edit_validation() {
        let edit = RouteEdit::from_route(&summary(), "Pinar y arroyo");
        assert!(edit.validate().is_ok());

        let mut untitled = edit.clone();
        untitled.title = "  ".to_string();
        assert!(matches!(
            untitled.validate(),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "title"
        ));

        let mut undescribed = edit.clone();
        undescribed.description.clear();
        assert!(undescribed.validate().is_err());

        let mut uncategorized = edit.clone();
        uncategorized.categories.clear();
        assert!(uncategorized.validate().is_err());

        let mut zero_length = edit;
        zero_length.distance = 0;
        assert!(zero_length.validate().is_err());
    }

    #[test]
    fn test_route_edit_keeps_author_and_balance() {
        let mut route = summary();
        let mut edit = RouteEdit::from_route(&route, "Pinar y arroyo");
        edit.title = "Bosque alto".to_string();
        edit.difficulty = SkillLevel::Hard;

        edit.apply_to(&mut route);

        assert_eq!(route.title, "Bosque alto");
        assert_eq!(route.difficulty, SkillLevel::Hard);
        assert_eq!(route.author, "leo");
        assert_eq!(route.kudos, 5);
    }

    #[test]
    fn test_overlay_clamps_out_of_range_modifiers() {
        let history = vec![entry(7, 4)];
        let overlay = KudoOverlay::from_entries(&history);
        assert_eq!(overlay.modifier_for(RouteId::new(7)), 1);
    }
}
