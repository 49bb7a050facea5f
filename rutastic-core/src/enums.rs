//! Enum types for Rutastic entities

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROUTE ENUMS
// ============================================================================

/// Difficulty of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Easy,
    Medium,
    Hard,
}

impl SkillLevel {
    /// Value stored by the backend for this level.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            SkillLevel::Easy => "facil",
            SkillLevel::Medium => "media",
            SkillLevel::Hard => "dificil",
        }
    }

    pub fn from_wire_str(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facil" | "easy" => Ok(SkillLevel::Easy),
            "media" | "medium" => Ok(SkillLevel::Medium),
            "dificil" | "hard" => Ok(SkillLevel::Hard),
            other => Err(ValidationError::InvalidValue {
                field: "skill_level".to_string(),
                reason: format!("unknown skill level '{}'", other),
            }),
        }
    }

    /// Numeric code the route filter endpoint expects.
    pub fn filter_code(&self) -> u8 {
        match self {
            SkillLevel::Easy => 1,
            SkillLevel::Medium => 2,
            SkillLevel::Hard => 3,
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SkillLevel::Easy => "easy",
            SkillLevel::Medium => "medium",
            SkillLevel::Hard => "hard",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for SkillLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire_str(s)
    }
}

/// Ordering of filtered routes by kudo balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KudoOrdering {
    #[default]
    Unordered,
    Ascending,
    Descending,
}

impl KudoOrdering {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            KudoOrdering::Unordered => "no-ordenar",
            KudoOrdering::Ascending => "ascendentes",
            KudoOrdering::Descending => "descendentes",
        }
    }
}

/// Dimension along which routes related to a reference route are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    /// Distance within a tolerance band computed client-side.
    Distance,
    /// Exact skill level match.
    SkillLevel,
    /// Exact category set match.
    Categories,
}

impl Similarity {
    pub const ALL: [Similarity; 3] = [
        Similarity::Distance,
        Similarity::SkillLevel,
        Similarity::Categories,
    ];

    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Similarity::Distance => "distancia",
            Similarity::SkillLevel => "dificultad",
            Similarity::Categories => "categorias",
        }
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Similarity::Distance => "distance",
            Similarity::SkillLevel => "skill_level",
            Similarity::Categories => "categories",
        };
        write!(f, "{}", value)
    }
}

// ============================================================================
// VOTES
// ============================================================================

/// Direction of a kudo vote. The backend toggles: repeating a direction
/// retracts the vote, the opposite direction switches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_i8(&self) -> i8 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    /// Action verb understood by the vote endpoint.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "dar",
            VoteDirection::Down => "quitar",
        }
    }
}

impl TryFrom<i8> for VoteDirection {
    type Error = ValidationError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(ValidationError::InvalidVoteDirection { value: other }),
        }
    }
}

impl From<VoteDirection> for i8 {
    fn from(direction: VoteDirection) -> Self {
        direction.as_i8()
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.as_i8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_direction_accepts_only_unit_values() {
        assert_eq!(VoteDirection::try_from(1), Ok(VoteDirection::Up));
        assert_eq!(VoteDirection::try_from(-1), Ok(VoteDirection::Down));
        for bad in [0i8, 2, -2, i8::MIN, i8::MAX] {
            assert!(matches!(
                VoteDirection::try_from(bad),
                Err(ValidationError::InvalidVoteDirection { value }) if value == bad
            ));
        }
    }

    #[test]
    fn test_vote_direction_display_is_signed() {
        assert_eq!(VoteDirection::Up.to_string(), "+1");
        assert_eq!(VoteDirection::Down.to_string(), "-1");
    }

    #[test]
    fn test_vote_direction_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<VoteDirection>("0").is_err());
        let up: VoteDirection = serde_json::from_str("1").expect("deserialize");
        assert_eq!(up, VoteDirection::Up);
    }

    #[test]
    fn test_skill_level_wire_round_trip() {
        for level in [SkillLevel::Easy, SkillLevel::Medium, SkillLevel::Hard] {
            assert_eq!(SkillLevel::from_wire_str(level.as_wire_str()), Ok(level));
        }
        assert_eq!("Medium".parse::<SkillLevel>(), Ok(SkillLevel::Medium));
        assert!("extreme".parse::<SkillLevel>().is_err());
    }

    #[test]
    fn test_skill_level_filter_codes() {
        assert_eq!(SkillLevel::Easy.filter_code(), 1);
        assert_eq!(SkillLevel::Medium.filter_code(), 2);
        assert_eq!(SkillLevel::Hard.filter_code(), 3);
    }
}
