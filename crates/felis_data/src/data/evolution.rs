use super::event::{EventData, EventType};
use super::genetics::{CatId, Mutation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a recorded evolution event.
pub type EventId = i64;

/// Discrete evolution tier, ordered and monotonic per cat.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum EvolutionStage {
    #[default]
    Basic = 1,
    Evolved = 2,
    Advanced = 3,
    Superior = 4,
    Ultimate = 5,
}

impl EvolutionStage {
    pub const ALL: [EvolutionStage; 5] = [
        EvolutionStage::Basic,
        EvolutionStage::Evolved,
        EvolutionStage::Advanced,
        EvolutionStage::Superior,
        EvolutionStage::Ultimate,
    ];

    /// Numeric stage, 1..=5.
    #[must_use]
    pub fn level(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EvolutionStage::Basic => "Basic",
            EvolutionStage::Evolved => "Evolved",
            EvolutionStage::Advanced => "Advanced",
            EvolutionStage::Superior => "Superior",
            EvolutionStage::Ultimate => "Ultimate",
        }
    }

    /// Following stage; `None` at the ceiling.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_level(self.level() + 1)
    }
}

impl TryFrom<u8> for EvolutionStage {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| format!("invalid evolution stage {level}"))
    }
}

impl From<EvolutionStage> for u8 {
    fn from(stage: EvolutionStage) -> Self {
        stage.level()
    }
}

impl fmt::Display for EvolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.level())
    }
}

/// Non-genetic adjustment recorded alongside evolution progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub factor: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Configured weight of the factor.
    pub weight: f64,
    /// Strength in (0, 1].
    pub strength: f64,
    pub timestamp: DateTime<Utc>,
}

/// Accumulated evolution state of one cat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionData {
    pub cat_id: CatId,
    pub experience_points: u64,
    pub evolution_stage: EvolutionStage,
    #[serde(default)]
    pub adaptations: Vec<Adaptation>,
    #[serde(default)]
    pub mutations: Vec<Mutation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvolutionData {
    /// Fresh row for a cat without any recorded events.
    #[must_use]
    pub fn new(cat_id: CatId, now: DateTime<Utc>) -> Self {
        Self {
            cat_id,
            experience_points: 0,
            evolution_stage: EvolutionStage::Basic,
            adaptations: Vec::new(),
            mutations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn has_mutation(&self, kind: &str) -> bool {
        self.mutations.iter().any(|m| m.kind == kind)
    }

    #[must_use]
    pub fn has_adaptation(&self, kind: &str) -> bool {
        self.adaptations.iter().any(|a| a.kind == kind)
    }
}

/// Contents of an evolution event, as computed before it is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub cat_id: CatId,
    pub event_type: EventType,
    pub event_data: EventData,
    pub experience_gain: u64,
    pub adaptations: Vec<Adaptation>,
    pub mutations: Vec<Mutation>,
    pub new_stage: EvolutionStage,
    pub created_at: DateTime<Utc>,
}

/// Stored, immutable evolution log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEvent {
    pub id: EventId,
    #[serde(flatten)]
    pub record: EventRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_levels_and_ceiling() {
        assert_eq!(EvolutionStage::from_level(0), None);
        assert_eq!(EvolutionStage::from_level(3), Some(EvolutionStage::Advanced));
        assert_eq!(EvolutionStage::Basic.next(), Some(EvolutionStage::Evolved));
        assert_eq!(EvolutionStage::Ultimate.next(), None);
        assert!(EvolutionStage::Evolved < EvolutionStage::Superior);
    }

    #[test]
    fn test_stage_serializes_as_number() {
        assert_eq!(serde_json::to_string(&EvolutionStage::Superior).unwrap(), "4");
        let stage: EvolutionStage = serde_json::from_str("2").unwrap();
        assert_eq!(stage, EvolutionStage::Evolved);
        assert!(serde_json::from_str::<EvolutionStage>("6").is_err());
    }
}
