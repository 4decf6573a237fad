use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of activity that produced an evolution event.
///
/// Known activities map to experience rates; anything else is carried through
/// as `Other` and earns the neutral rate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PhysicalActivity,
    MentalChallenge,
    SocialInteraction,
    Combat,
    Exploration,
    Training,
    Other(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            EventType::PhysicalActivity => "physical_activity",
            EventType::MentalChallenge => "mental_challenge",
            EventType::SocialInteraction => "social_interaction",
            EventType::Combat => "combat",
            EventType::Exploration => "exploration",
            EventType::Training => "training",
            EventType::Other(name) => name,
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "physical_activity" => EventType::PhysicalActivity,
            "mental_challenge" => EventType::MentalChallenge,
            "social_interaction" => EventType::SocialInteraction,
            "combat" => EventType::Combat,
            "exploration" => EventType::Exploration,
            "training" => EventType::Training,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        EventType::from(name.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Special circumstance of an event that scales experience.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    FirstTime,
    RareEvent,
    Challenging,
    Mastery,
    Discovery,
    Other(String),
}

impl Condition {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Condition::FirstTime => "first_time",
            Condition::RareEvent => "rare_event",
            Condition::Challenging => "challenging",
            Condition::Mastery => "mastery",
            Condition::Discovery => "discovery",
            Condition::Other(name) => name,
        }
    }
}

impl From<&str> for Condition {
    fn from(name: &str) -> Self {
        match name {
            "first_time" => Condition::FirstTime,
            "rare_event" => Condition::RareEvent,
            "challenging" => Condition::Challenging,
            "mastery" => Condition::Mastery,
            "discovery" => Condition::Discovery,
            other => Condition::Other(other.to_string()),
        }
    }
}

impl From<String> for Condition {
    fn from(name: String) -> Self {
        Condition::from(name.as_str())
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.as_str().to_string()
    }
}

/// Payload of an activity completion.
///
/// Recognised fields are typed; everything else lands in `extra` so payloads
/// from newer callers survive a round trip through the event log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_experience: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievement_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery_level: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_experience(mut self, base: f64) -> Self {
        self.base_experience = Some(base);
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Sets `<trigger>_level`, using the typed field when one exists.
    #[must_use]
    pub fn with_trigger_level(mut self, trigger: &str, level: f64) -> Self {
        match trigger {
            "stress" => self.stress_level = Some(level),
            "achievement" => self.achievement_level = Some(level),
            "mastery" => self.mastery_level = Some(level),
            other => {
                if let Some(number) = serde_json::Number::from_f64(level) {
                    self.extra
                        .insert(format!("{other}_level"), Value::Number(number));
                }
            }
        }
        self
    }

    /// Level reported for a mutation trigger, looked up as `<trigger>_level`.
    #[must_use]
    pub fn trigger_level(&self, trigger: &str) -> Option<f64> {
        match trigger {
            "stress" => self.stress_level,
            "achievement" => self.achievement_level,
            "mastery" => self.mastery_level,
            other => self
                .extra
                .get(&format!("{other}_level"))
                .and_then(Value::as_f64),
        }
    }
}
