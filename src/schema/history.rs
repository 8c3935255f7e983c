use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::character::SeedRole;
use super::element::ElementType;
use super::mood::{Intensity, ToneMode};
use super::request::PersonId;

/// One past selection event for a person. Appended by the caller after a
/// story completes and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionHistoryRecord {
    pub person_id: PersonId,
    #[serde(default)]
    pub blueprint_key: Option<String>,
    #[serde(default)]
    pub tone: Option<ToneMode>,
    #[serde(default)]
    pub intensity: Option<Intensity>,
    #[serde(default)]
    pub protagonist_key: Option<String>,
    #[serde(default)]
    pub sidekick_key: Option<String>,
    #[serde(default)]
    pub antagonist_key: Option<String>,
    #[serde(default)]
    pub element_keys: BTreeMap<ElementType, String>,
    /// Cultural background of the protagonist, if one was chosen.
    #[serde(default)]
    pub cultural_background: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SelectionHistoryRecord {
    /// An empty record for `person_id`, stamped `created_at`.
    pub fn new(person_id: PersonId, created_at: DateTime<Utc>) -> Self {
        Self {
            person_id,
            blueprint_key: None,
            tone: None,
            intensity: None,
            protagonist_key: None,
            sidekick_key: None,
            antagonist_key: None,
            element_keys: BTreeMap::new(),
            cultural_background: None,
            created_at,
        }
    }

    pub fn seed_key(&self, role: SeedRole) -> Option<&str> {
        match role {
            SeedRole::Protagonist => self.protagonist_key.as_deref(),
            SeedRole::Sidekick => self.sidekick_key.as_deref(),
            SeedRole::Antagonist => self.antagonist_key.as_deref(),
        }
    }
}

/// A single selection category inside a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryField {
    Intensity,
    Blueprint,
    Tone,
    Seed(SeedRole),
    Element(ElementType),
}

impl HistoryField {
    /// The key this field recorded, if any. Enum-valued fields yield their
    /// label.
    pub fn key_in<'a>(&self, record: &'a SelectionHistoryRecord) -> Option<&'a str> {
        match self {
            Self::Intensity => record.intensity.map(|i| i.label()),
            Self::Blueprint => record.blueprint_key.as_deref(),
            Self::Tone => record.tone.map(|t| t.label()),
            Self::Seed(role) => record.seed_key(*role),
            Self::Element(t) => record.element_keys.get(t).map(String::as_str),
        }
    }
}
