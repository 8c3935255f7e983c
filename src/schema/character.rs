use serde::{Deserialize, Serialize};

use super::blueprint::{default_active, default_weight};
use super::request::{AgeGroup, Gender, Theme};

/// Which slot a character seed can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedRole {
    Protagonist,
    Sidekick,
    Antagonist,
}

impl SeedRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Protagonist => "protagonist",
            Self::Sidekick => "sidekick",
            Self::Antagonist => "antagonist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatureType {
    Human,
    Mythical,
}

/// Candidate first names for a seed, grouped by gender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamePool {
    #[serde(default)]
    pub boy: Vec<String>,
    #[serde(default)]
    pub girl: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
}

impl NamePool {
    pub fn for_gender(&self, gender: Gender) -> &[String] {
        match gender {
            Gender::Boy => &self.boy,
            Gender::Girl => &self.girl,
            Gender::Neutral => &self.neutral,
        }
    }

    /// Every name in the pool, boy names first.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.boy.iter().chain(&self.girl).chain(&self.neutral)
    }

    pub fn is_empty(&self) -> bool {
        self.boy.is_empty() && self.girl.is_empty() && self.neutral.is_empty()
    }
}

/// A reusable archetype for a protagonist, sidekick or antagonist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSeed {
    pub key: String,
    pub role: SeedRole,
    pub creature_type: CreatureType,
    #[serde(default)]
    pub appearance: Option<String>,
    pub personality: String,
    pub weakness: String,
    pub strength: String,
    #[serde(default)]
    pub cultural_background: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Empty means suitable for every age group.
    #[serde(default)]
    pub applicable_ages: Vec<AgeGroup>,
    #[serde(default)]
    pub names: NamePool,
    #[serde(default)]
    pub compatible_themes: Vec<Theme>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl CharacterSeed {
    pub fn suits_age(&self, age: AgeGroup) -> bool {
        self.applicable_ages.is_empty() || self.applicable_ages.contains(&age)
    }

    /// Cultural background, ignoring blank values.
    pub fn background(&self) -> Option<&str> {
        self.cultural_background
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}
