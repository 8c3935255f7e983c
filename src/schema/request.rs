use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for the id of the person a story is generated for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reader age bracket. Ordered youngest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "6-7", alias = "six_to_seven")]
    SixToSeven,
    #[serde(rename = "8-9", alias = "eight_to_nine")]
    EightToNine,
    #[serde(rename = "10-11", alias = "ten_to_eleven")]
    TenToEleven,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [Self::SixToSeven, Self::EightToNine, Self::TenToEleven];

    pub fn label(&self) -> &'static str {
        match self {
            Self::SixToSeven => "6-7",
            Self::EightToNine => "8-9",
            Self::TenToEleven => "10-11",
        }
    }

    /// Age groups strictly older than this one, nearest first.
    pub fn older(self) -> impl Iterator<Item = AgeGroup> {
        Self::ALL.into_iter().filter(move |g| *g > self)
    }

    pub fn parse(label: &str) -> Option<AgeGroup> {
        Self::ALL.into_iter().find(|g| g.label() == label.trim())
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Story theme chosen by the reader, e.g. `magic_fantasy`.
///
/// Themes are catalog vocabulary, so this stays an open string rather than
/// an enum. The themes that drive selection rules have associated constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(pub String);

impl Theme {
    pub const MAGIC_FANTASY: &'static str = "magic_fantasy";
    pub const ADVENTURE_ACTION: &'static str = "adventure_action";
    pub const ANIMALS_NATURE: &'static str = "animals_nature";
    pub const SPACE_SCIENCE: &'static str = "space_science";
    pub const FRIENDSHIP_FAMILY: &'static str = "friendship_family";
    pub const EVERYDAY_LIFE: &'static str = "everyday_life";

    pub fn new(theme: impl Into<String>) -> Self {
        Self(theme.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who the story casts in the leading role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterMode {
    /// A fictional protagonist drawn from the seed catalog.
    #[serde(rename = "surprise")]
    Surprise,
    /// The real reader stars in the story.
    #[serde(rename = "self")]
    SelfInsert,
    /// The reader plus named real people from their life.
    #[serde(rename = "family")]
    Family,
}

impl CharacterMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Surprise => "surprise",
            Self::SelfInsert => "self",
            Self::Family => "family",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Boy,
    Girl,
    Neutral,
}

/// The real person the story is generated for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonIdentity {
    pub name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub appearance: Option<String>,
}

/// A real person from the reader's life who appears in a "family" story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoStar {
    pub name: String,
    /// Relationship to the reader, e.g. "grandma" or "little brother".
    pub relationship: String,
    #[serde(default)]
    pub appearance: Option<String>,
}

/// Everything the caller supplies for one engine call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRequest {
    pub person_id: PersonId,
    pub age_group: AgeGroup,
    pub theme: Theme,
    pub character_mode: CharacterMode,
    pub person_identity: PersonIdentity,
    #[serde(default)]
    pub co_stars: Vec<CoStar>,
    #[serde(default)]
    pub learning_theme: Option<String>,
}
