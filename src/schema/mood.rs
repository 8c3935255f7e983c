use serde::{Deserialize, Serialize};
use std::fmt;

/// How emotionally deep a story should go.
///
/// Variant order is meaningful: `Light < Medium < Deep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Light,
    Medium,
    Deep,
}

impl Intensity {
    pub const ALL: [Intensity; 3] = [Self::Light, Self::Medium, Self::Deep];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Deep => "deep",
        }
    }

    pub fn parse(label: &str) -> Option<Intensity> {
        Self::ALL.into_iter().find(|i| i.label() == label)
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The narrative voice layered on top of a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMode {
    Dramatic,
    Comedic,
    Adventurous,
    Gentle,
    Absurd,
}

impl ToneMode {
    /// Candidate pool, in the order used for the last-resort pick.
    pub const ALL: [ToneMode; 5] = [
        Self::Dramatic,
        Self::Comedic,
        Self::Adventurous,
        Self::Gentle,
        Self::Absurd,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dramatic => "dramatic",
            Self::Comedic => "comedic",
            Self::Adventurous => "adventurous",
            Self::Gentle => "gentle",
            Self::Absurd => "absurd",
        }
    }

    pub fn parse(label: &str) -> Option<ToneMode> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for ToneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
