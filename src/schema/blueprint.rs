use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::mood::Intensity;
use super::request::{AgeGroup, Theme};

/// Broad family an emotional arc belongs to.
///
/// Only `Social`, `Courage` and `Humor` change selection behavior; catalog
/// categories this build does not know deserialize to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintCategory {
    Social,
    Courage,
    Humor,
    Wonder,
    Comfort,
    Growth,
    #[serde(other)]
    Other,
}

impl BlueprintCategory {
    /// Categories whose arcs call for an antagonist.
    pub fn wants_antagonist(&self) -> bool {
        matches!(self, Self::Social | Self::Courage)
    }
}

pub(crate) fn default_weight() -> f64 {
    1.0
}

pub(crate) fn default_active() -> bool {
    true
}

/// A reusable emotional-arc template with age-specific phrasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionBlueprint {
    pub key: String,
    pub category: BlueprintCategory,
    /// Arc text per age group. Missing groups fall back through older
    /// groups to `generic_arc`.
    #[serde(default)]
    pub arc_by_age: HashMap<AgeGroup, String>,
    pub generic_arc: String,
    #[serde(default)]
    pub tone_guidance: Option<String>,
    #[serde(default)]
    pub surprise_moment: Option<String>,
    #[serde(default)]
    pub ending_feeling: Option<String>,
    /// Empty means compatible with every theme.
    #[serde(default)]
    pub compatible_themes: Vec<Theme>,
    pub min_intensity: Intensity,
    pub ideal_ages: Vec<AgeGroup>,
    #[serde(default)]
    pub learning_themes: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl EmotionBlueprint {
    pub fn suits_age(&self, age: AgeGroup) -> bool {
        self.ideal_ages.contains(&age)
    }

    pub fn suits_theme(&self, theme: &Theme) -> bool {
        self.compatible_themes.is_empty() || self.compatible_themes.contains(theme)
    }

    /// Inclusive: a blueprint with `min_intensity = Medium` is eligible at
    /// `Medium` and `Deep`.
    pub fn allows_intensity(&self, intensity: Intensity) -> bool {
        self.min_intensity <= intensity
    }

    pub fn supports_learning_theme(&self, learning_theme: &str) -> bool {
        self.learning_themes.iter().any(|t| t == learning_theme)
    }

    /// Arc text for `age`: exact match, then the next older groups in
    /// order, then the generic description.
    pub fn arc_for_age(&self, age: AgeGroup) -> &str {
        std::iter::once(age)
            .chain(age.older())
            .find_map(|g| self.arc_by_age.get(&g))
            .map(String::as_str)
            .unwrap_or(self.generic_arc.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_blueprint() -> EmotionBlueprint {
        EmotionBlueprint {
            key: "brave_little_step".to_string(),
            category: BlueprintCategory::Courage,
            arc_by_age: HashMap::from([(
                AgeGroup::TenToEleven,
                "Doubt gives way to a hard-won decision.".to_string(),
            )]),
            generic_arc: "Fear turns into a small brave step.".to_string(),
            tone_guidance: None,
            surprise_moment: None,
            ending_feeling: None,
            compatible_themes: vec![],
            min_intensity: Intensity::Medium,
            ideal_ages: vec![AgeGroup::EightToNine, AgeGroup::TenToEleven],
            learning_themes: vec!["perseverance".to_string()],
            weight: 1.0,
            active: true,
        }
    }

    #[test]
    fn arc_falls_back_to_older_group_then_generic() {
        let bp = make_blueprint();
        assert_eq!(
            bp.arc_for_age(AgeGroup::SixToSeven),
            "Doubt gives way to a hard-won decision."
        );
        assert_eq!(
            bp.arc_for_age(AgeGroup::TenToEleven),
            "Doubt gives way to a hard-won decision."
        );

        let mut generic_only = make_blueprint();
        generic_only.arc_by_age.clear();
        assert_eq!(
            generic_only.arc_for_age(AgeGroup::EightToNine),
            "Fear turns into a small brave step."
        );
    }

    #[test]
    fn exact_age_wins_over_older() {
        let mut bp = make_blueprint();
        bp.arc_by_age
            .insert(AgeGroup::SixToSeven, "A tiny worry shrinks.".to_string());
        assert_eq!(bp.arc_for_age(AgeGroup::SixToSeven), "A tiny worry shrinks.");
    }

    #[test]
    fn intensity_gate_is_inclusive() {
        let bp = make_blueprint();
        assert!(!bp.allows_intensity(Intensity::Light));
        assert!(bp.allows_intensity(Intensity::Medium));
        assert!(bp.allows_intensity(Intensity::Deep));
    }

    #[test]
    fn empty_theme_list_matches_everything() {
        let bp = make_blueprint();
        assert!(bp.suits_theme(&Theme::new("space_science")));
        assert!(bp.suits_age(AgeGroup::EightToNine));
        assert!(!bp.suits_age(AgeGroup::SixToSeven));
    }

    #[test]
    fn unknown_category_deserializes_to_other() {
        let cat: BlueprintCategory = serde_json::from_str("\"melancholy\"").unwrap();
        assert_eq!(cat, BlueprintCategory::Other);
        assert!(BlueprintCategory::Social.wants_antagonist());
        assert!(!BlueprintCategory::Humor.wants_antagonist());
    }
}
