use serde::{Deserialize, Serialize};
use std::fmt;

use super::blueprint::{default_active, default_weight, BlueprintCategory};
use super::request::{AgeGroup, Theme};

/// The seven kinds of narrative device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Opening,
    Perspective,
    Macguffin,
    SettingDetail,
    HumorTechnique,
    TensionTechnique,
    Closing,
}

impl ElementType {
    /// Canonical order, also used when rendering the elements block.
    pub const ALL: [ElementType; 7] = [
        Self::Opening,
        Self::Perspective,
        Self::Macguffin,
        Self::SettingDetail,
        Self::HumorTechnique,
        Self::TensionTechnique,
        Self::Closing,
    ];

    pub const MANDATORY: [ElementType; 3] = [Self::Opening, Self::Perspective, Self::Closing];

    pub fn is_mandatory(&self) -> bool {
        Self::MANDATORY.contains(self)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Perspective => "perspective",
            Self::Macguffin => "macguffin",
            Self::SettingDetail => "setting_detail",
            Self::HumorTechnique => "humor_technique",
            Self::TensionTechnique => "tension_technique",
            Self::Closing => "closing",
        }
    }

    /// Heading used in the elements prompt block.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Opening => "Opening style",
            Self::Perspective => "Perspective",
            Self::Macguffin => "Story object",
            Self::SettingDetail => "Setting detail",
            Self::HumorTechnique => "Humor technique",
            Self::TensionTechnique => "Tension technique",
            Self::Closing => "Closing style",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A small reusable narrative device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryElement {
    pub key: String,
    pub element_type: ElementType,
    pub content: String,
    #[serde(default)]
    pub compatible_ages: Vec<AgeGroup>,
    #[serde(default)]
    pub compatible_themes: Vec<Theme>,
    #[serde(default)]
    pub compatible_categories: Vec<BlueprintCategory>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl StoryElement {
    /// Empty compatibility lists accept anything. A missing blueprint
    /// category does not constrain the category list.
    pub fn is_compatible(
        &self,
        age: AgeGroup,
        theme: &Theme,
        category: Option<BlueprintCategory>,
    ) -> bool {
        let age_ok = self.compatible_ages.is_empty() || self.compatible_ages.contains(&age);
        let theme_ok =
            self.compatible_themes.is_empty() || self.compatible_themes.contains(theme);
        let category_ok = match category {
            Some(c) => {
                self.compatible_categories.is_empty() || self.compatible_categories.contains(&c)
            }
            None => true,
        };
        age_ok && theme_ok && category_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_element(categories: Vec<BlueprintCategory>) -> StoryElement {
        StoryElement {
            key: "whisper_map".to_string(),
            element_type: ElementType::Macguffin,
            content: "A map that whispers directions.".to_string(),
            compatible_ages: vec![AgeGroup::EightToNine],
            compatible_themes: vec![Theme::new(Theme::MAGIC_FANTASY)],
            compatible_categories: categories,
            weight: 1.0,
            active: true,
        }
    }

    #[test]
    fn compatibility_filters() {
        let el = make_element(vec![BlueprintCategory::Wonder]);
        let magic = Theme::new(Theme::MAGIC_FANTASY);
        assert!(el.is_compatible(AgeGroup::EightToNine, &magic, Some(BlueprintCategory::Wonder)));
        assert!(!el.is_compatible(AgeGroup::SixToSeven, &magic, None));
        assert!(!el.is_compatible(AgeGroup::EightToNine, &Theme::new("space_science"), None));
        assert!(!el.is_compatible(AgeGroup::EightToNine, &magic, Some(BlueprintCategory::Humor)));
        assert!(el.is_compatible(AgeGroup::EightToNine, &magic, None));
    }

    #[test]
    fn mandatory_types() {
        assert!(ElementType::Opening.is_mandatory());
        assert!(ElementType::Closing.is_mandatory());
        assert!(!ElementType::Macguffin.is_mandatory());
        assert_eq!(ElementType::ALL.iter().filter(|t| t.is_mandatory()).count(), 3);
    }
}
