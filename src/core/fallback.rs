/// Hardcoded defaults substituted when the catalog cannot supply a value.

use crate::schema::character::{CharacterSeed, CreatureType, NamePool, SeedRole};
use crate::schema::element::{ElementType, StoryElement};

pub const FALLBACK_SIDEKICK_KEY: &str = "fallback_sidekick";
pub const FALLBACK_OPENING_KEY: &str = "fallback_opening";
pub const FALLBACK_PERSPECTIVE_KEY: &str = "fallback_perspective";
pub const FALLBACK_CLOSING_KEY: &str = "fallback_closing";

/// The sidekick used when the seed catalog is unreachable or empty.
pub fn fallback_sidekick() -> CharacterSeed {
    CharacterSeed {
        key: FALLBACK_SIDEKICK_KEY.to_string(),
        role: SeedRole::Sidekick,
        creature_type: CreatureType::Mythical,
        appearance: Some(
            "a palm-sized fox with a tail that glows softly when it is thinking".to_string(),
        ),
        personality: "curious, chatty and fiercely loyal".to_string(),
        weakness: "asks so many questions that it sometimes misses the answer".to_string(),
        strength: "notices the small clue everyone else walked past".to_string(),
        cultural_background: None,
        gender: None,
        applicable_ages: Vec::new(),
        names: NamePool::default(),
        compatible_themes: Vec::new(),
        weight: 1.0,
        active: true,
    }
}

/// Default element for a mandatory type; `None` for conditional types.
pub fn fallback_element(element_type: ElementType) -> Option<StoryElement> {
    let (key, content) = match element_type {
        ElementType::Opening => (
            FALLBACK_OPENING_KEY,
            "Open in the middle of a small, vivid moment that hints at what is about to change.",
        ),
        ElementType::Perspective => (
            FALLBACK_PERSPECTIVE_KEY,
            "Tell the story in close third person, staying with the main character's feelings.",
        ),
        ElementType::Closing => (
            FALLBACK_CLOSING_KEY,
            "Close on a quiet image that echoes the opening and shows how the character has grown.",
        ),
        _ => return None,
    };
    Some(StoryElement {
        key: key.to_string(),
        element_type,
        content: content.to_string(),
        compatible_ages: Vec::new(),
        compatible_themes: Vec::new(),
        compatible_categories: Vec::new(),
        weight: 1.0,
        active: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_types_have_fallbacks() {
        for t in ElementType::ALL {
            assert_eq!(fallback_element(t).is_some(), t.is_mandatory(), "{}", t);
        }
        assert_eq!(
            fallback_element(ElementType::Opening).unwrap().key,
            FALLBACK_OPENING_KEY
        );
    }

    #[test]
    fn fallback_sidekick_is_a_sidekick() {
        let seed = fallback_sidekick();
        assert_eq!(seed.role, SeedRole::Sidekick);
        assert_eq!(seed.key, FALLBACK_SIDEKICK_KEY);
        assert!(seed.appearance.is_some());
    }
}
