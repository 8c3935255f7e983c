/// Prompt text blocks composed from the chosen selections.
///
/// Every builder here is a pure function of its inputs. The relationship
/// block takes an rng only to choose the protagonist's name.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::core::elements::ElementSelection;
use crate::schema::blueprint::EmotionBlueprint;
use crate::schema::character::CharacterSeed;
use crate::schema::mood::{Intensity, ToneMode};
use crate::schema::request::{AgeGroup, CharacterMode, CoStar, PersonIdentity};

/// Name used when a seed's name pool is empty.
pub const PLACEHOLDER_NAME: &str = "the hero";

const PUSH_PULL_DYNAMIC: &str = "The protagonist and the sidekick should pull in \
different directions at least once: one wants to rush ahead while the other holds back, \
and the story is better because they have to meet in the middle.";

const SETTING_BEAT_RULE: &str =
    "Each emotional beat must happen in a visually distinct setting.";

const VISUAL_PROGRESSION_RULE: &str = "Visual progression: the emotional arc must be \
readable from the illustrations alone. Change the light, the colors, the weather or the \
place as the feelings change, so a child flipping through the pictures without reading \
can tell where the story starts emotionally, where it turns and how it ends.";

const CRITICAL_RULES: &str = "CRITICAL RULES\n\
- Never state a moral or a lesson outright. Let the reader feel it through what happens.\n\
- Emotional shifts must be gradual. Bridge every change of feeling with a moment, a line \
of dialogue or an action that makes it believable; never jump abruptly from one mood to \
another.\n\
- Every story needs at least 3 visually distinct settings or moments.\n\
- Setting variety and smooth emotional pacing are separate requirements. Meeting one \
never excuses missing the other.";

/// The names a protagonist could be given: the list matching the seed's
/// gender, else every name in the pool.
pub fn resolve_name_pool(seed: &CharacterSeed) -> Vec<&str> {
    if let Some(gender) = seed.gender {
        let matched = seed.names.for_gender(gender);
        if !matched.is_empty() {
            return matched.iter().map(String::as_str).collect();
        }
    }
    seed.names.all().map(String::as_str).collect()
}

pub fn pick_protagonist_name(seed: &CharacterSeed, rng: &mut StdRng) -> String {
    resolve_name_pool(seed)
        .choose(rng)
        .map(|n| n.to_string())
        .unwrap_or_else(|| PLACEHOLDER_NAME.to_string())
}

fn traits_sentence(seed: &CharacterSeed) -> String {
    format!(
        "Personality: {}. Weakness: {}. Strength: {}.",
        seed.personality.trim_end_matches('.'),
        seed.weakness.trim_end_matches('.'),
        seed.strength.trim_end_matches('.'),
    )
}

fn sidekick_paragraph(sidekick: &CharacterSeed) -> String {
    let mut out = String::from("SIDEKICK\n");
    match &sidekick.appearance {
        Some(appearance) => {
            out.push_str(&format!("The sidekick is {}. ", appearance.trim_end_matches('.')))
        }
        None => out.push_str("The sidekick is the hero's constant companion. "),
    }
    out.push_str(&traits_sentence(sidekick));
    out.push_str(" The sidekick helps, but never solves the main problem for the hero.");
    out
}

fn person_line(identity: &PersonIdentity) -> String {
    let mut line = format!("The hero of this story is {}", identity.name);
    if let Some(age) = identity.age {
        line.push_str(&format!(", age {}", age));
    }
    if let Some(appearance) = identity.appearance.as_deref().filter(|a| !a.trim().is_empty()) {
        line.push_str(&format!(", who looks like this: {}", appearance.trim_end_matches('.')));
    }
    line.push('.');
    line
}

fn self_block(identity: &PersonIdentity, sidekick: &CharacterSeed) -> String {
    format!(
        "MAIN CHARACTER\n{} This is a real person. Keep the name exactly as written and \
         never give them traits that contradict what is stated here.\n\n\
         SIDEKICK\nIntroduce a new character as {}'s companion. {}",
        person_line(identity),
        identity.name,
        traits_sentence(sidekick),
    )
}

/// Who is in the story and how they relate.
pub fn relationship_block(
    mode: CharacterMode,
    identity: &PersonIdentity,
    co_stars: &[CoStar],
    protagonist: Option<&CharacterSeed>,
    sidekick: &CharacterSeed,
    rng: &mut StdRng,
) -> String {
    match mode {
        CharacterMode::Surprise => {
            let mut out = String::from("MAIN CHARACTER\n");
            match protagonist {
                Some(seed) => {
                    let name = pick_protagonist_name(seed, rng);
                    out.push_str(&format!("The hero of this story is {}", name));
                    if let Some(appearance) = &seed.appearance {
                        out.push_str(&format!(", {}", appearance.trim_end_matches('.')));
                    }
                    out.push_str(". ");
                    out.push_str(&traits_sentence(seed));
                }
                None => out.push_str(
                    "The hero of this story is an original character invented for it.",
                ),
            }
            out.push_str("\n\n");
            out.push_str(&sidekick_paragraph(sidekick));
            out.push_str("\n\n");
            out.push_str(PUSH_PULL_DYNAMIC);
            out
        }
        CharacterMode::Family if !co_stars.is_empty() => {
            let mut out = format!(
                "MAIN CHARACTER\n{} This is a real person.\n\nREAL PEOPLE IN THIS STORY\n",
                person_line(identity)
            );
            for co_star in co_stars {
                out.push_str(&format!("- {} ({})", co_star.name, co_star.relationship));
                if let Some(appearance) = co_star.appearance.as_deref().filter(|a| !a.trim().is_empty()) {
                    out.push_str(&format!(": {}", appearance.trim_end_matches('.')));
                }
                out.push('\n');
            }
            out.push_str(
                "Every person listed above must appear in the story with their own dialogue \
                 and actions. Do not invent any other named characters; unnamed background \
                 extras are fine.\n\n",
            );
            out.push_str(&format!(
                "Give these traits to whichever co-star fits best instead of creating a new \
                 character. {}\n\n",
                traits_sentence(sidekick)
            ));
            out.push_str(
                "Tie the emotional arc to these real relationships, so the change the hero \
                 goes through is felt between the people who share their life.",
            );
            out
        }
        CharacterMode::Family | CharacterMode::SelfInsert => self_block(identity, sidekick),
    }
}

/// The emotional arc, shortened for medium intensity. Empty for light
/// stories and when there is no blueprint.
pub fn arc_block(
    blueprint: Option<&EmotionBlueprint>,
    age: AgeGroup,
    intensity: Intensity,
) -> String {
    let blueprint = match blueprint {
        Some(b) if intensity != Intensity::Light => b,
        _ => return String::new(),
    };
    let arc = blueprint.arc_for_age(age);

    if intensity == Intensity::Medium {
        return format!("EMOTIONAL ARC\n{}\n{}", arc, SETTING_BEAT_RULE);
    }

    let mut out = format!("EMOTIONAL ARC\n{}\n", arc);
    let optional = [
        ("Tone guidance", &blueprint.tone_guidance),
        ("Surprise moment", &blueprint.surprise_moment),
        ("Ending feeling", &blueprint.ending_feeling),
    ];
    for (label, text) in optional {
        if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
            out.push_str(&format!("{}: {}\n", label, text));
        }
    }
    out.push('\n');
    out.push_str(VISUAL_PROGRESSION_RULE);
    out
}

pub fn tone_block(tone: ToneMode) -> String {
    let body = match tone {
        ToneMode::Dramatic => {
            "Tell this story with real stakes. Let the hero feel the weight of the moment, \
             slow down at the hardest point and let the relief land fully when it comes."
        }
        ToneMode::Comedic => {
            "Tell this story with a light, playful voice. Use funny misunderstandings, \
             comic timing and at least one moment that makes the reader laugh out loud."
        }
        ToneMode::Adventurous => {
            "Tell this story with momentum. Keep the hero moving, give every scene a new \
             discovery and end chapters on a small question that pulls the reader onward."
        }
        ToneMode::Gentle => {
            "Tell this story softly and warmly. Keep the pace calm, linger on cozy details \
             and make sure every worry is met with comfort before the end."
        }
        ToneMode::Absurd => {
            "Tell this story with joyful nonsense. Let impossible things happen as if they \
             were completely normal, and let the characters take the silliness very seriously."
        }
    };
    format!("TONE: {}\n{}", tone.label(), body)
}

/// Simpler alternative to the relationship block: appearance and sidekick only.
pub fn character_block(protagonist: Option<&CharacterSeed>, sidekick: &CharacterSeed) -> String {
    let mut out = String::new();
    if let Some(appearance) = protagonist
        .and_then(|p| p.appearance.as_deref())
        .filter(|a| !a.trim().is_empty())
    {
        out.push_str("APPEARANCE\n");
        out.push_str(&format!(
            "The hero looks like this: {}. Keep this look consistent in every scene.\n\n",
            appearance.trim_end_matches('.')
        ));
    }
    out.push_str(&sidekick_paragraph(sidekick));
    out
}

/// One line per chosen element, in canonical type order.
pub fn elements_block(elements: &ElementSelection) -> String {
    if elements.is_empty() {
        return String::new();
    }
    let mut out = String::from("STORY ELEMENTS");
    for (element_type, element) in elements.iter() {
        out.push_str(&format!("\n- {}: {}", element_type.heading(), element.content));
    }
    out
}

pub fn critical_rules_block() -> String {
    CRITICAL_RULES.to_string()
}
