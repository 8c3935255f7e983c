/// Character seed selection for protagonist, sidekick and antagonist.
///
/// The sidekick is always present. The protagonist only exists in surprise
/// mode, the antagonist only for social and courage blueprints.

use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

use crate::core::fallback::fallback_sidekick;
use crate::core::history::{exclude_recent, HistoryReader, ProtagonistUse};
use crate::core::sampler::{weighted_pick_by, SampleError};
use crate::schema::blueprint::BlueprintCategory;
use crate::schema::character::{CharacterSeed, CreatureType, SeedRole};
use crate::schema::history::HistoryField;
use crate::schema::request::{AgeGroup, CharacterMode, PersonId, Theme};
use crate::store::CharacterSeedRepo;

/// Protagonist picks read for the background diversity rule.
pub const PROTAGONIST_LOOKBACK: usize = 5;
/// Protagonist picks excluded outright.
pub const PROTAGONIST_EXCLUSION: usize = 3;
/// Sidekick and antagonist picks excluded.
pub const SUPPORTING_LOOKBACK: usize = 3;

/// Percent chance of a mythical protagonist when no table row matches.
pub const DEFAULT_MYTHICAL_CHANCE: u32 = 30;

/// Percent chance of a mythical protagonist by age group and theme.
pub const MYTHICAL_CHANCE: &[(AgeGroup, &str, u32)] = &[
    (AgeGroup::SixToSeven, Theme::MAGIC_FANTASY, 80),
    (AgeGroup::EightToNine, Theme::MAGIC_FANTASY, 70),
    (AgeGroup::TenToEleven, Theme::MAGIC_FANTASY, 60),
    (AgeGroup::SixToSeven, Theme::ANIMALS_NATURE, 60),
    (AgeGroup::EightToNine, Theme::ANIMALS_NATURE, 50),
    (AgeGroup::TenToEleven, Theme::ANIMALS_NATURE, 40),
    (AgeGroup::SixToSeven, Theme::ADVENTURE_ACTION, 50),
    (AgeGroup::EightToNine, Theme::ADVENTURE_ACTION, 40),
    (AgeGroup::TenToEleven, Theme::ADVENTURE_ACTION, 30),
    (AgeGroup::SixToSeven, Theme::SPACE_SCIENCE, 40),
    (AgeGroup::EightToNine, Theme::SPACE_SCIENCE, 35),
    (AgeGroup::SixToSeven, Theme::EVERYDAY_LIFE, 20),
    (AgeGroup::EightToNine, Theme::EVERYDAY_LIFE, 15),
    (AgeGroup::TenToEleven, Theme::EVERYDAY_LIFE, 10),
];

pub fn mythical_chance(age: AgeGroup, theme: &Theme) -> u32 {
    MYTHICAL_CHANCE
        .iter()
        .find(|(a, t, _)| *a == age && theme.is(t))
        .map(|(_, _, pct)| *pct)
        .unwrap_or(DEFAULT_MYTHICAL_CHANCE)
}

/// Inputs the character stage depends on.
#[derive(Debug, Clone, Copy)]
pub struct CharacterQuery<'a> {
    pub person_id: &'a PersonId,
    pub age_group: AgeGroup,
    pub theme: &'a Theme,
    pub mode: CharacterMode,
    pub category: Option<BlueprintCategory>,
}

#[derive(Debug, Clone)]
pub struct CharacterSelection {
    pub protagonist: Option<CharacterSeed>,
    pub sidekick: CharacterSeed,
    pub antagonist: Option<CharacterSeed>,
    /// The creature type drawn for the protagonist, after any fallback.
    pub creature_type: Option<CreatureType>,
}

impl CharacterSelection {
    /// What the story gets when the seed catalog is unreachable.
    pub fn fallback() -> Self {
        Self {
            protagonist: None,
            sidekick: fallback_sidekick(),
            antagonist: None,
            creature_type: None,
        }
    }
}

pub struct CharacterSeedSelector {
    seeds: Arc<dyn CharacterSeedRepo>,
    history: HistoryReader,
}

impl CharacterSeedSelector {
    pub fn new(seeds: Arc<dyn CharacterSeedRepo>, history: HistoryReader) -> Self {
        Self { seeds, history }
    }

    pub async fn select(
        &self,
        query: CharacterQuery<'_>,
        rng: &mut StdRng,
    ) -> Result<CharacterSelection, SampleError> {
        let wants_protagonist = query.mode == CharacterMode::Surprise;
        let wants_antagonist = query.category.is_some_and(|c| c.wants_antagonist());

        let mut roles = vec![SeedRole::Sidekick];
        if wants_protagonist {
            roles.push(SeedRole::Protagonist);
        }
        if wants_antagonist {
            roles.push(SeedRole::Antagonist);
        }

        let seeds = match self.seeds.list_active_by_roles(&roles).await {
            Ok(seeds) => seeds,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    person_id = %query.person_id,
                    "Failed to load character seeds, using fallback sidekick"
                );
                return Ok(CharacterSelection::fallback());
            }
        };

        let (protagonist, creature_type) = if wants_protagonist {
            let (seed, creature) = self.pick_protagonist(query, &seeds, rng).await?;
            (seed, Some(creature))
        } else {
            (None, None)
        };

        let sidekick = match self
            .pick_supporting(query.person_id, SeedRole::Sidekick, &seeds, rng)
            .await?
        {
            Some(seed) => seed,
            None => {
                tracing::debug!(person_id = %query.person_id, "No sidekick seeds, using fallback");
                fallback_sidekick()
            }
        };

        let antagonist = if wants_antagonist {
            self.pick_supporting(query.person_id, SeedRole::Antagonist, &seeds, rng)
                .await?
        } else {
            None
        };

        Ok(CharacterSelection {
            protagonist,
            sidekick,
            antagonist,
            creature_type,
        })
    }

    async fn pick_protagonist(
        &self,
        query: CharacterQuery<'_>,
        seeds: &[CharacterSeed],
        rng: &mut StdRng,
    ) -> Result<(Option<CharacterSeed>, CreatureType), SampleError> {
        let recent = self
            .history
            .recent_protagonists(query.person_id, PROTAGONIST_LOOKBACK)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, person_id = %query.person_id, "Failed to read protagonist history");
                Vec::new()
            });

        let of_type = |creature: CreatureType| -> Vec<CharacterSeed> {
            seeds
                .iter()
                .filter(|s| {
                    s.role == SeedRole::Protagonist
                        && s.creature_type == creature
                        && s.suits_age(query.age_group)
                })
                .cloned()
                .collect()
        };

        let roll = rng.gen_range(0..100);
        let mut creature = if roll < mythical_chance(query.age_group, query.theme) {
            CreatureType::Mythical
        } else {
            CreatureType::Human
        };
        let mut candidates = of_type(creature);
        if creature == CreatureType::Mythical && candidates.is_empty() {
            tracing::debug!(person_id = %query.person_id, "No mythical protagonists, falling back to human");
            creature = CreatureType::Human;
            candidates = of_type(creature);
        }
        if candidates.is_empty() {
            return Ok((None, creature));
        }

        let recent_keys: Vec<String> = recent
            .iter()
            .take(PROTAGONIST_EXCLUSION)
            .map(|u| u.key.clone())
            .collect();
        let mut candidates = exclude_recent(candidates, &recent_keys, |s| s.key.as_str());

        if creature == CreatureType::Human {
            if let Some(background) = repeated_background(&recent) {
                let diverse: Vec<CharacterSeed> = candidates
                    .iter()
                    .filter(|s| s.background() != Some(background))
                    .cloned()
                    .collect();
                if diverse.is_empty() {
                    tracing::debug!(background, "Every candidate shares the repeated background");
                } else {
                    candidates = diverse;
                }
            }
        }

        let picked = weighted_pick_by(&candidates, |s| s.weight, rng)?;
        Ok((Some(picked.clone()), creature))
    }

    async fn pick_supporting(
        &self,
        person_id: &PersonId,
        role: SeedRole,
        seeds: &[CharacterSeed],
        rng: &mut StdRng,
    ) -> Result<Option<CharacterSeed>, SampleError> {
        let candidates: Vec<CharacterSeed> =
            seeds.iter().filter(|s| s.role == role).cloned().collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let recent = self
            .history
            .recent_keys(person_id, HistoryField::Seed(role), SUPPORTING_LOOKBACK)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, person_id = %person_id, role = role.label(), "Failed to read seed history");
                Vec::new()
            });
        let candidates = exclude_recent(candidates, &recent, |s| s.key.as_str());
        let picked = weighted_pick_by(&candidates, |s| s.weight, rng)?;
        Ok(Some(picked.clone()))
    }
}

/// The background shared by every one of the last `PROTAGONIST_LOOKBACK`
/// protagonists, if there is such a streak.
fn repeated_background(recent: &[ProtagonistUse]) -> Option<&str> {
    if recent.len() < PROTAGONIST_LOOKBACK {
        return None;
    }
    let first = recent[0].background()?;
    recent[..PROTAGONIST_LOOKBACK]
        .iter()
        .all(|u| u.background() == Some(first))
        .then_some(first)
}
