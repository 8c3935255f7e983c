/// Emotional-arc blueprint selection, gated by intensity.

use rand::rngs::StdRng;
use std::sync::Arc;

use crate::core::history::{exclude_recent, HistoryReader};
use crate::core::sampler::{sanitize_weight, weighted_pick, SampleError};
use crate::schema::blueprint::EmotionBlueprint;
use crate::schema::history::HistoryField;
use crate::schema::mood::Intensity;
use crate::schema::request::{AgeGroup, PersonId, Theme};
use crate::store::BlueprintRepo;

/// Recently used blueprints excluded from the next pick.
pub const BLUEPRINT_LOOKBACK: usize = 5;

/// Weight multiplier for blueprints that teach the requested learning theme.
pub const LEARNING_THEME_BOOST: f64 = 1.75;

/// A boost below 1 or not finite is replaced by `LEARNING_THEME_BOOST`.
pub fn usable_boost(boost: f64) -> f64 {
    if boost.is_finite() && boost >= 1.0 {
        boost
    } else {
        LEARNING_THEME_BOOST
    }
}

/// Inputs the blueprint stage depends on.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintQuery<'a> {
    pub person_id: &'a PersonId,
    pub age_group: AgeGroup,
    pub theme: &'a Theme,
    pub intensity: Intensity,
    pub learning_theme: Option<&'a str>,
}

pub struct BlueprintSelector {
    blueprints: Arc<dyn BlueprintRepo>,
    history: HistoryReader,
    learning_theme_boost: f64,
}

impl BlueprintSelector {
    pub fn new(blueprints: Arc<dyn BlueprintRepo>, history: HistoryReader) -> Self {
        Self {
            blueprints,
            history,
            learning_theme_boost: LEARNING_THEME_BOOST,
        }
    }

    pub fn with_learning_theme_boost(mut self, boost: f64) -> Self {
        self.learning_theme_boost = usable_boost(boost);
        self
    }

    /// Pick a blueprint, or none. Light stories never get one and cost no
    /// reads; any read failure also yields none.
    pub async fn select(
        &self,
        query: BlueprintQuery<'_>,
        rng: &mut StdRng,
    ) -> Result<Option<EmotionBlueprint>, SampleError> {
        if query.intensity == Intensity::Light {
            return Ok(None);
        }

        let all = match self.blueprints.list_active().await {
            Ok(all) => all,
            Err(e) => {
                tracing::warn!(error = %e, person_id = %query.person_id, "Failed to load blueprints");
                return Ok(None);
            }
        };

        let eligible: Vec<EmotionBlueprint> = all
            .into_iter()
            .filter(|b| {
                b.suits_age(query.age_group)
                    && b.suits_theme(query.theme)
                    && b.allows_intensity(query.intensity)
            })
            .collect();
        if eligible.is_empty() {
            tracing::debug!(
                person_id = %query.person_id,
                age_group = %query.age_group,
                theme = %query.theme,
                "No eligible blueprints"
            );
            return Ok(None);
        }

        let recent = match self
            .history
            .recent_keys(query.person_id, HistoryField::Blueprint, BLUEPRINT_LOOKBACK)
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, person_id = %query.person_id, "Failed to read blueprint history");
                return Ok(None);
            }
        };

        let candidates = exclude_recent(eligible, &recent, |b| b.key.as_str());
        let weights: Vec<f64> = candidates
            .iter()
            .map(|b| {
                let base = sanitize_weight(b.weight);
                match query.learning_theme {
                    Some(lt) if b.supports_learning_theme(lt) => {
                        sanitize_weight((base * self.learning_theme_boost).min(f64::MAX))
                    }
                    _ => base,
                }
            })
            .collect();

        weighted_pick(&candidates, &weights, rng).map(|b| Some(b.clone()))
    }
}
