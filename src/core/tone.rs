/// Narrative tone selection.

use rand::rngs::StdRng;

use crate::core::history::{exclude_recent, HistoryReader};
use crate::core::sampler::{weighted_pick, SampleError};
use crate::schema::blueprint::BlueprintCategory;
use crate::schema::history::HistoryField;
use crate::schema::mood::ToneMode;
use crate::schema::request::{AgeGroup, PersonId};

/// Recently used tones excluded from the next pick.
pub const TONE_LOOKBACK: usize = 2;

/// Weight of `tone` for a reader of `age` under a blueprint of `category`.
///
/// Absurd is only ever possible for humor blueprints read by under-tens.
pub fn tone_weight(tone: ToneMode, age: AgeGroup, category: Option<BlueprintCategory>) -> f64 {
    match tone {
        ToneMode::Absurd => {
            let young = matches!(age, AgeGroup::SixToSeven | AgeGroup::EightToNine);
            if young && category == Some(BlueprintCategory::Humor) {
                10.0
            } else {
                0.0
            }
        }
        ToneMode::Gentle if age == AgeGroup::SixToSeven => 15.0,
        ToneMode::Gentle => 8.0,
        ToneMode::Dramatic if age == AgeGroup::TenToEleven => 15.0,
        ToneMode::Dramatic => 8.0,
        ToneMode::Comedic => 12.0,
        ToneMode::Adventurous => 12.0,
    }
}

pub struct ToneSelector {
    history: HistoryReader,
}

impl ToneSelector {
    pub fn new(history: HistoryReader) -> Self {
        Self { history }
    }

    /// Choose a tone, avoiding the last two used. A failed history read
    /// just means nothing is excluded.
    pub async fn select(
        &self,
        person_id: &PersonId,
        age: AgeGroup,
        category: Option<BlueprintCategory>,
        rng: &mut StdRng,
    ) -> Result<ToneMode, SampleError> {
        let recent = self
            .history
            .recent_keys(person_id, HistoryField::Tone, TONE_LOOKBACK)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, person_id = %person_id, "Failed to read tone history");
                Vec::new()
            });

        let pool = exclude_recent(ToneMode::ALL.to_vec(), &recent, |t| t.label());
        let weighted = |tones: &[ToneMode]| -> Vec<(ToneMode, f64)> {
            tones
                .iter()
                .map(|t| (*t, tone_weight(*t, age, category)))
                .filter(|(_, w)| *w > 0.0)
                .collect()
        };

        let mut positive = weighted(&pool);
        if positive.is_empty() {
            tracing::debug!(person_id = %person_id, "Remaining tones all weigh zero, retrying over full pool");
            positive = weighted(&ToneMode::ALL[..]);
        }
        if positive.is_empty() {
            return Ok(pool[0]);
        }

        let (tones, weights): (Vec<ToneMode>, Vec<f64>) = positive.into_iter().unzip();
        weighted_pick(&tones, &weights, rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::history::SelectionHistoryRecord;
    use crate::store::{MockHistoryRepo, StoreError};
    use chrono::Utc;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn history_of(tones: &'static [ToneMode]) -> HistoryReader {
        let mut repo = MockHistoryRepo::new();
        repo.expect_recent().returning(move |_| {
            Ok(tones
                .iter()
                .map(|t| {
                    let mut r = SelectionHistoryRecord::new(PersonId::new("k1"), Utc::now());
                    r.tone = Some(*t);
                    r
                })
                .collect())
        });
        HistoryReader::new(Arc::new(repo))
    }

    async fn sample(
        selector: &ToneSelector,
        age: AgeGroup,
        category: Option<BlueprintCategory>,
        trials: usize,
    ) -> Vec<ToneMode> {
        let person = PersonId::new("k1");
        let mut rng = StdRng::seed_from_u64(99);
        let mut out = Vec::with_capacity(trials);
        for _ in 0..trials {
            out.push(selector.select(&person, age, category, &mut rng).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn absurd_only_for_young_humor() {
        let selector = ToneSelector::new(history_of(&[]));

        let young_humor = sample(&selector, AgeGroup::SixToSeven, Some(BlueprintCategory::Humor), 300).await;
        assert!(young_humor.contains(&ToneMode::Absurd));

        let nine_humor = sample(&selector, AgeGroup::EightToNine, Some(BlueprintCategory::Humor), 300).await;
        assert!(nine_humor.contains(&ToneMode::Absurd));

        let older_humor = sample(&selector, AgeGroup::TenToEleven, Some(BlueprintCategory::Humor), 300).await;
        assert!(!older_humor.contains(&ToneMode::Absurd));

        let young_social = sample(&selector, AgeGroup::SixToSeven, Some(BlueprintCategory::Social), 300).await;
        assert!(!young_social.contains(&ToneMode::Absurd));

        let no_blueprint = sample(&selector, AgeGroup::SixToSeven, None, 300).await;
        assert!(!no_blueprint.contains(&ToneMode::Absurd));
    }

    #[tokio::test]
    async fn last_two_tones_excluded() {
        let selector = ToneSelector::new(history_of(&[ToneMode::Comedic, ToneMode::Adventurous]));
        let picks = sample(&selector, AgeGroup::EightToNine, None, 200).await;
        assert!(!picks.contains(&ToneMode::Comedic));
        assert!(!picks.contains(&ToneMode::Adventurous));
        assert!(picks.contains(&ToneMode::Gentle));
        assert!(picks.contains(&ToneMode::Dramatic));
    }

    #[tokio::test]
    async fn history_failure_still_yields_a_tone() {
        let mut repo = MockHistoryRepo::new();
        repo.expect_recent()
            .returning(|_| Err(StoreError::unavailable("recent_history", "down")));
        let selector = ToneSelector::new(HistoryReader::new(Arc::new(repo)));
        let picks = sample(&selector, AgeGroup::TenToEleven, None, 20).await;
        assert!(picks.iter().all(|t| *t != ToneMode::Absurd));
    }

    #[test]
    fn age_specific_weights() {
        assert_eq!(tone_weight(ToneMode::Gentle, AgeGroup::SixToSeven, None), 15.0);
        assert_eq!(tone_weight(ToneMode::Gentle, AgeGroup::TenToEleven, None), 8.0);
        assert_eq!(tone_weight(ToneMode::Dramatic, AgeGroup::TenToEleven, None), 15.0);
        assert_eq!(tone_weight(ToneMode::Dramatic, AgeGroup::EightToNine, None), 8.0);
        assert_eq!(tone_weight(ToneMode::Comedic, AgeGroup::EightToNine, None), 12.0);
        assert_eq!(
            tone_weight(ToneMode::Absurd, AgeGroup::EightToNine, Some(BlueprintCategory::Humor)),
            10.0
        );
    }
}
