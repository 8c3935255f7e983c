/// Intensity selection with an anti-monotony rule.

use rand::rngs::StdRng;

use crate::core::history::HistoryReader;
use crate::core::sampler::{weighted_pick, SampleError};
use crate::schema::history::HistoryField;
use crate::schema::mood::Intensity;
use crate::schema::request::PersonId;

/// Base weights, parallel to `Intensity::ALL`.
pub const INTENSITY_WEIGHTS: [(Intensity, f64); 3] = [
    (Intensity::Light, 30.0),
    (Intensity::Medium, 50.0),
    (Intensity::Deep, 20.0),
];

/// How many past intensities the anti-monotony rule inspects.
pub const INTENSITY_LOOKBACK: usize = 3;

/// Used whenever the history read fails.
pub const FALLBACK_INTENSITY: Intensity = Intensity::Medium;

pub struct IntensitySelector {
    history: HistoryReader,
}

impl IntensitySelector {
    pub fn new(history: HistoryReader) -> Self {
        Self { history }
    }

    /// Choose light, medium or deep. If the last three stories all used the
    /// same level, that level sits this one out.
    pub async fn select(
        &self,
        person_id: &PersonId,
        rng: &mut StdRng,
    ) -> Result<Intensity, SampleError> {
        let recent = match self
            .history
            .recent_keys(person_id, HistoryField::Intensity, INTENSITY_LOOKBACK)
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    person_id = %person_id,
                    "Failed to read intensity history, using {}",
                    FALLBACK_INTENSITY
                );
                return Ok(FALLBACK_INTENSITY);
            }
        };

        let excluded = monotonous_run(&recent);
        if let Some(level) = excluded {
            tracing::debug!(person_id = %person_id, excluded = %level, "Breaking intensity streak");
        }

        let (levels, weights): (Vec<Intensity>, Vec<f64>) = INTENSITY_WEIGHTS
            .iter()
            .filter(|(level, _)| Some(*level) != excluded)
            .copied()
            .unzip();
        weighted_pick(&levels, &weights, rng).copied()
    }
}

/// The repeated level when the full lookback window holds one value.
fn monotonous_run(recent: &[String]) -> Option<Intensity> {
    if recent.len() < INTENSITY_LOOKBACK {
        return None;
    }
    let first = Intensity::parse(&recent[0])?;
    recent
        .iter()
        .all(|k| Intensity::parse(k) == Some(first))
        .then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::history::SelectionHistoryRecord;
    use crate::store::{MockHistoryRepo, StoreError};
    use chrono::Utc;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn history_of(levels: &'static [Intensity]) -> HistoryReader {
        let mut repo = MockHistoryRepo::new();
        repo.expect_recent().returning(move |_| {
            Ok(levels
                .iter()
                .map(|l| {
                    let mut r = SelectionHistoryRecord::new(PersonId::new("k1"), Utc::now());
                    r.intensity = Some(*l);
                    r
                })
                .collect())
        });
        HistoryReader::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn frequencies_match_base_weights_with_empty_history() {
        let selector = IntensitySelector::new(history_of(&[]));
        let person = PersonId::new("k1");
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 2000;
        let mut counts = [0usize; 3];
        for _ in 0..trials {
            let level = selector.select(&person, &mut rng).await.unwrap();
            counts[level as usize] += 1;
        }
        let expected = [0.30, 0.50, 0.20];
        for (count, share) in counts.iter().zip(expected) {
            let observed = *count as f64 / trials as f64;
            assert!(
                (observed - share).abs() <= 0.08,
                "observed {} vs expected {}",
                observed,
                share
            );
        }
    }

    #[tokio::test]
    async fn three_identical_levels_are_excluded() {
        let selector = IntensitySelector::new(history_of(&[
            Intensity::Medium,
            Intensity::Medium,
            Intensity::Medium,
        ]));
        let person = PersonId::new("k1");
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert_ne!(selector.select(&person, &mut rng).await.unwrap(), Intensity::Medium);
        }
    }

    #[tokio::test]
    async fn mixed_history_keeps_full_pool() {
        let selector = IntensitySelector::new(history_of(&[
            Intensity::Deep,
            Intensity::Deep,
            Intensity::Light,
        ]));
        let person = PersonId::new("k1");
        let mut rng = StdRng::seed_from_u64(5);
        let mut saw_deep = false;
        for _ in 0..200 {
            if selector.select(&person, &mut rng).await.unwrap() == Intensity::Deep {
                saw_deep = true;
            }
        }
        assert!(saw_deep);
    }

    #[tokio::test]
    async fn read_failure_falls_back_to_medium() {
        let mut repo = MockHistoryRepo::new();
        repo.expect_recent()
            .returning(|_| Err(StoreError::unavailable("recent_history", "connection reset")));
        let selector = IntensitySelector::new(HistoryReader::new(Arc::new(repo)));
        let mut rng = StdRng::seed_from_u64(1);
        let level = selector.select(&PersonId::new("k1"), &mut rng).await.unwrap();
        assert_eq!(level, Intensity::Medium);
    }

    #[test]
    fn short_history_is_not_a_streak() {
        assert_eq!(monotonous_run(&["deep".to_string(), "deep".to_string()]), None);
    }
}
