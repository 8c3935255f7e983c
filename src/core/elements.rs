/// Auxiliary narrative element selection.

use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::fallback::fallback_element;
use crate::core::history::{ElementHistory, HistoryReader};
use crate::core::sampler::{weighted_pick_by, SampleError};
use crate::schema::blueprint::BlueprintCategory;
use crate::schema::element::{ElementType, StoryElement};
use crate::schema::mood::{Intensity, ToneMode};
use crate::schema::request::{AgeGroup, PersonId, Theme};
use crate::store::StoryElementRepo;

/// Chance that a setting detail is attempted at all.
pub const SETTING_DETAIL_CHANCE: f64 = 0.5;

/// Inputs the element stage depends on.
#[derive(Debug, Clone, Copy)]
pub struct ElementQuery<'a> {
    pub person_id: &'a PersonId,
    pub age_group: AgeGroup,
    pub theme: &'a Theme,
    pub intensity: Intensity,
    pub tone: ToneMode,
    pub category: Option<BlueprintCategory>,
}

/// The chosen element per type. Mandatory types are always filled.
#[derive(Debug, Clone, Default)]
pub struct ElementSelection {
    chosen: BTreeMap<ElementType, StoryElement>,
}

impl ElementSelection {
    pub fn get(&self, element_type: ElementType) -> Option<&StoryElement> {
        self.chosen.get(&element_type)
    }

    pub fn key(&self, element_type: ElementType) -> Option<&str> {
        self.get(element_type).map(|e| e.key.as_str())
    }

    /// Chosen elements in canonical type order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementType, &StoryElement)> {
        self.chosen.iter().map(|(t, e)| (*t, e))
    }

    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    pub fn keys_by_type(&self) -> BTreeMap<ElementType, String> {
        self.chosen
            .iter()
            .map(|(t, e)| (*t, e.key.clone()))
            .collect()
    }

    /// Mandatory fallbacks only, nothing conditional.
    pub fn fallback() -> Self {
        let chosen = ElementType::MANDATORY
            .iter()
            .filter_map(|t| fallback_element(*t).map(|e| (*t, e)))
            .collect();
        Self { chosen }
    }
}

/// Element types to attempt for this story, in canonical order.
///
/// Consumes one random draw for the setting detail.
pub fn attempted_types(query: &ElementQuery<'_>, rng: &mut StdRng) -> Vec<ElementType> {
    let wants_macguffin = query.theme.is(Theme::MAGIC_FANTASY)
        || query.theme.is(Theme::ADVENTURE_ACTION)
        || query.intensity == Intensity::Deep;
    let wants_setting = rng.gen_bool(SETTING_DETAIL_CHANCE);
    let wants_humor = matches!(query.tone, ToneMode::Comedic | ToneMode::Absurd)
        || query.category == Some(BlueprintCategory::Humor);
    let wants_tension =
        query.intensity == Intensity::Deep && query.age_group != AgeGroup::SixToSeven;

    ElementType::ALL
        .into_iter()
        .filter(|t| match t {
            ElementType::Macguffin => wants_macguffin,
            ElementType::SettingDetail => wants_setting,
            ElementType::HumorTechnique => wants_humor,
            ElementType::TensionTechnique => wants_tension,
            _ => true,
        })
        .collect()
}

pub struct StoryElementSelector {
    elements: Arc<dyn StoryElementRepo>,
    history: HistoryReader,
}

impl StoryElementSelector {
    pub fn new(elements: Arc<dyn StoryElementRepo>, history: HistoryReader) -> Self {
        Self { elements, history }
    }

    /// Choose elements with one catalog read and one history read.
    pub async fn select(
        &self,
        query: ElementQuery<'_>,
        rng: &mut StdRng,
    ) -> Result<ElementSelection, SampleError> {
        let types = attempted_types(&query, rng);

        let catalog = match self.elements.list_active_by_types(&types).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    person_id = %query.person_id,
                    "Failed to load story elements, using mandatory fallbacks"
                );
                return Ok(ElementSelection::fallback());
            }
        };

        let history = self
            .history
            .recent_element_keys(query.person_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, person_id = %query.person_id, "Failed to read element history");
                ElementHistory::default()
            });

        let mut chosen = BTreeMap::new();
        for element_type in types {
            let compatible: Vec<&StoryElement> = catalog
                .iter()
                .filter(|e| {
                    e.element_type == element_type
                        && e.is_compatible(query.age_group, query.theme, query.category)
                })
                .collect();

            let recent = history.recent(element_type);
            let fresh: Vec<&StoryElement> = compatible
                .iter()
                .copied()
                .filter(|e| !recent.contains(&e.key))
                .collect();
            let candidates = if fresh.is_empty() {
                if !compatible.is_empty() {
                    tracing::debug!(element_type = %element_type, "All compatible elements used recently, ignoring history");
                }
                compatible
            } else {
                fresh
            };

            if candidates.is_empty() {
                if let Some(fallback) = fallback_element(element_type) {
                    tracing::debug!(element_type = %element_type, "No compatible elements, using fallback");
                    chosen.insert(element_type, fallback);
                }
                continue;
            }

            let picked = weighted_pick_by(&candidates, |e| e.weight, rng)?;
            chosen.insert(element_type, (*picked).clone());
        }

        Ok(ElementSelection { chosen })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fallback::{FALLBACK_CLOSING_KEY, FALLBACK_OPENING_KEY, FALLBACK_PERSPECTIVE_KEY};
    use crate::schema::history::SelectionHistoryRecord;
    use crate::store::{MockHistoryRepo, MockStoryElementRepo, StoreError};
    use chrono::Utc;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn element(key: &str, element_type: ElementType) -> StoryElement {
        StoryElement {
            key: key.to_string(),
            element_type,
            content: format!("{} content", key),
            compatible_ages: vec![],
            compatible_themes: vec![],
            compatible_categories: vec![],
            weight: 1.0,
            active: true,
        }
    }

    fn two_of_each() -> Vec<StoryElement> {
        ElementType::ALL
            .iter()
            .flat_map(|t| {
                vec![
                    element(&format!("{}_a", t.label()), *t),
                    element(&format!("{}_b", t.label()), *t),
                ]
            })
            .collect()
    }

    fn catalog(elements: Vec<StoryElement>) -> Arc<dyn StoryElementRepo> {
        let mut repo = MockStoryElementRepo::new();
        repo.expect_list_active_by_types().returning(move |types| {
            Ok(elements
                .iter()
                .filter(|e| types.contains(&e.element_type))
                .cloned()
                .collect())
        });
        Arc::new(repo)
    }

    fn history(records: Vec<SelectionHistoryRecord>) -> HistoryReader {
        let mut repo = MockHistoryRepo::new();
        repo.expect_recent().returning(move |_| Ok(records.clone()));
        HistoryReader::new(Arc::new(repo))
    }

    fn used(pairs: &[(ElementType, &str)]) -> SelectionHistoryRecord {
        let mut r = SelectionHistoryRecord::new(PersonId::new("k1"), Utc::now());
        for (t, k) in pairs {
            r.element_keys.insert(*t, k.to_string());
        }
        r
    }

    fn query<'a>(person: &'a PersonId, theme: &'a Theme) -> ElementQuery<'a> {
        ElementQuery {
            person_id: person,
            age_group: AgeGroup::EightToNine,
            theme,
            intensity: Intensity::Medium,
            tone: ToneMode::Gentle,
            category: Some(BlueprintCategory::Wonder),
        }
    }

    #[test]
    fn conditional_predicates() {
        let person = PersonId::new("k1");
        let everyday = Theme::new(Theme::EVERYDAY_LIFE);
        let magic = Theme::new(Theme::MAGIC_FANTASY);
        let mut rng = StdRng::seed_from_u64(6);

        let plain = attempted_types(&query(&person, &everyday), &mut rng);
        assert!(!plain.contains(&ElementType::Macguffin));
        assert!(!plain.contains(&ElementType::HumorTechnique));
        assert!(!plain.contains(&ElementType::TensionTechnique));
        for t in ElementType::MANDATORY {
            assert!(plain.contains(&t));
        }

        let magic_types = attempted_types(&query(&person, &magic), &mut rng);
        assert!(magic_types.contains(&ElementType::Macguffin));

        let mut deep = query(&person, &everyday);
        deep.intensity = Intensity::Deep;
        let deep_types = attempted_types(&deep, &mut rng);
        assert!(deep_types.contains(&ElementType::Macguffin));
        assert!(deep_types.contains(&ElementType::TensionTechnique));

        deep.age_group = AgeGroup::SixToSeven;
        assert!(!attempted_types(&deep, &mut rng).contains(&ElementType::TensionTechnique));

        let mut comedic = query(&person, &everyday);
        comedic.tone = ToneMode::Comedic;
        assert!(attempted_types(&comedic, &mut rng).contains(&ElementType::HumorTechnique));

        let mut humor = query(&person, &everyday);
        humor.category = Some(BlueprintCategory::Humor);
        assert!(attempted_types(&humor, &mut rng).contains(&ElementType::HumorTechnique));
    }

    #[test]
    fn setting_detail_is_a_coin_flip() {
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::EVERYDAY_LIFE);
        let mut rng = StdRng::seed_from_u64(10);
        let hits = (0..1000)
            .filter(|_| {
                attempted_types(&query(&person, &theme), &mut rng)
                    .contains(&ElementType::SettingDetail)
            })
            .count();
        assert!((400..600).contains(&hits), "setting detail attempted {} times", hits);
    }

    #[tokio::test]
    async fn at_most_two_reads_per_call() {
        let mut elements = MockStoryElementRepo::new();
        elements
            .expect_list_active_by_types()
            .times(1)
            .returning(|_| Ok(two_of_each()));
        let mut history = MockHistoryRepo::new();
        history.expect_recent().times(1).returning(|_| Ok(vec![]));

        let selector =
            StoryElementSelector::new(Arc::new(elements), HistoryReader::new(Arc::new(history)));
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::MAGIC_FANTASY);
        let mut q = query(&person, &theme);
        q.intensity = Intensity::Deep;
        q.tone = ToneMode::Comedic;
        let mut rng = StdRng::seed_from_u64(1);
        let sel = selector.select(q, &mut rng).await.unwrap();
        assert!(sel.get(ElementType::Macguffin).is_some());
        assert!(sel.get(ElementType::HumorTechnique).is_some());
        assert!(sel.get(ElementType::TensionTechnique).is_some());
    }

    #[tokio::test]
    async fn total_failure_gives_mandatory_fallbacks_only() {
        let mut elements = MockStoryElementRepo::new();
        elements
            .expect_list_active_by_types()
            .times(1)
            .returning(|_| Err(StoreError::unavailable("list_active_story_elements", "down")));
        let mut history = MockHistoryRepo::new();
        history.expect_recent().times(0..=1).returning(|_| {
            Err(StoreError::unavailable("recent_history", "down"))
        });

        let selector =
            StoryElementSelector::new(Arc::new(elements), HistoryReader::new(Arc::new(history)));
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::MAGIC_FANTASY);
        let mut q = query(&person, &theme);
        q.intensity = Intensity::Deep;
        q.tone = ToneMode::Comedic;
        let mut rng = StdRng::seed_from_u64(1);
        let sel = selector.select(q, &mut rng).await.unwrap();

        assert_eq!(sel.key(ElementType::Opening), Some(FALLBACK_OPENING_KEY));
        assert_eq!(sel.key(ElementType::Perspective), Some(FALLBACK_PERSPECTIVE_KEY));
        assert_eq!(sel.key(ElementType::Closing), Some(FALLBACK_CLOSING_KEY));
        assert_eq!(sel.len(), 3);
    }

    #[tokio::test]
    async fn empty_catalog_keeps_mandatory_fallbacks() {
        let selector = StoryElementSelector::new(catalog(vec![]), history(vec![]));
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::MAGIC_FANTASY);
        let mut rng = StdRng::seed_from_u64(2);
        let sel = selector.select(query(&person, &theme), &mut rng).await.unwrap();
        assert_eq!(sel.key(ElementType::Opening), Some(FALLBACK_OPENING_KEY));
        assert!(sel.get(ElementType::Macguffin).is_none());
    }

    #[tokio::test]
    async fn recent_keys_excluded_per_type_with_reset() {
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::MAGIC_FANTASY);
        let mut q = query(&person, &theme);
        q.intensity = Intensity::Deep;
        q.tone = ToneMode::Comedic;
        let mut rng = StdRng::seed_from_u64(17);

        let one_used: Vec<(ElementType, String)> = ElementType::ALL
            .iter()
            .map(|t| (*t, format!("{}_a", t.label())))
            .collect();
        let record = {
            let mut r = SelectionHistoryRecord::new(PersonId::new("k1"), Utc::now());
            for (t, k) in &one_used {
                r.element_keys.insert(*t, k.clone());
            }
            r
        };
        let selector = StoryElementSelector::new(catalog(two_of_each()), history(vec![record]));
        for _ in 0..40 {
            let sel = selector.select(q, &mut rng).await.unwrap();
            for (t, e) in sel.iter() {
                assert_eq!(e.key, format!("{}_b", t.label()));
            }
        }

        // both used: every type resets to its full compatible pool
        let both: Vec<SelectionHistoryRecord> = ElementType::ALL
            .iter()
            .flat_map(|t| {
                let a = format!("{}_a", t.label());
                let b = format!("{}_b", t.label());
                vec![used(&[(*t, a.as_str())]), used(&[(*t, b.as_str())])]
            })
            .collect();
        let selector = StoryElementSelector::new(catalog(two_of_each()), history(both));
        let mut seen: HashSet<String> = HashSet::new();
        for _ in 0..80 {
            let sel = selector.select(q, &mut rng).await.unwrap();
            for (_, e) in sel.iter() {
                seen.insert(e.key.clone());
            }
        }
        for t in ElementType::ALL {
            assert!(seen.contains(&format!("{}_a", t.label())), "{}", t);
            assert!(seen.contains(&format!("{}_b", t.label())), "{}", t);
        }
    }

    #[tokio::test]
    async fn reset_keeps_compatibility_filters() {
        let mut only_for_tens = element("opening_tens", ElementType::Opening);
        only_for_tens.compatible_ages = vec![AgeGroup::TenToEleven];
        let opening = element("opening_any", ElementType::Opening);
        let selector = StoryElementSelector::new(
            catalog(vec![only_for_tens, opening]),
            history(vec![used(&[(ElementType::Opening, "opening_any")])]),
        );
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::EVERYDAY_LIFE);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let sel = selector.select(query(&person, &theme), &mut rng).await.unwrap();
            assert_eq!(sel.key(ElementType::Opening), Some("opening_any"));
        }
    }

    #[tokio::test]
    async fn category_constrains_only_when_blueprint_present() {
        let mut humor_only = element("closing_joke", ElementType::Closing);
        humor_only.compatible_categories = vec![BlueprintCategory::Humor];
        let selector = StoryElementSelector::new(catalog(vec![humor_only]), history(vec![]));
        let person = PersonId::new("k1");
        let theme = Theme::new(Theme::EVERYDAY_LIFE);
        let mut rng = StdRng::seed_from_u64(3);

        let sel = selector.select(query(&person, &theme), &mut rng).await.unwrap();
        assert_eq!(sel.key(ElementType::Closing), Some(FALLBACK_CLOSING_KEY));

        let mut no_blueprint = query(&person, &theme);
        no_blueprint.category = None;
        let sel = selector.select(no_blueprint, &mut rng).await.unwrap();
        assert_eq!(sel.key(ElementType::Closing), Some("closing_joke"));
    }
}
