//! In-process store backed by a RON catalog file.
//!
//! Implements every repository trait. Useful for previews and tests: it counts
//! reads per repository and can be switched into a mode where every read
//! fails.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{
    BlueprintRepo, CharacterSeedRepo, ConfigRepo, HistoryQuery, HistoryRepo, StoreError,
    StoryElementRepo,
};
use crate::schema::blueprint::EmotionBlueprint;
use crate::schema::character::{CharacterSeed, SeedRole};
use crate::schema::element::{ElementType, StoryElement};
use crate::schema::history::SelectionHistoryRecord;

/// The three content catalogs as authored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub blueprints: Vec<EmotionBlueprint>,
    #[serde(default)]
    pub character_seeds: Vec<CharacterSeed>,
    #[serde(default)]
    pub story_elements: Vec<StoryElement>,
}

impl Catalog {
    /// Load a catalog from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Catalog, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a catalog from a RON string.
    pub fn parse_ron(input: &str) -> Result<Catalog, StoreError> {
        Ok(ron::from_str(input)?)
    }
}

/// Number of reads each repository has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub blueprints: usize,
    pub character_seeds: usize,
    pub story_elements: usize,
    pub history: usize,
    pub config: usize,
}

impl ReadCounts {
    pub fn total(&self) -> usize {
        self.blueprints + self.character_seeds + self.story_elements + self.history + self.config
    }
}

#[derive(Debug, Default)]
struct ReadCounters {
    blueprints: AtomicUsize,
    character_seeds: AtomicUsize,
    story_elements: AtomicUsize,
    history: AtomicUsize,
    config: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: Catalog,
    history: RwLock<Vec<SelectionHistoryRecord>>,
    config: RwLock<FxHashMap<String, String>>,
    failing: AtomicBool,
    reads: ReadCounters,
}

impl MemoryStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Catalog::load_from_ron(path)?))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// When set, every read returns `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn set_config_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.config.write().await.insert(key.into(), value.into());
    }

    pub fn reads(&self) -> ReadCounts {
        ReadCounts {
            blueprints: self.reads.blueprints.load(Ordering::SeqCst),
            character_seeds: self.reads.character_seeds.load(Ordering::SeqCst),
            story_elements: self.reads.story_elements.load(Ordering::SeqCst),
            history: self.reads.history.load(Ordering::SeqCst),
            config: self.reads.config.load(Ordering::SeqCst),
        }
    }

    pub fn reset_reads(&self) {
        for counter in [
            &self.reads.blueprints,
            &self.reads.character_seeds,
            &self.reads.story_elements,
            &self.reads.history,
            &self.reads.config,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn begin_read(&self, counter: &AtomicUsize, operation: &'static str) -> Result<(), StoreError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(operation, "store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl BlueprintRepo for MemoryStore {
    async fn list_active(&self) -> Result<Vec<EmotionBlueprint>, StoreError> {
        self.begin_read(&self.reads.blueprints, "list_active_blueprints")?;
        Ok(self
            .catalog
            .blueprints
            .iter()
            .filter(|b| b.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CharacterSeedRepo for MemoryStore {
    async fn list_active_by_roles(
        &self,
        roles: &[SeedRole],
    ) -> Result<Vec<CharacterSeed>, StoreError> {
        self.begin_read(&self.reads.character_seeds, "list_active_character_seeds")?;
        Ok(self
            .catalog
            .character_seeds
            .iter()
            .filter(|s| s.active && roles.contains(&s.role))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoryElementRepo for MemoryStore {
    async fn list_active_by_types(
        &self,
        types: &[ElementType],
    ) -> Result<Vec<StoryElement>, StoreError> {
        self.begin_read(&self.reads.story_elements, "list_active_story_elements")?;
        Ok(self
            .catalog
            .story_elements
            .iter()
            .filter(|e| e.active && types.contains(&e.element_type))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HistoryRepo for MemoryStore {
    async fn recent(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<SelectionHistoryRecord>, StoreError> {
        self.begin_read(&self.reads.history, "recent_history")?;
        let history = self.history.read().await;
        // Newest append first so equal timestamps keep insertion recency.
        let mut rows: Vec<SelectionHistoryRecord> = history
            .iter()
            .rev()
            .filter(|r| r.person_id == query.person_id)
            .filter(|r| query.present.map_or(true, |field| field.key_in(r).is_some()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn append(&self, record: SelectionHistoryRecord) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("append_history", "store is offline"));
        }
        self.history.write().await.push(record);
        Ok(())
    }
}

#[async_trait]
impl ConfigRepo for MemoryStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.begin_read(&self.reads.config, "get_config_value")?;
        Ok(self.config.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::history::HistoryField;
    use crate::schema::mood::ToneMode;
    use crate::schema::request::PersonId;
    use chrono::{Duration, TimeZone, Utc};

    fn record(person: &str, minutes: i64, tone: Option<ToneMode>) -> SelectionHistoryRecord {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let mut r = SelectionHistoryRecord::new(PersonId::new(person), base + Duration::minutes(minutes));
        r.tone = tone;
        r
    }

    #[tokio::test]
    async fn recent_orders_newest_first_and_limits() {
        let store = MemoryStore::default();
        store.append(record("k1", 1, Some(ToneMode::Gentle))).await.unwrap();
        store.append(record("k1", 3, Some(ToneMode::Comedic))).await.unwrap();
        store.append(record("k1", 2, Some(ToneMode::Dramatic))).await.unwrap();
        store.append(record("k2", 9, Some(ToneMode::Absurd))).await.unwrap();

        let rows = store
            .recent(&HistoryQuery::latest(&PersonId::new("k1"), 2))
            .await
            .unwrap();
        let tones: Vec<_> = rows.iter().map(|r| r.tone).collect();
        assert_eq!(tones, vec![Some(ToneMode::Comedic), Some(ToneMode::Dramatic)]);
    }

    #[tokio::test]
    async fn recent_with_field_skips_records_without_it() {
        let store = MemoryStore::default();
        store.append(record("k1", 1, Some(ToneMode::Gentle))).await.unwrap();
        store.append(record("k1", 2, None)).await.unwrap();

        let rows = store
            .recent(&HistoryQuery::with_field(&PersonId::new("k1"), HistoryField::Tone, 5))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tone, Some(ToneMode::Gentle));
    }

    #[tokio::test]
    async fn failing_store_counts_and_errors() {
        let store = MemoryStore::default();
        store.set_failing(true);
        assert!(store.list_active().await.is_err());
        assert!(store.list_active_by_types(&[ElementType::Opening]).await.is_err());
        assert_eq!(store.reads().blueprints, 1);
        assert_eq!(store.reads().story_elements, 1);
        assert_eq!(store.reads().total(), 2);
        store.reset_reads();
        assert_eq!(store.reads(), ReadCounts::default());
    }

    #[test]
    fn parse_minimal_catalog() {
        let catalog = Catalog::parse_ron(
            r#"(
                story_elements: [
                    (key: "hook", element_type: opening, content: "Start mid-action."),
                ],
            )"#,
        )
        .unwrap();
        assert!(catalog.blueprints.is_empty());
        assert_eq!(catalog.story_elements.len(), 1);
        assert_eq!(catalog.story_elements[0].weight, 1.0);
    }
}
