/// Per-person recency reads over the selection history log.

use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::character::SeedRole;
use crate::schema::element::ElementType;
use crate::schema::history::HistoryField;
use crate::schema::request::PersonId;
use crate::store::{HistoryQuery, HistoryRepo, StoreError};

/// How many stories the bulk element-history read looks back over.
pub const ELEMENT_HISTORY_WINDOW: usize = 15;

/// Recent keys per element type kept for exclusion.
pub const ELEMENT_EXCLUSION_DEPTH: usize = 3;

/// A past protagonist pick together with its cultural background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtagonistUse {
    pub key: String,
    pub cultural_background: Option<String>,
}

impl ProtagonistUse {
    /// Trimmed background, `None` when absent or blank.
    pub fn background(&self) -> Option<&str> {
        self.cultural_background
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

/// Most recent element keys per type, newest first.
#[derive(Debug, Clone, Default)]
pub struct ElementHistory {
    by_type: HashMap<ElementType, Vec<String>>,
}

impl ElementHistory {
    pub fn recent(&self, element_type: ElementType) -> &[String] {
        self.by_type
            .get(&element_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Reads recent selection keys for one person. Every method is a single
/// store read.
#[derive(Clone)]
pub struct HistoryReader {
    repo: Arc<dyn HistoryRepo>,
}

impl HistoryReader {
    pub fn new(repo: Arc<dyn HistoryRepo>) -> Self {
        Self { repo }
    }

    /// The `n` most recent keys recorded for `field`, newest first.
    pub async fn recent_keys(
        &self,
        person_id: &PersonId,
        field: HistoryField,
        n: usize,
    ) -> Result<Vec<String>, StoreError> {
        let query = HistoryQuery::with_field(person_id, field, n);
        let records = self.repo.recent(&query).await?;
        Ok(records
            .iter()
            .filter_map(|r| field.key_in(r))
            .take(n)
            .map(str::to_string)
            .collect())
    }

    /// The `n` most recent protagonist picks with their backgrounds.
    pub async fn recent_protagonists(
        &self,
        person_id: &PersonId,
        n: usize,
    ) -> Result<Vec<ProtagonistUse>, StoreError> {
        let field = HistoryField::Seed(SeedRole::Protagonist);
        let query = HistoryQuery::with_field(person_id, field, n);
        let records = self.repo.recent(&query).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| {
                let key = r.protagonist_key?;
                Some(ProtagonistUse {
                    key,
                    cultural_background: r.cultural_background,
                })
            })
            .take(n)
            .collect())
    }

    /// One bulk read covering every element type.
    pub async fn recent_element_keys(
        &self,
        person_id: &PersonId,
    ) -> Result<ElementHistory, StoreError> {
        let query = HistoryQuery::latest(person_id, ELEMENT_HISTORY_WINDOW);
        let records = self.repo.recent(&query).await?;

        let mut by_type: HashMap<ElementType, Vec<String>> = HashMap::new();
        for record in &records {
            for (element_type, key) in &record.element_keys {
                let keys = by_type.entry(*element_type).or_default();
                if keys.len() < ELEMENT_EXCLUSION_DEPTH {
                    keys.push(key.clone());
                }
            }
        }
        Ok(ElementHistory { by_type })
    }
}

/// Drop items whose key is in `recent`, unless that would drop them all.
pub fn exclude_recent<T, F>(items: Vec<T>, recent: &[String], key_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let is_recent = |item: &T| recent.iter().any(|r| r == key_of(item));
    if recent.is_empty() {
        return items;
    }
    if items.iter().all(|item| is_recent(item)) {
        tracing::debug!(
            excluded = recent.len(),
            "Recency exclusion would empty the pool, ignoring it"
        );
        return items;
    }
    items.into_iter().filter(|item| !is_recent(item)).collect()
}
