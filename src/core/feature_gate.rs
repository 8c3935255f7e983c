/// Per-person enablement check, consulted before the engine runs.
///
/// The configuration value is JSON: `[]` enables nobody, a list of person
/// ids enables those ids, and `"*"` or `["*"]` enables everyone. Anything
/// that cannot be read or decoded means disabled.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::schema::request::PersonId;
use crate::store::{ConfigRepo, StoreError};

const WILDCARD: &str = "*";

#[derive(Debug, Error)]
enum GateError {
    #[error(transparent)]
    Unavailable(#[from] StoreError),
    #[error("cannot parse enabled ids: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnabledIds {
    Everyone,
    Only(Vec<String>),
}

impl EnabledIds {
    pub fn parse(raw: &str) -> Result<Self, String> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        match serde_json::from_str::<Raw>(raw).map_err(|e| e.to_string())? {
            Raw::One(s) if s == WILDCARD => Ok(Self::Everyone),
            Raw::One(s) => Err(format!("expected a list or \"{}\", got {:?}", WILDCARD, s)),
            Raw::Many(ids) if ids.iter().any(|id| id == WILDCARD) => Ok(Self::Everyone),
            Raw::Many(ids) => Ok(Self::Only(ids)),
        }
    }

    pub fn allows(&self, person_id: &PersonId) -> bool {
        match self {
            Self::Everyone => true,
            Self::Only(ids) => ids.iter().any(|id| id == person_id.as_str()),
        }
    }
}

/// Memoized gate decisions keyed by person id. Shared between gates and
/// cleared explicitly.
///
/// Entries are never evicted: the cache holds one decision per person seen
/// for as long as it lives. Long-running callers bound it with `forget` or
/// `reset`.
#[derive(Debug, Default)]
pub struct FlagCache {
    decisions: RwLock<FxHashMap<PersonId, bool>>,
}

impl FlagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, person_id: &PersonId) -> Option<bool> {
        self.decisions.read().await.get(person_id).copied()
    }

    pub async fn insert(&self, person_id: PersonId, enabled: bool) {
        self.decisions.write().await.insert(person_id, enabled);
    }

    pub async fn forget(&self, person_id: &PersonId) -> Option<bool> {
        self.decisions.write().await.remove(person_id)
    }

    pub async fn reset(&self) {
        self.decisions.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.decisions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.decisions.read().await.is_empty()
    }
}

pub struct FeatureGate {
    config: Arc<dyn ConfigRepo>,
    key: String,
    cache: Arc<FlagCache>,
}

impl FeatureGate {
    pub fn new(config: Arc<dyn ConfigRepo>, key: impl Into<String>) -> Self {
        Self::with_cache(config, key, Arc::new(FlagCache::new()))
    }

    pub fn with_cache(
        config: Arc<dyn ConfigRepo>,
        key: impl Into<String>,
        cache: Arc<FlagCache>,
    ) -> Self {
        Self {
            config,
            key: key.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<FlagCache> {
        &self.cache
    }

    /// Whether the emotion flow is enabled for `person_id`.
    ///
    /// Decisions are memoized per person. A failed read is not memoized so
    /// the next call tries the store again.
    pub async fn is_enabled(&self, person_id: &PersonId) -> bool {
        if let Some(enabled) = self.cache.get(person_id).await {
            return enabled;
        }

        match self.lookup(person_id).await {
            Ok(enabled) => {
                self.cache.insert(person_id.clone(), enabled).await;
                enabled
            }
            Err(GateError::Unavailable(e)) => {
                tracing::warn!(error = %e, person_id = %person_id, key = %self.key, "Failed to read feature flag, treating as disabled");
                false
            }
            Err(e @ GateError::Parse(_)) => {
                tracing::warn!(error = %e, person_id = %person_id, key = %self.key, "Malformed feature flag, treating as disabled");
                self.cache.insert(person_id.clone(), false).await;
                false
            }
        }
    }

    async fn lookup(&self, person_id: &PersonId) -> Result<bool, GateError> {
        let Some(raw) = self.config.get_value(&self.key).await? else {
            return Ok(false);
        };
        let enabled = EnabledIds::parse(&raw).map_err(GateError::Parse)?;
        Ok(enabled.allows(person_id))
    }
}
