//! Repository traits for the backing store.
//!
//! One trait per catalog plus one for selection history. Every read is
//! treated as a fallible network call; the engine never retries, it turns a
//! failed read into the calling stage's fallback.

pub mod memory;

use async_trait::async_trait;

use crate::schema::blueprint::EmotionBlueprint;
use crate::schema::character::{CharacterSeed, SeedRole};
use crate::schema::element::{ElementType, StoryElement};
use crate::schema::history::{HistoryField, SelectionHistoryRecord};
use crate::schema::request::PersonId;

/// Backing-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable or the query failed.
    #[error("store unavailable in {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// A stored row or value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl StoreError {
    pub fn unavailable(operation: &'static str, message: impl ToString) -> Self {
        Self::Unavailable {
            operation,
            message: message.to_string(),
        }
    }
}

/// A history read: one person's records, newest first, at most `limit`.
///
/// With `present` set, only records that carry that field are returned, so
/// `limit` counts selections of that category rather than stories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub person_id: PersonId,
    pub present: Option<HistoryField>,
    pub limit: usize,
}

impl HistoryQuery {
    pub fn latest(person_id: &PersonId, limit: usize) -> Self {
        Self {
            person_id: person_id.clone(),
            present: None,
            limit,
        }
    }

    pub fn with_field(person_id: &PersonId, field: HistoryField, limit: usize) -> Self {
        Self {
            person_id: person_id.clone(),
            present: Some(field),
            limit,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlueprintRepo: Send + Sync {
    /// All blueprints with `active = true`.
    async fn list_active(&self) -> Result<Vec<EmotionBlueprint>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterSeedRepo: Send + Sync {
    /// Active seeds whose role is one of `roles`.
    async fn list_active_by_roles(
        &self,
        roles: &[SeedRole],
    ) -> Result<Vec<CharacterSeed>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryElementRepo: Send + Sync {
    /// Active elements whose type is one of `types`.
    async fn list_active_by_types(
        &self,
        types: &[ElementType],
    ) -> Result<Vec<StoryElement>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepo: Send + Sync {
    async fn recent(&self, query: &HistoryQuery)
        -> Result<Vec<SelectionHistoryRecord>, StoreError>;

    /// Called by the caller once a story completes. The engine never writes.
    async fn append(&self, record: SelectionHistoryRecord) -> Result<(), StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigRepo: Send + Sync {
    /// Raw configuration value stored under `key`.
    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError>;
}
