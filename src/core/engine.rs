/// The emotion-flow engine: Request → selections → prompt blocks.
///
/// Runs the five selection stages in dependency order, then composes the
/// text blocks. Each stage swallows its own data errors; only a sampler
/// contract violation can fail a run.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

use crate::core::blocks::{
    arc_block, character_block, critical_rules_block, elements_block, relationship_block,
    tone_block,
};
use crate::core::blueprint::{BlueprintQuery, BlueprintSelector};
use crate::core::characters::{CharacterQuery, CharacterSeedSelector, CharacterSelection};
use crate::core::config::EngineConfig;
use crate::core::elements::{ElementQuery, ElementSelection, StoryElementSelector};
use crate::core::history::HistoryReader;
use crate::core::intensity::IntensitySelector;
use crate::core::sampler::SampleError;
use crate::core::tone::ToneSelector;
use crate::schema::blueprint::EmotionBlueprint;
use crate::schema::element::ElementType;
use crate::schema::history::SelectionHistoryRecord;
use crate::schema::mood::{Intensity, ToneMode};
use crate::schema::request::{FlowRequest, PersonId};
use crate::store::{BlueprintRepo, CharacterSeedRepo, HistoryRepo, StoryElementRepo};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sampling contract violated: {0}")]
    Sampling(#[from] SampleError),
    #[error("engine built without a {0} repository")]
    MissingRepository(&'static str),
}

/// The composed prompt text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBlocks {
    pub relationship: String,
    pub arc: String,
    pub tone: String,
    pub character: String,
    pub elements: String,
    pub critical_rules: String,
}

impl PromptBlocks {
    /// Blocks in the order they go into the generation prompt. The
    /// relationship block wins over the simpler character block.
    pub fn ordered_for_prompt(&self) -> [&str; 5] {
        let cast = if self.relationship.is_empty() {
            self.character.as_str()
        } else {
            self.relationship.as_str()
        };
        [
            cast,
            self.arc.as_str(),
            self.tone.as_str(),
            self.elements.as_str(),
            self.critical_rules.as_str(),
        ]
    }
}

/// Flat record of what was chosen, for persistence and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetadata {
    pub blueprint_key: Option<String>,
    pub tone: ToneMode,
    pub intensity: Intensity,
    pub protagonist_key: Option<String>,
    pub sidekick_key: String,
    pub antagonist_key: Option<String>,
    pub opening_key: Option<String>,
    pub perspective_key: Option<String>,
    pub element_keys: BTreeMap<ElementType, String>,
    pub cultural_background: Option<String>,
}

impl FlowMetadata {
    /// The history record the caller appends once the story exists.
    pub fn to_history_record(
        &self,
        person_id: &PersonId,
        created_at: DateTime<Utc>,
    ) -> SelectionHistoryRecord {
        SelectionHistoryRecord {
            person_id: person_id.clone(),
            blueprint_key: self.blueprint_key.clone(),
            tone: Some(self.tone),
            intensity: Some(self.intensity),
            protagonist_key: self.protagonist_key.clone(),
            sidekick_key: Some(self.sidekick_key.clone()),
            antagonist_key: self.antagonist_key.clone(),
            element_keys: self.element_keys.clone(),
            cultural_background: self.cultural_background.clone(),
            created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmotionFlowResult {
    pub intensity: Intensity,
    pub blueprint: Option<EmotionBlueprint>,
    pub tone: ToneMode,
    pub characters: CharacterSelection,
    pub elements: ElementSelection,
    pub blocks: PromptBlocks,
    pub metadata: FlowMetadata,
}

/// Built via `FlowEngine::builder()`.
pub struct FlowEngine {
    intensity: IntensitySelector,
    blueprints: BlueprintSelector,
    tones: ToneSelector,
    characters: CharacterSeedSelector,
    elements: StoryElementSelector,
    config: EngineConfig,
}

#[derive(Default)]
pub struct FlowEngineBuilder {
    blueprints: Option<Arc<dyn BlueprintRepo>>,
    character_seeds: Option<Arc<dyn CharacterSeedRepo>>,
    story_elements: Option<Arc<dyn StoryElementRepo>>,
    history: Option<Arc<dyn HistoryRepo>>,
    config: EngineConfig,
}

impl FlowEngine {
    pub fn builder() -> FlowEngineBuilder {
        FlowEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run with the configured seed, or fresh entropy when there is none.
    pub async fn run(&self, request: &FlowRequest) -> Result<EmotionFlowResult, EngineError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ person_hash(&request.person_id)),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(request, &mut rng).await
    }

    pub async fn run_with_rng(
        &self,
        request: &FlowRequest,
        rng: &mut StdRng,
    ) -> Result<EmotionFlowResult, EngineError> {
        let person_id = &request.person_id;

        let intensity = self.intensity.select(person_id, rng).await?;
        tracing::info!(person_id = %person_id, intensity = %intensity, "Selected intensity");

        let blueprint = self
            .blueprints
            .select(
                BlueprintQuery {
                    person_id,
                    age_group: request.age_group,
                    theme: &request.theme,
                    intensity,
                    learning_theme: request.learning_theme.as_deref(),
                },
                rng,
            )
            .await?;
        let category = blueprint.as_ref().map(|b| b.category);
        tracing::info!(
            person_id = %person_id,
            blueprint = blueprint.as_ref().map(|b| b.key.as_str()).unwrap_or("none"),
            "Selected blueprint"
        );

        let tone = self
            .tones
            .select(person_id, request.age_group, category, rng)
            .await?;
        tracing::info!(person_id = %person_id, tone = %tone, "Selected tone");

        let characters = self
            .characters
            .select(
                CharacterQuery {
                    person_id,
                    age_group: request.age_group,
                    theme: &request.theme,
                    mode: request.character_mode,
                    category,
                },
                rng,
            )
            .await?;
        tracing::info!(
            person_id = %person_id,
            protagonist = characters.protagonist.as_ref().map(|s| s.key.as_str()).unwrap_or("none"),
            sidekick = %characters.sidekick.key,
            antagonist = characters.antagonist.as_ref().map(|s| s.key.as_str()).unwrap_or("none"),
            "Selected characters"
        );

        let elements = self
            .elements
            .select(
                ElementQuery {
                    person_id,
                    age_group: request.age_group,
                    theme: &request.theme,
                    intensity,
                    tone,
                    category,
                },
                rng,
            )
            .await?;
        tracing::info!(
            person_id = %person_id,
            count = elements.len(),
            opening = elements.key(ElementType::Opening).unwrap_or("none"),
            "Selected story elements"
        );

        let blocks = PromptBlocks {
            relationship: relationship_block(
                request.character_mode,
                &request.person_identity,
                &request.co_stars,
                characters.protagonist.as_ref(),
                &characters.sidekick,
                rng,
            ),
            arc: arc_block(blueprint.as_ref(), request.age_group, intensity),
            tone: tone_block(tone),
            character: character_block(characters.protagonist.as_ref(), &characters.sidekick),
            elements: elements_block(&elements),
            critical_rules: critical_rules_block(),
        };

        let metadata = FlowMetadata {
            blueprint_key: blueprint.as_ref().map(|b| b.key.clone()),
            tone,
            intensity,
            protagonist_key: characters.protagonist.as_ref().map(|s| s.key.clone()),
            sidekick_key: characters.sidekick.key.clone(),
            antagonist_key: characters.antagonist.as_ref().map(|s| s.key.clone()),
            opening_key: elements.key(ElementType::Opening).map(str::to_string),
            perspective_key: elements.key(ElementType::Perspective).map(str::to_string),
            element_keys: elements.keys_by_type(),
            cultural_background: characters
                .protagonist
                .as_ref()
                .and_then(|s| s.background())
                .map(str::to_string),
        };

        Ok(EmotionFlowResult {
            intensity,
            blueprint,
            tone,
            characters,
            elements,
            blocks,
            metadata,
        })
    }
}

fn person_hash(person_id: &PersonId) -> u64 {
    let mut hasher = FxHasher::default();
    person_id.hash(&mut hasher);
    hasher.finish()
}

impl FlowEngineBuilder {
    pub fn blueprints(mut self, repo: Arc<dyn BlueprintRepo>) -> Self {
        self.blueprints = Some(repo);
        self
    }

    pub fn character_seeds(mut self, repo: Arc<dyn CharacterSeedRepo>) -> Self {
        self.character_seeds = Some(repo);
        self
    }

    pub fn story_elements(mut self, repo: Arc<dyn StoryElementRepo>) -> Self {
        self.story_elements = Some(repo);
        self
    }

    pub fn history(mut self, repo: Arc<dyn HistoryRepo>) -> Self {
        self.history = Some(repo);
        self
    }

    /// Use one store for every repository.
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: BlueprintRepo + CharacterSeedRepo + StoryElementRepo + HistoryRepo + 'static,
    {
        self.blueprints(store.clone())
            .character_seeds(store.clone())
            .story_elements(store.clone())
            .history(store)
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<FlowEngine, EngineError> {
        let blueprints = self
            .blueprints
            .ok_or(EngineError::MissingRepository("blueprint"))?;
        let character_seeds = self
            .character_seeds
            .ok_or(EngineError::MissingRepository("character seed"))?;
        let story_elements = self
            .story_elements
            .ok_or(EngineError::MissingRepository("story element"))?;
        let history = HistoryReader::new(
            self.history
                .ok_or(EngineError::MissingRepository("history"))?,
        );

        Ok(FlowEngine {
            intensity: IntensitySelector::new(history.clone()),
            blueprints: BlueprintSelector::new(blueprints, history.clone())
                .with_learning_theme_boost(self.config.learning_theme_boost),
            tones: ToneSelector::new(history.clone()),
            characters: CharacterSeedSelector::new(character_seeds, history.clone()),
            elements: StoryElementSelector::new(story_elements, history),
            config: self.config,
        })
    }
}
