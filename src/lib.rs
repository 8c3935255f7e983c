//! Story Flow: emotion-flow selection for personalized children's stories.
//!
//! Chooses an intensity, an emotional-arc blueprint, a narrative tone,
//! character archetypes and small narrative devices for each story, steering
//! away from what the same reader saw recently, and composes them into text
//! blocks for a downstream generation prompt. Every data read may fail; each
//! stage then degrades to a fixed default instead of failing the request.

pub mod core;
pub mod schema;
pub mod store;
