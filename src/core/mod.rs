pub mod blocks;
pub mod blueprint;
pub mod characters;
pub mod config;
pub mod elements;
pub mod engine;
pub mod fallback;
pub mod feature_gate;
pub mod history;
pub mod intensity;
pub mod sampler;
pub mod tone;
