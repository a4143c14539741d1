//! Image resolution engine: finds an illustrative image for short event
//! descriptions by routing each query over encyclopedia, media-commons,
//! media-database and music-catalog sources.

pub mod backends;
pub mod config;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod router;
pub mod safety;
pub mod scheduler;
pub mod store;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::EngineConfig;
pub use models::{ImageResult, RejectionSet, SearchQuery};
pub use router::Resolver;
pub use scheduler::{resolve_all, spawn_resolve};
