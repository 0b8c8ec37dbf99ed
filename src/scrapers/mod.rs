//! Scraper core: range selection, catalog sync, per-episode resolution,
//! and batch fan-out.

pub mod batch;
pub mod catalog;
pub mod extractors;
pub mod range;
pub mod resolver;

pub use batch::BatchOrchestrator;
pub use catalog::CatalogSynchronizer;
pub use resolver::{EpisodeResolver, ResolveEpisode};
