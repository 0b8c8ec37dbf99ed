//! anilink - episode catalog synchronization and download-link resolution.
//!
//! Core library behind the `anilink` binary: a bounded-concurrency
//! orchestrator that drives page-automation sessions through host-specific
//! extraction chains, plus an incremental infinite-scroll synchronizer for
//! the episode catalog.

pub mod automation;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
