//! Persistence layer for the SquadVibe studio.
//!
//! This crate contains:
//! - SQLite connection management and embedded migrations
//! - Entity definitions (database row mappings)
//! - One repository per logical collection (squad, closet, searchHistory)

pub mod collection;
pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

pub use collection::{Collection, CollectionStore};
