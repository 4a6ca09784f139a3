//! questmap - Localized content cache for a gamified learning map
//!
//! Serves regions, countries and quests for a requested language without
//! making the caller wait on the network whenever cached content exists.
//!
//! # Architecture
//!
//! Content is cached as whole-language snapshots in two tiers:
//! - An in-memory snapshot, replaced wholesale, never patched
//! - A durable store that survives restarts
//!
//! Stale snapshots are served immediately while a background refresh runs.
//! Concurrent loads collapse into a single fetch cycle. Each cycle merges
//! the requested language's translations over a fallback language.
//!
//! # Modules
//!
//! - `adapters`: Remote content source and durable store (REST, file, memory)
//! - `core`: Cache manager, fetch state machine, merge logic
//! - `domain`: Data structures (Region, Country, Quest, Snapshot)
//! - `config`: Config file and environment resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Load Korean content and print a summary
//! questmap fetch --lang ko
//!
//! # List quests for a country
//! questmap quests kr --lang ko
//!
//! # Drop the cache and reload
//! questmap invalidate --lang en
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ContentSource, DurableStore, EntitySet, FileStore, MemoryStore, Query, RestContentSource};
pub use core::{CacheSettings, CacheStatus, ContentCache, ContentError, FetchPhase};
pub use domain::{Country, Quest, QuestPayload, QuestType, Region, Snapshot};
