//! Domain types for localized game content.
//!
//! This module contains the core data structures:
//! - Rows: Raw records as the remote source returns them
//! - Region/Country/Quest: Resolved, display-ready content
//! - Translation: Per-language lookup and field resolution
//! - Snapshot: One language's complete content, the unit of caching

pub mod quest;
pub mod region;
pub mod rows;
pub mod snapshot;
pub mod translation;

// Re-export commonly used types
pub use quest::{Difficulty, Quest, QuestPayload, QuestType};
pub use region::{Country, Region};
pub use rows::{CountryRow, QuestRow, RegionRow, TranslationRow};
pub use snapshot::Snapshot;
pub use translation::{EntityKind, FieldClass, Resolver, TranslationIndex};
