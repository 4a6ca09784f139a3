//! Adapter interfaces for external systems.
//!
//! The cache consumes two collaborators:
//! - `ContentSource`: read-only, filtered/ordered reads over the content tables
//! - `DurableStore`: a key-value store that survives process restarts

pub mod file_store;
pub mod memory;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::Snapshot;

// Re-export the concrete adapters
pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use rest::{RestConfig, RestContentSource};

/// Logical entity sets the content source exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntitySet {
    Regions,
    Countries,
    Quests,
    Translations,
}

impl EntitySet {
    /// Table name in the source
    pub fn table(&self) -> &'static str {
        match self {
            EntitySet::Regions => "regions",
            EntitySet::Countries => "countries",
            EntitySet::Quests => "quests",
            EntitySet::Translations => "translations",
        }
    }
}

impl std::fmt::Display for EntitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// A single collection read: entity set, equality filters, sort order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub entity: EntitySet,
    pub filters: Vec<Filter>,
    /// Columns to sort by, ascending, in priority order
    pub order_by: Vec<String>,
}

impl Query {
    pub fn new(entity: EntitySet) -> Self {
        Self {
            entity,
            filters: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Add an equality filter
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Add a sort column
    pub fn order(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Value of the first filter on `column`, if any
    pub fn filter_value(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.value.as_str())
    }
}

/// Read-only remote content source
///
/// Reads may be issued concurrently and resolve independently. An empty
/// collection is a valid result, not a failure.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Read one filtered, ordered collection as raw JSON rows
    async fn read(&self, query: &Query) -> Result<Vec<serde_json::Value>>;
}

/// Durable key-value store for snapshots
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Load the snapshot under `key`, if one exists
    async fn get(&self, key: &str) -> Result<Option<Snapshot>>;

    /// Replace the snapshot under `key`
    async fn set(&self, key: &str, snapshot: &Snapshot) -> Result<()>;

    /// Delete the snapshot under `key`; deleting a missing key succeeds
    async fn remove(&self, key: &str) -> Result<()>;
}
