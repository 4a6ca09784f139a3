//! Core caching logic.
//!
//! This module contains:
//! - ContentCache: Tiered, de-duplicating content cache
//! - FetchState: In-flight fetch state machine
//! - Merge: Parallel reads and translation merging
//! - Clock: Injectable time source

pub mod cache;
pub mod clock;
pub mod error;
pub mod fetch_state;
pub mod merge;

// Re-export commonly used types
pub use cache::{CacheSettings, CacheStatus, ContentCache, DIAGNOSTICS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ContentError;
pub use fetch_state::{FetchPhase, FetchState};
