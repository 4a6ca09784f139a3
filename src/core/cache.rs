//! Content cache manager.
//!
//! Serves localized content from three tiers: the in-memory snapshot, the
//! durable store, and the remote source. `fetch_all_content` decides, in
//! order:
//!
//! 1. fresh memory snapshot for the language -> return it
//! 2. fresh durable snapshot for the language -> adopt and return it
//! 3. any snapshot for the language (stale) -> return it, refresh in background
//! 4. nothing -> block on a fetch cycle; failure is returned to the caller
//!
//! Fetch cycles are collapsed: at most one runs at a time and every caller
//! arriving while it runs gets the same outcome.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{ContentSource, DurableStore};
use crate::domain::{Country, Quest, Region, Snapshot};

use super::clock::{Clock, SystemClock};
use super::error::ContentError;
use super::fetch_state::{CycleOutcome, FetchPhase, FetchState, Ticket};
use super::merge;

/// Tracing target for swallowed failures operators should still see
pub const DIAGNOSTICS: &str = "questmap::diagnostics";

/// Default staleness threshold (1 hour)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Default fallback language
pub const DEFAULT_FALLBACK_LANGUAGE: &str = "en";

/// Default durable-store key
pub const DEFAULT_STORAGE_KEY: &str = "questmap_content_cache";

/// Cache behaviour settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Snapshots older than this are stale
    pub max_age: Duration,

    /// Language always queried to fill translation gaps
    pub fallback_language: String,

    /// The single durable-store key holding the last snapshot
    pub storage_key: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            fallback_language: DEFAULT_FALLBACK_LANGUAGE.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Point-in-time view of the cache for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub language: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub age_seconds: Option<u64>,
    pub stale: bool,
    pub countries: usize,
    pub phase: FetchPhase,
}

struct CacheInner {
    source: Arc<dyn ContentSource>,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    fetch: Mutex<FetchState>,
}

/// Localized content cache
///
/// Cheap to clone; clones share the same snapshot and fetch state.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<CacheInner>,
}

impl ContentCache {
    /// Create a cache using the system clock
    pub fn new(
        source: Arc<dyn ContentSource>,
        store: Arc<dyn DurableStore>,
        settings: CacheSettings,
    ) -> Self {
        Self::with_clock(source, store, settings, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock
    pub fn with_clock(
        source: Arc<dyn ContentSource>,
        store: Arc<dyn DurableStore>,
        settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                store,
                clock,
                settings,
                snapshot: RwLock::new(None),
                fetch: Mutex::new(FetchState::default()),
            }),
        }
    }

    /// Content for `language`, from the cheapest tier that can serve it
    #[instrument(skip(self), fields(source = %self.inner.source.name()))]
    pub async fn fetch_all_content(&self, language: &str) -> Result<Arc<Snapshot>, ContentError> {
        let inner = &self.inner;
        let now = inner.clock.now();
        let max_age = inner.settings.max_age;

        // 1. Memory
        let memory = inner.memory_for(language);
        if let Some(snapshot) = &memory {
            if !snapshot.is_stale_at(now, max_age) {
                debug!("Serving fresh snapshot from memory");
                return Ok(Arc::clone(snapshot));
            }
        }

        // 2. Durable store
        let durable = inner.durable_for(language).await;
        if let Some(snapshot) = &durable {
            if !snapshot.is_stale_at(now, max_age) {
                debug!("Adopting fresh snapshot from durable store");
                inner.install(Arc::clone(snapshot));
                return Ok(Arc::clone(snapshot));
            }
        }

        // 3. Stale fallback: newest of memory and durable
        let stale = match (memory, durable) {
            (Some(m), Some(d)) => Some(if d.captured_at > m.captured_at { d } else { m }),
            (m, d) => m.or(d),
        };
        if let Some(snapshot) = stale {
            info!(
                captured_at = %snapshot.captured_at,
                "Serving stale snapshot, refreshing in background"
            );
            inner.install_if_absent(language, Arc::clone(&snapshot));
            self.spawn_refresh(language);
            return Ok(snapshot);
        }

        // 4. Nothing cached anywhere
        info!("No cached content, fetching");
        self.load(language).await
    }

    /// Fetch `language` from the source now, joining any cycle in flight.
    /// Unlike `fetch_all_content`, a failure is returned even when a cached
    /// snapshot exists; the cached snapshot is left untouched.
    pub async fn refresh(&self, language: &str) -> Result<Arc<Snapshot>, ContentError> {
        self.load(language).await
    }

    /// Wait for a fetch cycle that produces `language`, starting one if needed
    async fn load(&self, language: &str) -> Result<Arc<Snapshot>, ContentError> {
        loop {
            let ticket = {
                let mut state = self.inner.lock_fetch();
                state.begin(language, self.inner.clock.now())
            };

            let (cycle_language, mut receiver) = match ticket {
                Ticket::Started {
                    cycle_id,
                    sender,
                    receiver,
                } => {
                    self.spawn_cycle(cycle_id, language.to_string(), sender);
                    (language.to_string(), receiver)
                }
                Ticket::Joined {
                    cycle_id,
                    language: running,
                    receiver,
                } => {
                    debug!(%cycle_id, running = %running, "Joining in-flight fetch");
                    (running, receiver)
                }
            };

            let outcome = match receiver.recv().await {
                Ok(outcome) => outcome,
                Err(broadcast::error::RecvError::Closed) => {
                    Err("fetch cycle ended without a result".to_string())
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    Err("fetch cycle result was lost".to_string())
                }
            };

            if cycle_language != language {
                // Someone else's language; now that it settled, go again
                continue;
            }

            return outcome.map_err(|reason| ContentError::load_failed(language, reason));
        }
    }

    /// Run a fetch cycle on its own task so it completes even if every
    /// caller goes away. A panicking cycle still settles, as a failure.
    fn spawn_cycle(&self, cycle_id: Uuid, language: String, sender: broadcast::Sender<CycleOutcome>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let cycle = tokio::spawn({
                let inner = Arc::clone(&inner);
                async move { inner.run_cycle(cycle_id, &language).await }
            });

            let outcome = match cycle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        target: DIAGNOSTICS,
                        event = "fetch_cycle_failed",
                        %cycle_id,
                        error = %e,
                        "Fetch cycle panicked"
                    );
                    Err("fetch cycle panicked".to_string())
                }
            };
            let succeeded = outcome.is_ok();

            let settled = inner
                .lock_fetch()
                .settle(cycle_id, succeeded, inner.clock.now());
            if !settled {
                debug!(%cycle_id, "Detached fetch cycle settled");
            }

            // Receivers may all be gone; nothing to do then
            let _ = sender.send(outcome);
        });
    }

    /// Refresh `language` without making anyone wait
    fn spawn_refresh(&self, language: &str) {
        let cache = self.clone();
        let language = language.to_string();
        tokio::spawn(async move {
            if let Err(e) = cache.load(&language).await {
                warn!(
                    target: DIAGNOSTICS,
                    event = "background_refresh_failed",
                    language = %language,
                    error = %e,
                    "Background refresh failed, keeping stale snapshot"
                );
            }
        });
    }

    /// All regions of the current snapshot
    pub fn get_regions(&self) -> Vec<Region> {
        self.snapshot()
            .map(|s| s.regions.clone())
            .unwrap_or_default()
    }

    /// All countries of the current snapshot
    pub fn get_countries(&self) -> Vec<Country> {
        self.snapshot()
            .map(|s| s.countries.clone())
            .unwrap_or_default()
    }

    pub fn get_country(&self, id: &str) -> Option<Country> {
        self.snapshot().and_then(|s| s.country(id).cloned())
    }

    /// Quests of a country; empty if unknown or nothing is loaded
    pub fn get_quests(&self, country_id: &str) -> Vec<Quest> {
        self.snapshot()
            .map(|s| s.quests(country_id).to_vec())
            .unwrap_or_default()
    }

    /// True iff a snapshot with at least one country is in memory
    pub fn is_loaded(&self) -> bool {
        self.snapshot()
            .map(|s| !s.countries.is_empty())
            .unwrap_or(false)
    }

    /// Language of the in-memory snapshot
    pub fn get_current_language(&self) -> Option<String> {
        self.snapshot().map(|s| s.language.clone())
    }

    /// The in-memory snapshot itself
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.read_snapshot()
    }

    /// Drop the in-memory and durable snapshots.
    ///
    /// A cycle already running is detached: it completes and installs its
    /// result, but the next caller starts a fresh cycle instead of joining it.
    /// With a language, a blocking load for it follows.
    #[instrument(skip(self))]
    pub async fn invalidate_cache(
        &self,
        language: Option<&str>,
    ) -> Result<Option<Arc<Snapshot>>, ContentError> {
        let inner = &self.inner;

        *inner.snapshot.write().unwrap_or_else(|e| e.into_inner()) = None;

        let detached = inner.lock_fetch().detach();
        if let Some(cycle_id) = detached {
            debug!(%cycle_id, "Detached in-flight fetch");
        }

        if let Err(e) = inner.store.remove(&inner.settings.storage_key).await {
            warn!(
                target: DIAGNOSTICS,
                event = "durable_remove_failed",
                error = %format!("{:#}", e),
                "Failed to remove durable snapshot"
            );
        }

        info!("Cache invalidated");

        match language {
            Some(language) => self.load(language).await.map(Some),
            None => Ok(None),
        }
    }

    /// Diagnostics view of the cache
    pub fn status(&self) -> CacheStatus {
        let now = self.inner.clock.now();
        let snapshot = self.snapshot();
        let phase = self.inner.lock_fetch().phase();

        CacheStatus {
            language: snapshot.as_ref().map(|s| s.language.clone()),
            captured_at: snapshot.as_ref().map(|s| s.captured_at),
            age_seconds: snapshot.as_ref().map(|s| s.age_at(now).as_secs()),
            stale: snapshot
                .as_ref()
                .map(|s| s.is_stale_at(now, self.inner.settings.max_age))
                .unwrap_or(false),
            countries: snapshot.as_ref().map(|s| s.countries.len()).unwrap_or(0),
            phase,
        }
    }
}

impl CacheInner {
    fn read_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn memory_for(&self, language: &str) -> Option<Arc<Snapshot>> {
        self.read_snapshot()
            .filter(|s| s.matches_language(language))
    }

    /// Replace the in-memory snapshot wholesale
    fn install(&self, snapshot: Arc<Snapshot>) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }

    /// Install `snapshot` unless memory already holds `language`
    fn install_if_absent(&self, language: &str, snapshot: Arc<Snapshot>) {
        let mut current = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        if !current.as_ref().map_or(false, |s| s.matches_language(language)) {
            *current = Some(snapshot);
        }
    }

    fn lock_fetch(&self) -> std::sync::MutexGuard<'_, FetchState> {
        self.fetch.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Durable snapshot for `language`; read failures count as absent
    async fn durable_for(&self, language: &str) -> Option<Arc<Snapshot>> {
        match self.store.get(&self.settings.storage_key).await {
            Ok(Some(snapshot)) if snapshot.matches_language(language) => Some(Arc::new(snapshot)),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    target: DIAGNOSTICS,
                    event = "durable_read_failed",
                    language,
                    error = %format!("{:#}", e),
                    "Failed to read durable snapshot"
                );
                None
            }
        }
    }

    /// Fetch, merge, install and persist. The snapshot is persisted before
    /// the outcome is reported; a persist failure does not fail the cycle.
    async fn run_cycle(&self, cycle_id: Uuid, language: &str) -> CycleOutcome {
        info!(%cycle_id, language, "Fetch cycle started");

        let merged = merge::fetch_and_merge(
            self.source.as_ref(),
            language,
            &self.settings.fallback_language,
            self.clock.now(),
        )
        .await;

        let snapshot = match merged {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(
                    target: DIAGNOSTICS,
                    event = "fetch_cycle_failed",
                    %cycle_id,
                    language,
                    error = %reason,
                    "Fetch cycle failed"
                );
                return Err(reason);
            }
        };

        self.install(Arc::clone(&snapshot));

        if let Err(e) = self.store.set(&self.settings.storage_key, &snapshot).await {
            warn!(
                target: DIAGNOSTICS,
                event = "durable_write_failed",
                %cycle_id,
                language,
                error = %format!("{:#}", e),
                "Failed to persist snapshot, keeping it in memory"
            );
        }

        info!(
            %cycle_id,
            language,
            countries = snapshot.countries.len(),
            "Fetch cycle completed"
        );

        Ok(snapshot)
    }
}
