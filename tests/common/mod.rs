//! Shared fixtures for cache integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use questmap::adapters::{ContentSource, DurableStore, EntitySet, Query};
use questmap::core::{CacheSettings, ContentCache, ManualClock};
use questmap::domain::Snapshot;
use serde_json::{json, Value};
use tokio::sync::watch;

pub const MAX_AGE: Duration = Duration::from_secs(3600);

/// Fixed start time so tests don't depend on the wall clock
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

/// Rows the mock source serves
#[derive(Debug, Clone, Default)]
pub struct MockData {
    pub regions: Vec<Value>,
    pub countries: Vec<Value>,
    pub quests: Vec<Value>,
    pub translations: HashMap<String, Vec<Value>>,
}

impl MockData {
    /// One region, one country, one quest; English names only
    pub fn korea() -> Self {
        let mut translations = HashMap::new();
        translations.insert(
            "en".to_string(),
            vec![translation("country", "kr", "en", json!({ "name": "Korea" }))],
        );

        Self {
            regions: vec![json!({ "id": "east_asia", "country_ids": ["kr"] })],
            countries: vec![json!({ "id": "kr", "region_id": "east_asia" })],
            quests: vec![json!({
                "id": "kr-q1",
                "country_id": "kr",
                "quest_type": "trivia-quiz",
                "difficulty": "easy",
                "points": 10,
                "payload": { "questions": [] }
            })],
            translations,
        }
    }
}

pub fn translation(kind: &str, id: &str, lang: &str, fields: Value) -> Value {
    json!({
        "entity_type": kind,
        "entity_id": id,
        "language": lang,
        "fields": fields,
    })
}

/// Content source that records every read, can be held shut, and can be
/// told to fail per entity set or per translation language
pub struct MockSource {
    data: Mutex<MockData>,
    reads: Mutex<Vec<Query>>,
    gate: watch::Sender<bool>,
    failing: Mutex<HashSet<EntitySet>>,
    failing_languages: Mutex<HashSet<String>>,
}

impl MockSource {
    pub fn new(data: MockData) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            data: Mutex::new(data),
            reads: Mutex::new(Vec::new()),
            gate,
            failing: Mutex::new(HashSet::new()),
            failing_languages: Mutex::new(HashSet::new()),
        }
    }

    pub fn korea() -> Arc<Self> {
        Arc::new(Self::new(MockData::korea()))
    }

    /// Hold every read until `open_gate`
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn fail(&self, entity: EntitySet) {
        self.failing.lock().unwrap().insert(entity);
    }

    pub fn fail_translations(&self, language: &str) {
        self.failing_languages
            .lock()
            .unwrap()
            .insert(language.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
        self.failing_languages.lock().unwrap().clear();
    }

    pub fn update(&self, f: impl FnOnce(&mut MockData)) {
        f(&mut self.data.lock().unwrap());
    }

    pub fn reads_of(&self, entity: EntitySet) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.entity == entity)
            .count()
    }

    pub fn translation_reads(&self, language: &str) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|q| {
                q.entity == EntitySet::Translations && q.filter_value("language") == Some(language)
            })
            .count()
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read(&self, query: &Query) -> Result<Vec<Value>> {
        self.reads.lock().unwrap().push(query.clone());

        let mut gate = self.gate.subscribe();
        loop {
            let open = *gate.borrow();
            if open {
                break;
            }
            gate.changed().await?;
        }

        if self.failing.lock().unwrap().contains(&query.entity) {
            anyhow::bail!("{} unavailable", query.entity);
        }

        let data = self.data.lock().unwrap();
        Ok(match query.entity {
            EntitySet::Regions => data.regions.clone(),
            EntitySet::Countries => data.countries.clone(),
            EntitySet::Quests => data.quests.clone(),
            EntitySet::Translations => {
                let language = query.filter_value("language").unwrap_or_default();
                if self.failing_languages.lock().unwrap().contains(language) {
                    anyhow::bail!("translations for {} unavailable", language);
                }
                data.translations.get(language).cloned().unwrap_or_default()
            }
        })
    }
}

/// Durable store whose every operation fails
#[derive(Default)]
pub struct FailingStore {
    pub writes: Mutex<usize>,
}

#[async_trait]
impl DurableStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Snapshot>> {
        anyhow::bail!("storage quota exceeded")
    }

    async fn set(&self, _key: &str, _snapshot: &Snapshot) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        anyhow::bail!("storage quota exceeded")
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        anyhow::bail!("storage quota exceeded")
    }
}

pub fn settings() -> CacheSettings {
    CacheSettings {
        max_age: MAX_AGE,
        ..CacheSettings::default()
    }
}

pub fn build_cache(
    source: Arc<MockSource>,
    store: Arc<dyn DurableStore>,
    clock: Arc<ManualClock>,
) -> ContentCache {
    ContentCache::with_clock(source, store, settings(), clock)
}

/// Let spawned tasks run until they block
pub async fn pump() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Poll `condition` until it holds, failing after a second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not met in time");
}
