//! End-to-End Integration Tests
//!
//! Full loads through the cache with a file-backed durable store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_cache, t0, MockData, MockSource, MAX_AGE};
use questmap::adapters::{EntitySet, FileStore};
use questmap::core::{ContentError, ManualClock};
use questmap::domain::{QuestPayload, QuestType};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_korean_request_with_english_fallback() {
    let source = MockSource::korea();
    let temp = TempDir::new().unwrap();
    let cache = build_cache(
        source.clone(),
        Arc::new(FileStore::new(temp.path())),
        Arc::new(ManualClock::new(t0())),
    );

    let snapshot = cache.fetch_all_content("ko").await.unwrap();

    assert_eq!(snapshot.language, "ko");
    assert_eq!(snapshot.regions.len(), 1);
    assert_eq!(snapshot.regions[0].countries, vec!["kr".to_string()]);

    let kr = snapshot.country("kr").unwrap();
    assert_eq!(kr.name, "Korea");
    assert_eq!(kr.region, "east_asia");
    assert_eq!(kr.quests.len(), 1);
    assert_eq!(kr.quests[0].id, "kr-q1");
    assert_eq!(kr.quests[0].points, 10);
    assert_eq!(kr.total_points(), 10);

    let payload = kr.quests[0].typed_payload().unwrap();
    assert_eq!(payload.quest_type(), Some(QuestType::TriviaQuiz));

    // Accessors read the same snapshot
    assert_eq!(cache.get_quests("kr").len(), 1);
    assert!(cache.get_quests("jp").is_empty());
    assert_eq!(cache.get_regions().len(), 1);
    assert_eq!(cache.get_current_language().as_deref(), Some("ko"));
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));

    let first_source = MockSource::korea();
    let first = build_cache(
        first_source.clone(),
        Arc::new(FileStore::new(temp.path())),
        clock.clone(),
    );
    let original = first.fetch_all_content("en").await.unwrap();
    drop(first);

    // New process, same directory, still fresh
    clock.advance(Duration::from_secs(600));
    let second_source = MockSource::korea();
    let second = build_cache(
        second_source.clone(),
        Arc::new(FileStore::new(temp.path())),
        clock.clone(),
    );

    let restored = second.fetch_all_content("en").await.unwrap();
    assert_eq!(*restored, *original);
    assert_eq!(second_source.total_reads(), 0);
    assert!(second.is_loaded());
}

#[tokio::test]
async fn test_stale_file_snapshot_served_when_offline() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));

    let online = build_cache(
        MockSource::korea(),
        Arc::new(FileStore::new(temp.path())),
        clock.clone(),
    );
    online.fetch_all_content("en").await.unwrap();

    clock.advance(MAX_AGE * 48);
    let offline_source = MockSource::korea();
    offline_source.fail(EntitySet::Countries);
    let offline = build_cache(
        offline_source,
        Arc::new(FileStore::new(temp.path())),
        clock,
    );

    let snapshot = offline.fetch_all_content("en").await.unwrap();
    assert_eq!(snapshot.country("kr").unwrap().name, "Korea");
}

#[tokio::test]
async fn test_unknown_quest_type_is_kept() {
    let mut data = MockData::korea();
    data.quests.push(json!({
        "id": "kr-q2",
        "country_id": "kr",
        "quest_type": "karaoke-night",
        "points": 5,
        "payload": { "song": "Arirang" }
    }));
    let source = Arc::new(MockSource::new(data));
    let temp = TempDir::new().unwrap();
    let cache = build_cache(
        source,
        Arc::new(FileStore::new(temp.path())),
        Arc::new(ManualClock::new(t0())),
    );

    let snapshot = cache.fetch_all_content("en").await.unwrap();
    let quests = snapshot.quests("kr");
    assert_eq!(quests.len(), 2);

    let unknown = &quests[1];
    assert!(matches!(unknown.payload, QuestPayload::Unknown { .. }));
    assert_eq!(
        unknown.typed_payload().unwrap_err(),
        ContentError::UnknownQuestType("karaoke-night".to_string())
    );
}
