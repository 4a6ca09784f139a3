//! The unit of caching: all content for one language.
//!
//! A snapshot is built once by a fetch cycle and never modified. Newer
//! content replaces it wholesale, in memory and in the durable store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quest::Quest;
use super::region::{Country, Region};

/// Language-scoped view of all regions, countries and quests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Language tag the strings were resolved for
    pub language: String,

    pub regions: Vec<Region>,

    pub countries: Vec<Country>,

    /// When the fetch cycle that built this snapshot finished
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        language: impl Into<String>,
        regions: Vec<Region>,
        countries: Vec<Country>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            language: language.into(),
            regions,
            countries,
            captured_at,
        }
    }

    /// Age at `now`; zero if `captured_at` lies in the future
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.captured_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Stale once strictly older than `max_age`
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age_at(now) > max_age
    }

    pub fn matches_language(&self, language: &str) -> bool {
        self.language == language
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn country(&self, id: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.id == id)
    }

    /// Quests of one country; empty if the country is unknown
    pub fn quests(&self, country_id: &str) -> &[Quest] {
        self.country(country_id)
            .map(|c| c.quests.as_slice())
            .unwrap_or(&[])
    }

    /// Countries belonging to a region, in country order
    pub fn countries_in_region(&self, region_id: &str) -> Vec<&Country> {
        self.countries
            .iter()
            .filter(|c| c.region == region_id)
            .collect()
    }

    pub fn quest_count(&self) -> usize {
        self.countries.iter().map(|c| c.quests.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quest::{Difficulty, QuestPayload};

    fn sample(captured_at: DateTime<Utc>) -> Snapshot {
        let quest = Quest {
            id: "kr-q1".to_string(),
            country_id: "kr".to_string(),
            type_tag: "trivia-quiz".to_string(),
            difficulty: Difficulty::Easy,
            points: 10,
            title: "Hangul basics".to_string(),
            description: String::new(),
            payload: QuestPayload::from_raw("trivia-quiz", serde_json::json!({})),
        };

        Snapshot::new(
            "en",
            vec![Region {
                id: "east_asia".to_string(),
                name: "East Asia".to_string(),
                emoji: String::new(),
                color: "#ff0000".to_string(),
                unlock_threshold: 0,
                countries: vec!["kr".to_string()],
            }],
            vec![Country {
                id: "kr".to_string(),
                name: "Korea".to_string(),
                local_name: "한국".to_string(),
                flag: "🇰🇷".to_string(),
                region: "east_asia".to_string(),
                greeting: "안녕하세요".to_string(),
                cultural_value: String::new(),
                description: String::new(),
                quests: vec![quest],
            }],
            captured_at,
        )
    }

    #[test]
    fn test_staleness_is_strict() {
        let t = Utc::now();
        let snapshot = sample(t);
        let max_age = Duration::from_secs(3600);

        assert!(!snapshot.is_stale_at(t + chrono::Duration::seconds(3600), max_age));
        assert!(snapshot.is_stale_at(t + chrono::Duration::seconds(3601), max_age));
    }

    #[test]
    fn test_future_capture_is_fresh() {
        let t = Utc::now();
        let snapshot = sample(t + chrono::Duration::seconds(60));
        assert_eq!(snapshot.age_at(t), Duration::ZERO);
        assert!(!snapshot.is_stale_at(t, Duration::from_secs(1)));
    }

    #[test]
    fn test_lookups() {
        let snapshot = sample(Utc::now());

        assert_eq!(snapshot.country("kr").map(|c| c.name.as_str()), Some("Korea"));
        assert!(snapshot.country("jp").is_none());
        assert_eq!(snapshot.quests("kr").len(), 1);
        assert!(snapshot.quests("jp").is_empty());
        assert_eq!(snapshot.countries_in_region("east_asia").len(), 1);
        assert_eq!(snapshot.quest_count(), 1);
    }
}
