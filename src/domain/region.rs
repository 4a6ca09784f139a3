//! Regions and countries as served to the UI.

use serde::{Deserialize, Serialize};

use super::quest::Quest;

/// A map region grouping several countries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,

    /// Resolved display name
    pub name: String,

    pub emoji: String,

    pub color: String,

    /// Points needed before the region unlocks
    pub unlock_threshold: u32,

    /// Member country ids, in display order
    pub countries: Vec<String>,
}

/// A country with its quests embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,

    /// Resolved display name
    pub name: String,

    /// Resolved name in the country's own language
    pub local_name: String,

    pub flag: String,

    /// Owning region id
    pub region: String,

    pub greeting: String,

    pub cultural_value: String,

    pub description: String,

    /// Quests in source order
    pub quests: Vec<Quest>,
}

impl Country {
    /// Total points available across this country's quests
    pub fn total_points(&self) -> u32 {
        self.quests.iter().map(|q| q.points).sum()
    }

    pub fn quest(&self, quest_id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == quest_id)
    }
}
