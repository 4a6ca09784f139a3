//! Raw rows as returned by the remote content source.
//!
//! These mirror the source tables one-to-one. They carry no resolved
//! strings; display text lives in translation rows and is merged in by
//! the assembler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A row from the `regions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRow {
    pub id: String,

    #[serde(default)]
    pub emoji: String,

    #[serde(default)]
    pub color: String,

    /// Points needed before the region unlocks
    #[serde(default)]
    pub unlock_threshold: u32,

    /// Member country ids, in display order
    #[serde(default)]
    pub country_ids: Vec<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// A row from the `countries` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRow {
    pub id: String,

    #[serde(default)]
    pub flag: String,

    pub region_id: String,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// A row from the `quests` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestRow {
    pub id: String,

    pub country_id: String,

    /// Type tag, e.g. "trivia-quiz"
    pub quest_type: String,

    #[serde(default)]
    pub difficulty: String,

    #[serde(default)]
    pub points: u32,

    /// Type-specific payload, shape depends on `quest_type`
    #[serde(default)]
    pub payload: serde_json::Value,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// A row from the `translations` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRow {
    /// "region", "country" or "quest"
    pub entity_type: String,

    pub entity_id: String,

    pub language: String,

    /// Field name -> translated value. Non-string values are ignored.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

fn default_active() -> bool {
    true
}
