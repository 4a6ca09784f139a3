//! Fetch-and-merge: parallel source reads assembled into a snapshot.
//!
//! Regions, countries, quests and fallback-language translations are
//! required; if any of those reads fails the cycle fails. Requested-language
//! translations are best-effort and an error there just means "none".

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::adapters::{ContentSource, EntitySet, Query};
use crate::domain::{
    Country, CountryRow, Difficulty, EntityKind, Quest, QuestPayload, QuestRow, Region, RegionRow,
    Resolver, Snapshot, TranslationIndex, TranslationRow,
};

use super::cache::DIAGNOSTICS;

/// Raw rows from one read burst
#[derive(Debug, Default)]
pub struct SourceRows {
    pub regions: Vec<RegionRow>,
    pub countries: Vec<CountryRow>,
    pub quests: Vec<QuestRow>,
    pub fallback_translations: Vec<TranslationRow>,
    pub requested_translations: Vec<TranslationRow>,
}

fn active_query(entity: EntitySet) -> Query {
    Query::new(entity)
        .filter("is_active", "true")
        .order("sort_order")
}

fn translation_query(language: &str) -> Query {
    Query::new(EntitySet::Translations)
        .filter("language", language)
        .order("entity_type")
        .order("entity_id")
}

/// Issue one read and decode its rows, skipping any that don't fit
async fn read_rows<T: DeserializeOwned>(
    source: &dyn ContentSource,
    query: Query,
) -> Result<Vec<T>> {
    let raw = source
        .read(&query)
        .await
        .with_context(|| format!("Failed to read {}", query.entity))?;

    let mut rows = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(row) => rows.push(row),
            Err(e) => warn!(
                target: DIAGNOSTICS,
                event = "row_skipped",
                entity = %query.entity,
                error = %e,
                "Skipping row that failed to decode"
            ),
        }
    }

    Ok(rows)
}

/// Issue all reads for `language` concurrently
pub async fn fetch_rows(
    source: &dyn ContentSource,
    language: &str,
    fallback_language: &str,
) -> Result<SourceRows> {
    let wants_requested = language != fallback_language;

    let (regions, countries, quests, fallback, requested) = tokio::join!(
        read_rows::<RegionRow>(source, active_query(EntitySet::Regions)),
        read_rows::<CountryRow>(source, active_query(EntitySet::Countries)),
        read_rows::<QuestRow>(source, active_query(EntitySet::Quests)),
        read_rows::<TranslationRow>(source, translation_query(fallback_language)),
        async {
            if wants_requested {
                Some(read_rows::<TranslationRow>(source, translation_query(language)).await)
            } else {
                None
            }
        }
    );

    let requested_translations = match requested {
        Some(Ok(rows)) => rows,
        Some(Err(e)) => {
            warn!(
                target: DIAGNOSTICS,
                event = "requested_translations_unavailable",
                language,
                error = %format!("{:#}", e),
                "Continuing with fallback translations only"
            );
            Vec::new()
        }
        None => Vec::new(),
    };

    Ok(SourceRows {
        regions: regions?,
        countries: countries?,
        quests: quests?,
        fallback_translations: fallback?,
        requested_translations,
    })
}

/// Assemble display-ready content from raw rows
pub fn assemble(rows: &SourceRows, language: &str, captured_at: DateTime<Utc>) -> Snapshot {
    let fallback = TranslationIndex::from_rows(&rows.fallback_translations);
    let requested = TranslationIndex::from_rows(&rows.requested_translations);
    let resolver = Resolver::new(&requested, &fallback);

    // Group quests by owning country, keeping source order
    let mut quests_by_country: HashMap<&str, Vec<Quest>> = HashMap::new();
    for row in &rows.quests {
        quests_by_country
            .entry(row.country_id.as_str())
            .or_default()
            .push(build_quest(row, &resolver));
    }

    let regions = rows
        .regions
        .iter()
        .map(|row| Region {
            id: row.id.clone(),
            name: resolver.name(EntityKind::Region, &row.id, "name"),
            emoji: row.emoji.clone(),
            color: row.color.clone(),
            unlock_threshold: row.unlock_threshold,
            countries: row.country_ids.clone(),
        })
        .collect();

    let countries = rows
        .countries
        .iter()
        .map(|row| Country {
            id: row.id.clone(),
            name: resolver.name(EntityKind::Country, &row.id, "name"),
            local_name: resolver.text(EntityKind::Country, &row.id, "localName"),
            flag: row.flag.clone(),
            region: row.region_id.clone(),
            greeting: resolver.text(EntityKind::Country, &row.id, "greeting"),
            cultural_value: resolver.text(EntityKind::Country, &row.id, "culturalValue"),
            description: resolver.text(EntityKind::Country, &row.id, "description"),
            quests: quests_by_country.remove(row.id.as_str()).unwrap_or_default(),
        })
        .collect();

    Snapshot::new(language, regions, countries, captured_at)
}

fn build_quest(row: &QuestRow, resolver: &Resolver<'_>) -> Quest {
    let payload = QuestPayload::from_raw(&row.quest_type, row.payload.clone());

    match &payload {
        QuestPayload::Unknown { type_tag, .. } => debug!(
            quest = %row.id,
            type_tag = %type_tag,
            "Quest has unknown type tag"
        ),
        QuestPayload::Malformed { reason, .. } => warn!(
            quest = %row.id,
            reason = %reason,
            "Quest payload does not match its type"
        ),
        _ => {}
    }

    Quest {
        id: row.id.clone(),
        country_id: row.country_id.clone(),
        type_tag: row.quest_type.clone(),
        difficulty: Difficulty::from_tag(&row.difficulty),
        points: row.points,
        title: resolver.name(EntityKind::Quest, &row.id, "title"),
        description: resolver.text(EntityKind::Quest, &row.id, "description"),
        payload,
    }
}

/// Run the reads and assemble the result
pub async fn fetch_and_merge(
    source: &dyn ContentSource,
    language: &str,
    fallback_language: &str,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    let started = Instant::now();
    let rows = fetch_rows(source, language, fallback_language).await?;
    let snapshot = assemble(&rows, language, now);

    debug!(
        language,
        regions = snapshot.regions.len(),
        countries = snapshot.countries.len(),
        quests = snapshot.quest_count(),
        requested_translations = rows.requested_translations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Content merged"
    );

    Ok(snapshot)
}
