//! Command-line interface for questmap.
//!
//! Operator commands for loading, inspecting and invalidating the
//! localized content cache.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{DurableStore, FileStore, RestContentSource};
use crate::config::{self, ResolvedConfig};
use crate::core::ContentCache;
use crate::domain::{Quest, Snapshot};

/// questmap - Localized content cache for the questmap learning game
#[derive(Parser, Debug)]
#[command(name = "questmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load content for a language and print a summary
    Fetch {
        /// Language tag (defaults to cache.default_language)
        #[arg(short, long)]
        lang: Option<String>,

        /// Always fetch from the source, even if a fresh snapshot exists
        #[arg(long)]
        refresh: bool,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// List regions
    Regions {
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// List countries
    Countries {
        #[arg(short, long)]
        lang: Option<String>,

        /// Only countries in this region
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Show one country
    Country {
        /// Country id
        id: String,

        #[arg(short, long)]
        lang: Option<String>,
    },

    /// List the quests of a country
    Quests {
        /// Country id
        country_id: String,

        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Show the durable snapshot's language and age
    Status,

    /// Drop cached content, optionally reloading a language
    Invalidate {
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;

        match self.command {
            Commands::Fetch {
                lang,
                refresh,
                json,
            } => fetch(cfg, &language(cfg, lang), refresh, json).await,
            Commands::Regions { lang } => list_regions(cfg, &language(cfg, lang)).await,
            Commands::Countries { lang, region } => {
                list_countries(cfg, &language(cfg, lang), region.as_deref()).await
            }
            Commands::Country { id, lang } => show_country(cfg, &language(cfg, lang), &id).await,
            Commands::Quests { country_id, lang } => {
                list_quests(cfg, &language(cfg, lang), &country_id).await
            }
            Commands::Status => show_status(cfg).await,
            Commands::Invalidate { lang } => invalidate(cfg, lang.as_deref()).await,
            Commands::Config => show_config(cfg),
        }
    }
}

fn language(cfg: &ResolvedConfig, lang: Option<String>) -> String {
    lang.unwrap_or_else(|| cfg.default_language.clone())
}

/// Compose a cache from the resolved configuration
fn build_cache(cfg: &ResolvedConfig) -> Result<ContentCache> {
    let source = RestContentSource::new(cfg.rest_config()?)?;
    let store = FileStore::new(cfg.cache_dir());

    Ok(ContentCache::new(
        Arc::new(source),
        Arc::new(store),
        cfg.cache.clone(),
    ))
}

/// Load through the cache.
///
/// The process exits right after the command, so a background refresh would
/// never land; a stale hit waits for the refresh instead and only falls back
/// to the stale snapshot if it fails.
async fn load(cache: &ContentCache, lang: &str) -> Result<Arc<Snapshot>> {
    let snapshot = cache
        .fetch_all_content(lang)
        .await
        .context("Failed to load content")?;

    if !cache.status().stale {
        return Ok(snapshot);
    }

    match cache.refresh(lang).await {
        Ok(fresh) => Ok(fresh),
        Err(e) => {
            eprintln!(
                "[Serving stale content captured {}; refresh failed: {}]",
                snapshot.captured_at, e
            );
            Ok(snapshot)
        }
    }
}

async fn fetch(cfg: &ResolvedConfig, lang: &str, refresh: bool, json: bool) -> Result<()> {
    let cache = build_cache(cfg)?;

    let snapshot = if refresh {
        cache
            .refresh(lang)
            .await
            .context("Failed to refresh content")?
    } else {
        load(&cache, lang).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        return Ok(());
    }

    println!("Language:  {}", snapshot.language);
    println!("Captured:  {}", snapshot.captured_at);
    println!("Regions:   {}", snapshot.regions.len());
    println!("Countries: {}", snapshot.countries.len());
    println!("Quests:    {}", snapshot.quest_count());

    Ok(())
}

async fn list_regions(cfg: &ResolvedConfig, lang: &str) -> Result<()> {
    let cache = build_cache(cfg)?;
    let snapshot = load(&cache, lang).await?;

    println!("{:<16} {:<6} {:<28} {:>8} {:>10}", "ID", "", "NAME", "UNLOCK", "COUNTRIES");
    println!("{}", "-".repeat(72));

    for region in &snapshot.regions {
        println!(
            "{:<16} {:<6} {:<28} {:>8} {:>10}",
            region.id,
            region.emoji,
            truncate(&region.name, 28),
            region.unlock_threshold,
            region.countries.len()
        );
    }

    println!("\nTotal: {} regions", snapshot.regions.len());

    Ok(())
}

async fn list_countries(cfg: &ResolvedConfig, lang: &str, region: Option<&str>) -> Result<()> {
    let cache = build_cache(cfg)?;
    let snapshot = load(&cache, lang).await?;

    let countries: Vec<_> = match region {
        Some(region_id) => snapshot.countries_in_region(region_id),
        None => snapshot.countries.iter().collect(),
    };

    if countries.is_empty() {
        println!("No countries found.");
        return Ok(());
    }

    println!("{:<8} {:<4} {:<28} {:<16} {:>7}", "ID", "", "NAME", "REGION", "QUESTS");
    println!("{}", "-".repeat(68));

    for country in &countries {
        println!(
            "{:<8} {:<4} {:<28} {:<16} {:>7}",
            country.id,
            country.flag,
            truncate(&country.name, 28),
            country.region,
            country.quests.len()
        );
    }

    println!("\nTotal: {} countries", countries.len());

    Ok(())
}

async fn show_country(cfg: &ResolvedConfig, lang: &str, id: &str) -> Result<()> {
    let cache = build_cache(cfg)?;
    load(&cache, lang).await?;

    let country = cache
        .get_country(id)
        .with_context(|| format!("Country not found: {}", id))?;

    println!("{} {} ({})", country.flag, country.name, country.id);
    if !country.local_name.is_empty() {
        println!("Local name:     {}", country.local_name);
    }
    println!("Region:         {}", country.region);
    if !country.greeting.is_empty() {
        println!("Greeting:       {}", country.greeting);
    }
    if !country.cultural_value.is_empty() {
        println!("Cultural value: {}", country.cultural_value);
    }
    if !country.description.is_empty() {
        println!("\n{}", country.description);
    }
    println!(
        "\nQuests: {} ({} points)",
        country.quests.len(),
        country.total_points()
    );

    Ok(())
}

async fn list_quests(cfg: &ResolvedConfig, lang: &str, country_id: &str) -> Result<()> {
    let cache = build_cache(cfg)?;
    load(&cache, lang).await?;

    let quests = cache.get_quests(country_id);
    if quests.is_empty() {
        println!("No quests for '{}'.", country_id);
        return Ok(());
    }

    println!("{:<12} {:<18} {:<12} {:>6}  {}", "ID", "TYPE", "DIFFICULTY", "POINTS", "TITLE");
    println!("{}", "-".repeat(80));

    for quest in &quests {
        println!(
            "{:<12} {:<18} {:<12} {:>6}  {}",
            quest.id,
            quest_type_label(quest),
            quest.difficulty.to_string(),
            quest.points,
            truncate(&quest.title, 40)
        );
    }

    Ok(())
}

fn quest_type_label(quest: &Quest) -> String {
    match quest.typed_payload() {
        Ok(_) => quest.type_tag.clone(),
        Err(_) => format!("{} (?)", quest.type_tag),
    }
}

async fn show_status(cfg: &ResolvedConfig) -> Result<()> {
    let store = FileStore::new(cfg.cache_dir());
    let path = store.key_path(&cfg.cache.storage_key);

    println!("Snapshot file: {}", path.display());

    match store.get(&cfg.cache.storage_key).await? {
        Some(snapshot) => {
            let now = chrono::Utc::now();
            let age = snapshot.age_at(now);
            println!("Language:      {}", snapshot.language);
            println!("Captured:      {}", snapshot.captured_at);
            println!("Age:           {}s", age.as_secs());
            println!(
                "Stale:         {} (max age {}s)",
                snapshot.is_stale_at(now, cfg.cache.max_age),
                cfg.cache.max_age.as_secs()
            );
            println!("Countries:     {}", snapshot.countries.len());
            println!("Quests:        {}", snapshot.quest_count());
        }
        None => println!("No snapshot stored."),
    }

    Ok(())
}

async fn invalidate(cfg: &ResolvedConfig, lang: Option<&str>) -> Result<()> {
    let cache = build_cache(cfg)?;

    match cache
        .invalidate_cache(lang)
        .await
        .context("Failed to reload content")?
    {
        Some(snapshot) => println!(
            "Cache invalidated and reloaded '{}' ({} countries).",
            snapshot.language,
            snapshot.countries.len()
        ),
        None => println!("Cache invalidated."),
    }

    Ok(())
}

fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("questmap configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:  {}", cfg.home.display());
    println!("  Cache: {}", cfg.cache_dir().display());
    println!();
    println!("Source:");
    println!(
        "  URL:     {}",
        cfg.source.url.as_deref().unwrap_or("(not configured)")
    );
    println!(
        "  API key: {}",
        if cfg.source.api_key.is_some() { "(set)" } else { "(none)" }
    );
    println!("  Timeout: {}s", cfg.source.request_timeout.as_secs());
    println!();
    println!("Cache:");
    println!("  Max age:           {}s", cfg.cache.max_age.as_secs());
    println!("  Fallback language: {}", cfg.cache.fallback_language);
    println!("  Default language:  {}", cfg.default_language);
    println!("  Storage key:       {}", cfg.cache.storage_key);

    Ok(())
}

/// Truncate to `max` characters, marking the cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ContentSource, EntitySet, MemoryStore, Query};
    use crate::core::{CacheSettings, Clock, ManualClock};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Source serving one country, or failing every read
    struct OneCountrySource {
        offline: bool,
    }

    #[async_trait]
    impl ContentSource for OneCountrySource {
        fn name(&self) -> &str {
            "one-country"
        }

        async fn read(&self, query: &Query) -> Result<Vec<Value>> {
            if self.offline {
                anyhow::bail!("network unreachable");
            }
            Ok(match query.entity {
                EntitySet::Countries => vec![json!({ "id": "kr", "region_id": "east_asia" })],
                _ => Vec::new(),
            })
        }
    }

    /// Cache whose durable store holds an empty snapshot two hours old
    fn stale_cache(offline: bool) -> ContentCache {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let stored = Snapshot::new("en", Vec::new(), Vec::new(), clock.now());
        clock.advance(Duration::from_secs(7200));

        ContentCache::with_clock(
            Arc::new(OneCountrySource { offline }),
            Arc::new(MemoryStore::with_snapshot(
                crate::core::cache::DEFAULT_STORAGE_KEY,
                stored,
            )),
            CacheSettings::default(),
            clock,
        )
    }

    #[tokio::test]
    async fn test_load_waits_for_refresh_on_stale_hit() {
        let cache = stale_cache(false);

        let snapshot = load(&cache, "en").await.unwrap();

        assert_eq!(snapshot.countries.len(), 1);
        assert!(!cache.status().stale);
    }

    #[tokio::test]
    async fn test_load_keeps_stale_snapshot_when_refresh_fails() {
        let cache = stale_cache(true);

        let snapshot = load(&cache, "en").await.unwrap();

        assert!(snapshot.countries.is_empty());
        assert!(cache.status().stale);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Korea", 10), "Korea");
        assert_eq!(truncate("대한민국의 전통 문화 체험", 8), "대한민국의...");
    }

    #[test]
    fn test_cli_parses_fetch() {
        let cli = Cli::parse_from(["questmap", "fetch", "--lang", "ko", "--refresh"]);
        match cli.command {
            Commands::Fetch {
                lang,
                refresh,
                json,
            } => {
                assert_eq!(lang.as_deref(), Some("ko"));
                assert!(refresh);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_quests() {
        let cli = Cli::parse_from(["questmap", "quests", "kr"]);
        assert!(matches!(
            cli.command,
            Commands::Quests { ref country_id, lang: None } if country_id == "kr"
        ));
    }
}
