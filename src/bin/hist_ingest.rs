use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use signalizer::config::ScanConfig;
use signalizer::http_cache::HttpBodyCache;
use signalizer::http_client::http_client_with_timeout;
use signalizer::logging;
use signalizer::results_feed::FootballDataFeed;
use signalizer::stats_provider::{self, SqliteStatsProvider};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let cfg = ScanConfig::from_env();
    let seasons = arg_value("--seasons")
        .map(|raw| parse_seasons(&raw))
        .unwrap_or_else(|| vec![cfg.season.clone()]);
    if seasons.is_empty() {
        return Err(anyhow!("no seasons resolved for ingest"));
    }

    let db_path = arg_value("--db")
        .map(PathBuf::from)
        .or_else(|| cfg.stats_db.clone())
        .or_else(stats_provider::default_db_path)
        .context("unable to resolve sqlite path")?;

    let profiles = cfg.profiles()?;
    let client = http_client_with_timeout(cfg.http_timeout_secs)?;
    let feed = FootballDataFeed::new(&cfg.feed_base_url, client, HttpBodyCache::in_app_dir());

    let mut store = SqliteStatsProvider::open(&db_path)?;
    let summary = store.ingest(&feed, &profiles, &seasons)?;

    println!("Historical ingest complete");
    println!("DB: {}", db_path.display());
    println!("Seasons: {:?}", summary.seasons);
    println!(
        "Season loads: {}/{}",
        summary.seasons_succeeded, summary.seasons_total
    );
    println!("Matches upserted: {}", summary.matches_upserted);
    if !summary.skipped.is_empty() {
        println!("Skipped (no feed code): {}", summary.skipped.join(", "));
    }

    let mut league_keys = summary.per_league.keys().cloned().collect::<Vec<_>>();
    league_keys.sort_unstable();
    for stats_id in league_keys {
        let Some(item) = summary.per_league.get(&stats_id) else {
            continue;
        };
        println!(
            "league {}: seasons {}/{} matches={} latest={}",
            stats_id,
            item.seasons_succeeded,
            item.seasons_total,
            item.matches_upserted,
            item.latest_utc_time.as_deref().unwrap_or("n/a")
        );
        if !item.errors.is_empty() {
            println!("  errors: {}", item.errors.len());
            for err in item.errors.iter().take(6) {
                println!("   - {err}");
            }
        }
    }

    Ok(())
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix)
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

/// Four-digit feed season codes such as `2324`; anything else is dropped.
fn parse_seasons(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split([',', ';', ' '])
        .map(str::trim)
        .filter(|part| part.len() == 4 && part.chars().all(|c| c.is_ascii_digit()))
        .filter(|part| seen.insert(part.to_string()))
        .map(str::to_string)
        .collect()
}
