use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use signalizer::config::ScanConfig;
use signalizer::http_cache::HttpBodyCache;
use signalizer::http_client::{ReqwestTransport, http_client_with_timeout};
use signalizer::logging;
use signalizer::odds_cache::OddsCacheStore;
use signalizer::odds_fetch::OddsFetcher;
use signalizer::resolver::{FixtureResolver, display_time};
use signalizer::results_feed::FootballDataFeed;
use signalizer::scanner::{ScanSettings, Scanner};
use signalizer::stats_provider::{self, SqliteStatsProvider};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let mut cfg = ScanConfig::from_env();
    if let Some(days) = arg_value("--days").and_then(|v| v.parse::<i64>().ok()) {
        cfg.horizon_days = days.clamp(1, 30);
    }
    if let Some(out) = arg_value("--out") {
        cfg.signals_path = PathBuf::from(out);
    }

    let profiles = cfg.profiles()?;
    let watchlist = cfg.watchlist()?;

    let store = open_odds_cache(&cfg)?;
    let transport = ReqwestTransport::new(cfg.http_timeout_secs)?;
    let mut fetcher = OddsFetcher::new(store, Box::new(transport), cfg.odds.clone());

    let client = http_client_with_timeout(cfg.http_timeout_secs)?;
    let feed = FootballDataFeed::new(&cfg.feed_base_url, client, HttpBodyCache::in_app_dir());
    let stats = open_stats(&cfg);

    let mut resolver = FixtureResolver::new(cfg.season.clone()).with_feed(&feed);
    if let Some(stats) = stats.as_ref() {
        resolver = resolver.with_stats(stats);
    }

    let settings = ScanSettings {
        horizon_days: cfg.horizon_days,
        signal_cap: cfg.signal_cap,
        match_strategy: cfg.watchlist_match,
        csv_path: Some(cfg.signals_path.clone()),
        xlsx_path: cfg.signals_xlsx.clone(),
    };
    let mut scanner = Scanner::new(&profiles, resolver, &mut fetcher, &watchlist, settings);
    let report = scanner.scan(Utc::now());

    println!(
        "Scan complete ({} days, season {})",
        cfg.horizon_days, cfg.season
    );
    for league in &report.leagues {
        println!(
            "{:<20} source={:<5} fixtures={:<3} signals={}",
            league.league,
            league.source.map(|s| s.as_str()).unwrap_or("-"),
            league.fixtures,
            league.accepted
        );
    }
    if report.popular_fallback {
        println!("No strict signals; listing popular matches instead.");
    }
    for s in &report.signals {
        println!(
            "{} | {} | {} vs {} | {} @ {:.2} [{}] {}",
            s.league,
            display_time(s.kickoff),
            s.home_team,
            s.away_team,
            s.prediction,
            s.odds,
            s.confidence,
            s.watchlist.as_deref().unwrap_or("")
        );
    }
    println!(
        "{} signals saved to {}",
        report.signals.len(),
        cfg.signals_path.display()
    );
    for err in &report.write_errors {
        println!("  write failed: {err}");
    }
    Ok(())
}

fn open_odds_cache(cfg: &ScanConfig) -> Result<OddsCacheStore> {
    if let Some(path) = cfg.cache_db.as_ref() {
        match OddsCacheStore::open(path, cfg.cache_ttl_secs) {
            Ok(store) => return Ok(store),
            Err(err) => warn!(path = %path.display(), error = %err, "odds cache unavailable, using memory"),
        }
    }
    OddsCacheStore::open_in_memory(cfg.cache_ttl_secs)
}

fn open_stats(cfg: &ScanConfig) -> Option<SqliteStatsProvider> {
    if !cfg.use_stats_provider {
        return None;
    }
    let path = cfg.stats_db.clone().or_else(stats_provider::default_db_path)?;
    match SqliteStatsProvider::open(&path) {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "stats provider disabled");
            None
        }
    }
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
