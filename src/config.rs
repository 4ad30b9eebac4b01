use std::env;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use crate::league_profile::{LeagueProfile, default_profiles, load_profiles};
use crate::odds_cache::{self, DEFAULT_TTL_SECS};
use crate::odds_fetch::{DEFAULT_BASE_URL, OddsFetchConfig, parse_api_keys};
use crate::results_feed::{DEFAULT_FEED_BASE_URL, season_code};
use crate::scanner::DEFAULT_SIGNAL_CAP;
use crate::team_match::MatchStrategy;
use crate::watchlist::Watchlist;

const MAX_TTL_SECS: i64 = 7 * 24 * 3600;

/// Everything a scan run reads from the environment.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub odds: OddsFetchConfig,
    pub cache_ttl_secs: i64,
    pub cache_db: Option<PathBuf>,
    pub horizon_days: i64,
    pub season: String,
    pub use_stats_provider: bool,
    pub stats_db: Option<PathBuf>,
    pub feed_base_url: String,
    pub signals_path: PathBuf,
    pub signals_xlsx: Option<PathBuf>,
    pub league_profiles: Option<PathBuf>,
    pub watchlist_file: Option<PathBuf>,
    pub watchlist_match: MatchStrategy,
    pub http_timeout_secs: u64,
    pub signal_cap: usize,
    pub history_path: PathBuf,
}

impl ScanConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str| get(key).map(|v| PathBuf::from(v.trim()));

        let watchlist_match = match get("WATCHLIST_MATCH") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(value = %raw, error = %err, "bad WATCHLIST_MATCH, using substring");
                MatchStrategy::default()
            }),
            None => MatchStrategy::default(),
        };

        Self {
            odds: OddsFetchConfig {
                base_url: get("ODDS_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_keys: get("ODDS_API_KEY")
                    .map(|raw| parse_api_keys(&raw))
                    .unwrap_or_default(),
                regions: get("ODDS_REGIONS").unwrap_or_else(|| "eu".to_string()),
                markets: get("ODDS_MARKETS").unwrap_or_else(|| "h2h".to_string()),
            },
            cache_ttl_secs: get("ODDS_CACHE_TTL_SECS")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(DEFAULT_TTL_SECS)
                .clamp(60, MAX_TTL_SECS),
            cache_db: path("ODDS_CACHE_DB").or_else(odds_cache::default_db_path),
            horizon_days: get("SCAN_HORIZON_DAYS")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(7)
                .clamp(1, 30),
            season: get("SCAN_SEASON")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| season_code(Utc::now().date_naive())),
            use_stats_provider: get("USE_STATS_PROVIDER").is_some_and(|v| parse_bool(&v)),
            stats_db: path("STATS_DB"),
            feed_base_url: get("FEED_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string()),
            signals_path: path("SIGNALS_PATH")
                .unwrap_or_else(|| PathBuf::from("under35_signals.csv")),
            signals_xlsx: path("SIGNALS_XLSX"),
            league_profiles: path("LEAGUE_PROFILES"),
            watchlist_file: path("WATCHLIST_FILE"),
            watchlist_match,
            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(10)
                .clamp(1, 120),
            signal_cap: get("SIGNAL_CAP")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(DEFAULT_SIGNAL_CAP)
                .max(1),
            history_path: path("HISTORY_PATH")
                .unwrap_or_else(|| PathBuf::from("data/history.json")),
        }
    }

    /// Built-in profiles unless a profile file is configured.
    pub fn profiles(&self) -> Result<Vec<LeagueProfile>> {
        match self.league_profiles.as_ref() {
            Some(path) => load_profiles(path),
            None => Ok(default_profiles()),
        }
    }

    pub fn watchlist(&self) -> Result<Watchlist> {
        match self.watchlist_file.as_ref() {
            Some(path) => Watchlist::load(path),
            None => Ok(Watchlist::default()),
        }
    }
}

/// `0`, `false`, `off`, `no` and blank are false; anything else is true.
pub fn parse_bool(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::{ScanConfig, parse_bool};
    use crate::team_match::MatchStrategy;

    fn config(pairs: &[(&str, &str)]) -> ScanConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScanConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]);
        assert!(cfg.odds.api_keys.is_empty());
        assert_eq!(cfg.odds.regions, "eu");
        assert_eq!(cfg.cache_ttl_secs, 6 * 3600);
        assert_eq!(cfg.horizon_days, 7);
        assert!(!cfg.use_stats_provider);
        assert_eq!(cfg.signals_path, PathBuf::from("under35_signals.csv"));
        assert_eq!(cfg.signal_cap, 10);
        assert_eq!(cfg.watchlist_match, MatchStrategy::Substring);
        assert_eq!(cfg.season.len(), 4);
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let cfg = config(&[
            ("ODDS_API_KEY", "k1, k2,,"),
            ("ODDS_CACHE_TTL_SECS", "5"),
            ("SCAN_HORIZON_DAYS", "90"),
            ("USE_STATS_PROVIDER", "yes"),
            ("SCAN_SEASON", "2526"),
            ("WATCHLIST_MATCH", "edit:2"),
            ("SIGNALS_XLSX", "  "),
        ]);
        assert_eq!(cfg.odds.api_keys, vec!["k1".to_string(), "k2".to_string()]);
        assert_eq!(cfg.cache_ttl_secs, 60);
        assert_eq!(cfg.horizon_days, 30);
        assert!(cfg.use_stats_provider);
        assert_eq!(cfg.season, "2526");
        assert_eq!(cfg.watchlist_match, MatchStrategy::EditDistance(2));
        assert!(cfg.signals_xlsx.is_none());
    }

    #[test]
    fn bool_parsing_matches_env_conventions() {
        assert!(!parse_bool("off"));
        assert!(!parse_bool(" FALSE "));
        assert!(!parse_bool(""));
        assert!(parse_bool("1"));
        assert!(parse_bool("on"));
    }

    #[test]
    fn bad_strategy_falls_back_to_substring() {
        let cfg = config(&[("WATCHLIST_MATCH", "fuzzy")]);
        assert_eq!(cfg.watchlist_match, MatchStrategy::Substring);
    }
}
