pub mod config;
pub mod express;
pub mod form;
pub mod history;
pub mod http_cache;
pub mod http_client;
pub mod league_profile;
pub mod logging;
pub mod narrative;
pub mod odds_cache;
pub mod odds_fetch;
pub mod resolver;
pub mod results_feed;
pub mod scanner;
pub mod signals;
pub mod stakes;
pub mod stats_provider;
pub mod team_match;
pub mod watchlist;

/// Fresh per-process directory under the system temp dir.
#[cfg(test)]
pub(crate) fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("signalizer_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}
