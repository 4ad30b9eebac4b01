use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::league_profile::LeagueProfile;
use crate::odds_cache::{H2hPrices, MarketEntry};
use crate::odds_fetch::{OddsSource, find_market};
use crate::resolver::{Fixture, FixtureResolver, FixtureSource};
use crate::signals::{Signal, export_signals_xlsx, passes, write_signals_csv};
use crate::team_match::MatchStrategy;
use crate::watchlist::Watchlist;

pub const DEFAULT_SIGNAL_CAP: usize = 10;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub horizon_days: i64,
    pub signal_cap: usize,
    pub match_strategy: MatchStrategy,
    pub csv_path: Option<PathBuf>,
    pub xlsx_path: Option<PathBuf>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            signal_cap: DEFAULT_SIGNAL_CAP,
            match_strategy: MatchStrategy::default(),
            csv_path: None,
            xlsx_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeagueScan {
    pub league: String,
    pub source: Option<FixtureSource>,
    pub fixtures: usize,
    pub accepted: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub signals: Vec<Signal>,
    pub leagues: Vec<LeagueScan>,
    pub popular_fallback: bool,
    pub write_errors: Vec<String>,
}

/// One pass over every league profile, producing the capped signal list.
pub struct Scanner<'a> {
    profiles: &'a [LeagueProfile],
    resolver: FixtureResolver<'a>,
    odds: &'a mut dyn OddsSource,
    watchlist: &'a Watchlist,
    settings: ScanSettings,
    markets: HashMap<String, Vec<MarketEntry>>,
}

/// Answers each competition from the first provider reply of the scan, empty
/// replies included, so a failed fetch is not repeated per fixture.
struct ScanOdds<'s> {
    inner: &'s mut dyn OddsSource,
    markets: &'s mut HashMap<String, Vec<MarketEntry>>,
}

impl OddsSource for ScanOdds<'_> {
    fn get_odds(&mut self, competition: &str) -> Vec<MarketEntry> {
        if let Some(known) = self.markets.get(competition) {
            return known.clone();
        }
        let fetched = self.inner.get_odds(competition);
        self.markets.insert(competition.to_string(), fetched.clone());
        fetched
    }
}

impl<'a> Scanner<'a> {
    pub fn new(
        profiles: &'a [LeagueProfile],
        resolver: FixtureResolver<'a>,
        odds: &'a mut dyn OddsSource,
        watchlist: &'a Watchlist,
        settings: ScanSettings,
    ) -> Self {
        Self {
            profiles,
            resolver,
            odds,
            watchlist,
            settings,
            markets: HashMap::new(),
        }
    }

    /// Runs the scan and, when output paths are set, replaces the signal files.
    /// Failures along the way shrink the result, they never abort it.
    pub fn scan(&mut self, now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport::default();
        let mut signals = Vec::new();
        self.markets.clear();

        for profile in self.profiles {
            let (league, mut found) = self.scan_league(profile, now);
            report.leagues.push(league);
            signals.append(&mut found);
        }

        if signals.is_empty() {
            info!("no strict signals, falling back to popular matches");
            report.popular_fallback = true;
            for profile in self.profiles.iter().filter(|p| p.feed_code.is_some()) {
                signals.extend(
                    self.resolver
                        .popular_fixtures(profile, self.settings.horizon_days, now)
                        .iter()
                        .map(Signal::popular),
                );
            }
        }

        signals.sort_by_key(|s| s.kickoff);
        signals.truncate(self.settings.signal_cap);
        info!(
            signals = signals.len(),
            popular = report.popular_fallback,
            "scan complete"
        );

        if let Some(path) = self.settings.csv_path.as_ref()
            && let Err(err) = write_signals_csv(path, &signals)
        {
            warn!(path = %path.display(), error = %err, "signal csv not written");
            report.write_errors.push(format!("{err:#}"));
        }
        if let Some(path) = self.settings.xlsx_path.as_ref()
            && let Err(err) = export_signals_xlsx(path, &signals)
        {
            warn!(path = %path.display(), error = %err, "signal xlsx not written");
            report.write_errors.push(format!("{err:#}"));
        }

        report.signals = signals;
        report
    }

    fn scan_league(&mut self, profile: &LeagueProfile, now: DateTime<Utc>) -> (LeagueScan, Vec<Signal>) {
        info!(league = %profile.name, "scanning");
        let mut odds = ScanOdds {
            inner: &mut *self.odds,
            markets: &mut self.markets,
        };
        let markets = odds.get_odds(&profile.odds_key);

        let resolution = self.resolver.resolve_with_results(
            profile,
            self.settings.horizon_days,
            now,
            &mut odds,
        );
        let results = resolution.results.as_deref();
        let accepted: Vec<Fixture> = resolution
            .fixtures
            .par_iter()
            .filter(|f| passes(f, profile, results))
            .cloned()
            .collect();

        let mut signals = Vec::with_capacity(accepted.len());
        for fixture in &accepted {
            let prices = fixture.odds.or_else(|| {
                find_market(&markets, &fixture.home_team, &fixture.away_team).map(|m| m.prices)
            });
            let odds = top_team_price(fixture, profile, prices).unwrap_or(profile.min_odds);
            let badge = self.watchlist.badge_for(
                &fixture.home_team,
                &fixture.away_team,
                self.settings.match_strategy,
            );
            signals.push(Signal::strict(fixture, odds, badge));
        }

        let league = LeagueScan {
            league: profile.name.clone(),
            source: resolution.source,
            fixtures: resolution.fixtures.len(),
            accepted: signals.len(),
        };
        (league, signals)
    }
}

/// Price of the favourite's side, when the bookmaker quoted one above evens.
fn top_team_price(fixture: &Fixture, profile: &LeagueProfile, prices: Option<H2hPrices>) -> Option<f64> {
    let prices = prices?;
    let side = if profile.is_top_team(&fixture.home_team) {
        prices.home
    } else {
        prices.away
    };
    side.filter(|price| *price > 1.0)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::top_team_price;
    use crate::league_profile::default_profiles;
    use crate::odds_cache::H2hPrices;
    use crate::resolver::Fixture;

    #[test]
    fn price_follows_the_top_team_side() {
        let epl = default_profiles()
            .into_iter()
            .find(|p| p.name == "Premier League")
            .expect("epl");
        let prices = Some(H2hPrices {
            home: Some(6.0),
            away: Some(1.5),
            draw: Some(4.2),
        });
        let f = Fixture {
            competition: epl.name.clone(),
            kickoff: Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap(),
            home_team: "Everton".to_string(),
            away_team: "Arsenal".to_string(),
            odds: None,
        };
        assert_eq!(top_team_price(&f, &epl, prices), Some(1.5));
        assert_eq!(top_team_price(&f, &epl, None), None);
        let junk = Some(H2hPrices {
            away: Some(1.0),
            ..Default::default()
        });
        assert_eq!(top_team_price(&f, &epl, junk), None);
    }
}
