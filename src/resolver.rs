use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::league_profile::LeagueProfile;
use crate::odds_cache::H2hPrices;
use crate::odds_fetch::OddsSource;
use crate::results_feed::{MatchRow, ResultsFeed, parse_feed_datetime};
use crate::stats_provider::StatsProvider;

/// Display offset for kickoff times (Moscow, no DST).
pub const DISPLAY_OFFSET_SECS: i32 = 3 * 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub competition: String,
    pub kickoff: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub odds: Option<H2hPrices>,
}

impl Fixture {
    /// Kickoff rendered in UTC+3, e.g. `2026-10-18 17:00 (MSK)`.
    pub fn display_kickoff(&self) -> String {
        display_time(self.kickoff)
    }

    pub fn involves_top_team(&self, profile: &LeagueProfile) -> bool {
        profile.is_top_team(&self.home_team) || profile.is_top_team(&self.away_team)
    }
}

pub fn display_time(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(DISPLAY_OFFSET_SECS) {
        Some(tz) => at.with_timezone(&tz).format("%Y-%m-%d %H:%M (MSK)").to_string(),
        None => (at.naive_utc() + Duration::seconds(DISPLAY_OFFSET_SECS as i64))
            .format("%Y-%m-%d %H:%M (MSK)")
            .to_string(),
    }
}

/// Inverse of [`display_time`]; the `(MSK)` suffix is optional.
pub fn parse_display_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_end_matches("(MSK)").trim();
    let local = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M").ok()?;
    let utc = local - Duration::seconds(DISPLAY_OFFSET_SECS as i64);
    Some(Utc.from_utc_datetime(&utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureSource {
    StatsProvider,
    ResultsFeed,
    Odds,
}

impl FixtureSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FixtureSource::StatsProvider => "stats",
            FixtureSource::ResultsFeed => "feed",
            FixtureSource::Odds => "odds",
        }
    }
}

/// Outcome of one league resolution.
///
/// `results` is the first non-empty results table seen along the chain and
/// feeds the form filter; it stays `None` when only the odds provider answered.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub fixtures: Vec<Fixture>,
    pub results: Option<Vec<MatchRow>>,
    pub source: Option<FixtureSource>,
}

/// Walks the source chain for one league: stats provider (when enabled), the
/// flat feed for `season`, then the odds provider. The first source with a
/// fixture inside the horizon wins.
pub struct FixtureResolver<'a> {
    stats: Option<&'a dyn StatsProvider>,
    feed: Option<&'a dyn ResultsFeed>,
    season: String,
}

impl<'a> FixtureResolver<'a> {
    pub fn new(season: impl Into<String>) -> Self {
        Self {
            stats: None,
            feed: None,
            season: season.into(),
        }
    }

    pub fn with_stats(mut self, stats: &'a dyn StatsProvider) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_feed(mut self, feed: &'a dyn ResultsFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn resolve(
        &self,
        profile: &LeagueProfile,
        horizon_days: i64,
        now: DateTime<Utc>,
        odds: &mut dyn OddsSource,
    ) -> Vec<Fixture> {
        self.resolve_with_results(profile, horizon_days, now, odds)
            .fixtures
    }

    pub fn resolve_with_results(
        &self,
        profile: &LeagueProfile,
        horizon_days: i64,
        now: DateTime<Utc>,
        odds: &mut dyn OddsSource,
    ) -> Resolution {
        let mut out = Resolution::default();

        if let Some(table) = self.stats_table(profile) {
            let fixtures = upcoming_from_rows(profile, &table, horizon_days, now);
            out.results = Some(table);
            if !fixtures.is_empty() {
                out.fixtures = fixtures;
                out.source = Some(FixtureSource::StatsProvider);
                return out;
            }
        }

        if let Some(table) = self.feed_table(profile) {
            let fixtures = upcoming_from_rows(profile, &table, horizon_days, now);
            if out.results.is_none() {
                out.results = Some(table);
            }
            if !fixtures.is_empty() {
                out.fixtures = fixtures;
                out.source = Some(FixtureSource::ResultsFeed);
                return out;
            }
        }

        let markets = odds.get_odds(&profile.odds_key);
        let mut dropped = 0usize;
        let mut fixtures = Vec::new();
        for m in markets {
            let Some(kickoff) = parse_feed_datetime(&m.commence_time, None) else {
                dropped += 1;
                continue;
            };
            if !in_horizon(kickoff, horizon_days, now) {
                continue;
            }
            fixtures.push(Fixture {
                competition: profile.name.clone(),
                kickoff,
                home_team: m.home_team,
                away_team: m.away_team,
                odds: Some(m.prices),
            });
        }
        if dropped > 0 {
            debug!(league = %profile.name, dropped, "odds events without kickoff skipped");
        }
        if !fixtures.is_empty() {
            fixtures.sort_by_key(|f| f.kickoff);
            out.fixtures = fixtures;
            out.source = Some(FixtureSource::Odds);
        } else {
            info!(league = %profile.name, "no fixtures from any source");
        }
        out
    }

    /// Upcoming flat-feed fixtures involving a top team, primary filters ignored.
    pub fn popular_fixtures(
        &self,
        profile: &LeagueProfile,
        horizon_days: i64,
        now: DateTime<Utc>,
    ) -> Vec<Fixture> {
        let Some(table) = self.feed_table(profile) else {
            return Vec::new();
        };
        upcoming_from_rows(profile, &table, horizon_days, now)
            .into_iter()
            .filter(|f| f.involves_top_team(profile))
            .collect()
    }

    fn stats_table(&self, profile: &LeagueProfile) -> Option<Vec<MatchRow>> {
        let stats = self.stats?;
        match stats.league_table(&profile.stats_id) {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => None,
            Err(err) => {
                warn!(league = %profile.name, error = %err, "stats provider failed");
                None
            }
        }
    }

    fn feed_table(&self, profile: &LeagueProfile) -> Option<Vec<MatchRow>> {
        let feed = self.feed?;
        let code = profile.feed_code.as_deref()?;
        match feed.load_season(code, &self.season) {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => None,
            Err(err) => {
                warn!(league = %profile.name, error = %err, "results feed failed");
                None
            }
        }
    }
}

pub fn in_horizon(kickoff: DateTime<Utc>, horizon_days: i64, now: DateTime<Utc>) -> bool {
    kickoff >= now && kickoff <= now + Duration::days(horizon_days)
}

fn upcoming_from_rows(
    profile: &LeagueProfile,
    rows: &[MatchRow],
    horizon_days: i64,
    now: DateTime<Utc>,
) -> Vec<Fixture> {
    let mut out: Vec<Fixture> = rows
        .iter()
        .filter(|r| in_horizon(r.date, horizon_days, now))
        .map(|r| Fixture {
            competition: profile.name.clone(),
            kickoff: r.date,
            home_team: r.home_team.clone(),
            away_team: r.away_team.clone(),
            odds: None,
        })
        .collect();
    out.sort_by_key(|f| f.kickoff);
    out
}
