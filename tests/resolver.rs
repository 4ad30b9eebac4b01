use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};

use signalizer::league_profile::LeagueProfile;
use signalizer::odds_cache::MarketEntry;
use signalizer::odds_fetch::{OddsSource, parse_odds_events};
use signalizer::resolver::{FixtureResolver, FixtureSource};
use signalizer::results_feed::{MatchRow, ResultsFeed, parse_results_csv};
use signalizer::stats_provider::StatsProvider;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn epl() -> LeagueProfile {
    LeagueProfile {
        name: "Premier League".to_string(),
        stats_id: "ENG-Premier League".to_string(),
        feed_code: Some("E0".to_string()),
        odds_key: "soccer_epl".to_string(),
        top_teams: vec![
            "Arsenal".to_string(),
            "Liverpool".to_string(),
            "Chelsea".to_string(),
        ],
        opp_last5_max: Some(6),
        clean_last3_min: Some(1),
        min_odds: 1.2,
    }
}

struct CsvFeed {
    body: String,
    calls: Cell<usize>,
}

impl CsvFeed {
    fn new(body: String) -> Self {
        Self {
            body,
            calls: Cell::new(0),
        }
    }
}

impl ResultsFeed for CsvFeed {
    fn load_season(&self, feed_code: &str, _season: &str) -> Result<Vec<MatchRow>> {
        self.calls.set(self.calls.get() + 1);
        if feed_code != "E0" {
            return Ok(Vec::new());
        }
        parse_results_csv(&self.body)
    }
}

enum FakeStats {
    Table(Vec<MatchRow>),
    Broken,
}

impl StatsProvider for FakeStats {
    fn league_table(&self, _stats_id: &str) -> Result<Vec<MatchRow>> {
        match self {
            FakeStats::Table(rows) => Ok(rows.clone()),
            FakeStats::Broken => Err(anyhow!("database is locked")),
        }
    }
}

#[derive(Default)]
struct FixedOdds {
    markets: Vec<MarketEntry>,
    calls: usize,
}

impl OddsSource for FixedOdds {
    fn get_odds(&mut self, competition: &str) -> Vec<MarketEntry> {
        self.calls += 1;
        if competition == "soccer_epl" {
            self.markets.clone()
        } else {
            Vec::new()
        }
    }
}

fn fixture_odds() -> FixedOdds {
    FixedOdds {
        markets: parse_odds_events(&read_fixture("odds_epl.json")).expect("odds fixture"),
        calls: 0,
    }
}

fn played_only_csv() -> String {
    read_fixture("results_E0.csv")
        .lines()
        .filter(|l| !l.ends_with(",,"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pairs(fixtures: &[signalizer::resolver::Fixture]) -> Vec<(String, String)> {
    fixtures
        .iter()
        .map(|f| (f.home_team.clone(), f.away_team.clone()))
        .collect()
}

#[test]
fn feed_rows_outside_the_horizon_are_ignored() {
    let feed = CsvFeed::new(read_fixture("results_E0.csv"));
    let resolver = FixtureResolver::new("2627").with_feed(&feed);
    let mut odds = FixedOdds::default();

    let out = resolver.resolve_with_results(&epl(), 7, now(), &mut odds);
    assert_eq!(out.source, Some(FixtureSource::ResultsFeed));
    assert_eq!(
        pairs(&out.fixtures),
        vec![
            ("Arsenal".to_string(), "Everton".to_string()),
            ("Liverpool".to_string(), "Brentford".to_string()),
            ("Fulham".to_string(), "Wolves".to_string()),
        ]
    );
    assert!(out.fixtures.iter().all(|f| f.odds.is_none()));
    assert_eq!(out.results.as_ref().map(Vec::len), Some(22));
    assert_eq!(odds.calls, 0);

    let short = resolver.resolve(&epl(), 2, now(), &mut odds);
    assert_eq!(short.len(), 1);
    assert_eq!(short[0].display_kickoff(), "2026-10-18 17:00 (MSK)");
}

#[test]
fn stats_provider_is_asked_first() {
    let table = parse_results_csv(&read_fixture("results_E0.csv")).expect("csv");
    let stats = FakeStats::Table(table);
    let feed = CsvFeed::new(read_fixture("results_E0.csv"));
    let resolver = FixtureResolver::new("2627")
        .with_stats(&stats)
        .with_feed(&feed);
    let mut odds = FixedOdds::default();

    let out = resolver.resolve_with_results(&epl(), 7, now(), &mut odds);
    assert_eq!(out.source, Some(FixtureSource::StatsProvider));
    assert_eq!(out.fixtures.len(), 3);
    assert_eq!(feed.calls.get(), 0);
    assert_eq!(odds.calls, 0);
}

#[test]
fn broken_or_empty_stats_fall_through_to_the_feed() {
    let feed = CsvFeed::new(read_fixture("results_E0.csv"));
    let mut odds = FixedOdds::default();

    for stats in [FakeStats::Broken, FakeStats::Table(Vec::new())] {
        let resolver = FixtureResolver::new("2627")
            .with_stats(&stats)
            .with_feed(&feed);
        let out = resolver.resolve_with_results(&epl(), 7, now(), &mut odds);
        assert_eq!(out.source, Some(FixtureSource::ResultsFeed));
        assert_eq!(out.fixtures.len(), 3);
    }
}

#[test]
fn odds_supply_fixtures_when_the_feed_has_only_results() {
    let feed = CsvFeed::new(played_only_csv());
    let resolver = FixtureResolver::new("2627").with_feed(&feed);
    let mut odds = fixture_odds();

    let out = resolver.resolve_with_results(&epl(), 7, now(), &mut odds);
    assert_eq!(out.source, Some(FixtureSource::Odds));
    // November kickoff is past the horizon, the TBD one has no kickoff at all.
    assert_eq!(
        pairs(&out.fixtures),
        vec![
            ("Arsenal".to_string(), "Everton".to_string()),
            ("Liverpool".to_string(), "Brentford".to_string()),
            ("Fulham".to_string(), "Wolverhampton Wanderers".to_string()),
        ]
    );
    assert_eq!(out.fixtures[0].odds.and_then(|p| p.home), Some(1.45));
    // The played table is still handed on for the form filter.
    assert_eq!(out.results.as_ref().map(Vec::len), Some(17));
}

#[test]
fn nothing_anywhere_resolves_to_empty() {
    let resolver = FixtureResolver::new("2627");
    let mut odds = FixedOdds::default();
    let out = resolver.resolve_with_results(&epl(), 7, now(), &mut odds);
    assert!(out.fixtures.is_empty());
    assert!(out.results.is_none());
    assert_eq!(out.source, None);
    assert_eq!(odds.calls, 1);
}

#[test]
fn popular_fixtures_need_a_top_team() {
    let feed = CsvFeed::new(read_fixture("results_E0.csv"));
    let resolver = FixtureResolver::new("2627").with_feed(&feed);
    let popular = resolver.popular_fixtures(&epl(), 7, now());
    assert_eq!(
        pairs(&popular),
        vec![
            ("Arsenal".to_string(), "Everton".to_string()),
            ("Liverpool".to_string(), "Brentford".to_string()),
        ]
    );

    let mut no_feed = epl();
    no_feed.feed_code = None;
    assert!(resolver.popular_fixtures(&no_feed, 7, now()).is_empty());
}
