use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use reqwest::blocking::Client;
use tracing::debug;

use crate::http_cache::HttpBodyCache;

pub const DEFAULT_FEED_BASE_URL: &str = "https://www.football-data.co.uk/mmz4281";

/// One row of a results table, canonical regardless of the source's column names.
///
/// Rows without both goal counts are fixtures that have not been played.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

impl MatchRow {
    pub fn is_played(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

/// Source of a season's results table for one league.
pub trait ResultsFeed {
    fn load_season(&self, feed_code: &str, season: &str) -> Result<Vec<MatchRow>>;
}

/// Season code as used by the flat feed: seasons roll over in July.
pub fn season_code(date: NaiveDate) -> String {
    let start = if date.month() >= 7 {
        date.year()
    } else {
        date.year() - 1
    };
    let a = start.rem_euclid(100);
    let b = (start + 1).rem_euclid(100);
    format!("{a:02}{b:02}")
}

pub struct FootballDataFeed {
    base_url: String,
    client: &'static Client,
    cache: HttpBodyCache,
}

impl FootballDataFeed {
    pub fn new(base_url: &str, client: &'static Client, cache: HttpBodyCache) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache,
        }
    }

    pub fn season_url(&self, feed_code: &str, season: &str) -> String {
        format!("{}/{}/{}.csv", self.base_url, season, feed_code)
    }
}

impl ResultsFeed for FootballDataFeed {
    fn load_season(&self, feed_code: &str, season: &str) -> Result<Vec<MatchRow>> {
        let url = self.season_url(feed_code, season);
        let body = self
            .cache
            .fetch_text(self.client, &url)
            .with_context(|| format!("fetch results feed {feed_code}/{season}"))?;
        parse_results_csv(&body)
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    time: Option<usize>,
    home: usize,
    away: usize,
    home_goals: Option<usize>,
    away_goals: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim() == *n))
        };
        let date = find(&["Date", "date"]).ok_or_else(|| anyhow!("missing date column"))?;
        let home = find(&["HomeTeam", "Home", "home_team"])
            .ok_or_else(|| anyhow!("missing home team column"))?;
        let away = find(&["AwayTeam", "Away", "away_team"])
            .ok_or_else(|| anyhow!("missing away team column"))?;
        Ok(Self {
            date,
            time: find(&["Time", "time"]),
            home,
            away,
            home_goals: find(&["FTHG", "HG", "home_goals"]),
            away_goals: find(&["FTAG", "AG", "away_goals"]),
        })
    }
}

/// Parses a results/fixtures CSV into canonical rows.
///
/// Only a missing header column is an error; rows with an unreadable date or
/// an empty team name are skipped.
pub fn parse_results_csv(raw: &str) -> Result<Vec<MatchRow>> {
    let raw = raw.trim_start_matches('\u{feff}');
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Ok(Vec::new());
    };
    let header = split_csv_line(header_line);
    let cols = Columns::from_header(&header)?;

    let mut out = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let fields = split_csv_line(line);
        match row_from_fields(&fields, cols) {
            Some(row) => out.push(row),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, kept = out.len(), "skipped malformed feed rows");
    }
    Ok(out)
}

fn row_from_fields(fields: &[String], cols: Columns) -> Option<MatchRow> {
    let get = |idx: usize| fields.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty());
    let time = cols.time.and_then(get);
    let date = parse_feed_datetime(get(cols.date)?, time)?;
    let home_team = get(cols.home)?.to_string();
    let away_team = get(cols.away)?.to_string();
    let goals = |idx: Option<usize>| idx.and_then(get).and_then(|s| s.parse::<u32>().ok());
    Some(MatchRow {
        date,
        home_team,
        away_team,
        home_goals: goals(cols.home_goals),
        away_goals: goals(cols.away_goals),
    })
}

/// Day-first dates (`18/10/2026`, `18/10/26`), ISO dates, or RFC3339. Naive values are UTC.
pub fn parse_feed_datetime(date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    // `%Y` happily reads "24" as year 24, so pick the format from the year width.
    let fmt = match date.rsplit_once('/') {
        Some((_, year)) if year.len() == 2 => "%d/%m/%y",
        Some(_) => "%d/%m/%Y",
        None => "%Y-%m-%d",
    };
    let day = NaiveDate::parse_from_str(date, fmt).ok()?;
    let clock = time
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(Utc.from_utc_datetime(&day.and_time(clock)))
}

pub(crate) fn split_csv_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }
    out.push(field);
    out
}

/// Quotes a field for CSV output when it contains a separator, quote or newline.
pub fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
