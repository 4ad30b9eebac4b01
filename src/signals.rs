use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::debug;

use crate::form::team_form;
use crate::league_profile::LeagueProfile;
use crate::resolver::{Fixture, display_time, parse_display_time};
use crate::results_feed::{MatchRow, csv_field, split_csv_line};

pub const PREDICTION_UNDER: &str = "Under 3.5 Opponent Goals";
pub const PREDICTION_POPULAR: &str = "Popular Match";
pub const CONFIDENCE_HIGH: &str = "HIGH";
pub const CONFIDENCE_INFO: &str = "INFO";

pub const SIGNAL_HEADER: [&str; 8] = [
    "League",
    "Date",
    "Home",
    "Away",
    "Prediction",
    "Odds",
    "Confidence",
    "Watchlist",
];

/// Decides whether a fixture is a signal for `profile`.
///
/// Missing supporting data never blocks: no results table, or no form for a
/// team, lets the fixture through.
pub fn passes(fixture: &Fixture, profile: &LeagueProfile, results: Option<&[MatchRow]>) -> bool {
    let home_top = profile.is_top_team(&fixture.home_team);
    let away_top = profile.is_top_team(&fixture.away_team);
    let (top, opponent) = match (home_top, away_top) {
        (false, false) => return false,
        (true, true) => return true,
        (true, false) => (&fixture.home_team, &fixture.away_team),
        (false, true) => (&fixture.away_team, &fixture.home_team),
    };

    let Some(results) = results else {
        return true;
    };
    let Some(opp) = team_form(results, opponent) else {
        return true;
    };

    if let Some(max) = profile.opp_last5_max
        && opp.goals_scored_last5 > max
    {
        return false;
    }
    if let Some(min) = profile.clean_last3_min
        && let Some(own) = team_form(results, top)
        && own.clean_sheets_last3 < min
    {
        return false;
    }
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub league: String,
    pub kickoff: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub prediction: String,
    pub odds: f64,
    pub confidence: String,
    pub watchlist: Option<String>,
}

impl Signal {
    pub fn strict(fixture: &Fixture, odds: f64, watchlist: Option<&str>) -> Self {
        Self {
            league: fixture.competition.clone(),
            kickoff: fixture.kickoff,
            home_team: fixture.home_team.clone(),
            away_team: fixture.away_team.clone(),
            prediction: PREDICTION_UNDER.to_string(),
            odds,
            confidence: CONFIDENCE_HIGH.to_string(),
            watchlist: watchlist.map(|w| w.to_string()),
        }
    }

    pub fn popular(fixture: &Fixture) -> Self {
        Self {
            league: fixture.competition.clone(),
            kickoff: fixture.kickoff,
            home_team: fixture.home_team.clone(),
            away_team: fixture.away_team.clone(),
            prediction: PREDICTION_POPULAR.to_string(),
            odds: 0.0,
            confidence: CONFIDENCE_INFO.to_string(),
            watchlist: None,
        }
    }

    /// `Home vs Away`, the label used by the express step.
    pub fn match_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    fn to_row(&self) -> [String; 8] {
        [
            self.league.clone(),
            display_time(self.kickoff),
            self.home_team.clone(),
            self.away_team.clone(),
            self.prediction.clone(),
            format!("{:.2}", self.odds),
            self.confidence.clone(),
            self.watchlist.clone().unwrap_or_default(),
        ]
    }
}

/// Replaces `path` with the given signals. An empty slice still writes the header.
pub fn write_signals_csv(path: &Path, signals: &[Signal]) -> Result<()> {
    let mut out = SIGNAL_HEADER.join(",");
    out.push('\n');
    for s in signals {
        let row = s.to_row();
        let fields: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create signal dir {}", parent.display()))?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, out).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

pub fn read_signals_csv(path: &Path) -> Result<Vec<Signal>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read signals {}", path.display()))?;
    let mut lines = raw
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let header = split_csv_line(header);
    let col = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("signal file missing {name} column"))
    };
    let idx = [
        col("League")?,
        col("Date")?,
        col("Home")?,
        col("Away")?,
        col("Prediction")?,
        col("Odds")?,
        col("Confidence")?,
    ];
    let watch_idx = header.iter().position(|h| h.trim() == "Watchlist");

    let mut out = Vec::new();
    for line in lines {
        let fields = split_csv_line(line);
        let get = |i: usize| fields.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
        let Some(kickoff) = parse_display_time(&get(idx[1])) else {
            debug!(line, "signal row with unreadable date skipped");
            continue;
        };
        out.push(Signal {
            league: get(idx[0]),
            kickoff,
            home_team: get(idx[2]),
            away_team: get(idx[3]),
            prediction: get(idx[4]),
            odds: get(idx[5]).parse().unwrap_or(0.0),
            confidence: get(idx[6]),
            watchlist: watch_idx.map(get).filter(|w| !w.is_empty()),
        });
    }
    Ok(out)
}

pub fn export_signals_xlsx(path: &Path, signals: &[Signal]) -> Result<()> {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(signals.len() + 1);
    rows.push(SIGNAL_HEADER.iter().map(|h| h.to_string()).collect());
    rows.extend(signals.iter().map(|s| s.to_row().to_vec()));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Signals")?;
        write_rows(sheet, &rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
