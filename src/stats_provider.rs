use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::http_cache::app_cache_dir;
use crate::league_profile::LeagueProfile;
use crate::results_feed::{MatchRow, ResultsFeed};

/// Historical results keyed by a league's stats id.
pub trait StatsProvider {
    /// Every stored row for the league, played or scheduled, oldest first.
    fn league_table(&self, stats_id: &str) -> Result<Vec<MatchRow>>;
}

#[derive(Debug, Clone, Default)]
pub struct LeagueIngestSummary {
    pub stats_id: String,
    pub seasons_total: usize,
    pub seasons_succeeded: usize,
    pub matches_upserted: usize,
    pub latest_utc_time: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub seasons: Vec<String>,
    pub seasons_total: usize,
    pub seasons_succeeded: usize,
    pub matches_upserted: usize,
    pub skipped: Vec<String>,
    pub per_league: HashMap<String, LeagueIngestSummary>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("historical_matches.sqlite"))
}

pub struct SqliteStatsProvider {
    conn: Connection,
}

impl SqliteStatsProvider {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Pulls `seasons` of every profile with a feed code into the store.
    ///
    /// A failing season is recorded on the league's run and does not stop the ingest.
    pub fn ingest(
        &mut self,
        feed: &dyn ResultsFeed,
        profiles: &[LeagueProfile],
        seasons: &[String],
    ) -> Result<IngestSummary> {
        if seasons.is_empty() {
            return Err(anyhow!("no seasons passed to ingest"));
        }

        let mut summary = IngestSummary {
            seasons: seasons.to_vec(),
            seasons_total: 0,
            seasons_succeeded: 0,
            matches_upserted: 0,
            skipped: Vec::new(),
            per_league: HashMap::new(),
        };

        for profile in profiles {
            let Some(code) = profile.feed_code.as_deref() else {
                summary.skipped.push(profile.name.clone());
                continue;
            };
            let league = self.ingest_league(feed, &profile.stats_id, code, seasons)?;
            summary.seasons_total += league.seasons_total;
            summary.seasons_succeeded += league.seasons_succeeded;
            summary.matches_upserted += league.matches_upserted;
            summary.per_league.insert(profile.stats_id.clone(), league);
        }
        Ok(summary)
    }

    fn ingest_league(
        &mut self,
        feed: &dyn ResultsFeed,
        stats_id: &str,
        feed_code: &str,
        seasons: &[String],
    ) -> Result<LeagueIngestSummary> {
        let started_at = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs(started_at, finished_at, stats_id, seasons_total, seasons_succeeded, matches_upserted, errors_json)
                 VALUES (?1, NULL, ?2, ?3, 0, 0, '[]')",
                params![started_at, stats_id, seasons.len() as i64],
            )
            .context("insert ingest run")?;
        let run_id = self.conn.last_insert_rowid();

        let mut out = LeagueIngestSummary {
            stats_id: stats_id.to_string(),
            seasons_total: seasons.len(),
            ..Default::default()
        };

        for season in seasons {
            match feed.load_season(feed_code, season) {
                Ok(rows) => {
                    let tx = self
                        .conn
                        .transaction()
                        .context("begin ingest transaction")?;
                    for row in &rows {
                        upsert_match(&tx, stats_id, season, row)?;
                    }
                    tx.commit().context("commit ingest transaction")?;
                    out.matches_upserted += rows.len();
                    out.seasons_succeeded += 1;
                    info!(stats_id, season = %season, rows = rows.len(), "season ingested");
                }
                Err(err) => {
                    warn!(stats_id, season = %season, error = %err, "season ingest failed");
                    out.errors.push(format!("season {season}: {err:#}"));
                }
            }
        }

        let errors_json = serde_json::to_string(&out.errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "UPDATE ingest_runs
                 SET finished_at = ?1, seasons_succeeded = ?2, matches_upserted = ?3, errors_json = ?4
                 WHERE run_id = ?5",
                params![
                    Utc::now().to_rfc3339(),
                    out.seasons_succeeded as i64,
                    out.matches_upserted as i64,
                    errors_json,
                    run_id
                ],
            )
            .context("update ingest run")?;

        out.latest_utc_time = self
            .conn
            .query_row(
                "SELECT MAX(utc_time) FROM matches WHERE stats_id = ?1",
                params![stats_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .context("query latest utc_time")?;
        Ok(out)
    }

    pub fn ingest_run_count(&self) -> Result<usize> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| {
                row.get::<_, i64>(0)
            })
            .context("count ingest runs")?;
        Ok(n.max(0) as usize)
    }
}

impl StatsProvider for SqliteStatsProvider {
    fn league_table(&self, stats_id: &str) -> Result<Vec<MatchRow>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT utc_time, home_team, away_team, home_goals, away_goals
                FROM matches
                WHERE stats_id = ?1
                ORDER BY utc_time ASC, home_team ASC
                "#,
            )
            .context("prepare league table query")?;

        let rows = stmt
            .query_map(params![stats_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<u32>>(3)?,
                    row.get::<_, Option<u32>>(4)?,
                ))
            })
            .context("query league table")?;

        let mut out = Vec::new();
        for row in rows {
            let (utc_time, home_team, away_team, home_goals, away_goals) =
                row.context("decode match row")?;
            let date = DateTime::parse_from_rfc3339(&utc_time)
                .with_context(|| format!("stored kickoff {utc_time}"))?
                .with_timezone(&Utc);
            out.push(MatchRow {
                date,
                home_team,
                away_team,
                home_goals,
                away_goals,
            });
        }
        Ok(out)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            stats_id TEXT NOT NULL,
            season TEXT NOT NULL,
            utc_time TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (stats_id, utc_time, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            stats_id TEXT NOT NULL,
            seasons_total INTEGER NOT NULL,
            seasons_succeeded INTEGER NOT NULL,
            matches_upserted INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn upsert_match(
    tx: &rusqlite::Transaction<'_>,
    stats_id: &str,
    season: &str,
    m: &MatchRow,
) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO matches (
            stats_id, season, utc_time, home_team, away_team,
            home_goals, away_goals, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(stats_id, utc_time, home_team, away_team) DO UPDATE SET
            season = excluded.season,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            updated_at = excluded.updated_at
        "#,
        params![
            stats_id,
            season,
            m.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            m.home_team,
            m.away_team,
            m.home_goals,
            m.away_goals,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert match")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use chrono::{TimeZone, Utc};

    use super::{SqliteStatsProvider, StatsProvider};
    use crate::league_profile::default_profiles;
    use crate::results_feed::{MatchRow, ResultsFeed};

    struct OneSeasonFeed;

    impl ResultsFeed for OneSeasonFeed {
        fn load_season(&self, feed_code: &str, season: &str) -> Result<Vec<MatchRow>> {
            if season != "2526" {
                return Err(anyhow!("404 for {feed_code}/{season}"));
            }
            Ok(vec![
                MatchRow {
                    date: Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap(),
                    home_team: format!("{feed_code} Home"),
                    away_team: format!("{feed_code} Away"),
                    home_goals: Some(2),
                    away_goals: Some(1),
                },
                MatchRow {
                    date: Utc.with_ymd_and_hms(2026, 5, 20, 18, 30, 0).unwrap(),
                    home_team: format!("{feed_code} Away"),
                    away_team: format!("{feed_code} Home"),
                    home_goals: None,
                    away_goals: None,
                },
            ])
        }
    }

    #[test]
    fn ingest_records_runs_and_skips_leagues_without_feed() {
        let mut store = SqliteStatsProvider::open_in_memory().expect("store");
        let profiles = default_profiles();
        let seasons = vec!["2425".to_string(), "2526".to_string()];
        let summary = store
            .ingest(&OneSeasonFeed, &profiles, &seasons)
            .expect("ingest");

        assert_eq!(summary.skipped.len(), 2);
        assert_eq!(summary.per_league.len(), 8);
        assert_eq!(summary.seasons_total, 16);
        assert_eq!(summary.seasons_succeeded, 8);
        assert_eq!(summary.matches_upserted, 16);
        assert_eq!(store.ingest_run_count().expect("count"), 8);
        let epl = &summary.per_league["ENG-Premier League"];
        assert_eq!(epl.errors.len(), 1);
        assert_eq!(epl.latest_utc_time.as_deref(), Some("2026-05-20T18:30:00Z"));
    }

    #[test]
    fn table_round_trips_played_and_scheduled_rows() {
        let mut store = SqliteStatsProvider::open_in_memory().expect("store");
        let profiles = default_profiles();
        store
            .ingest(&OneSeasonFeed, &profiles, &["2526".to_string()])
            .expect("ingest");
        // Re-ingesting the same season must not duplicate rows.
        store
            .ingest(&OneSeasonFeed, &profiles, &["2526".to_string()])
            .expect("ingest");

        let table = store.league_table("ENG-Premier League").expect("table");
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].home_team, "E0 Home");
        assert!(table[0].is_played());
        assert!(!table[1].is_played());
        assert!(store.league_table("nope").expect("table").is_empty());
    }

    #[test]
    fn empty_season_list_is_rejected() {
        let mut store = SqliteStatsProvider::open_in_memory().expect("store");
        assert!(store.ingest(&OneSeasonFeed, &default_profiles(), &[]).is_err());
    }
}
