use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::http_cache::app_cache_dir;

pub const DEFAULT_TTL_SECS: i64 = 6 * 3600;

/// Decimal head-to-head prices. A side the bookmaker did not quote is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct H2hPrices {
    pub home: Option<f64>,
    pub away: Option<f64>,
    pub draw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    pub prices: H2hPrices,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedOddsEntry {
    pub competition: String,
    pub entry: MarketEntry,
    pub last_refreshed: i64,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("odds_cache.sqlite"))
}

/// Local price table keyed by `(competition, event_id)`.
///
/// Rows older than the TTL never reach a reader: every lookup deletes them first.
pub struct OddsCacheStore {
    conn: Connection,
    ttl_secs: i64,
}

impl OddsCacheStore {
    /// Opens the store and rebuilds the schema. Cached rows do not survive a restart.
    pub fn open(path: &Path, ttl_secs: i64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open odds cache {}", path.display()))?;
        Self::from_connection(conn, ttl_secs)
    }

    pub fn open_in_memory(ttl_secs: i64) -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory odds cache")?;
        Self::from_connection(conn, ttl_secs)
    }

    fn from_connection(conn: Connection, ttl_secs: i64) -> Result<Self> {
        let store = Self {
            conn,
            ttl_secs: ttl_secs.max(1),
        };
        store.rebuild_schema()?;
        Ok(store)
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    fn rebuild_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                DROP TABLE IF EXISTS odds_cache;
                CREATE TABLE odds_cache (
                    competition TEXT NOT NULL,
                    event_id TEXT NOT NULL,
                    home_team TEXT NOT NULL,
                    away_team TEXT NOT NULL,
                    commence_time TEXT NOT NULL,
                    price_home REAL NULL,
                    price_away REAL NULL,
                    price_draw REAL NULL,
                    last_refreshed INTEGER NOT NULL,
                    PRIMARY KEY (competition, event_id)
                );
                CREATE INDEX idx_odds_cache_refreshed ON odds_cache(last_refreshed);
                "#,
            )
            .context("create odds cache schema")?;
        Ok(())
    }

    /// Deletes rows older than the TTL, across all competitions.
    pub fn purge_stale(&self, now: i64) -> Result<usize> {
        let cutoff = now - self.ttl_secs;
        let removed = self
            .conn
            .execute(
                "DELETE FROM odds_cache WHERE last_refreshed < ?1",
                params![cutoff],
            )
            .context("purge stale odds")?;
        Ok(removed)
    }

    pub fn fresh_entries(&self, competition: &str, now: i64) -> Result<Vec<CachedOddsEntry>> {
        self.purge_stale(now)?;

        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT competition, event_id, home_team, away_team, commence_time,
                       price_home, price_away, price_draw, last_refreshed
                FROM odds_cache
                WHERE competition = ?1
                ORDER BY commence_time ASC, event_id ASC
                "#,
            )
            .context("prepare odds cache query")?;

        let rows = stmt
            .query_map(params![competition], |row| {
                Ok(CachedOddsEntry {
                    competition: row.get(0)?,
                    entry: MarketEntry {
                        event_id: row.get(1)?,
                        home_team: row.get(2)?,
                        away_team: row.get(3)?,
                        commence_time: row.get(4)?,
                        prices: H2hPrices {
                            home: row.get(5)?,
                            away: row.get(6)?,
                            draw: row.get(7)?,
                        },
                    },
                    last_refreshed: row.get(8)?,
                })
            })
            .context("query odds cache")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode odds cache row")?);
        }
        Ok(out)
    }

    /// Inserts or overwrites every entry with `refreshed_at` as its timestamp.
    pub fn upsert_entries(
        &mut self,
        competition: &str,
        entries: &[MarketEntry],
        refreshed_at: i64,
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .context("begin odds cache transaction")?;
        for e in entries {
            tx.execute(
                r#"
                INSERT INTO odds_cache (
                    competition, event_id, home_team, away_team, commence_time,
                    price_home, price_away, price_draw, last_refreshed
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(competition, event_id) DO UPDATE SET
                    home_team = excluded.home_team,
                    away_team = excluded.away_team,
                    commence_time = excluded.commence_time,
                    price_home = excluded.price_home,
                    price_away = excluded.price_away,
                    price_draw = excluded.price_draw,
                    last_refreshed = excluded.last_refreshed
                "#,
                params![
                    competition,
                    e.event_id,
                    e.home_team,
                    e.away_team,
                    e.commence_time,
                    e.prices.home,
                    e.prices.away,
                    e.prices.draw,
                    refreshed_at,
                ],
            )
            .context("upsert odds entry")?;
        }
        tx.commit().context("commit odds cache transaction")?;
        Ok(entries.len())
    }
}
