use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http_client::HttpGet;
use crate::odds_cache::{H2hPrices, MarketEntry, OddsCacheStore};
use crate::team_match::{aliases_intersect, team_aliases};

pub const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4/sports";

#[derive(Debug, Clone)]
pub struct OddsFetchConfig {
    pub base_url: String,
    pub api_keys: Vec<String>,
    pub regions: String,
    pub markets: String,
}

impl Default for OddsFetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_keys: Vec::new(),
            regions: "eu".to_string(),
            markets: "h2h".to_string(),
        }
    }
}

/// Splits a comma-separated key list, dropping blanks and keeping order.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .collect()
}

/// Anything that can hand out head-to-head markets for a competition.
pub trait OddsSource {
    fn get_odds(&mut self, competition: &str) -> Vec<MarketEntry>;

    /// Best-effort price lookup for a fixture by team names.
    fn lookup_h2h(&mut self, competition: &str, home: &str, away: &str) -> Option<H2hPrices> {
        let markets = self.get_odds(competition);
        find_market(&markets, home, away).map(|m| m.prices)
    }
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    id: String,
    #[serde(default)]
    commence_time: Option<String>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    price: f64,
}

enum KeyAttempt {
    Fetched(Vec<MarketEntry>),
    Exhausted,
    Abort,
}

type Clock = Box<dyn Fn() -> i64 + Send>;

/// Cached, key-rotating client for the odds provider.
///
/// Any fresh cached row for a competition short-circuits the network call.
/// On a miss the keys are tried in order: 401/429 moves to the next key, any
/// other failure ends the call with an empty result.
pub struct OddsFetcher {
    store: OddsCacheStore,
    transport: Box<dyn HttpGet + Send>,
    cfg: OddsFetchConfig,
    clock: Clock,
}

impl OddsFetcher {
    pub fn new(
        store: OddsCacheStore,
        transport: Box<dyn HttpGet + Send>,
        cfg: OddsFetchConfig,
    ) -> Self {
        Self {
            store,
            transport,
            cfg,
            clock: Box::new(|| Utc::now().timestamp()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn get_odds(&mut self, competition: &str) -> Vec<MarketEntry> {
        match self.try_get_odds(competition) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(competition, error = %err, "odds lookup failed");
                Vec::new()
            }
        }
    }

    fn try_get_odds(&mut self, competition: &str) -> Result<Vec<MarketEntry>> {
        let now = (self.clock)();
        let cached = self.store.fresh_entries(competition, now)?;
        if !cached.is_empty() {
            debug!(competition, rows = cached.len(), "using cached odds");
            return Ok(cached.into_iter().map(|c| c.entry).collect());
        }

        if self.cfg.api_keys.is_empty() {
            warn!(competition, "no odds api keys configured");
            return Ok(Vec::new());
        }

        info!(competition, "fetching fresh odds");
        for key_index in 0..self.cfg.api_keys.len() {
            match self.attempt_key(competition, key_index) {
                KeyAttempt::Fetched(entries) => {
                    let refreshed_at = (self.clock)();
                    self.store
                        .upsert_entries(competition, &entries, refreshed_at)
                        .context("persist fetched odds")?;
                    let rows = self.store.fresh_entries(competition, refreshed_at)?;
                    return Ok(rows.into_iter().map(|c| c.entry).collect());
                }
                KeyAttempt::Exhausted => continue,
                KeyAttempt::Abort => return Ok(Vec::new()),
            }
        }

        warn!(competition, "all odds api keys exhausted");
        Ok(Vec::new())
    }

    fn attempt_key(&self, competition: &str, key_index: usize) -> KeyAttempt {
        let url = format!(
            "{}/{}/odds/",
            self.cfg.base_url.trim_end_matches('/'),
            competition
        );
        let key = self.cfg.api_keys[key_index].as_str();
        let query = [
            ("apiKey", key),
            ("regions", self.cfg.regions.as_str()),
            ("markets", self.cfg.markets.as_str()),
            ("oddsFormat", "decimal"),
            ("dateFormat", "iso"),
        ];

        let resp = match self.transport.get(&url, &query) {
            Ok(resp) => resp,
            Err(err) => {
                warn!(competition, key_index, error = %err, "odds request failed");
                return KeyAttempt::Abort;
            }
        };

        match resp.status {
            200 => match parse_odds_events(&resp.body) {
                Ok(entries) => {
                    info!(
                        competition,
                        key_index,
                        events = entries.len(),
                        remaining = resp.requests_remaining.as_deref().unwrap_or("?"),
                        "odds api success"
                    );
                    KeyAttempt::Fetched(entries)
                }
                Err(err) => {
                    warn!(competition, error = %err, "odds payload rejected");
                    KeyAttempt::Abort
                }
            },
            401 | 429 => {
                warn!(competition, key_index, status = resp.status, "odds key rejected, rotating");
                KeyAttempt::Exhausted
            }
            status => {
                let snippet = resp
                    .body
                    .trim()
                    .replace(['\n', '\r'], " ")
                    .chars()
                    .take(220)
                    .collect::<String>();
                warn!(competition, status, body = %snippet, "odds api error");
                KeyAttempt::Abort
            }
        }
    }
}

impl OddsSource for OddsFetcher {
    fn get_odds(&mut self, competition: &str) -> Vec<MarketEntry> {
        OddsFetcher::get_odds(self, competition)
    }
}

/// Parses the provider's event array into head-to-head entries.
pub fn parse_odds_events(body: &str) -> Result<Vec<MarketEntry>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let events: Vec<OddsEvent> = serde_json::from_str(trimmed).context("invalid odds json")?;
    Ok(events.iter().map(event_to_entry).collect())
}

fn event_to_entry(event: &OddsEvent) -> MarketEntry {
    MarketEntry {
        event_id: event.id.clone(),
        home_team: event.home_team.clone(),
        away_team: event.away_team.clone(),
        commence_time: event.commence_time.clone().unwrap_or_default(),
        prices: first_h2h_prices(event),
    }
}

fn first_h2h_prices(event: &OddsEvent) -> H2hPrices {
    let market = event
        .bookmakers
        .iter()
        .find_map(|b| b.markets.iter().find(|m| m.key == "h2h"));
    let Some(market) = market else {
        return H2hPrices::default();
    };
    let price_of = |label: &str| {
        market
            .outcomes
            .iter()
            .find(|o| o.name == label)
            .map(|o| o.price)
    };
    H2hPrices {
        home: price_of(&event.home_team),
        away: price_of(&event.away_team),
        draw: price_of("Draw"),
    }
}

/// Finds the market whose teams line up with `home`/`away`.
pub fn find_market<'a>(markets: &'a [MarketEntry], home: &str, away: &str) -> Option<&'a MarketEntry> {
    if let Some(exact) = markets
        .iter()
        .find(|m| m.home_team == home && m.away_team == away)
    {
        return Some(exact);
    }
    let home_aliases = team_aliases(home);
    let away_aliases = team_aliases(away);
    markets.iter().find(|m| {
        aliases_intersect(&home_aliases, &team_aliases(&m.home_team))
            && aliases_intersect(&away_aliases, &team_aliases(&m.away_team))
    })
}
