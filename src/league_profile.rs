use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Per-competition identifiers and filter thresholds. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueProfile {
    pub name: String,
    /// Key in the historical match store.
    pub stats_id: String,
    /// File code on the flat results feed (e.g. `E0`). Some leagues have none.
    #[serde(default)]
    pub feed_code: Option<String>,
    /// Sport key on the odds provider.
    pub odds_key: String,
    pub top_teams: Vec<String>,
    #[serde(default)]
    pub opp_last5_max: Option<u32>,
    #[serde(default)]
    pub clean_last3_min: Option<u32>,
    pub min_odds: f64,
}

impl LeagueProfile {
    pub fn is_top_team(&self, team: &str) -> bool {
        self.top_teams.iter().any(|t| t == team)
    }
}

#[allow(clippy::too_many_arguments)]
fn profile(
    name: &str,
    stats_id: &str,
    feed_code: Option<&str>,
    odds_key: &str,
    top_teams: &[&str],
    opp_last5_max: u32,
    clean_last3_min: Option<u32>,
    min_odds: f64,
) -> LeagueProfile {
    LeagueProfile {
        name: name.to_string(),
        stats_id: stats_id.to_string(),
        feed_code: feed_code.map(|c| c.to_string()),
        odds_key: odds_key.to_string(),
        top_teams: top_teams.iter().map(|t| t.to_string()).collect(),
        opp_last5_max: Some(opp_last5_max),
        clean_last3_min,
        min_odds,
    }
}

pub fn default_profiles() -> Vec<LeagueProfile> {
    vec![
        profile(
            "Primeira Liga",
            "POR-Primeira-Liga",
            Some("P1"),
            "soccer_portugal_primeira_liga",
            &["FC Porto", "SL Benfica", "Sporting CP"],
            5,
            Some(2),
            1.58,
        ),
        profile(
            "Greek Super League",
            "GRE-Super-League",
            None,
            "soccer_greece_super_league",
            &["PAOK FC", "Olympiacos FC", "AEK Athens"],
            4,
            None,
            1.60,
        ),
        profile(
            "La Liga 2",
            "ESP-Segunda",
            Some("SP2"),
            "soccer_spain_segunda_division",
            &["Real Valladolid", "RCD Espanyol", "CD Leganes"],
            6,
            None,
            1.58,
        ),
        profile(
            "Eredivisie",
            "NED-Eredivisie",
            Some("N1"),
            "soccer_netherlands_eredivisie",
            &["PSV Eindhoven", "AFC Ajax", "Feyenoord"],
            7,
            None,
            1.62,
        ),
        profile(
            "Argentina Liga",
            "ARG-Primera",
            None,
            "soccer_argentina_primera_division",
            &["River Plate", "Boca Juniors", "CA Independiente"],
            6,
            None,
            1.60,
        ),
        profile(
            "Premier League",
            "ENG-Premier League",
            Some("E0"),
            "soccer_epl",
            &["Manchester City", "Arsenal", "Liverpool", "Chelsea", "Manchester Utd"],
            8,
            Some(0),
            1.20,
        ),
        profile(
            "La Liga",
            "ESP-La Liga",
            Some("SP1"),
            "soccer_spain_la_liga",
            &["Real Madrid", "Barcelona", "Atletico Madrid"],
            8,
            Some(0),
            1.20,
        ),
        profile(
            "Serie A",
            "ITA-Serie A",
            Some("I1"),
            "soccer_italy_serie_a",
            &["Inter", "Juventus", "Milan", "Napoli"],
            8,
            Some(0),
            1.20,
        ),
        profile(
            "Bundesliga",
            "GER-Bundesliga",
            Some("D1"),
            "soccer_germany_bundesliga",
            &["Bayern Munich", "Bayer Leverkusen", "Dortmund"],
            8,
            Some(0),
            1.20,
        ),
        profile(
            "Ligue 1",
            "FRA-Ligue 1",
            Some("F1"),
            "soccer_france_ligue_one",
            &["Paris SG", "Monaco", "Marseille"],
            8,
            Some(0),
            1.20,
        ),
    ]
}

/// Reads a JSON array of profiles, replacing the built-in table.
pub fn load_profiles(path: &Path) -> Result<Vec<LeagueProfile>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read league profiles {}", path.display()))?;
    let profiles: Vec<LeagueProfile> =
        serde_json::from_str(&raw).context("invalid league profiles json")?;
    if profiles.is_empty() {
        return Err(anyhow!("league profile file {} is empty", path.display()));
    }
    Ok(profiles)
}
