use serde::{Deserialize, Serialize};

use crate::results_feed::MatchRow;

const GOAL_WINDOW: usize = 5;
const CLEAN_SHEET_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamFormStats {
    pub goals_scored_last5: u32,
    pub goals_conceded_last5: u32,
    pub clean_sheets_last3: u32,
    pub matches_played: u32,
}

/// Rolling form for `team` over the played rows of `results`.
///
/// `None` means the table has no played match for the team. Callers treat that
/// as unknown, never as weak.
pub fn team_form(results: &[MatchRow], team: &str) -> Option<TeamFormStats> {
    let mut played: Vec<&MatchRow> = results
        .iter()
        .filter(|m| m.is_played() && m.involves(team))
        .collect();
    if played.is_empty() {
        return None;
    }
    played.sort_by_key(|m| m.date);

    let perspective = |m: &MatchRow| {
        let (home, away) = (m.home_goals.unwrap_or(0), m.away_goals.unwrap_or(0));
        if m.home_team == team {
            (home, away)
        } else {
            (away, home)
        }
    };

    let mut stats = TeamFormStats {
        matches_played: played.len() as u32,
        ..Default::default()
    };
    for m in played.iter().rev().take(GOAL_WINDOW) {
        let (scored, conceded) = perspective(m);
        stats.goals_scored_last5 += scored;
        stats.goals_conceded_last5 += conceded;
    }
    stats.clean_sheets_last3 = played
        .iter()
        .rev()
        .take(CLEAN_SHEET_WINDOW)
        .filter(|m| perspective(m).1 == 0)
        .count() as u32;
    Some(stats)
}
