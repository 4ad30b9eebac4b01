use std::collections::HashSet;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// How a fixture team name is compared against a curated name list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Case-insensitive equality after trimming.
    Exact,
    /// Equality of canonical words (punctuation and club suffixes dropped).
    Normalized,
    /// Case-insensitive containment in either direction.
    #[default]
    Substring,
    /// Canonical forms within `n` edits of each other.
    EditDistance(usize),
}

impl MatchStrategy {
    pub fn matches(self, candidate: &str, listed: &str) -> bool {
        match self {
            MatchStrategy::Exact => {
                candidate.trim().to_lowercase() == listed.trim().to_lowercase()
            }
            MatchStrategy::Normalized => {
                let a = canonical_words(candidate);
                !a.is_empty() && a == canonical_words(listed)
            }
            MatchStrategy::Substring => {
                let a = candidate.trim().to_lowercase();
                let b = listed.trim().to_lowercase();
                if a.is_empty() || b.is_empty() {
                    return false;
                }
                a.contains(&b) || b.contains(&a)
            }
            MatchStrategy::EditDistance(max) => {
                let a = canonical_words(candidate).join(" ");
                let b = canonical_words(listed).join(" ");
                if a.is_empty() || b.is_empty() {
                    return false;
                }
                strsim::levenshtein(&a, &b) <= max
            }
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let t = raw.trim().to_ascii_lowercase();
        match t.as_str() {
            "" | "substring" => Ok(MatchStrategy::Substring),
            "exact" => Ok(MatchStrategy::Exact),
            "normalized" => Ok(MatchStrategy::Normalized),
            other => {
                let Some(n) = other.strip_prefix("edit:") else {
                    return Err(anyhow!("unknown match strategy {other}"));
                };
                let n = n
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow!("invalid edit distance in {other}"))?;
                Ok(MatchStrategy::EditDistance(n))
            }
        }
    }
}

/// Loose identity tokens for a team name, used to pair feed names with bookmaker names.
pub fn team_aliases(name: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let words = canonical_words(name);
    if words.is_empty() {
        return out;
    }

    let collapsed = words.join("");
    if collapsed.len() >= 2 {
        out.insert(collapsed.clone());
    }

    let acronym: String = words.iter().filter_map(|w| w.chars().next()).collect();
    if acronym.len() >= 2 {
        out.insert(acronym);
    }

    for w in &words {
        if w.len() >= 3 {
            out.insert(w.clone());
        }
        if let Some(p3) = prefix(w, 3)
            && p3.len() == 3
        {
            out.insert(p3);
        }
    }

    out
}

pub fn aliases_intersect(a: &HashSet<String>, b: &HashSet<String>) -> bool {
    a.iter().any(|x| b.contains(x))
}

pub fn canonical_words(name: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            cleaned.extend(ch.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
        .split_whitespace()
        .filter(|w| !matches!(*w, "fc" | "cf" | "afc" | "sc" | "ac" | "cd" | "club"))
        .map(|w| w.to_string())
        .collect()
}

fn prefix(raw: &str, n: usize) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.chars().take(n).collect())
}
