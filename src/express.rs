use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Price assumed for an outcome when nobody quoted one.
pub const DEFAULT_OUTCOME_ODDS: f64 = 1.9;

pub const OUTCOMES_PER_MATCH: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum ExpressError {
    #[error("match {match_index} has {found} outcomes, expected 3")]
    WrongOutcomeCount { match_index: usize, found: usize },
    #[error("expected 3 matches, got {0}")]
    WrongMatchCount(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub label: String,
    pub odds: f64,
}

impl Outcome {
    pub fn new(label: impl Into<String>, odds: f64) -> Self {
        Self {
            label: label.into(),
            odds,
        }
    }

    pub fn unpriced(label: impl Into<String>) -> Self {
        Self::new(label, DEFAULT_OUTCOME_ODDS)
    }
}

/// One leg per match, in match order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressCombination {
    pub labels: [String; 3],
    /// Position of each leg within its match's outcome list.
    pub indices: [usize; 3],
    pub combined_odds: f64,
}

impl ExpressCombination {
    pub fn describe(&self) -> String {
        self.labels.join(" + ")
    }
}

/// The 27-way system: exactly three outcomes per match.
///
/// Combination `9*i + 3*j + k` is `(m1[i], m2[j], m3[k])`. Stake lists are
/// zipped against this order, so it must not change.
pub fn expand(
    m1: &[Outcome],
    m2: &[Outcome],
    m3: &[Outcome],
) -> Result<Vec<ExpressCombination>, ExpressError> {
    for (match_index, outcomes) in [m1, m2, m3].into_iter().enumerate() {
        if outcomes.len() != OUTCOMES_PER_MATCH {
            return Err(ExpressError::WrongOutcomeCount {
                match_index,
                found: outcomes.len(),
            });
        }
    }
    Ok(cross_product(m1, m2, m3))
}

/// Nested-loop product of any three outcome lists, first match outermost.
///
/// Odds are multiplied as given; the stake allocator floors unusable prices.
pub fn cross_product(m1: &[Outcome], m2: &[Outcome], m3: &[Outcome]) -> Vec<ExpressCombination> {
    let mut out = Vec::with_capacity(m1.len() * m2.len() * m3.len());
    for (i, a) in m1.iter().enumerate() {
        for (j, b) in m2.iter().enumerate() {
            for (k, c) in m3.iter().enumerate() {
                out.push(ExpressCombination {
                    labels: [a.label.clone(), b.label.clone(), c.label.clone()],
                    indices: [i, j, k],
                    combined_odds: a.odds * b.odds * c.odds,
                });
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryMarket {
    UnderOver,
    OddEven,
}

impl BinaryMarket {
    pub fn sides(self) -> [&'static str; 2] {
        match self {
            BinaryMarket::UnderOver => ["Under", "Over"],
            BinaryMarket::OddEven => ["Odd", "Even"],
        }
    }
}

/// 2x2x2 system over a two-way market; legs read `"<match> - <side>"`.
pub fn binary_system(
    matches: &[String],
    market: BinaryMarket,
) -> Result<Vec<ExpressCombination>, ExpressError> {
    if matches.len() != 3 {
        return Err(ExpressError::WrongMatchCount(matches.len()));
    }
    let legs: Vec<Vec<Outcome>> = matches
        .iter()
        .map(|m| {
            market
                .sides()
                .iter()
                .map(|side| Outcome::unpriced(format!("{m} - {side}")))
                .collect()
        })
        .collect();
    Ok(cross_product(&legs[0], &legs[1], &legs[2]))
}

/// Flips an `Odd` leg to `Even` and back; other labels pass through.
pub fn swap_parity(label: &str) -> String {
    if let Some(stem) = label.strip_suffix(" - Odd") {
        format!("{stem} - Even")
    } else if let Some(stem) = label.strip_suffix(" - Even") {
        format!("{stem} - Odd")
    } else {
        label.to_string()
    }
}
