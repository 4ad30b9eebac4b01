use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::express::Outcome;

/// Label for an even goal total. Every parsed block carries it.
pub const EVEN_LABEL: &str = "EVEN";

const BLOCK_MARKER: char = '⚽';
const DATE_MARKER: char = '📅';
const REASON_MARKER: char = '📝';

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9])[:|\-]([0-9])\b").expect("score pattern compiles"));

#[derive(Debug, Error, PartialEq)]
pub enum NarrativeParseError {
    #[error("block {block} has no scorelines")]
    NoScores { block: usize },
    #[error("found {found} usable match blocks, need 3")]
    NotEnoughBlocks { found: usize },
}

/// Outcome labels and metadata read from one match block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOutcome {
    pub title: String,
    pub labels: Vec<String>,
    pub date: Option<String>,
    pub reason: Option<String>,
}

impl ParsedOutcome {
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.labels.iter().map(Outcome::unpriced).collect()
    }
}

/// Splits narrative text into match blocks and parses each one.
///
/// Blocks are separated by the ball marker; text without markers falls back to
/// blank-line separation. Whitespace-only blocks are skipped.
pub fn parse_narrative(text: &str) -> Vec<Result<ParsedOutcome, NarrativeParseError>> {
    split_blocks(text)
        .into_iter()
        .enumerate()
        .map(|(block, body)| parse_block(block, body))
        .collect()
}

/// First three usable blocks, in text order.
pub fn parse_express_outcomes(text: &str) -> Result<[ParsedOutcome; 3], NarrativeParseError> {
    let parsed: Vec<ParsedOutcome> = parse_narrative(text)
        .into_iter()
        .filter_map(Result::ok)
        .take(3)
        .collect();
    let found = parsed.len();
    parsed
        .try_into()
        .map_err(|_| NarrativeParseError::NotEnoughBlocks { found })
}

fn split_blocks(text: &str) -> Vec<&str> {
    let mut blocks: Vec<&str> = text.split(BLOCK_MARKER).collect();
    if blocks.len() < 2 {
        blocks = text.split("\n\n").collect();
    }
    blocks.retain(|b| !b.trim().is_empty());
    blocks
}

fn parse_block(block: usize, body: &str) -> Result<ParsedOutcome, NarrativeParseError> {
    let mut labels: Vec<String> = Vec::new();
    let mut date = None;
    let mut reason = None;

    for line in body.lines() {
        if date.is_none() {
            date = marker_value(line, DATE_MARKER);
        }
        if reason.is_none() {
            reason = marker_value(line, REASON_MARKER);
        }
        for caps in SCORE_RE.captures_iter(line) {
            let (Ok(g1), Ok(g2)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
                continue;
            };
            let label = if (g1 + g2) % 2 == 0 {
                EVEN_LABEL.to_string()
            } else {
                format!("Score {g1}:{g2}")
            };
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }

    if labels.is_empty() {
        return Err(NarrativeParseError::NoScores { block });
    }
    if !labels.iter().any(|l| l == EVEN_LABEL) {
        labels.insert(0, EVEN_LABEL.to_string());
    }
    while labels.len() < 3 {
        labels.push(EVEN_LABEL.to_string());
    }
    labels.truncate(3);

    let title = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();

    Ok(ParsedOutcome {
        title,
        labels,
        date,
        reason,
    })
}

/// `📅 Date: 18.10 19:00` → `18.10 19:00`.
fn marker_value(line: &str, marker: char) -> Option<String> {
    let (_, rest) = line.split_once(marker)?;
    let (_, value) = rest.split_once(": ")?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
