use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One generated express, as appended to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub date: String,
    pub matches: Vec<String>,
    /// `m1`..`m3` → outcome labels.
    pub outcomes: BTreeMap<String, Vec<String>>,
    /// `m1`..`m3` → outcome odds, aligned with `outcomes`.
    pub odds: BTreeMap<String, Vec<f64>>,
    pub variations_count: usize,
    pub roi_calculation: String,
    pub timestamp: f64,
}

/// Appends `item` to the JSON array at `path`, creating the file if needed.
///
/// Existing entries are carried over untouched, whatever their shape.
pub fn append_history(path: &Path, item: &HistoryItem) -> Result<usize> {
    let mut entries: Vec<Value> = match fs::read_to_string(path) {
        Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .with_context(|| format!("history file {} is not a json array", path.display()))?,
        Ok(_) => Vec::new(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            return Err(anyhow!(err).context(format!("read history {}", path.display())));
        }
    };
    entries.push(serde_json::to_value(item).context("serialize history item")?);

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(&entries).context("serialize history")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(entries.len())
}
