use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{
    ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const CACHE_VERSION: u32 = 1;
const APP_DIR: &str = "signalizer";
const CACHE_FILE: &str = "http_cache.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

/// Conditional-GET body cache for slow-changing remote files (season CSVs).
///
/// Bodies are revalidated with `If-None-Match` / `If-Modified-Since` and a 304
/// reuses the stored copy.
pub struct HttpBodyCache {
    path: Option<PathBuf>,
    state: Mutex<Option<HttpCacheFile>>,
}

impl HttpBodyCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            state: Mutex::new(None),
        }
    }

    pub fn in_app_dir() -> Self {
        Self::new(app_cache_dir().map(|dir| dir.join(CACHE_FILE)))
    }

    pub fn fetch_text(&self, client: &Client, url: &str) -> Result<String> {
        let cached = self.with_file(|cache| cache.entries.get(url).cloned());

        let mut req = client.get(url).header(USER_AGENT, "Mozilla/5.0");
        if let Some(entry) = cached.as_ref() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = req.send().context("request failed")?;
        let status = resp.status();
        let headers = resp.headers().clone();
        if status == StatusCode::NOT_MODIFIED {
            let Some(entry) = cached else {
                return Err(anyhow!("received 304 without cache body"));
            };
            debug!(url, "body cache revalidated");
            return Ok(entry.body);
        }

        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}"));
        }

        let header_str = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let entry = CacheEntry {
            body: body.clone(),
            etag: header_str(ETAG),
            last_modified: header_str(LAST_MODIFIED),
            fetched_at: Utc::now().timestamp(),
        };
        self.store(url, entry);
        Ok(body)
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut HttpCacheFile) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let path = self.path.clone();
        let cache = guard.get_or_insert_with(|| load_cache_file(path.as_ref()));
        f(cache)
    }

    fn store(&self, url: &str, entry: CacheEntry) {
        let path = self.path.clone();
        self.with_file(|cache| {
            cache.version = CACHE_VERSION;
            cache.entries.insert(url.to_string(), entry);
            if let Some(path) = path.as_ref()
                && let Err(err) = save_cache_file(path, cache)
            {
                debug!(error = %err, "body cache not persisted");
            }
        });
    }
}

fn load_cache_file(path: Option<&PathBuf>) -> HttpCacheFile {
    let Some(path) = path else {
        return HttpCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(path: &PathBuf, cache: &HttpCacheFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, path).context("swap http cache")?;
    Ok(())
}

/// `$XDG_CACHE_HOME/signalizer`, falling back to `~/.cache/signalizer`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::{CACHE_VERSION, CacheEntry, HttpCacheFile, load_cache_file, save_cache_file};
    use crate::scratch_dir;

    #[test]
    fn cache_file_roundtrips_through_disk() {
        let dir = scratch_dir("http_cache_1");
        let path = dir.join("nested").join("http_cache.json");
        let mut file = HttpCacheFile {
            version: CACHE_VERSION,
            ..Default::default()
        };
        file.entries.insert(
            "https://example.com/E0.csv".to_string(),
            CacheEntry {
                body: "Date,HomeTeam".to_string(),
                etag: Some("\"abc\"".to_string()),
                last_modified: None,
                fetched_at: 1,
            },
        );
        save_cache_file(&path, &file).expect("save");
        let loaded = load_cache_file(Some(&path));
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(
            loaded.entries["https://example.com/E0.csv"].etag.as_deref(),
            Some("\"abc\"")
        );
    }

    #[test]
    fn version_mismatch_discards_cache() {
        let dir = scratch_dir("http_cache_2");
        let path = dir.join("http_cache.json");
        std::fs::write(&path, r#"{"version":99,"entries":{}}"#).expect("write");
        let loaded = load_cache_file(Some(&path));
        assert_eq!(loaded.version, 0);
    }
}
