use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use signalizer::http_client::{HttpGet, HttpResponse};
use signalizer::odds_cache::OddsCacheStore;
use signalizer::odds_fetch::{OddsFetchConfig, OddsFetcher, OddsSource};

const TTL: i64 = 3600;
const T0: i64 = 1_792_000_000;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[derive(Clone, Default)]
struct Scripted {
    replies: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    calls: Arc<AtomicUsize>,
    keys: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    fn push_status(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
            requests_remaining: Some("499".to_string()),
        }));
    }

    fn push_error(&self, msg: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(anyhow!(msg.to_string())));
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpGet for Scripted {
    fn get(&self, _url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, key)) = query.iter().find(|(name, _)| *name == "apiKey") {
            self.keys.lock().unwrap().push(key.to_string());
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))
    }
}

fn fetcher(keys: &[&str], transport: &Scripted, clock: &Arc<AtomicI64>) -> OddsFetcher {
    let cfg = OddsFetchConfig {
        api_keys: keys.iter().map(|k| k.to_string()).collect(),
        ..Default::default()
    };
    let store = OddsCacheStore::open_in_memory(TTL).expect("store");
    let clock = Arc::clone(clock);
    OddsFetcher::new(store, Box::new(transport.clone()), cfg)
        .with_clock(move || clock.load(Ordering::SeqCst))
}

#[test]
fn second_call_inside_ttl_stays_local() {
    let transport = Scripted::default();
    transport.push_status(200, &read_fixture("odds_epl.json"));
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1"], &transport, &clock);

    let first = f.get_odds("soccer_epl");
    assert_eq!(first.len(), 5);
    clock.store(T0 + TTL - 1, Ordering::SeqCst);
    let second = f.get_odds("soccer_epl");
    assert_eq!(second, first);
    assert_eq!(transport.calls(), 1);
}

#[test]
fn expired_rows_trigger_a_refetch() {
    let transport = Scripted::default();
    let body = read_fixture("odds_epl.json");
    transport.push_status(200, &body);
    transport.push_status(200, &body);
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1"], &transport, &clock);

    assert!(!f.get_odds("soccer_epl").is_empty());
    clock.store(T0 + TTL + 1, Ordering::SeqCst);
    assert!(!f.get_odds("soccer_epl").is_empty());
    assert_eq!(transport.calls(), 2);
}

#[test]
fn rate_limited_key_rotates_to_the_next() {
    let transport = Scripted::default();
    transport.push_status(429, "quota");
    transport.push_status(200, &read_fixture("odds_epl.json"));
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1", "k2", "k3"], &transport, &clock);

    let rows = f.get_odds("soccer_epl");
    assert_eq!(rows.len(), 5);
    assert_eq!(transport.calls(), 2);
    assert_eq!(*transport.keys.lock().unwrap(), vec!["k1", "k2"]);
}

#[test]
fn unauthorized_on_every_key_yields_nothing() {
    let transport = Scripted::default();
    transport.push_status(401, "bad key");
    transport.push_status(401, "bad key");
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1", "k2"], &transport, &clock);

    assert!(f.get_odds("soccer_epl").is_empty());
    assert_eq!(transport.calls(), 2);
}

#[test]
fn server_error_aborts_without_rotation() {
    let transport = Scripted::default();
    transport.push_status(500, "<html>upstream down</html>");
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1", "k2"], &transport, &clock);

    assert!(f.get_odds("soccer_epl").is_empty());
    assert_eq!(transport.calls(), 1);
}

#[test]
fn transport_failure_aborts_without_rotation() {
    let transport = Scripted::default();
    transport.push_error("connection refused");
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1", "k2"], &transport, &clock);

    assert!(f.get_odds("soccer_epl").is_empty());
    assert_eq!(transport.calls(), 1);
}

#[test]
fn no_keys_means_no_request() {
    let transport = Scripted::default();
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&[], &transport, &clock);

    assert!(f.get_odds("soccer_epl").is_empty());
    assert_eq!(transport.calls(), 0);
}

#[test]
fn h2h_lookup_matches_feed_style_names() {
    let transport = Scripted::default();
    transport.push_status(200, &read_fixture("odds_epl.json"));
    let clock = Arc::new(AtomicI64::new(T0));
    let mut f = fetcher(&["k1"], &transport, &clock);

    let prices = f
        .lookup_h2h("soccer_epl", "Fulham", "Wolves")
        .expect("alias match");
    assert_eq!(prices.home, Some(2.1));
    assert_eq!(prices.away, Some(3.4));

    let arsenal = f
        .lookup_h2h("soccer_epl", "Arsenal", "Everton")
        .expect("exact match");
    assert_eq!(arsenal.home, Some(1.45));
    assert!(f.lookup_h2h("soccer_epl", "Chelsea", "Fulham").is_none());
    assert_eq!(transport.calls(), 1);
}
