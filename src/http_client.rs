use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const AGENT: &str = "signalizer/0.1";

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide blocking client. The timeout is fixed by whoever builds it first.
pub fn http_client() -> Result<&'static Client> {
    http_client_with_timeout(DEFAULT_TIMEOUT_SECS)
}

pub fn http_client_with_timeout(timeout_secs: u64) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub requests_remaining: Option<String>,
}

/// Minimal GET seam so provider calls can be scripted in tests.
///
/// `Err` means the request never produced a status (timeout, DNS, refused).
pub trait HttpGet {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: &'static Client,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client_with_timeout(timeout_secs)?,
        })
    }
}

impl HttpGet for ReqwestTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .header(USER_AGENT, AGENT)
            .send()
            .context("request failed")?;
        let status = resp.status().as_u16();
        let requests_remaining = resp
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.text().context("failed reading body")?;
        Ok(HttpResponse {
            status,
            body,
            requests_remaining,
        })
    }
}
