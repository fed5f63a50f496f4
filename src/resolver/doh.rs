//! DoH JSON queries
//!
//! Resolvers are queried with the JSON flavor of DNS-over-HTTPS
//! (`GET <endpoint>?name=<domain>&type=A`, `accept: application/dns-json`),
//! which Cloudflare, Google, and most public resolvers serve.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failures that make a resolver's answer unusable
///
/// None of these say anything about the domain itself; the prober moves on
/// to the next resolver.
#[derive(Debug, Error)]
pub enum DohError {
    #[error("invalid resolver URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("resolver returned HTTP {0}")]
    Status(u16),

    #[error("malformed answer: {0}")]
    Malformed(String),
}

/// The subset of a DoH JSON answer the prober needs
#[derive(Debug, Clone, Deserialize)]
pub struct DohAnswer {
    /// DNS response code (0 = NOERROR, 3 = NXDOMAIN, ...)
    #[serde(rename = "Status")]
    pub status: u32,

    /// Answer records; absent when the name has none
    #[serde(rename = "Answer", default)]
    pub answer: Vec<serde_json::Value>,
}

impl DohAnswer {
    /// NOERROR with at least one answer record
    pub fn has_records(&self) -> bool {
        self.status == 0 && !self.answer.is_empty()
    }

    /// Parses a DoH JSON body
    pub fn parse(body: &[u8]) -> Result<Self, DohError> {
        serde_json::from_slice(body).map_err(|e| DohError::Malformed(e.to_string()))
    }
}

/// Builds the A-record query URL for `domain` against `endpoint`
///
/// # Examples
///
/// ```
/// use dom4in_collector::resolver::build_query_url;
///
/// let url = build_query_url("https://cloudflare-dns.com/dns-query", "abc.io").unwrap();
/// assert_eq!(url.as_str(), "https://cloudflare-dns.com/dns-query?name=abc.io&type=A");
/// ```
pub fn build_query_url(endpoint: &str, domain: &str) -> Result<Url, DohError> {
    let mut url = Url::parse(endpoint).map_err(|e| DohError::InvalidUrl {
        url: endpoint.to_string(),
        message: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("name", domain)
        .append_pair("type", "A");
    Ok(url)
}

/// Sends one A-record query and parses the answer
///
/// A non-200 status, transport error, timeout, or unparsable body is an
/// error; any well-formed answer is returned as-is.
pub async fn query_a(
    client: &Client,
    endpoint: &str,
    domain: &str,
    timeout: Duration,
) -> Result<DohAnswer, DohError> {
    let url = build_query_url(endpoint, domain)?;

    let request = async {
        let response = client
            .get(url)
            .header("accept", "application/dns-json")
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(DohError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        DohAnswer::parse(&body)
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(DohError::Timeout(timeout)),
    }
}
