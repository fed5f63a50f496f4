//! Prober
//!
//! A strict two-stage pipeline: a DoH A-record lookup decides registration,
//! and only registered domains pay for the HTTP liveness fetch.

use crate::config::ProbeConfig;
use crate::probe::classify::{classify_site, Classification, ProductState, UsageState};
use crate::resolver::{query_a, ResolverPool};
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;

/// Most landing-page bytes read for classification
pub const MAX_BODY_BYTES: usize = 4096;

/// Outcome of the DNS phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsVerdict {
    /// NOERROR with at least one answer record
    Registered,

    /// Any other well-formed answer
    Unregistered,

    /// No resolver returned a usable answer
    ResolverFailure,
}

/// The first bytes of a landing page
#[derive(Debug, Clone)]
pub struct SiteResponse {
    pub status: u16,
    pub content_type: String,
    /// Lowercased, at most [`MAX_BODY_BYTES`] bytes
    pub body: String,
}

/// Builds the HTTP client shared by DoH queries and site fetches
///
/// Redirects are never followed: a redirect is itself a classification
/// signal.
pub fn build_http_client(config: &ProbeConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.http_timeout().min(config.dns_timeout()))
        .redirect(Policy::none())
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Probes candidate domains against a shared resolver pool
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    pool: Arc<ResolverPool>,
    config: Arc<ProbeConfig>,
}

impl Prober {
    /// Creates a prober with its own HTTP client
    pub fn new(config: ProbeConfig, pool: Arc<ResolverPool>) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config)?;
        Ok(Self::with_client(client, config, pool))
    }

    pub fn with_client(client: Client, config: ProbeConfig, pool: Arc<ResolverPool>) -> Self {
        Self {
            client,
            pool,
            config: Arc::new(config),
        }
    }

    pub fn pool(&self) -> &Arc<ResolverPool> {
        &self.pool
    }

    /// Probes one domain and classifies it
    ///
    /// Never fails: resolver and HTTP errors are folded into the result.
    pub async fn probe(&self, domain: &str) -> Classification {
        match self.dns_phase(domain).await {
            DnsVerdict::Registered => {
                let (usage, product) = self.http_phase(domain).await;
                tracing::trace!("{} registered: {} / {}", domain, usage, product);
                Classification::registered(usage, product)
            }
            DnsVerdict::Unregistered => {
                tracing::trace!("{} unregistered", domain);
                Classification::unregistered()
            }
            DnsVerdict::ResolverFailure => Classification::resolver_failure(),
        }
    }

    /// Queries resolvers until one returns a well-formed answer
    ///
    /// Each resolver is tried at most once per call, so a candidate costs at
    /// most one query per configured resolver.
    pub async fn dns_phase(&self, domain: &str) -> DnsVerdict {
        let mut tried = Vec::with_capacity(self.pool.len());

        while let Some(resolver) = self.pool.select_excluding(&tried) {
            tried.push(resolver.index);

            match query_a(&self.client, &resolver.url, domain, self.config.dns_timeout()).await {
                Ok(answer) => {
                    self.pool.record_result(resolver.index, true);
                    return if answer.has_records() {
                        DnsVerdict::Registered
                    } else {
                        DnsVerdict::Unregistered
                    };
                }
                Err(e) => {
                    self.pool.record_result(resolver.index, false);
                    tracing::warn!(
                        "Resolver {} failed for {} ({}), failing over",
                        resolver.name,
                        domain,
                        e
                    );
                }
            }
        }

        tracing::error!(
            "All {} resolvers failed for {}, recording as unregistered",
            tried.len(),
            domain
        );
        DnsVerdict::ResolverFailure
    }

    /// Fetches the landing page and classifies it
    ///
    /// Any transport, TLS, or timeout error means no website.
    pub async fn http_phase(&self, domain: &str) -> (UsageState, ProductState) {
        let url = format!("{}://{}", self.config.site_scheme, domain);
        match fetch_site(&self.client, &url, self.config.http_timeout()).await {
            Ok(site) => classify_site(site.status, &site.content_type, &site.body),
            Err(e) => {
                tracing::debug!("HTTP probe of {} failed: {}", url, e);
                (UsageState::NoWebsite, ProductState::Unknown)
            }
        }
    }
}

/// Fetches `url`, reading at most [`MAX_BODY_BYTES`] of the body
pub async fn fetch_site(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<SiteResponse, reqwest::Error> {
    let mut response = client.get(url).timeout(timeout).send().await?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut body = Vec::with_capacity(MAX_BODY_BYTES);
    while body.len() < MAX_BODY_BYTES {
        match response.chunk().await? {
            Some(chunk) => {
                let take = chunk.len().min(MAX_BODY_BYTES - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }

    Ok(SiteResponse {
        status,
        content_type,
        body: String::from_utf8_lossy(&body).to_lowercase(),
    })
}
