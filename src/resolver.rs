//! Hostname to IP/country resolution, memoized for the lifetime of a run.
//!
//! A successful DNS lookup is cached permanently, even when the geolocation
//! step fails (the country is then stored as `Err`). A failed DNS lookup is
//! not cached, so a later iteration tries again.

use crate::types::HostInfo;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup(&self, host: &str) -> Option<IpAddr>;
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn country_code(&self, ip: IpAddr) -> Option<String>;
}

/// System resolver through `tokio::net::lookup_host`.
pub struct SystemDns;

#[async_trait]
impl DnsLookup for SystemDns {
    async fn lookup(&self, host: &str) -> Option<IpAddr> {
        match tokio::net::lookup_host((host, 0)).await {
            Ok(mut addrs) => addrs.next().map(|a| a.ip()),
            Err(e) => {
                debug!("DNS lookup for {} failed: {}", host, e);
                None
            }
        }
    }
}

/// Country lookup against an ip-api.com compatible JSON endpoint.
pub struct IpApiGeo {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    country_code: Option<String>,
}

impl IpApiGeo {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl GeoLookup for IpApiGeo {
    async fn country_code(&self, ip: IpAddr) -> Option<String> {
        let url = format!("{}{}", self.endpoint, ip);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Geolocation lookup for {} failed: {}", ip, e);
                return None;
            }
        };
        match response.json::<GeoResponse>().await {
            Ok(body) => body.country_code.filter(|cc| !cc.is_empty()),
            Err(e) => {
                debug!("Geolocation response for {} unreadable: {}", ip, e);
                None
            }
        }
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<HostInfo>>>;

pub struct HostInfoResolver {
    dns: Arc<dyn DnsLookup>,
    geo: Arc<dyn GeoLookup>,
    timeout: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl HostInfoResolver {
    pub fn new(dns: Arc<dyn DnsLookup>, geo: Arc<dyn GeoLookup>, timeout: Duration) -> Self {
        Self {
            dns,
            geo,
            timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, url: &str) -> HostInfo {
        let Some(host) = hostname(url) else {
            return HostInfo::unresolved();
        };

        // Holding the per-host slot keeps a second caller for the same host
        // waiting instead of issuing a duplicate lookup.
        let slot = self.slot(&host);
        let mut cached = slot.lock().await;
        if let Some(info) = cached.as_ref() {
            return info.clone();
        }

        let ip = match tokio::time::timeout(self.timeout, self.dns.lookup(&host)).await {
            Ok(Some(ip)) => ip,
            Ok(None) => return HostInfo::unresolved(),
            Err(_) => {
                warn!("DNS lookup for {} timed out", host);
                return HostInfo::unresolved();
            }
        };

        let country_code = match tokio::time::timeout(self.timeout, self.geo.country_code(ip)).await {
            Ok(Some(cc)) => cc,
            Ok(None) | Err(_) => HostInfo::GEO_FAILED.to_string(),
        };

        let info = HostInfo {
            ip: ip.to_string(),
            country_code,
        };
        debug!("Resolved {} to {} ({})", host, info.ip, info.country_code);
        *cached = Some(info.clone());
        info
    }

    fn slot(&self, host: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(host.to_string()).or_default().clone()
    }
}

fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.host()? {
        url::Host::Domain(d) => Some(d.to_string()),
        url::Host::Ipv4(ip) => Some(ip.to_string()),
        url::Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// Asks a "what is my IP" service for the public address of this machine.
pub async fn public_ip(endpoint: &str, timeout: Duration) -> Option<String> {
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    let response = client.get(endpoint).send().await.ok()?.error_for_status().ok()?;
    let body = response.text().await.ok()?;
    let ip = body.trim();
    ip.parse::<IpAddr>().ok().map(|_| ip.to_string())
}
