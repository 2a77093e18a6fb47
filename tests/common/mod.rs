//! In-process HTTP target and stubbed host resolution for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use traffic_sim::config::RunConfig;
use traffic_sim::controller::RunController;
use traffic_sim::downloader::Downloader;
use traffic_sim::resolver::{DnsLookup, GeoLookup, HostInfoResolver};
use traffic_sim::sink::{MemoryWriter, ReportSink};

pub const TEN_MB: usize = 10 * 1024 * 1024;
pub const PAGE_A_LEN: usize = 1000;
pub const PAGE_B_LEN: usize = 3000;

pub const INDEX: &str = r#"<html><body>
<a href="/a.html">a</a>
<a href="b.html">b</a>
<a href="/gone.html">gone</a>
<a href="mailto:ops@example.com">mail</a>
</body></html>"#;

/// Serves fixed pages and files on a random localhost port.
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
}

impl TestServer {
    pub async fn new() -> Self {
        let app = Router::new()
            .route("/files/10MB.bin", get(|| async { vec![7u8; TEN_MB] }))
            .route("/files/small.bin", get(|| async { vec![1u8; 64 * 1024] }))
            .route("/index.html", get(|| async { Html(INDEX) }))
            .route("/a.html", get(|| async { Html("a".repeat(PAGE_A_LEN)) }))
            .route("/b.html", get(|| async { Html("b".repeat(PAGE_B_LEN)) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let socket = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { handle, socket }
    }

    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://127.0.0.1:{}/{}", self.socket.port(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A URL on a port nothing listens on.
pub fn unreachable_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/{}", port, path.trim_start_matches('/'))
}

#[derive(Default)]
pub struct StubDns {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DnsLookup for StubDns {
    async fn lookup(&self, _host: &str) -> Option<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

#[derive(Default)]
pub struct StubGeo {
    pub calls: AtomicUsize,
}

#[async_trait]
impl GeoLookup for StubGeo {
    async fn country_code(&self, _ip: IpAddr) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some("ZZ".to_string())
    }
}

pub fn test_config(scratch: &std::path::Path) -> RunConfig {
    RunConfig {
        duration: Duration::ZERO,
        cooldown: Duration::from_secs(60),
        scratch_dir: scratch.join("scratch"),
        log_dir: scratch.join("logs"),
        seed: Some(1),
        ..Default::default()
    }
}

pub fn hidden_progress() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
}

pub struct Harness {
    pub controller: RunController,
    pub lines: MemoryWriter,
    pub dns: Arc<StubDns>,
    pub geo: Arc<StubGeo>,
    pub cancel: CancellationToken,
}

pub fn harness(config: RunConfig) -> Harness {
    let lines = MemoryWriter::new();
    let sink = ReportSink::new().with_writer(lines.clone());
    let dns = Arc::new(StubDns::default());
    let geo = Arc::new(StubGeo::default());
    let resolver = HostInfoResolver::new(dns.clone(), geo.clone(), config.lookup_timeout);
    let downloader = Downloader::new(&config, hidden_progress()).unwrap();
    let cancel = CancellationToken::new();
    let controller = RunController::new(config, downloader, resolver, sink, cancel.clone());
    Harness {
        controller,
        lines,
        dns,
        geo,
        cancel,
    }
}

/// Report rows: successful rows carry a size column, failed ones end in FAILED.
pub fn result_rows(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| l.ends_with("| FAILED") || l.contains(" MB ") || l.contains(" GB "))
        .cloned()
        .collect()
}

pub fn is_empty_or_missing(dir: &std::path::Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
