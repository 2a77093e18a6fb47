use crate::config::RunConfig;
use crate::crawler::{extract_links, sample_links};
use crate::error::TrafficError;
use crate::report::{render_progress, throughput_mbps};
use crate::types::{Target, TransferMode, TransferResult};
use futures::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::io::StreamReader;
use url::Url;

/// Bytes read per step of a large-file download.
pub const CHUNK_SIZE: usize = 8 * 1024;

pub struct Downloader {
    client: reqwest::Client,
    page_timeout: Duration,
    read_timeout: Duration,
    scratch_dir: PathBuf,
    progress: MultiProgress,
    rng: Mutex<StdRng>,
    seq: AtomicU64,
}

impl Downloader {
    pub fn new(config: &RunConfig, progress: MultiProgress) -> Result<Self, TrafficError> {
        // Test targets often use self-signed certificates.
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(true)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            client,
            page_timeout: config.page_timeout,
            read_timeout: config.connect_timeout,
            scratch_dir: config.scratch_dir.clone(),
            progress,
            rng: Mutex::new(rng),
            seq: AtomicU64::new(0),
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Measures one target. Never fails: errors are folded into the result,
    /// and every scratch file written on the way is gone when this returns
    /// or when the future is dropped.
    pub async fn transfer(&self, target: &Target) -> TransferResult {
        match target.mode {
            TransferMode::BulkFile => self.download_file(target).await,
            TransferMode::PageCrawl => self.crawl_site(target).await,
        }
    }

    /// Removes the scratch directory if nothing is left in it.
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_dir(&self.scratch_dir).await {
            if e.kind() != io::ErrorKind::NotFound {
                debug!("Scratch directory {} not removed: {}", self.scratch_dir.display(), e);
            }
        }
    }

    async fn download_file(&self, target: &Target) -> TransferResult {
        let start_time = Instant::now();
        info!("Starting download: {}", target.url);
        let bar = LiveBar(self.progress.add(self.create_progress_bar()));
        let mut downloaded: u64 = 0;

        let result: Result<(), TrafficError> = async {
            let resp = timeout(self.read_timeout, self.client.get(&target.url).send()).await??;

            if !resp.status().is_success() {
                return Err(TrafficError::Status {
                    status: resp.status(),
                    url: target.url.clone(),
                });
            }

            let total_size = resp.content_length();
            let mut scratch = self.scratch_file(&target.label()).await?;

            let stream = resp
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
            let reader = StreamReader::new(stream);
            tokio::pin!(reader);

            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = timeout(self.read_timeout, reader.read(&mut buf)).await??;
                if n == 0 {
                    break;
                }
                scratch.write_all(&buf[..n]).await?;
                downloaded += n as u64;

                let mbps = throughput_mbps(downloaded, start_time.elapsed());
                bar.0.set_message(render_progress(downloaded, total_size, mbps));
            }

            scratch.flush().await?;
            Ok(())
        }
        .await;

        drop(bar);
        let duration = start_time.elapsed();
        match result {
            Ok(()) => TransferResult::success(target.clone(), downloaded, duration),
            Err(e) => {
                warn!("Download failed for {}: {}", target.url, e);
                TransferResult::failure(target.clone(), downloaded, duration, e.to_string())
            }
        }
    }

    async fn crawl_site(&self, target: &Target) -> TransferResult {
        let start_time = Instant::now();
        info!("Starting crawl: {}", target.url);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut total_bytes: u64 = 0;

        let result: Result<(), TrafficError> = async {
            let base = Url::parse(&target.url).map_err(|_| TrafficError::InvalidUrl(target.url.clone()))?;
            let body = self.fetch_page(base.as_str()).await?;

            let mut kept = vec![self.keep(&format!("base_page-{}.html", seq), &body).await?];
            total_bytes += body.len() as u64;

            let links = extract_links(&body, &base);
            let picked = {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                sample_links(&links, &mut *rng)
            };
            debug!("Following {} of {} links from {}", picked.len(), links.len(), base);

            for (i, link) in picked.iter().enumerate() {
                let body = match self.fetch_page(link.as_str()).await {
                    Ok(body) => body,
                    Err(e) => {
                        debug!("Skipping sub-page {}: {}", link, e);
                        continue;
                    }
                };
                match self.keep(&format!("sub_page-{}-{}.html", seq, i), &body).await {
                    Ok(file) => {
                        kept.push(file);
                        total_bytes += body.len() as u64;
                    }
                    Err(e) => debug!("Skipping sub-page {}: {}", link, e),
                }
            }

            Ok(())
        }
        .await;

        let duration = start_time.elapsed();
        match result {
            Ok(()) => TransferResult::success(target.clone(), total_bytes, duration),
            Err(e) => {
                warn!("Crawl failed for {}: {}", target.url, e);
                TransferResult::failure(target.clone(), total_bytes, duration, e.to_string())
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, TrafficError> {
        let resp = self.client.get(url).timeout(self.page_timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TrafficError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn keep(&self, name: &str, body: &[u8]) -> Result<ScratchFile, TrafficError> {
        let mut file = self.scratch_file(name).await?;
        file.write_all(body).await?;
        file.flush().await?;
        Ok(file)
    }

    async fn scratch_file(&self, name: &str) -> Result<ScratchFile, TrafficError> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self.scratch_dir.join(format!("{:04}-{}", seq, sanitize(name)));
        Ok(ScratchFile::create(path).await?)
    }

    fn create_progress_bar(&self) -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        pb.set_message(render_progress(0, None, 0.0));
        pb
    }
}

/// Clears the live progress line on every exit path, including cancellation.
struct LiveBar(ProgressBar);

impl Drop for LiveBar {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// A file on local scratch space, deleted when dropped.
pub struct ScratchFile {
    path: PathBuf,
    file: Option<File>,
}

impl ScratchFile {
    pub async fn create(path: PathBuf) -> io::Result<Self> {
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.handle()?.write_all(data).await
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.handle()?.flush().await
    }

    fn handle(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "scratch file already closed"))
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // Close before removing so the delete also succeeds on Windows.
        drop(self.file.take());
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove scratch file {}: {}", self.path.display(), e);
            }
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .take(64)
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}
