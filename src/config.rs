use crate::cli::Cli;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Bot/Testing";
pub const GEO_ENDPOINT: &str = "http://ip-api.com/json/";
pub const PUBLIC_IP_ENDPOINT: &str = "https://api.ipify.org";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub duration: Duration,
    pub cooldown: Duration,
    pub websites_path: PathBuf,
    pub files_path: PathBuf,
    pub log_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub parallelism: usize,
    pub seed: Option<u64>,
    pub skip_websites: bool,
    pub skip_files: bool,
    /// Whole-request timeout for website pages.
    pub page_timeout: Duration,
    /// Connect and per-read timeout for large files.
    pub connect_timeout: Duration,
    /// Bound on each DNS and geolocation step.
    pub lookup_timeout: Duration,
    pub user_agent: String,
    pub geo_endpoint: String,
    pub public_ip_endpoint: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5 * 60),
            cooldown: Duration::from_secs(5),
            websites_path: PathBuf::from("websites.txt"),
            files_path: PathBuf::from("files.txt"),
            log_dir: exe_dir().join("logs"),
            scratch_dir: std::env::temp_dir().join(format!("traffic-sim-{}", std::process::id())),
            parallelism: 1,
            seed: None,
            skip_websites: false,
            skip_files: false,
            page_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(20),
            lookup_timeout: Duration::from_secs(2),
            user_agent: USER_AGENT.to_string(),
            geo_endpoint: GEO_ENDPOINT.to_string(),
            public_ip_endpoint: PUBLIC_IP_ENDPOINT.to_string(),
        }
    }
}

impl RunConfig {
    pub fn from_cli(cli: Cli) -> Self {
        let defaults = Self::default();
        Self {
            duration: Duration::from_secs(cli.duration),
            cooldown: Duration::from_secs(cli.cooldown),
            websites_path: resolve_input_path(&cli.websites),
            files_path: resolve_input_path(&cli.files),
            log_dir: cli.log_dir.unwrap_or(defaults.log_dir),
            scratch_dir: cli.scratch_dir.unwrap_or(defaults.scratch_dir),
            parallelism: cli.parallelism.max(1),
            seed: cli.seed,
            skip_websites: cli.skip_websites,
            skip_files: cli.skip_files,
            ..defaults
        }
    }
}

/// Uses `path` as given if it exists relative to the working directory,
/// otherwise looks next to the executable.
pub fn resolve_input_path(path: &Path) -> PathBuf {
    resolve_against(path, &exe_dir())
}

fn resolve_against(path: &Path, fallback_dir: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    fallback_dir.join(path)
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
