use std::fmt;
use std::time::Duration;

/// Smallest elapsed time used when computing a rate.
pub const MIN_ELAPSED: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMode {
    /// Base page plus a random sample of its outbound links.
    PageCrawl,
    /// Single streamed resource.
    BulkFile,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::PageCrawl => f.write_str("website"),
            TransferMode::BulkFile => f.write_str("large file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub mode: TransferMode,
}

impl Target {
    pub fn new(url: impl Into<String>, mode: TransferMode) -> Self {
        Self {
            url: url.into(),
            mode,
        }
    }

    /// Name shown in the first report column: the base URL for websites,
    /// the last path segment for large files.
    pub fn label(&self) -> String {
        match self.mode {
            TransferMode::PageCrawl => self.url.clone(),
            TransferMode::BulkFile => {
                let name = self
                    .url
                    .split(['?', '#'])
                    .next()
                    .unwrap_or_default()
                    .rsplit('/')
                    .next()
                    .unwrap_or_default();
                if name.is_empty() {
                    "temp_large_file.dat".to_string()
                } else {
                    name.to_string()
                }
            }
        }
    }
}

/// IP address and country code of a target's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub ip: String,
    pub country_code: String,
}

impl HostInfo {
    /// Placeholder for both columns when no address could be found.
    pub const UNRESOLVED: &'static str = "N/A";
    /// Country code stored when the address resolved but geolocation did not.
    pub const GEO_FAILED: &'static str = "Err";

    pub fn unresolved() -> Self {
        Self {
            ip: Self::UNRESOLVED.to_string(),
            country_code: Self::UNRESOLVED.to_string(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.ip == Self::UNRESOLVED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub target: Target,
    pub status: TransferStatus,
    pub bytes_transferred: u64,
    elapsed: Duration,
    pub error: Option<String>,
}

impl TransferResult {
    pub fn success(target: Target, bytes_transferred: u64, elapsed: Duration) -> Self {
        Self {
            target,
            status: TransferStatus::Success,
            bytes_transferred,
            elapsed: elapsed.max(MIN_ELAPSED),
            error: None,
        }
    }

    pub fn failure(
        target: Target,
        bytes_transferred: u64,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            target,
            status: TransferStatus::Failed,
            bytes_transferred,
            elapsed: elapsed.max(MIN_ELAPSED),
            error: Some(error.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == TransferStatus::Success
    }

    /// Always at least [`MIN_ELAPSED`].
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
