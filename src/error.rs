use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("No URLs found in {} or {}", .websites.display(), .files.display())]
    NoTargets { websites: PathBuf, files: PathBuf },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    TimedOut,

    #[error("HTTP status {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Request error: {0}")]
    Request(reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for TrafficError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TrafficError::TimedOut
        } else if e.is_connect() {
            TrafficError::Connect(root_cause(&e))
        } else if let Some(status) = e.status() {
            TrafficError::Status {
                status,
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            TrafficError::Request(e)
        }
    }
}

impl From<tokio::time::error::Elapsed> for TrafficError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TrafficError::TimedOut
    }
}

/// Innermost message of an error chain; reqwest wraps the interesting part
/// (refused, reset, dns) several layers deep.
fn root_cause(e: &reqwest::Error) -> String {
    let mut current: &dyn std::error::Error = e;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
