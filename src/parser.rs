use crate::types::{Target, TransferMode};
use log::{debug, warn};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Reads a newline-delimited URL list.
///
/// Blank lines and lines starting with `#` are skipped; everything else is
/// taken literally, so malformed URLs only surface when fetched. A missing or
/// unreadable file yields an empty list rather than an error.
pub async fn parse_targets(path: &Path, mode: TransferMode) -> Vec<Target> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            warn!("Could not open target list {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut contents = String::new();
    if let Err(e) = file.read_to_string(&mut contents).await {
        warn!("Could not read target list {}: {}", path.display(), e);
        return Vec::new();
    }

    let targets = parse_lines(&contents, mode);
    debug!("Parsed {} {} targets from {}", targets.len(), mode, path.display());
    targets
}

pub fn parse_lines(contents: &str, mode: TransferMode) -> Vec<Target> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Target::new(line, mode))
        .collect()
}
