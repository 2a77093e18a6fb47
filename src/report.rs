use crate::types::{HostInfo, TransferMode, TransferResult, MIN_ELAPSED};
use std::time::Duration;

/// Width of the first column; longer labels are cut to `LABEL_WIDTH - 2`.
pub const LABEL_WIDTH: usize = 30;
/// Cells in the live progress bar.
pub const BAR_CELLS: usize = 20;
/// Error details are cut to this many characters.
pub const ERROR_DETAIL_WIDTH: usize = 60;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

pub fn format_size(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}

/// Megabits per second. Zero elapsed time is replaced by [`MIN_ELAPSED`].
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.max(MIN_ELAPSED).as_secs_f64();
    (bytes as f64 * 8.0) / (1_000_000.0 * secs)
}

pub fn header(mode: TransferMode) -> Vec<String> {
    let first = match mode {
        TransferMode::PageCrawl => "Target Site",
        TransferMode::BulkFile => "File Name",
    };
    let title = match mode {
        TransferMode::PageCrawl => "STARTING WEBSITE CRAWL TEST (SSL Verify Disabled)",
        TransferMode::BulkFile => "STARTING LARGE FILE DOWNLOAD TEST (SSL Verify Disabled)",
    };
    let columns = format!(
        "{:<width$} | {:<15} | {:<4} | {:<10} | {:<10} | {:<12}",
        first,
        "IP",
        "CC",
        "Size",
        "Time (s)",
        "Speed (Mbps)",
        width = LABEL_WIDTH
    );
    vec![
        "=".repeat(100),
        title.to_string(),
        "=".repeat(100),
        columns,
        "-".repeat(100),
    ]
}

/// One row for a successful transfer, or a `FAILED` row followed by an
/// indented error detail line.
pub fn render(result: &TransferResult, host: &HostInfo) -> Vec<String> {
    let label = truncate(&result.target.label(), LABEL_WIDTH - 2);
    if result.succeeded() {
        let elapsed = result.elapsed();
        vec![format!(
            "{:<width$} | {:<15} | {:<4} | {:<10} | {:<10.2} | {:<12.2}",
            label,
            host.ip,
            host.country_code,
            format_size(result.bytes_transferred),
            elapsed.as_secs_f64(),
            throughput_mbps(result.bytes_transferred, elapsed),
            width = LABEL_WIDTH
        )]
    } else {
        let detail = result.error.as_deref().unwrap_or("unknown error");
        vec![
            format!(
                "{:<width$} | {:<15} | {:<4} | FAILED",
                label,
                host.ip,
                host.country_code,
                width = LABEL_WIDTH
            ),
            format!("    Error: {}", error_detail(detail)),
        ]
    }
}

/// Message for the ephemeral progress line of a large-file download.
pub fn render_progress(downloaded: u64, total: Option<u64>, mbps: f64) -> String {
    match total {
        Some(total) if total > 0 => {
            let fraction = (downloaded as f64 / total as f64).min(1.0);
            let filled = ((BAR_CELLS as u64 * downloaded) / total).min(BAR_CELLS as u64) as usize;
            format!(
                "Downloading: |{}{}| {:5.1}% @ {:5.2} Mbps",
                "█".repeat(filled),
                "-".repeat(BAR_CELLS - filled),
                fraction * 100.0,
                mbps
            )
        }
        _ => format!("Downloading: {} @ {:5.2} Mbps", format_size(downloaded), mbps),
    }
}

/// First line of an error message, cut to [`ERROR_DETAIL_WIDTH`].
pub fn error_detail(message: &str) -> String {
    let first = message.lines().next().unwrap_or_default();
    if first.chars().count() > ERROR_DETAIL_WIDTH {
        format!("{}...", truncate(first, ERROR_DETAIL_WIDTH))
    } else {
        first.to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
