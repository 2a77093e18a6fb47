//! Repeats passes over the target lists until the run deadline passes or the
//! operator cancels.
//!
//! ```text
//! Startup -> Iterating -> Cooldown -> Iterating -> ... -> Stopped
//! ```
//!
//! The first pass always runs, so a zero duration gives exactly one pass and
//! no cooldown. Cancellation stops from any state without finishing the
//! in-flight target; rows already emitted stay valid.

use crate::config::RunConfig;
use crate::downloader::Downloader;
use crate::error::TrafficError;
use crate::report;
use crate::resolver::HostInfoResolver;
use crate::sink::{LineKind, ReportSink};
use crate::types::{Target, TransferMode};
use chrono::Local;
use log::debug;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DeadlineReached,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Startup,
    Iterating,
    Cooldown,
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u32,
    pub stop_reason: StopReason,
}

pub struct RunController {
    config: RunConfig,
    downloader: Downloader,
    resolver: HostInfoResolver,
    sink: ReportSink,
    cancel: CancellationToken,
}

impl RunController {
    pub fn new(
        config: RunConfig,
        downloader: Downloader,
        resolver: HostInfoResolver,
        sink: ReportSink,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            downloader,
            resolver,
            sink,
            cancel,
        }
    }

    /// Runs to completion. The only error is having no targets at all;
    /// cancellation is a normal stop.
    pub async fn run(&self, websites: Vec<Target>, files: Vec<Target>) -> Result<RunSummary, TrafficError> {
        self.sink.emit(
            LineKind::Plain,
            format!("Loaded {} websites and {} large files.", websites.len(), files.len()),
        );

        if websites.is_empty() && files.is_empty() {
            let err = TrafficError::NoTargets {
                websites: self.config.websites_path.clone(),
                files: self.config.files_path.clone(),
            };
            self.sink.emit(LineKind::Failure, format!("Error: {}. Exiting.", err));
            return Err(err);
        }

        let deadline = Instant::now() + self.config.duration;
        self.sink.emit_lines(
            LineKind::Plain,
            &[
                format!("Starting Bandwidth Stress Test for {}.", describe(self.config.duration)),
                "Press Ctrl+C to stop manually.".to_string(),
            ],
        );

        let mut iterations = 0;
        let mut state = RunState::Startup;
        let stop_reason = loop {
            let next = match state {
                RunState::Startup => RunState::Iterating,
                RunState::Iterating => {
                    if self.cancel.is_cancelled() {
                        RunState::Stopped(StopReason::Cancelled)
                    } else {
                        iterations += 1;
                        if !self.run_pass(iterations, &websites, &files).await {
                            RunState::Stopped(StopReason::Cancelled)
                        } else if Instant::now() >= deadline {
                            RunState::Stopped(StopReason::DeadlineReached)
                        } else {
                            RunState::Cooldown
                        }
                    }
                }
                RunState::Cooldown => {
                    self.sink.emit(
                        LineKind::Plain,
                        format!(
                            "Iteration complete. Cooling down for {} seconds...",
                            self.config.cooldown.as_secs()
                        ),
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => RunState::Stopped(StopReason::Cancelled),
                        _ = tokio::time::sleep(self.config.cooldown) => {
                            if Instant::now() >= deadline {
                                RunState::Stopped(StopReason::DeadlineReached)
                            } else {
                                RunState::Iterating
                            }
                        }
                    }
                }
                RunState::Stopped(reason) => break reason,
            };
            debug!("Run state {:?} -> {:?}", state, next);
            state = next;
        };

        self.downloader.cleanup().await;
        if stop_reason == StopReason::Cancelled {
            self.sink.emit(LineKind::Notice, "Test stopped by user.");
        }
        self.sink.emit(LineKind::Heading, "Test Complete.");

        Ok(RunSummary {
            iterations,
            stop_reason,
        })
    }

    /// One pass over both lists. Returns `false` if cancelled part way.
    async fn run_pass(&self, iteration: u32, websites: &[Target], files: &[Target]) -> bool {
        self.sink.emit(
            LineKind::Heading,
            format!(
                ">>> ITERATION {} STARTING AT {} <<<",
                iteration,
                Local::now().format("%H:%M:%S")
            ),
        );

        for (mode, targets) in [(TransferMode::PageCrawl, websites), (TransferMode::BulkFile, files)] {
            if targets.is_empty() {
                continue;
            }
            self.sink.emit_lines(LineKind::Heading, &report::header(mode));

            for chunk in targets.chunks(self.config.parallelism.max(1)) {
                if self.cancel.is_cancelled() {
                    return false;
                }
                let measurements = futures::future::join_all(chunk.iter().map(|t| self.measure(t)));
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return false,
                    _ = measurements => {}
                }
            }
        }
        true
    }

    async fn measure(&self, target: &Target) {
        let result = self.downloader.transfer(target).await;
        let host = self.resolver.resolve(&target.url).await;
        let kind = if result.succeeded() {
            LineKind::Success
        } else {
            LineKind::Failure
        };
        self.sink.emit_lines(kind, &report::render(&result, &host));
    }
}

fn describe(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}
