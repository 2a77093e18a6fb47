//! Operator-facing report stream.
//!
//! Every line shown to the operator goes through a [`ReportSink`], which fans
//! it out to the registered writers. A line is written to all writers while
//! the sink's lock is held, so rows from concurrent transfers never interleave.

use chrono::{DateTime, Local};
use colored::Colorize;
use indicatif::MultiProgress;
use log::warn;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Plain,
    Heading,
    Success,
    Failure,
    Notice,
}

pub trait LineWriter: Send {
    fn write_line(&mut self, at: &DateTime<Local>, kind: LineKind, text: &str) -> io::Result<()>;
}

#[derive(Clone, Default)]
pub struct ReportSink {
    writers: Arc<Mutex<Vec<Box<dyn LineWriter>>>>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_writer(self, writer: impl LineWriter + 'static) -> Self {
        self.add_writer(writer);
        self
    }

    pub fn add_writer(&self, writer: impl LineWriter + 'static) {
        self.lock().push(Box::new(writer));
    }

    pub fn emit(&self, kind: LineKind, text: impl AsRef<str>) {
        self.emit_lines(kind, &[text.as_ref()]);
    }

    /// Writes several lines as one unit.
    pub fn emit_lines<S: AsRef<str>>(&self, kind: LineKind, lines: &[S]) {
        let at = Local::now();
        let mut writers = self.lock();
        for line in lines {
            for writer in writers.iter_mut() {
                if let Err(e) = writer.write_line(&at, kind, line.as_ref()) {
                    warn!("Failed to write report line: {}", e);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn LineWriter>>> {
        // A panicking writer must not silence the rest of the run.
        self.writers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Prints to stdout, hiding any live progress bars while doing so.
pub struct ConsoleWriter {
    progress: MultiProgress,
}

impl ConsoleWriter {
    pub fn new(progress: MultiProgress) -> Self {
        Self { progress }
    }
}

impl LineWriter for ConsoleWriter {
    fn write_line(&mut self, _at: &DateTime<Local>, kind: LineKind, text: &str) -> io::Result<()> {
        let styled = match kind {
            LineKind::Plain => text.normal(),
            LineKind::Heading => text.bold(),
            LineKind::Success => text.green(),
            LineKind::Failure => text.red(),
            LineKind::Notice => text.yellow(),
        };
        self.progress.suspend(|| {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", styled)?;
            out.flush()
        })
    }
}

/// Appends `[YYYY-MM-DD HH:MM:SS] ` prefixed lines to a log file.
pub struct FileWriter {
    out: BufWriter<File>,
}

impl FileWriter {
    /// Creates `traffic_<started>.log` inside `dir`, creating `dir` if needed.
    pub fn create_in(dir: &Path, started: &DateTime<Local>) -> io::Result<(Self, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("traffic_{}.log", started.format("%Y-%m-%d_%H-%M-%S")));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok((
            Self {
                out: BufWriter::new(file),
            },
            path,
        ))
    }
}

impl LineWriter for FileWriter {
    fn write_line(&mut self, at: &DateTime<Local>, _kind: LineKind, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", timestamped(at, text))?;
        self.out.flush()
    }
}

/// Keeps lines in memory; the handle returned by [`MemoryWriter::lines`]
/// stays valid after the writer is moved into a sink.
#[derive(Clone, Default)]
pub struct MemoryWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LineWriter for MemoryWriter {
    fn write_line(&mut self, _at: &DateTime<Local>, _kind: LineKind, text: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}

pub fn timestamped(at: &DateTime<Local>, text: &str) -> String {
    format!("[{}] {}", at.format("%Y-%m-%d %H:%M:%S"), text)
}
