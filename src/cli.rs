use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate repeatable download traffic and log the throughput", long_about = None)]
pub struct Cli {
    /// List of websites to crawl, one URL per line
    #[arg(default_value = "websites.txt")]
    pub websites: PathBuf,

    /// List of large files to download, one URL per line
    #[arg(default_value = "files.txt")]
    pub files: PathBuf,

    /// Total run time in seconds
    #[arg(short, long, default_value = "300")]
    pub duration: u64,

    /// Pause between iterations in seconds
    #[arg(short, long, default_value = "5")]
    pub cooldown: u64,

    /// Number of targets measured concurrently
    #[arg(short, long, default_value = "1")]
    pub parallelism: usize,

    /// Seed for the crawl sampler (random if omitted)
    #[arg(short, long, default_value = None)]
    pub seed: Option<u64>,

    /// Directory for run logs (defaults to `logs` next to the executable)
    #[arg(long, default_value = None)]
    pub log_dir: Option<PathBuf>,

    /// Directory for scratch downloads, removed on exit
    #[arg(long, default_value = None)]
    pub scratch_dir: Option<PathBuf>,

    /// Do not crawl websites
    #[arg(long)]
    pub skip_websites: bool,

    /// Do not download large files
    #[arg(long)]
    pub skip_files: bool,
}
