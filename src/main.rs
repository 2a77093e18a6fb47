use anyhow::Context;
use chrono::Local;
use clap::Parser;
use colored::*;
use indicatif::MultiProgress;
use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use traffic_sim::cli::Cli;
use traffic_sim::config::RunConfig;
use traffic_sim::controller::RunController;
use traffic_sim::downloader::Downloader;
use traffic_sim::parser::parse_targets;
use traffic_sim::resolver::{self, HostInfoResolver, IpApiGeo, SystemDns};
use traffic_sim::sink::{ConsoleWriter, FileWriter, LineKind, ReportSink};
use traffic_sim::types::TransferMode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = RunConfig::from_cli(Cli::parse());
    info!("Run configuration: {:?}", config);

    let started = Local::now();
    let progress = MultiProgress::new();
    let sink = ReportSink::new().with_writer(ConsoleWriter::new(progress.clone()));
    match FileWriter::create_in(&config.log_dir, &started) {
        Ok((writer, path)) => {
            sink.add_writer(writer);
            sink.emit(LineKind::Plain, format!("Logging to {}", path.display()));
        }
        Err(e) => {
            error!("Failed to create log file in {}: {}", config.log_dir.display(), e);
            eprintln!("{}", "Could not create log file, logging to console only".yellow());
        }
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    sink.emit(LineKind::Plain, "Loading target lists...");
    let websites = if config.skip_websites {
        Vec::new()
    } else {
        parse_targets(&config.websites_path, TransferMode::PageCrawl).await
    };
    let files = if config.skip_files {
        Vec::new()
    } else {
        parse_targets(&config.files_path, TransferMode::BulkFile).await
    };

    let public_ip = resolver::public_ip(&config.public_ip_endpoint, config.lookup_timeout).await;
    sink.emit(
        LineKind::Plain,
        format!("Public IP: {}", public_ip.as_deref().unwrap_or("N/A")),
    );

    let geo = IpApiGeo::new(config.geo_endpoint.clone(), config.lookup_timeout)
        .context("Failed to build geolocation client")?;
    let resolver = HostInfoResolver::new(Arc::new(SystemDns), Arc::new(geo), config.lookup_timeout);
    let downloader = Downloader::new(&config, progress).context("Failed to build HTTP client")?;

    let controller = RunController::new(config, downloader, resolver, sink, cancel);
    let summary = controller.run(websites, files).await?;
    info!(
        "Finished after {} iterations ({:?})",
        summary.iterations, summary.stop_reason
    );
    Ok(())
}
