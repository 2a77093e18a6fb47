mod common;

use common::*;
use traffic_sim::downloader::Downloader;
use traffic_sim::types::{Target, TransferMode};

#[tokio::test]
async fn streamed_file_counts_every_byte() {
    let server = TestServer::new().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let downloader = Downloader::new(&config, hidden_progress()).unwrap();

    let target = Target::new(server.url("/files/10MB.bin"), TransferMode::BulkFile);
    let result = downloader.transfer(&target).await;

    assert!(result.succeeded(), "error: {:?}", result.error);
    assert_eq!(result.bytes_transferred, TEN_MB as u64);
    assert!(result.elapsed().as_secs_f64() > 0.0);
    assert!(is_empty_or_missing(downloader.scratch_dir()));
}

#[tokio::test]
async fn http_error_status_fails_and_cleans_up() {
    let server = TestServer::new().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let downloader = Downloader::new(&config, hidden_progress()).unwrap();

    for target in [
        Target::new(server.url("/files/nope.bin"), TransferMode::BulkFile),
        Target::new(server.url("/nope.html"), TransferMode::PageCrawl),
    ] {
        let result = downloader.transfer(&target).await;
        assert!(!result.succeeded());
        assert!(result.error.as_deref().unwrap().contains("404"));
        assert!(is_empty_or_missing(downloader.scratch_dir()));
    }
}

#[tokio::test]
async fn crawl_sums_base_and_sampled_pages() {
    let server = TestServer::new().await;
    let tmp = tempfile::tempdir().unwrap();

    for seed in 0..8 {
        let mut config = test_config(tmp.path());
        config.seed = Some(seed);
        let downloader = Downloader::new(&config, hidden_progress()).unwrap();

        let target = Target::new(server.url("/index.html"), TransferMode::PageCrawl);
        let result = downloader.transfer(&target).await;
        assert!(result.succeeded(), "error: {:?}", result.error);

        // Three links are sampled from; at least two are picked, and the
        // missing page contributes nothing.
        let base = INDEX.len() as u64;
        let allowed = [
            base + PAGE_A_LEN as u64,
            base + PAGE_B_LEN as u64,
            base + (PAGE_A_LEN + PAGE_B_LEN) as u64,
        ];
        assert!(
            allowed.contains(&result.bytes_transferred),
            "seed {} gave {} bytes",
            seed,
            result.bytes_transferred
        );
        assert!(is_empty_or_missing(downloader.scratch_dir()));
    }
}

#[tokio::test]
async fn malformed_url_fails_at_fetch_time() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let downloader = Downloader::new(&config, hidden_progress()).unwrap();

    for mode in [TransferMode::PageCrawl, TransferMode::BulkFile] {
        let result = downloader.transfer(&Target::new("not a url", mode)).await;
        assert!(!result.succeeded());
        assert_eq!(result.bytes_transferred, 0);
    }
}
