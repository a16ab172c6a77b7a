//! Test environment: a mock attachment host plus a temporary working directory

use board_attachments::{AttachmentDownloader, Config};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock host serving attachments, and a scratch directory holding export and output
pub struct TestEnv {
    pub server: MockServer,
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Absolute URL of a path on the mock host
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The output root a run writes into
    pub fn output_root(&self) -> PathBuf {
        self.dir().join("attachments")
    }

    /// Serve `body` with status 200 at `route`
    pub async fn serve(&self, route: &str, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `route` with a bare status code
    pub async fn fail(&self, route: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Test config: output root inside the temp dir, short timeouts
    pub fn config(&self) -> Config {
        let mut config = Config {
            output_dir: self.output_root(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        config.retry.initial_delay = Duration::from_millis(10);
        config.retry.jitter = false;
        config
    }

    pub fn downloader(&self, config: Config) -> AttachmentDownloader {
        std::fs::create_dir_all(&config.output_dir).unwrap();
        AttachmentDownloader::new(config).unwrap()
    }

    /// URLs requested from the mock host, in order
    pub async fn requested_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}
