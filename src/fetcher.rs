//! Retrieval of attachment bodies.
//!
//! [`Fetcher`] is the seam between the downloader and the network; the production
//! implementation is [`HttpFetcher`], tests substitute in-memory fetchers.

use crate::config::Config;
use crate::error::{Error, RetrievalError};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;

/// A response body ready to be streamed to disk
pub struct FetchedBody {
    /// Length announced by the remote host, if any
    pub content_length: Option<u64>,
    /// Body chunks in order
    pub stream: BoxStream<'static, Result<Bytes, RetrievalError>>,
}

impl FetchedBody {
    /// Body made of in-memory chunks (length announced as their sum)
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        let content_length = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            content_length: Some(content_length),
            stream: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
        }
    }
}

impl std::fmt::Debug for FetchedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Abstraction over fetching a URL, enabling testability.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Start retrieving `url`; a non-success status is an error
    async fn fetch(&self, url: &str) -> Result<FetchedBody, RetrievalError>;
}

/// Production [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with the configured timeouts and user agent
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one carrying credentials for private attachments
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, RetrievalError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RetrievalError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        let owned_url = url.to_string();
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| RetrievalError::from_reqwest(&owned_url, &e)))
            .boxed();

        Ok(FetchedBody {
            content_length,
            stream,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collect(body: FetchedBody) -> Vec<u8> {
        body.stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fetches_body_and_length() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        let body = fetcher
            .fetch(&format!("{}/files/img.png", server.uri()))
            .await
            .unwrap();

        assert_eq!(body.content_length, Some(9));
        assert_eq!(collect(body).await, b"png-bytes");
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_its_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing.png", server.uri()))
            .await
            .unwrap_err();

        assert!(
            matches!(err, RetrievalError::Status { status: 404, .. }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = Config {
            request_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow.bin", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        // Port 9 (discard) on localhost is expected to refuse connections
        let err = fetcher.fetch("http://127.0.0.1:9/x.png").await.unwrap_err();

        assert!(
            matches!(
                err,
                RetrievalError::Network { .. } | RetrievalError::Timeout { .. }
            ),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn configured_user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "board-attachments-test/1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let config = Config {
            user_agent: "board-attachments-test/1".to_string(),
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let body = fetcher.fetch(&format!("{}/a", server.uri())).await.unwrap();

        assert_eq!(collect(body).await, b"ok");
    }

    #[tokio::test]
    async fn caller_supplied_client_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"private".to_vec()))
            .mount(&server)
            .await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_static("Bearer token"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap();
        let fetcher = HttpFetcher::with_client(client);

        let body = fetcher
            .fetch(&format!("{}/private.bin", server.uri()))
            .await
            .unwrap();

        assert_eq!(collect(body).await, b"private");
    }

    #[tokio::test]
    async fn in_memory_bodies_announce_their_length() {
        let body = FetchedBody::from_chunks(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"c")]);

        assert_eq!(body.content_length, Some(3));
        assert_eq!(collect(body).await, b"abc");
    }
}
