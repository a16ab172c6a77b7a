//! Shared test helpers: a scripted in-memory fetcher and downloader constructors.

use crate::config::Config;
use crate::downloader::AttachmentDownloader;
use crate::error::RetrievalError;
use crate::fetcher::{FetchedBody, Fetcher};
use crate::types::{DownloadJob, Event};
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// What the fake host answers for one request
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// 200 with this body
    Body(Vec<u8>),
    /// 200 with this body after a delay
    Slow(Duration, Vec<u8>),
    /// Non-success status
    Status(u16),
    /// Body shorter than the announced length
    Truncated { announced: u64, body: Vec<u8> },
}

/// In-memory [`Fetcher`] answering from a script and recording every request
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    /// Replies per URL, consumed front to back; the last one repeats
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Script replies for a URL
    pub(crate) fn on(self, url: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
        self
    }

    /// URLs requested so far, in request order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, RetrievalError> {
        self.calls.lock().unwrap().push(url.to_string());

        match self.next_reply(url) {
            Some(Reply::Body(body)) => Ok(FetchedBody::from_chunks(vec![Bytes::from(body)])),
            Some(Reply::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(FetchedBody::from_chunks(vec![Bytes::from(body)]))
            }
            Some(Reply::Status(status)) => Err(RetrievalError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Reply::Truncated { announced, body }) => Ok(FetchedBody {
                content_length: Some(announced),
                stream: futures::stream::iter(vec![Ok(Bytes::from(body))]).boxed(),
            }),
            None => Err(RetrievalError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Downloader writing into a fresh temp dir, with the given config tweaks applied.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    fetcher: Arc<ScriptedFetcher>,
    tweak: impl FnOnce(&mut Config),
) -> (AttachmentDownloader, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        output_dir: temp_dir.path().join("attachments"),
        ..Default::default()
    };
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.jitter = false;
    tweak(&mut config);

    std::fs::create_dir_all(&config.output_dir).unwrap();
    let downloader = AttachmentDownloader::with_fetcher(config, fetcher).unwrap();
    (downloader, temp_dir)
}

pub(crate) fn job(owner: &str, attachment: &str, position: usize, url: &str) -> DownloadJob {
    DownloadJob {
        owner_id: owner.to_string(),
        attachment_id: attachment.to_string(),
        position,
        source_url: url.to_string(),
    }
}

/// Drain every event currently buffered on a receiver
pub(crate) fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
