// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-interval feed polling with sequence-numbered results.
//!
//! Every tick starts a new fetch without waiting for the previous one, so a
//! slow request never delays the schedule. Each fetch carries a sequence
//! number; a result that arrives after a newer result has already been
//! delivered is discarded instead of overwriting fresher data. Failures do
//! not stop the schedule.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::protocol::{ParseError, Protocol, Snapshot, StatesParser};

/// Default feed endpoint.
pub const DEFAULT_FEED_URL: &str = "https://opensky-network.org/api/states/all";

/// Errors from a single poll. All of them are network-level failures from
/// the caller's point of view.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("could not decode feed: {0}")]
    Decode(#[from] ParseError),
}

/// Something that can produce a snapshot on demand.
pub trait StateSource: Send + Sync + 'static {
    /// Fetch the current snapshot.
    ///
    /// `Ok(None)` means the feed answered but had no states to report.
    fn fetch(&self) -> impl Future<Output = Result<Option<Snapshot>, FeedError>> + Send;
}

/// HTTP source for OpenSky-style JSON documents.
#[derive(Debug)]
pub struct HttpStateSource {
    client: reqwest::Client,
    url: watch::Sender<String>,
}

impl HttpStateSource {
    /// Create a source for `url` with the given per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("opensky-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (url, _) = watch::channel(url.into());
        Ok(Self { client, url })
    }

    /// Change the feed URL. Takes effect on the next poll.
    pub fn set_url(&self, url: String) {
        info!("Feed URL changed to {}", url);
        self.url.send_replace(url);
    }

    #[must_use]
    pub fn current_url(&self) -> String {
        self.url.borrow().clone()
    }

    async fn fetch_document(&self) -> Result<Option<Snapshot>, FeedError> {
        let url = self.current_url();
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let mut parser = StatesParser::new();
        Ok(parser.parse(&body)?)
    }
}

impl StateSource for HttpStateSource {
    fn fetch(&self) -> impl Future<Output = Result<Option<Snapshot>, FeedError>> + Send {
        self.fetch_document()
    }
}

/// Shortest accepted time between poll starts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the poller.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between poll starts, at least [`MIN_POLL_INTERVAL`].
    pub interval: Duration,
    /// Channel buffer size for poll events.
    pub buffer_size: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            buffer_size: 16,
        }
    }
}

/// Events emitted by the poller, in delivery order.
#[derive(Debug)]
pub enum PollEvent {
    /// A fresh snapshot.
    Snapshot { seq: u64, snapshot: Snapshot },
    /// The feed answered without any states.
    NoData { seq: u64 },
    /// The poll failed. The schedule continues.
    Failed { seq: u64, error: String },
    /// A result arrived after a newer one and was dropped.
    Discarded { seq: u64 },
}

impl PollEvent {
    #[must_use]
    pub fn seq(&self) -> u64 {
        match self {
            Self::Snapshot { seq, .. }
            | Self::NoData { seq }
            | Self::Failed { seq, .. }
            | Self::Discarded { seq } => *seq,
        }
    }
}

/// Monotonic poll numbering and staleness check.
#[derive(Debug, Default)]
pub struct PollSequence {
    started: u64,
    delivered: Option<u64>,
}

impl PollSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next poll.
    pub fn begin(&mut self) -> u64 {
        self.started += 1;
        self.started
    }

    /// Decide whether the result of poll `seq` may be delivered.
    ///
    /// Returns `false` if a result of the same or a newer poll was already
    /// delivered.
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.delivered.is_some_and(|last| seq <= last) {
            return false;
        }
        self.delivered = Some(seq);
        true
    }

    #[must_use]
    pub fn latest_started(&self) -> u64 {
        self.started
    }

    #[must_use]
    pub fn last_delivered(&self) -> Option<u64> {
        self.delivered
    }
}

/// Handle to a background polling task.
///
/// The task stops when [`Poller::shutdown`] is called or the handle is
/// dropped. In-flight fetches are cancelled with it.
pub struct Poller<S> {
    event_rx: mpsc::Receiver<PollEvent>,
    source: Arc<S>,
    cancel_token: CancellationToken,
}

impl<S> std::fmt::Debug for Poller<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl<S: StateSource> Poller<S> {
    /// Spawn the polling task. The first poll starts immediately.
    ///
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    #[must_use]
    pub fn spawn(source: S, config: PollConfig) -> Self {
        let interval = if config.interval < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} too short, using {:?}",
                config.interval, MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            config.interval
        };

        let source = Arc::new(source);
        let (event_tx, event_rx) = mpsc::channel(config.buffer_size.max(1));
        let cancel_token = CancellationToken::new();

        tokio::spawn(poll_loop(
            Arc::clone(&source),
            event_tx,
            cancel_token.clone(),
            interval,
        ));

        Self {
            event_rx,
            source,
            cancel_token,
        }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the poller has shut down.
    pub async fn recv(&mut self) -> Option<PollEvent> {
        self.event_rx.recv().await
    }

    /// The source being polled.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stop polling.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl<S> Drop for Poller<S> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

type FetchResult = (u64, Result<Option<Snapshot>, FeedError>);

async fn poll_loop<S: StateSource>(
    source: Arc<S>,
    event_tx: mpsc::Sender<PollEvent>,
    cancel_token: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<FetchResult>();
    let mut sequence = PollSequence::new();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Poller cancelled");
                return;
            }

            _ = ticker.tick() => {
                let seq = sequence.begin();
                debug!("Starting poll #{}", seq);

                let source = Arc::clone(&source);
                let result_tx = result_tx.clone();
                let task_cancel = cancel_token.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        result = source.fetch() => {
                            let _ = result_tx.send((seq, result));
                        }
                        () = task_cancel.cancelled() => {}
                    }
                });
            }

            Some((seq, result)) = result_rx.recv() => {
                let event = if sequence.accept(seq) {
                    match result {
                        Ok(Some(snapshot)) => {
                            debug!("Poll #{} returned {} states", seq, snapshot.len());
                            PollEvent::Snapshot { seq, snapshot }
                        }
                        Ok(None) => PollEvent::NoData { seq },
                        Err(e) => {
                            error!("Poll #{} failed: {}", seq, e);
                            PollEvent::Failed { seq, error: e.to_string() }
                        }
                    }
                } else {
                    debug!(
                        "Discarding result of poll #{} (newer result already delivered)",
                        seq
                    );
                    PollEvent::Discarded { seq }
                };

                if event_tx.send(event).await.is_err() {
                    return; // Receiver dropped
                }
            }
        }
    }
}
