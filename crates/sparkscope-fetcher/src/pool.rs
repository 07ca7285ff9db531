//! Bounded-concurrency JSON fetching from the history server.
//!
//! Each worker owns its own `reqwest::Client`, so keep-alive connections
//! (and their TLS sessions) are reused across that worker's requests. Work is
//! pulled from one shared queue; the batch call returns only after every URL
//! has either produced a JSON body or been recorded as "no data".

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use sparkscope_core::KeyCodec;
use sparkscope_core::config::HistoryServerConfig;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, trace, warn};

use crate::error::{FetchError, FetchResult};

/// A fetched body, or `None` when the request failed in any way.
pub type Payload = Option<Value>;

/// Payloads keyed by the resource key derived from each URL.
pub type FetchResults = BTreeMap<String, Payload>;

/// How a URL is turned into its result key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// `{base}/{app_id}/...` keyed by `app_id`.
    ByApp,
    /// `{base}/{app_id}/stages/{n}/...` keyed by `app_id_n`.
    ByStage,
}

pub struct FetchPool {
    clients: Vec<Client>,
    codec: KeyCodec,
}

impl FetchPool {
    pub fn new(config: &HistoryServerConfig) -> FetchResult<Self> {
        let codec =
            KeyCodec::new(&config.base_url).map_err(|e| FetchError::BaseUrl(e.to_string()))?;
        let clients = (0..config.worker_pool_size.max(1))
            .map(|_| build_client(config))
            .collect::<FetchResult<Vec<_>>>()?;
        if !config.verify_certificates {
            warn!(base_url = %config.base_url, "TLS certificate verification disabled");
        }
        debug!(workers = clients.len(), "fetch pool ready");
        Ok(Self { clients, codec })
    }

    pub fn workers(&self) -> usize {
        self.clients.len()
    }

    /// Fetch a single URL on the first worker's connection.
    pub async fn fetch(&self, url: &str) -> Payload {
        let client = self.clients.first()?;
        get_json(client, url).await
    }

    /// Fetch every URL concurrently and wait for all of them.
    ///
    /// Every URL whose key can be derived gets an entry; URLs without a
    /// derivable key are skipped.
    pub async fn fetch_all(&self, urls: Vec<String>, mode: KeyMode) -> FetchResults {
        let mut results = FetchResults::new();
        let mut queue = VecDeque::with_capacity(urls.len());
        for url in urls {
            let key = match mode {
                KeyMode::ByApp => self.codec.app_id_from_url(&url),
                KeyMode::ByStage => self.codec.stage_key_from_url(&url),
            };
            match key {
                Some(key) => {
                    results.insert(key.clone(), None);
                    queue.push_back((key, url));
                }
                None => warn!(%url, ?mode, "no resource key in url, skipping"),
            }
        }
        if queue.is_empty() {
            return results;
        }

        let requested = queue.len();
        let workers = self.clients.len().min(requested);
        let queue = Arc::new(Mutex::new(queue));
        let mut set = JoinSet::new();
        for client in self.clients.iter().take(workers).cloned() {
            let queue = Arc::clone(&queue);
            set.spawn(async move {
                let mut fetched = Vec::new();
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((key, url)) = next else { break };
                    let payload = get_json(&client, &url).await;
                    fetched.push((key, payload));
                }
                fetched
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(fetched) => results.extend(fetched),
                Err(e) => error!(error = %e, "fetch worker panicked"),
            }
        }

        let received = results.values().filter(|p| p.is_some()).count();
        debug!(?mode, requested, received, workers, "fetch batch complete");
        results
    }
}

fn build_client(config: &HistoryServerConfig) -> FetchResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .danger_accept_invalid_certs(!config.verify_certificates)
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

async fn get_json(client: &Client, url: &str) -> Payload {
    trace!(%url, "GET");
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(%url, error = %e, "no data: request failed");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(%url, %status, "no data: unexpected status");
        return None;
    }

    match response.json::<Value>().await {
        Ok(body) => {
            trace!(%url, %status, "response");
            Some(body)
        }
        Err(e) => {
            warn!(%url, error = %e, "no data: body is not JSON");
            None
        }
    }
}
