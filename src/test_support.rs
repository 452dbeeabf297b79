//! In-memory doubles for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::download::{DownloadError, FileSink, check_destination};
use crate::report::{Reporter, StatusEvent};
use crate::search::{Identity, ResultRecord, SearchError, SearchProvider};

type Scripted = Result<Vec<ResultRecord>, SearchError>;

/// One recorded provider call.
#[derive(Debug, Clone)]
pub(crate) enum ProviderCall {
    Search {
        phrase: String,
        identity: Identity,
        at: Instant,
    },
    Cluster {
        cluster_id: String,
        identity: Identity,
        at: Instant,
    },
}

impl ProviderCall {
    pub(crate) fn at(&self) -> Instant {
        match self {
            Self::Search { at, .. } | Self::Cluster { at, .. } => *at,
        }
    }
}

/// Provider answering from queued responses; an exhausted queue answers empty.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProvider {
    searches: Mutex<VecDeque<Scripted>>,
    clusters: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_search(self, response: Scripted) -> Self {
        self.searches.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn with_cluster(self, response: Scripted) -> Self {
        self.clusters.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(
        &self,
        phrase: &str,
        _page_size: usize,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        self.calls.lock().unwrap().push(ProviderCall::Search {
            phrase: phrase.to_string(),
            identity: identity.clone(),
            at: Instant::now(),
        });
        self.searches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn search_cluster(
        &self,
        cluster_id: &str,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        self.calls.lock().unwrap().push(ProviderCall::Cluster {
            cluster_id: cluster_id.to_string(),
            identity: identity.clone(),
            at: Instant::now(),
        });
        self.clusters
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Reporter that keeps every event.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &StatusEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Sink that checks destinations on the real file system but only records writes.
#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    writes: Mutex<Vec<(String, PathBuf)>>,
}

impl MemorySink {
    pub(crate) fn writes(&self) -> Vec<(String, PathBuf)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSink for MemorySink {
    fn check_destination(&self, path: &Path) -> Result<(), DownloadError> {
        check_destination(path, false)
    }

    async fn write(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        self.writes
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf()));
        Ok(4)
    }
}
