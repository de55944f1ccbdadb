//! In-process request registry: request id → status, progress and terminal
//! result, with TTL eviction of finished requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use litscout_core::error::ProgressError;
use litscout_core::progress::ProgressSink;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::result::ResearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Started,
    Running,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub request_id: String,
    pub query: String,
    pub status: RequestStatus,
    pub progress: u8,
    pub step: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub result: Option<ResearchResult>,
    #[serde(skip)]
    touched: Instant,
}

/// Shared, cloneable handle to the registry.
#[derive(Clone)]
pub struct RequestRegistry {
    records: Arc<RwLock<HashMap<String, RequestRecord>>>,
    ttl: Duration,
}

impl RequestRegistry {
    /// Finished requests are evicted `ttl` after their last update.
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Register a new request and return its id.
    pub async fn start(&self, query: &str) -> String {
        let request_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let record = RequestRecord {
            request_id: request_id.clone(),
            query: query.to_string(),
            status: RequestStatus::Started,
            progress: 0,
            step: "Started".into(),
            created_at: now,
            updated_at: now,
            result: None,
            touched: Instant::now(),
        };
        self.records.write().await.insert(request_id.clone(), record);
        info!(request_id = %request_id, query, "Request registered");
        request_id
    }

    /// Record a progress update. Returns false for unknown requests.
    pub async fn update_progress(&self, request_id: &str, progress: u8, step: &str) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(request_id) else {
            return false;
        };
        if !record.status.is_terminal() {
            record.status = RequestStatus::Running;
        }
        record.progress = progress;
        record.step = step.to_string();
        record.updated_at = Utc::now();
        record.touched = Instant::now();
        true
    }

    /// Attach the terminal result. Returns false for unknown requests.
    pub async fn complete(&self, request_id: &str, result: ResearchResult) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(request_id) else {
            warn!(request_id, "Completing unknown request");
            return false;
        };
        record.status = if result.is_failed() {
            RequestStatus::Failed
        } else {
            RequestStatus::Completed
        };
        record.progress = 100;
        record.step = result.status.to_string();
        record.updated_at = Utc::now();
        record.touched = Instant::now();
        record.result = Some(result);
        true
    }

    pub async fn get(&self, request_id: &str) -> Option<RequestRecord> {
        self.records.read().await.get(request_id).cloned()
    }

    /// All records, oldest first.
    pub async fn list(&self) -> Vec<RequestRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub async fn remove(&self, request_id: &str) -> bool {
        self.records.write().await.remove(request_id).is_some()
    }

    /// Drop finished requests whose last update is older than the TTL.
    pub async fn evict_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !(r.status.is_terminal() && r.touched.elapsed() >= ttl));
        let evicted = before - records.len();
        if evicted > 0 {
            debug!(evicted, remaining = records.len(), "Evicted expired requests");
        }
        evicted
    }

    /// Evict expired requests every `every` until the handle is aborted.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                registry.evict_expired().await;
            }
        })
    }

    /// A [`ProgressSink`] that writes into this registry.
    pub fn sink(&self, request_id: &str) -> RegistrySink {
        RegistrySink {
            registry: self.clone(),
            request_id: request_id.to_string(),
            next: None,
        }
    }
}

pub struct RegistrySink {
    registry: RequestRegistry,
    request_id: String,
    next: Option<Arc<dyn ProgressSink>>,
}

impl RegistrySink {
    /// Also forward every update to `next`.
    pub fn forwarding(mut self, next: Option<Arc<dyn ProgressSink>>) -> Self {
        self.next = next;
        self
    }
}

#[async_trait]
impl ProgressSink for RegistrySink {
    async fn report(&self, progress: u8, step: &str) -> Result<(), ProgressError> {
        let known = self.registry.update_progress(&self.request_id, progress, step).await;
        if let Some(next) = &self.next {
            next.report(progress, step).await?;
        }
        if known {
            Ok(())
        } else {
            Err(ProgressError(format!("unknown request {}", self.request_id)))
        }
    }
}
