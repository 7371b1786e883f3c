use std::time::Duration;

use actiontrail_core_types::SummaryEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::Notify;
use url::Url;

use crate::errors::{TransportError, TransportResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One-way delivery of accepted summaries.
#[async_trait]
pub trait CollectorTransport: Send + Sync {
    async fn deliver(&self, endpoint: &Url, summary: &SummaryEvent) -> TransportResult<()>;
}

/// JSON POST to the collector. No retries.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> TransportResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> TransportResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CollectorTransport for HttpTransport {
    async fn deliver(&self, endpoint: &Url, summary: &SummaryEvent) -> TransportResult<()> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(summary)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Keeps delivered summaries in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    delivered: Mutex<Vec<(Url, SummaryEvent)>>,
    notify: Notify,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<SummaryEvent> {
        self.delivered
            .lock()
            .iter()
            .map(|(_, summary)| summary.clone())
            .collect()
    }

    pub fn endpoints(&self) -> Vec<Url> {
        self.delivered
            .lock()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    /// Wait until at least `count` summaries arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<SummaryEvent> {
        loop {
            let notified = self.notify.notified();
            let delivered = self.delivered();
            if delivered.len() >= count {
                return delivered;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl CollectorTransport for MemoryTransport {
    async fn deliver(&self, endpoint: &Url, summary: &SummaryEvent) -> TransportResult<()> {
        self.delivered
            .lock()
            .push((endpoint.clone(), summary.clone()));
        self.notify.notify_waiters();
        Ok(())
    }
}
