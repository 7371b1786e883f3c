//! Collector stand-in that prints summaries instead of posting them.

use std::io::Write;

use actiontrail_core_types::SummaryEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use trail_coordinator::{CollectorTransport, TransportResult};
use url::Url;

#[derive(Serialize)]
struct Line<'a> {
    endpoint: &'a str,
    summary: &'a SummaryEvent,
}

/// Writes one JSON document per delivered summary.
pub struct JsonLinesTransport {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesTransport {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

#[async_trait]
impl CollectorTransport for JsonLinesTransport {
    async fn deliver(&self, endpoint: &Url, summary: &SummaryEvent) -> TransportResult<()> {
        let line = serde_json::to_string(&Line {
            endpoint: endpoint.as_str(),
            summary,
        })?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actiontrail_core_types::{ActionTarget, ActionType, EventPayload};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_one_line_per_summary() {
        let buffer = Shared::default();
        let transport = JsonLinesTransport::new(Box::new(buffer.clone()));
        let endpoint = Url::parse("http://127.0.0.1:4934/action-data").unwrap();
        let summary = SummaryEvent::new(
            ActionType::Click,
            42,
            ActionTarget::default(),
            EventPayload::empty(),
            String::new(),
        );
        transport.deliver(&endpoint, &summary).await.unwrap();
        transport.deliver(&endpoint, &summary).await.unwrap();

        let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["summary"]["type"], "click");
        assert_eq!(parsed["summary"]["actionTimestamp"], 42);
    }
}
