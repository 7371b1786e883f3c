use std::collections::VecDeque;

use actiontrail_core_types::TimestampMs;
use dom_model::MutationRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimedRecord {
    pub record: MutationRecord,
    pub at: TimestampMs,
}

/// Arrival-ordered buffer of raw mutation records.
///
/// There is no capacity bound; the correlator drains it on every action.
#[derive(Debug, Default)]
pub struct MutationBuffer {
    records: VecDeque<TimedRecord>,
}

impl MutationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: MutationRecord, at: TimestampMs) {
        self.records.push_back(TimedRecord { record, at });
    }

    pub fn observe_batch(&mut self, records: impl IntoIterator<Item = MutationRecord>, at: TimestampMs) {
        for record in records {
            self.observe(record, at);
        }
    }

    /// Records with `from < at <= to`, in arrival order.
    pub fn query(&self, from: TimestampMs, to: TimestampMs) -> Vec<TimedRecord> {
        self.records
            .iter()
            .filter(|entry| in_window(entry.at, from, to))
            .cloned()
            .collect()
    }

    pub fn drain(&mut self) -> Vec<TimedRecord> {
        self.records.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn in_window(at: TimestampMs, from: TimestampMs, to: TimestampMs) -> bool {
    at > from && at <= to
}

/// Keep the drained records that fall in `(from, to]`.
pub fn window(records: Vec<TimedRecord>, from: TimestampMs, to: TimestampMs) -> Vec<TimedRecord> {
    records
        .into_iter()
        .filter(|entry| in_window(entry.at, from, to))
        .collect()
}
