use actiontrail_core_types::TimestampMs;
use dom_model::NodeKey;

/// A click waiting to find out whether it becomes a double click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingClick {
    pub generation: u64,
    pub origin: NodeKey,
    pub at: TimestampMs,
}

/// What the caller must do with its timers after a click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickArm {
    pub generation: u64,
    pub fire_at: TimestampMs,
    /// Timer of the click this one replaced.
    pub cancelled: Option<u64>,
}

/// Single/double click disambiguation by generation counter.
#[derive(Debug)]
pub struct ClickDebouncer {
    delay_ms: u64,
    generation: u64,
    pending: Option<PendingClick>,
}

impl ClickDebouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            generation: 0,
            pending: None,
        }
    }

    /// Arm (or re-arm) the single-click timer.
    pub fn click(&mut self, origin: NodeKey, at: TimestampMs) -> ClickArm {
        let cancelled = self.pending.take().map(|pending| pending.generation);
        self.generation += 1;
        self.pending = Some(PendingClick {
            generation: self.generation,
            origin,
            at,
        });
        ClickArm {
            generation: self.generation,
            fire_at: at + self.delay_ms,
            cancelled,
        }
    }

    /// A double click swallows the pending single click.
    pub fn double_click(&mut self) -> Option<u64> {
        self.pending.take().map(|pending| pending.generation)
    }

    /// Timer expiry; stale generations yield nothing.
    pub fn fire(&mut self, generation: u64) -> Option<PendingClick> {
        match self.pending {
            Some(pending) if pending.generation == generation => self.pending.take(),
            _ => None,
        }
    }

    pub fn reset(&mut self) -> Option<u64> {
        self.pending.take().map(|pending| pending.generation)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
