use ripple_scheduler::{FlushObserver, FlushReport, RunawayUpdate};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunawayRecord {
    pub subscriber: u64,
    pub description: String,
    pub count: u32,
}

impl From<&RunawayUpdate> for RunawayRecord {
    fn from(update: &RunawayUpdate) -> Self {
        Self {
            subscriber: update.id.0,
            description: update.description.clone(),
            count: update.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushRecord {
    pub timestamp: f64,
    pub ran: Vec<u64>,
    pub skipped: Vec<u64>,
    pub runaway: Option<RunawayRecord>,
}

impl From<&FlushReport> for FlushRecord {
    fn from(report: &FlushReport) -> Self {
        Self {
            timestamp: report.timestamp,
            ran: report.ran.iter().map(|id| id.0).collect(),
            skipped: report.skipped.iter().map(|id| id.0).collect(),
            runaway: report.runaway.as_ref().map(RunawayRecord::from),
        }
    }
}

/// Keeps the most recent flushes for inspection. Attach it with
/// `SchedulerBuilder::observer`.
pub struct FlushLog {
    records: RefCell<VecDeque<FlushRecord>>,
    capacity: usize,
}

impl FlushLog {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Oldest records are evicted once `capacity` is reached.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RefCell::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest first.
    pub fn records(&self) -> Vec<FlushRecord> {
        self.records.borrow().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    pub fn export_state(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.records.borrow())
    }
}

impl Default for FlushLog {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushObserver for FlushLog {
    fn flushed(&self, report: &FlushReport) {
        let mut records = self.records.borrow_mut();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(FlushRecord::from(report));
        tracing::trace!(recorded = records.len(), "flush recorded");
    }
}
