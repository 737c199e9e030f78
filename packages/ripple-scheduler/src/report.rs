use crate::error::RunawayUpdate;
use crate::subscriber::SubscriberId;

/// What one flush did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Shared by every subscriber processed in the flush.
    pub timestamp: f64,
    /// Run order, repeats included.
    pub ran: Vec<SubscriberId>,
    /// Dequeued without running: torn down, or owner destroyed.
    pub skipped: Vec<SubscriberId>,
    /// Set when the flush stopped early.
    pub runaway: Option<RunawayUpdate>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.ran.is_empty() && self.skipped.is_empty()
    }

    pub fn aborted(&self) -> bool {
        self.runaway.is_some()
    }
}
