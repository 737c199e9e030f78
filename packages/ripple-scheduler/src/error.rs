use crate::owner::OwnerId;
use crate::subscriber::SubscriberId;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("a flush is already in progress")]
    AlreadyFlushing,
    #[error("invalid scheduler config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Diagnostic for a subscriber that kept re-dirtying itself within one flush.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("you may have an infinite update loop {description}")]
pub struct RunawayUpdate {
    pub id: SubscriberId,
    pub owner: Option<OwnerId>,
    pub description: String,
    pub count: u32,
}
