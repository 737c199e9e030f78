use crate::hooks::{LifecycleHooks, invoke_hook};
use crate::owner::{OwnerId, Owners};
use ripple_tick::NextTick;
use smallvec::SmallVec;

pub type ActivationSnapshot = SmallVec<[OwnerId; 4]>;

/// Owners reactivated during a drain. Their hooks fire once the drain is over.
#[derive(Debug, Default)]
pub struct ActivationQueue {
    owners: ActivationSnapshot,
}

impl ActivationQueue {
    /// Clears the inactive flag right away so code running in the same drain
    /// already sees the owner as active.
    pub fn record(&mut self, owner: OwnerId, owners: &Owners) {
        owners.set_inactive(owner, false);
        self.owners.push(owner);
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn take(&mut self) -> ActivationSnapshot {
        std::mem::take(&mut self.owners)
    }

    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

/// Insertion order. Each owner is flagged inactive first so the subtree activation
/// walk below treats it as a fresh activation. A failing hook is reported through
/// `tick` and the remaining owners are still notified.
pub fn flush_activations(
    snapshot: &[OwnerId],
    owners: &Owners,
    hooks: &dyn LifecycleHooks,
    tick: &NextTick,
) {
    for &owner in snapshot {
        if !owners.is_live(owner) {
            continue;
        }
        owners.set_inactive(owner, true);
        for notified in owners.mark_activated(owner, true) {
            invoke_hook(tick, "activated", || hooks.activated(notified));
        }
    }
}
