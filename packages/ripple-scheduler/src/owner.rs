use crate::hooks::LifecycleHooks;
use crate::subscriber::SubscriberId;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    pub struct OwnerId;
}

/// A composite node that owns subscribers, e.g. a component instance.
#[derive(Debug, Default, Clone)]
pub struct Owner {
    pub parent: Option<OwnerId>,
    pub children: SmallVec<[OwnerId; 4]>,
    /// The subscriber whose settling stands for the whole owner.
    pub render_subscriber: Option<SubscriberId>,
    pub mounted: bool,
    pub destroyed: bool,
    /// `None` until the owner has been activated or deactivated once.
    pub inactive: Option<bool>,
    pub direct_inactive: bool,
}

/// Shared owner registry. Clones refer to the same registry.
#[derive(Debug, Default, Clone)]
pub struct Owners {
    nodes: Rc<RefCell<SlotMap<OwnerId, Owner>>>,
}

impl Owners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owners must be created ancestor-first; subscriber ids rely on it.
    pub fn create(&self, parent: Option<OwnerId>) -> OwnerId {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.insert(Owner {
            parent,
            ..Owner::default()
        });
        if let Some(parent) = parent {
            if let Some(node) = nodes.get_mut(parent) {
                node.children.push(id);
            }
        }
        id
    }

    pub fn get(&self, owner: OwnerId) -> Option<Owner> {
        self.nodes.borrow().get(owner).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_render_subscriber(&self, owner: OwnerId, subscriber: SubscriberId) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(owner) {
            node.render_subscriber = Some(subscriber);
        }
    }

    pub fn mark_mounted(&self, owner: OwnerId) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(owner) {
            node.mounted = true;
        }
    }

    /// Marks `owner` and its subtree destroyed. Entries stay in the registry so
    /// stale references still resolve to a dead owner.
    pub fn destroy(&self, owner: OwnerId) {
        let mut nodes = self.nodes.borrow_mut();
        let mut stack = vec![owner];
        while let Some(id) = stack.pop() {
            if let Some(node) = nodes.get_mut(id) {
                if !node.destroyed {
                    node.destroyed = true;
                    stack.extend(node.children.iter().copied());
                }
            }
        }
    }

    /// Drops the entry entirely.
    pub fn remove(&self, owner: OwnerId) -> Option<Owner> {
        self.nodes.borrow_mut().remove(owner)
    }

    pub fn is_live(&self, owner: OwnerId) -> bool {
        self.nodes
            .borrow()
            .get(owner)
            .is_some_and(|node| !node.destroyed)
    }

    pub fn is_mounted(&self, owner: OwnerId) -> bool {
        self.nodes.borrow().get(owner).is_some_and(|node| node.mounted)
    }

    pub fn inactive(&self, owner: OwnerId) -> Option<bool> {
        self.nodes.borrow().get(owner).and_then(|node| node.inactive)
    }

    pub(crate) fn set_inactive(&self, owner: OwnerId, inactive: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(owner) {
            node.inactive = Some(inactive);
        }
    }

    /// True when `subscriber` is the canonical subscriber of a mounted, live owner.
    pub fn settles(&self, owner: OwnerId, subscriber: SubscriberId) -> bool {
        self.nodes.borrow().get(owner).is_some_and(|node| {
            node.render_subscriber == Some(subscriber) && node.mounted && !node.destroyed
        })
    }

    pub fn is_in_inactive_tree(&self, owner: OwnerId) -> bool {
        in_inactive_tree(&self.nodes.borrow(), owner)
    }

    /// Reactivates `owner` and its subtree; `activated` fires children first.
    pub fn activate(&self, owner: OwnerId, direct: bool, hooks: &dyn LifecycleHooks) {
        for owner in self.mark_activated(owner, direct) {
            hooks.activated(owner);
        }
    }

    /// Flags the subtree active and returns the owners to notify, children first.
    pub(crate) fn mark_activated(&self, owner: OwnerId, direct: bool) -> Vec<OwnerId> {
        let mut notify = Vec::new();
        activate_in(&mut self.nodes.borrow_mut(), owner, direct, &mut notify);
        notify
    }

    /// Suspends `owner` and its subtree; `deactivated` fires children first.
    pub fn deactivate(&self, owner: OwnerId, direct: bool, hooks: &dyn LifecycleHooks) {
        let mut notify = Vec::new();
        deactivate_in(&mut self.nodes.borrow_mut(), owner, direct, &mut notify);
        for owner in notify {
            hooks.deactivated(owner);
        }
    }
}

fn in_inactive_tree(nodes: &SlotMap<OwnerId, Owner>, owner: OwnerId) -> bool {
    let mut current = nodes.get(owner).and_then(|node| node.parent);
    while let Some(id) = current {
        let Some(node) = nodes.get(id) else {
            return false;
        };
        if node.inactive == Some(true) {
            return true;
        }
        current = node.parent;
    }
    false
}

fn activate_in(
    nodes: &mut SlotMap<OwnerId, Owner>,
    owner: OwnerId,
    direct: bool,
    notify: &mut Vec<OwnerId>,
) {
    let Some(node) = nodes.get_mut(owner) else {
        return;
    };
    if node.destroyed {
        return;
    }
    if direct {
        node.direct_inactive = false;
        if in_inactive_tree(nodes, owner) {
            return;
        }
    } else if node.direct_inactive {
        return;
    }

    let Some(node) = nodes.get_mut(owner) else {
        return;
    };
    if node.inactive != Some(false) {
        node.inactive = Some(false);
        let children = node.children.clone();
        for child in children {
            activate_in(nodes, child, false, notify);
        }
        notify.push(owner);
    }
}

fn deactivate_in(
    nodes: &mut SlotMap<OwnerId, Owner>,
    owner: OwnerId,
    direct: bool,
    notify: &mut Vec<OwnerId>,
) {
    let Some(node) = nodes.get_mut(owner) else {
        return;
    };
    if node.destroyed {
        return;
    }
    if direct {
        node.direct_inactive = true;
        if in_inactive_tree(nodes, owner) {
            return;
        }
    }

    let Some(node) = nodes.get_mut(owner) else {
        return;
    };
    if node.inactive != Some(true) {
        node.inactive = Some(true);
        let children = node.children.clone();
        for child in children {
            deactivate_in(nodes, child, false, notify);
        }
        notify.push(owner);
    }
}
