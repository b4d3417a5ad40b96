//! The preemption pass (`spec.md` §4.8, §9 "Snapshot").
//!
//! One single step: check the trigger condition, build a short-lived
//! read-only snapshot of the live tree, then run the registered policy
//! chain against the snapshot. The default (and currently only) policy is
//! Dominant Resource Fairness — see [`drf`].

pub mod drf;
pub mod snapshot;

pub use snapshot::{PreemptionContext, PreemptionQueueContext, QueuePreemptCalcResource};

use crate::queue::QueueTree;
use crate::resource::Resource;

/// A pluggable preemption policy, run once per pass against the snapshot
/// built in Step B (`spec.md` §9 "Pluggable sorters & preemption
/// policies").
pub trait PreemptionPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, snapshot: &mut PreemptionContext, total_capacity: &Resource);
}

/// Step A: skip the pass unless some leaf both has pending demand and is
/// using below its guaranteed share. A conservative check — false
/// positives only cost a cheap pass (`spec.md` §4.8 step A).
pub fn needs_preemption(tree: &QueueTree) -> bool {
    tree.live_ids().any(|id| {
        let node = tree.node(id);
        if !node.is_leaf() {
            return false;
        }
        let guaranteed = node.cache.guaranteed.clone().unwrap_or_default();
        !node.sched.pending.is_zero() && node.assumed_allocated().le(&guaranteed)
    })
}

/// Run one full preemption pass: trigger check, snapshot, policy chain.
/// Returns `None` if the trigger condition is not met (`spec.md` §4.8).
pub fn run_pass(
    tree: &QueueTree,
    total_capacity: &Resource,
    policies: &[Box<dyn PreemptionPolicy>],
) -> Option<PreemptionContext> {
    if !needs_preemption(tree) {
        return None;
    }
    let mut snap = snapshot::build(tree);
    for policy in policies {
        policy.run(&mut snap, total_capacity);
    }
    Some(snap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueKind, QueueRole};

    #[test]
    fn trigger_requires_pending_and_under_guaranteed() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let leaf = tree
            .add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("memory", 100)), None)
            .unwrap();
        assert!(!needs_preemption(&tree));

        tree.inc_pending(leaf, &Resource::single("memory", 10));
        assert!(needs_preemption(&tree));
    }

    #[test]
    fn trigger_is_false_when_leaf_already_above_guaranteed() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let leaf = tree
            .add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("memory", 100)), None)
            .unwrap();
        tree.inc_pending(leaf, &Resource::single("memory", 10));
        tree.set_allocated(leaf, Resource::single("memory", 150));
        assert!(!needs_preemption(&tree));
    }
}
