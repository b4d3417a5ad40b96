//! The preemption snapshot: a short-lived, thread-confined mirror of the
//! live queue tree (`spec.md` §3 "Preemption snapshot", §9 "Snapshot").
//!
//! Structure (parent links, paths, leaf/parent role) is copied by value
//! since it is immutable for the duration of a pass; only the numeric
//! scheduling state that the policy chain mutates gets its own storage —
//! `guaranteed`/`max` are cloned once and never written to again.

use std::collections::HashMap;

use crate::ids::QueueId;
use crate::queue::QueueTree;
use crate::resource::Resource;

/// Per-queue working numbers for the DRF pass (`spec.md` §3).
#[derive(Debug, Clone, Default)]
pub struct QueuePreemptCalcResource {
    pub guaranteed: Resource,
    pub used: Resource,
    pub pending: Resource,
    pub max: Option<Resource>,
    pub ideal: Resource,
    pub marked_preempted: Resource,
    pub preemptable: Resource,
}

#[derive(Debug, Clone)]
pub struct PreemptionQueueContext {
    pub queue: QueueId,
    pub path: String,
    pub is_leaf: bool,
    pub parent: Option<QueueId>,
    pub calc: QueuePreemptCalcResource,
}

/// The mirror tree for one pass. Discarded when the pass ends; nothing
/// outlives it (`spec.md` §5 "Shared resources").
#[derive(Debug, Clone, Default)]
pub struct PreemptionContext {
    nodes: HashMap<QueueId, PreemptionQueueContext>,
}

impl PreemptionContext {
    pub fn get(&self, id: QueueId) -> Option<&PreemptionQueueContext> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: QueueId) -> Option<&mut PreemptionQueueContext> {
        self.nodes.get_mut(&id)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &PreemptionQueueContext> {
        self.nodes.values().filter(|n| n.is_leaf)
    }

    pub fn leaves_mut(&mut self) -> impl Iterator<Item = &mut PreemptionQueueContext> {
        self.nodes.values_mut().filter(|n| n.is_leaf)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PreemptionQueueContext> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Copy every live queue's numeric state into a fresh `PreemptionContext`.
/// `used` is `assumedAllocated` — unconfirmed allocations count as real for
/// fairness purposes (`spec.md` §4.3, §4.8 step B).
pub fn build(tree: &QueueTree) -> PreemptionContext {
    let mut nodes = HashMap::new();
    for id in tree.live_ids() {
        let node = tree.node(id);
        let calc = QueuePreemptCalcResource {
            guaranteed: node.cache.guaranteed.clone().unwrap_or_default(),
            used: node.assumed_allocated(),
            pending: node.sched.pending.clone(),
            max: tree.max_resource(id),
            ideal: Resource::new(),
            marked_preempted: Resource::new(),
            preemptable: Resource::new(),
        };
        nodes.insert(
            id,
            PreemptionQueueContext {
                queue: id,
                path: node.cache.path.clone(),
                is_leaf: node.is_leaf(),
                parent: node.cache.parent,
                calc,
            },
        );
    }
    PreemptionContext { nodes }
}
