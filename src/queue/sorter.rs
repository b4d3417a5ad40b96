//! Pluggable sibling/application ordering (`spec.md` §4.6, §6 "Sorter
//! contract", §9).
//!
//! The queue tree only guarantees filtering by pending>0 and by queue state,
//! plus deterministic invocation of whichever policy is registered; the
//! actual ordering is a capability interface implemented by named policies.
//! `spec.md` names `fair`, `fifo`, `stateaware` as the policy set but leaves
//! their implementation out of scope. This module defines the trait
//! boundary and ships `fifo`/`fair` so the crate is exercisable
//! stand-alone; `stateaware` is registered by name but left unimplemented
//! (`SPEC_FULL.md` §4.6a).

use std::collections::HashMap;

use priority_queue::PriorityQueue;

use crate::ids::{ApplicationId, QueueId};
use crate::queue::QueueTree;
use crate::resource::OrderedShare;

pub trait SiblingSorter: Send + Sync {
    fn name(&self) -> &'static str;
    fn sort(&self, tree: &QueueTree, children: Vec<QueueId>) -> Vec<QueueId>;
}

pub trait AppSorter: Send + Sync {
    fn name(&self) -> &'static str;
    fn sort(&self, tree: &QueueTree, leaf: QueueId, apps: Vec<ApplicationId>) -> Vec<ApplicationId>;
}

/// Orders by queue path / application id, ascending — a stand-in for
/// submission order since this core does not track submit timestamps
/// itself (that bookkeeping belongs to the out-of-scope RM ingestion path).
#[derive(Debug, Default)]
pub struct Fifo;

impl SiblingSorter for Fifo {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn sort(&self, tree: &QueueTree, mut children: Vec<QueueId>) -> Vec<QueueId> {
        children.sort_by(|a, b| tree.node(*a).cache.path.cmp(&tree.node(*b).cache.path));
        children
    }
}

impl AppSorter for Fifo {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn sort(&self, _tree: &QueueTree, _leaf: QueueId, mut apps: Vec<ApplicationId>) -> Vec<ApplicationId> {
        apps.sort();
        apps
    }
}

/// Orders queues by ascending dominant share of assumed-allocated resource
/// against the queue's own guaranteed share, so the least-served sibling is
/// offered first. Ties break lexicographically by path, matching the DRF
/// tie-break rule used by the preemption engine (`spec.md` §4.8).
#[derive(Debug, Default)]
pub struct Fair;

impl SiblingSorter for Fair {
    fn name(&self) -> &'static str {
        "fair"
    }

    fn sort(&self, tree: &QueueTree, children: Vec<QueueId>) -> Vec<QueueId> {
        // PriorityQueue::pop returns the greatest priority; wrapping the
        // (share, path) tuple in `Reverse` turns that into "smallest share
        // first, lexicographically smallest path breaks ties" — the DRF
        // tie-break rule shared with the preemption engine (`spec.md`
        // §4.8).
        let mut pq: PriorityQueue<QueueId, std::cmp::Reverse<(OrderedShare, String)>> = PriorityQueue::new();
        for id in children {
            let node = tree.node(id);
            let guaranteed = node.cache.guaranteed.clone().unwrap_or_default();
            let share = node.assumed_allocated().dominant_share(&guaranteed);
            pq.push(id, std::cmp::Reverse((OrderedShare(share), node.cache.path.clone())));
        }
        let mut out = Vec::with_capacity(pq.len());
        while let Some((id, _)) = pq.pop() {
            out.push(id);
        }
        out
    }
}

impl AppSorter for Fair {
    fn name(&self) -> &'static str {
        "fair"
    }

    fn sort(&self, tree: &QueueTree, leaf: QueueId, apps: Vec<ApplicationId>) -> Vec<ApplicationId> {
        let node = tree.node(leaf);
        let mut keyed: Vec<(ApplicationId, i64)> = apps
            .into_iter()
            .filter_map(|id| node.sched.applications.get(&id).map(|a| (id, a.fairness_key)))
            .collect();
        keyed.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        keyed.into_iter().map(|(id, _)| id).collect()
    }
}

/// Named policy lookup, mirroring `spec.md` §6's "policies enumerated:
/// fair, fifo, stateaware".
pub struct SorterRegistry {
    siblings: HashMap<&'static str, Box<dyn SiblingSorter>>,
}

impl Default for SorterRegistry {
    fn default() -> Self {
        let mut siblings: HashMap<&'static str, Box<dyn SiblingSorter>> = HashMap::new();
        siblings.insert("fifo", Box::new(Fifo));
        siblings.insert("fair", Box::new(Fair));
        Self { siblings }
    }
}

impl SorterRegistry {
    pub fn sibling_policy(&self, name: &str) -> Option<&dyn SiblingSorter> {
        self.siblings.get(name).map(|b| b.as_ref())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.siblings.contains_key(name) || name == "stateaware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueKind, QueueRole};
    use crate::resource::Resource;

    #[test]
    fn fifo_orders_by_path() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let b = tree.add_queue(root, "b", QueueKind::Managed, QueueRole::Leaf, None, None).unwrap();
        let a = tree.add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, None, None).unwrap();
        let sorted = Fifo.sort(&tree, vec![b, a]);
        assert_eq!(sorted, vec![a, b]);
    }

    #[test]
    fn fair_prefers_least_served_queue() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let a = tree
            .add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("memory", 100)), None)
            .unwrap();
        let b = tree
            .add_queue(root, "b", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("memory", 100)), None)
            .unwrap();
        tree.node_mut(a).cache.allocated = Resource::single("memory", 80);
        tree.node_mut(b).cache.allocated = Resource::single("memory", 20);

        let sorted = Fair.sort(&tree, vec![a, b]);
        assert_eq!(sorted, vec![b, a]);
    }

    #[test]
    fn registry_knows_stateaware_by_name_but_not_as_sibling_policy() {
        let reg = SorterRegistry::default();
        assert!(reg.is_registered("stateaware"));
        assert!(reg.sibling_policy("stateaware").is_none());
    }
}
