//! The queue tree: structural invariants, lifecycle, hierarchical
//! bookkeeping, and derived quantities (`spec.md` §2 "Queue tree (cache
//! layer)" + "Scheduling queue (wrapper)", §4.2-§4.7).

pub mod fsm;
pub mod node;
pub mod sorter;

pub use fsm::{QueueEvent, QueueState};
pub use node::{CacheQueueData, QueueKind, QueueNode, QueueRole, SchedulingQueueData};

use std::collections::HashMap;

use crate::application::{Ask, SchedulingApplication};
use crate::error::{CapacityError, NotFoundError, SchedulerError, SchedulerResult, StateError};
use crate::ids::{ApplicationId, AskKey, QueueId};
use crate::resource::Resource;

/// An arena-allocated queue tree for one partition. Children hold `QueueId`
/// indices rather than owning pointers, so there is no parent/child
/// ownership cycle to manage (`spec.md` §9).
#[derive(Debug, Clone)]
pub struct QueueTree {
    nodes: Vec<QueueNode>,
    path_index: HashMap<String, QueueId>,
    root: QueueId,
}

impl QueueTree {
    /// Create a tree containing only `root`, a distinguished parent queue
    /// with no parent link (`spec.md` §3).
    pub fn new_root(name: impl Into<String>) -> Self {
        let name = name.into();
        let root_node = QueueNode {
            cache: CacheQueueData {
                name: name.clone(),
                path: name.clone(),
                kind: QueueKind::Managed,
                role: QueueRole::Parent,
                state: QueueState::Running,
                guaranteed: None,
                max: None,
                allocated: Resource::new(),
                children: Default::default(),
                parent: None,
            },
            sched: SchedulingQueueData::default(),
            removed: false,
        };
        let mut path_index = HashMap::new();
        path_index.insert(name, QueueId(0));
        Self {
            nodes: vec![root_node],
            path_index,
            root: QueueId(0),
        }
    }

    pub fn root(&self) -> QueueId {
        self.root
    }

    pub fn node(&self, id: QueueId) -> &QueueNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: QueueId) -> &mut QueueNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn by_path(&self, path: &str) -> Option<QueueId> {
        self.path_index.get(path).copied()
    }

    /// All live (non-tombstoned) queue ids, in arena order. Not the same as
    /// sorted-for-scheduling order — see [`Self::sort_queues`].
    pub fn live_ids(&self) -> impl Iterator<Item = QueueId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.removed)
            .map(|(i, _)| QueueId(i as u32))
    }

    /// Add a child queue under `parent`. Fails with `ConfigError` only
    /// through the caller (config loading); structural misuse (duplicate
    /// sibling name) is rejected here.
    pub fn add_queue(
        &mut self,
        parent: QueueId,
        name: impl Into<String>,
        kind: QueueKind,
        role: QueueRole,
        guaranteed: Option<Resource>,
        max: Option<Resource>,
    ) -> SchedulerResult<QueueId> {
        let name = name.into();
        if self.node(parent).cache.children.contains_key(&name) {
            return Err(SchedulerError::Config(crate::error::ConfigError::DuplicateQueueName(name)));
        }
        let path = format!("{}.{}", self.node(parent).cache.path, name);
        let id = QueueId(self.nodes.len() as u32);
        self.nodes.push(QueueNode {
            cache: CacheQueueData {
                name: name.clone(),
                path: path.clone(),
                kind,
                role,
                state: QueueState::Running,
                guaranteed,
                max,
                allocated: Resource::new(),
                children: Default::default(),
                parent: Some(parent),
            },
            sched: SchedulingQueueData::default(),
            removed: false,
        });
        self.node_mut(parent).cache.children.insert(name, id);
        self.path_index.insert(path, id);
        Ok(id)
    }

    /// Remove a queue. Succeeds only if it has no children and no
    /// applications, and — for managed queues — is in state `Draining`
    /// (`spec.md` §3 invariant 7, §8 property 7). Dynamic queues may be
    /// removed as soon as they are empty (`spec.md` §4.2).
    pub fn remove_queue(&mut self, id: QueueId) -> bool {
        if id == self.root {
            return false;
        }
        let node = self.node(id);
        if !node.cache.children.is_empty() || !node.sched.applications.is_empty() {
            return false;
        }
        let removable = match node.cache.kind {
            QueueKind::Dynamic => true,
            QueueKind::Managed => node.cache.state == QueueState::Draining,
        };
        if !removable {
            return false;
        }

        let parent = node.cache.parent;
        let name = node.cache.name.clone();
        let path = node.cache.path.clone();
        self.node_mut(id).removed = true;
        if let Some(parent) = parent {
            self.node_mut(parent).cache.children.remove(&name);
        }
        self.path_index.remove(&path);
        true
    }

    /// Scan live dynamic queues and remove any that are empty, as a
    /// `SPEC_FULL.md` supplemental per-step sweep (not part of `spec.md`
    /// itself, which leaves the caller of removal unspecified).
    pub fn sweep_empty_dynamic_queues(&mut self) -> usize {
        let candidates: Vec<QueueId> = self
            .live_ids()
            .filter(|&id| {
                let n = self.node(id);
                n.cache.kind == QueueKind::Dynamic
                    && n.cache.children.is_empty()
                    && n.sched.applications.is_empty()
            })
            .collect();
        let mut removed = 0;
        for id in candidates {
            if self.remove_queue(id) {
                removed += 1;
            }
        }
        removed
    }

    pub fn transition(&mut self, id: QueueId, event: QueueEvent) -> Result<(), StateError> {
        let path = self.node(id).cache.path.clone();
        let from = self.node(id).cache.state;
        let to = fsm::transition(&path, from, event)?;
        self.node_mut(id).cache.state = to;
        Ok(())
    }

    // ---- hierarchical counters (`spec.md` §4.3) ----

    pub fn inc_pending(&mut self, leaf: QueueId, delta: &Resource) {
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let node = self.node_mut(id);
            node.sched.pending = node.sched.pending.add(delta);
            cur = node.cache.parent;
        }
    }

    /// Decrement pending up the chain, clamped at zero independently at
    /// each node (`spec.md` §3 invariant 4, §9).
    pub fn dec_pending(&mut self, leaf: QueueId, delta: &Resource) {
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let node = self.node_mut(id);
            node.sched.pending = node.sched.pending.sub_clamped(delta);
            cur = node.cache.parent;
        }
    }

    pub fn inc_allocating(&mut self, leaf: QueueId, delta: &Resource) {
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let node = self.node_mut(id);
            node.sched.allocating = node.sched.allocating.add(delta);
            cur = node.cache.parent;
        }
    }

    pub fn dec_allocating(&mut self, leaf: QueueId, delta: &Resource) {
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let node = self.node_mut(id);
            node.sched.allocating = node.sched.allocating.sub_clamped(delta);
            cur = node.cache.parent;
        }
    }

    /// `preempting` is local only; it never propagates (`spec.md` §3
    /// invariant 3).
    pub fn set_preempting(&mut self, queue: QueueId, amount: Resource) {
        self.node_mut(queue).sched.preempting = amount;
    }

    /// Set a queue's `allocated` (confirmed-by-the-resource-manager) total
    /// directly. `allocated` does not propagate up the chain on its own —
    /// each queue's figure is whatever the resource manager confirmed for
    /// it (`spec.md` §3).
    pub fn set_allocated(&mut self, queue: QueueId, amount: Resource) {
        self.node_mut(queue).cache.allocated = amount;
    }

    // ---- headroom and max-usage (`spec.md` §4.4, §4.5) ----

    /// `HR(Q) = min(max(Q) - assumedAllocated(Q), HR(parent(Q)))`, with
    /// `HR(root)` anchored at `max(root) - assumedAllocated(root)`. `None`
    /// means unbounded.
    pub fn head_room(&self, id: QueueId) -> Option<Resource> {
        let node = self.node(id);
        let local = node
            .cache
            .max
            .as_ref()
            .map(|max| max.sub_clamped(&node.assumed_allocated()));

        match node.cache.parent {
            None => local,
            Some(parent) => {
                let parent_hr = self.head_room(parent);
                match (local, parent_hr) {
                    (None, None) => None,
                    (Some(l), None) => Some(l),
                    (None, Some(p)) => Some(p),
                    (Some(l), Some(p)) => Some(l.min(&p)),
                }
            }
        }
    }

    /// `getMaxResource`: at root, its configured max (or `None`, unbounded);
    /// at a non-root queue, the elementwise min of the parent's effective
    /// max and the queue's own configured max. A configured (but sparse)
    /// max at either level zeroes any key it doesn't mention once combined
    /// with an ancestor that does mention it — `Resource::min` already
    /// treats a missing key as zero, so that case falls out of the plain
    /// min. A queue with *no* configured max at all (`None`) adds no
    /// restriction of its own and simply inherits the ancestor's effective
    /// max unchanged (`spec.md` §4.5).
    pub fn max_resource(&self, id: QueueId) -> Option<Resource> {
        let node = self.node(id);
        match node.cache.parent {
            None => node.cache.max.clone(),
            Some(parent) => {
                let parent_max = self.max_resource(parent);
                match (parent_max, node.cache.max.clone()) {
                    (None, local) => local,
                    (Some(p), None) => Some(p),
                    (Some(p), Some(l)) => Some(p.min(&l)),
                }
            }
        }
    }

    // ---- sorting (`spec.md` §4.6) ----

    /// Children of `parent` eligible for scheduling — state `Running` and
    /// `pending > 0` — ordered by `policy`. Ineligible children are dropped
    /// entirely, not just sorted last.
    pub fn sort_queues(&self, parent: QueueId, policy: &dyn sorter::SiblingSorter) -> Vec<QueueId> {
        let eligible: Vec<QueueId> = self
            .node(parent)
            .cache
            .children
            .values()
            .copied()
            .filter(|&id| self.node(id).is_eligible_for_sort())
            .collect();
        policy.sort(self, eligible)
    }

    /// Applications at a leaf with nonzero pending, ordered by `policy`.
    /// Returns `None` ("not applicable") at a non-leaf — callers must never
    /// call this on a parent (`spec.md` §4.6).
    pub fn sort_applications(
        &self,
        leaf: QueueId,
        policy: &dyn sorter::AppSorter,
    ) -> Option<Vec<ApplicationId>> {
        if !self.node(leaf).is_leaf() {
            return None;
        }
        let eligible: Vec<ApplicationId> = self
            .node(leaf)
            .sched
            .applications
            .values()
            .filter(|a| !a.pending().is_zero())
            .map(|a| a.id.clone())
            .collect();
        Some(policy.sort(self, leaf, eligible))
    }

    // ---- reservations (`spec.md` §4.7) ----

    pub fn reserve(&mut self, leaf: QueueId, app: ApplicationId) {
        *self.node_mut(leaf).sched.reserved_apps.entry(app).or_insert(0) += 1;
    }

    /// Decrements the count; removes the entry at zero. Unreserving an
    /// unknown app is a no-op, not an error (`spec.md` §4.7).
    pub fn unreserve(&mut self, leaf: QueueId, app: &ApplicationId) {
        let reserved = &mut self.node_mut(leaf).sched.reserved_apps;
        if let Some(count) = reserved.get_mut(app) {
            if *count <= 1 {
                reserved.remove(app);
            } else {
                *count -= 1;
            }
        }
    }

    pub fn reservation_count(&self, leaf: QueueId, app: &ApplicationId) -> u32 {
        self.node(leaf).sched.reserved_apps.get(app).copied().unwrap_or(0)
    }

    // ---- applications and asks (`spec.md` §4.9) ----

    pub fn add_application(&mut self, leaf: QueueId, app: SchedulingApplication) -> SchedulerResult<()> {
        if !self.node(leaf).is_leaf() {
            return Err(SchedulerError::NotFound(NotFoundError::QueuePath(
                self.node(leaf).cache.path.clone(),
            )));
        }
        self.node_mut(leaf).sched.applications.insert(app.id.clone(), app);
        Ok(())
    }

    /// Remove an application from its leaf, subtracting its remaining
    /// pending from the leaf's (and ancestors') chain-propagated pending so
    /// the tree stays consistent with the applications that remain
    /// (`spec.md` §4.9).
    pub fn remove_application(&mut self, leaf: QueueId, app: &ApplicationId) -> SchedulerResult<()> {
        let removed = self
            .node_mut(leaf)
            .sched
            .applications
            .remove(app)
            .ok_or_else(|| SchedulerError::NotFound(NotFoundError::Application(app.to_string())))?;
        if !removed.pending().is_zero() {
            self.dec_pending(leaf, removed.pending());
        }
        Ok(())
    }

    pub fn application(&self, leaf: QueueId, app: &ApplicationId) -> Option<&SchedulingApplication> {
        self.node(leaf).sched.applications.get(app)
    }

    /// Add (or replace) an ask on `app` at `leaf`, checked against the
    /// leaf's headroom, then propagated up the chain (`spec.md` §4.9).
    /// Capacity is enforced at add time, not retroactively on existing
    /// asks.
    pub fn add_ask(
        &mut self,
        leaf: QueueId,
        app: &ApplicationId,
        key: AskKey,
        resource: Resource,
        repeat: u32,
    ) -> SchedulerResult<()> {
        let requested_total = resource.scalar_mul(repeat as i64);
        if let Some(hr) = self.head_room(leaf) {
            if !requested_total.fits_within(Some(&hr)) {
                return Err(SchedulerError::Capacity(CapacityError::MaxExceeded {
                    queue: self.node(leaf).cache.path.clone(),
                    request: requested_total.to_string(),
                    max: hr.to_string(),
                }));
            }
        }

        let application = self
            .node_mut(leaf)
            .sched
            .applications
            .get_mut(app)
            .ok_or_else(|| SchedulerError::NotFound(NotFoundError::Application(app.to_string())))?;
        let delta = application.add_ask(key, resource, repeat);
        self.apply_signed_pending(leaf, &delta);
        Ok(())
    }

    pub fn update_ask_repeat(
        &mut self,
        leaf: QueueId,
        app: &ApplicationId,
        key: &AskKey,
        delta: i64,
    ) -> SchedulerResult<()> {
        let application = self
            .node_mut(leaf)
            .sched
            .applications
            .get_mut(app)
            .ok_or_else(|| SchedulerError::NotFound(NotFoundError::Application(app.to_string())))?;
        let signed = application
            .update_ask_repeat(key, delta)
            .ok_or_else(|| SchedulerError::NotFound(NotFoundError::AskKey(key.to_string(), app.to_string())))?;
        self.apply_signed_pending(leaf, &signed);
        Ok(())
    }

    pub fn ask(&self, leaf: QueueId, app: &ApplicationId, key: &AskKey) -> Option<&Ask> {
        self.node(leaf).sched.applications.get(app)?.ask(key)
    }

    fn apply_signed_pending(&mut self, leaf: QueueId, delta: &crate::resource::SignedResource) {
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let node = self.node_mut(id);
            node.sched.pending = node.sched.pending.add_signed_clamped(delta);
            cur = node.cache.parent;
        }
    }
}
