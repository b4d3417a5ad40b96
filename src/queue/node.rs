//! Queue node data (`spec.md` §3 "Queue node").
//!
//! Split into two composed structs mirroring the original source's
//! `cache`/`scheduler` package split (`SPEC_FULL.md` §3): `CacheQueueData`
//! is the structural/configuration half, `SchedulingQueueData` is the live
//! scheduling half. Both halves share one arena slot per queue — see
//! [`super::QueueTree`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::application::SchedulingApplication;
use crate::ids::{ApplicationId, QueueId};
use crate::queue::fsm::QueueState;
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueKind {
    /// Declared in static configuration; survives restarts.
    Managed,
    /// Created on first application submission; eligible for automatic
    /// removal once empty.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueRole {
    Parent,
    Leaf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheQueueData {
    pub name: String,
    pub path: String,
    pub kind: QueueKind,
    pub role: QueueRole,
    pub state: QueueState,
    pub guaranteed: Option<Resource>,
    pub max: Option<Resource>,
    pub allocated: Resource,
    pub children: BTreeMap<String, QueueId>,
    pub parent: Option<QueueId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingQueueData {
    pub pending: Resource,
    pub allocating: Resource,
    /// Set directly by the preemption engine; never propagated up or down
    /// the tree (`spec.md` §3 invariant 3).
    pub preempting: Resource,
    /// Reservation count per application id, counted as a small integer
    /// (`spec.md` §4.7).
    pub reserved_apps: HashMap<ApplicationId, u32>,
    /// Leaves only.
    pub applications: HashMap<ApplicationId, SchedulingApplication>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueNode {
    pub cache: CacheQueueData,
    pub sched: SchedulingQueueData,
    /// Tombstoned slots are skipped by iteration but keep their index
    /// stable so sibling/parent `QueueId`s elsewhere in the arena remain
    /// valid (`spec.md` §9).
    pub removed: bool,
}

impl QueueNode {
    /// `assumed allocated = allocated + allocating` (`spec.md` §4.3).
    pub fn assumed_allocated(&self) -> Resource {
        self.cache.allocated.add(&self.sched.allocating)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.cache.role, QueueRole::Leaf)
    }

    pub fn is_root(&self) -> bool {
        self.cache.parent.is_none()
    }

    pub fn is_eligible_for_sort(&self) -> bool {
        matches!(self.cache.state, QueueState::Running) && !self.sched.pending.is_zero()
    }
}
