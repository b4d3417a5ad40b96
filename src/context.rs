//! Cluster scheduling context (`spec.md` §2 "Cluster scheduling context",
//! §9 "Global state").
//!
//! Process-wide state is confined behind this explicit handle rather than a
//! module global, so tests can construct as many independent contexts as
//! they like. Each partition owns exactly one [`QueueTree`] and an
//! externally-supplied total capacity (node registration itself is out of
//! scope — `spec.md` §1, §6).

use std::collections::HashMap;

use crate::error::{ConfigError, SchedulerError, SchedulerResult};
use crate::ids::PartitionName;
use crate::queue::QueueTree;
use crate::resource::Resource;

/// Per-partition state: its queue tree plus the total schedulable capacity
/// fed into the DRF preemption engine (`spec.md` §4.8 step 1).
#[derive(Debug, Clone)]
pub struct Partition {
    pub tree: QueueTree,
    total_capacity: Resource,
}

impl Partition {
    pub fn new(tree: QueueTree) -> Self {
        Self {
            tree,
            total_capacity: Resource::new(),
        }
    }

    pub fn total_capacity(&self) -> &Resource {
        &self.total_capacity
    }

    pub fn set_total_capacity(&mut self, capacity: Resource) {
        self.total_capacity = capacity;
    }
}

/// Holds one [`Partition`] per name. Confined behind this handle and passed
/// explicitly through the scheduler rather than reached via a global
/// (`spec.md` §9).
#[derive(Debug, Clone, Default)]
pub struct ClusterSchedulingContext {
    partitions: HashMap<PartitionName, Partition>,
}

impl ClusterSchedulingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_partition(&mut self, name: PartitionName, tree: QueueTree) {
        self.partitions.insert(name, Partition::new(tree));
    }

    pub fn partition(&self, name: &PartitionName) -> SchedulerResult<&Partition> {
        self.partitions
            .get(name)
            .ok_or_else(|| SchedulerError::Config(ConfigError::UnknownPartition(name.to_string())))
    }

    pub fn partition_mut(&mut self, name: &PartitionName) -> SchedulerResult<&mut Partition> {
        self.partitions
            .get_mut(name)
            .ok_or_else(|| SchedulerError::Config(ConfigError::UnknownPartition(name.to_string())))
    }

    pub fn partition_names(&self) -> impl Iterator<Item = &PartitionName> {
        self.partitions.keys()
    }

    /// Resolve a dotted queue path within a partition, e.g.
    /// `"root.production.batch"`.
    pub fn queue_by_path(&self, partition: &PartitionName, path: &str) -> SchedulerResult<crate::ids::QueueId> {
        self.partition(partition)?
            .tree
            .by_path(path)
            .ok_or_else(|| SchedulerError::NotFound(crate::error::NotFoundError::QueuePath(path.to_string())))
    }

    /// Remove empty dynamic queues across every partition, as a per-step
    /// housekeeping sweep (`SPEC_FULL.md` supplemental #1).
    pub fn sweep_empty_dynamic_queues(&mut self) -> usize {
        self.partitions.values_mut().map(|p| p.tree.sweep_empty_dynamic_queues()).sum()
    }
}
