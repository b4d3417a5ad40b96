//! fairsched-core
//!
//! The scheduling queue hierarchy and DRF preemption engine at the heart of
//! a hierarchical, multi-tenant cluster resource scheduler: a tree of
//! managed/dynamic queues carrying pending/allocating/allocated/preempting
//! resource accounting, and a single-step preemption pass that computes
//! each leaf's ideal Dominant Resource Fairness share and marks excess
//! usage for reclamation.
//!
//! Out of scope: the resource-manager wire protocol (only its interface
//! boundary is modeled, in [`rm`]), node selection, and persistence — see
//! the crate's accompanying design notes.

pub mod application;
pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod preemption;
pub mod queue;
pub mod resource;
pub mod rm;
pub mod scheduler;

pub use application::{Ask, SchedulingApplication};
pub use context::{ClusterSchedulingContext, Partition};
pub use error::{SchedulerError, SchedulerResult};
pub use ids::{ApplicationId, AskKey, PartitionName, QueueId};
pub use preemption::{PreemptionContext, PreemptionPolicy};
pub use queue::{QueueEvent, QueueState, QueueTree};
pub use resource::Resource;

use tracing::{info, instrument};

/// Initialize structured logging for a scheduler process.
#[instrument]
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    info!("fairsched-core initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// End-to-end smoke test exercising the public surface across modules:
    /// config loading, queue tree construction, ask bookkeeping, and a
    /// preemption pass.
    #[test]
    fn builds_tree_from_config_and_runs_a_preemption_pass() {
        let yaml = r#"
partitions:
  - name: default
    queues:
      - name: prod
        resources:
          guaranteed:
            mem: "100"
      - name: dev
        resources:
          guaranteed:
            mem: "100"
"#;
        let parsed = config::parse_yaml(yaml).unwrap();
        let mut tree = config::build_tree(&parsed.partitions[0]).unwrap();

        let prod = tree.by_path("root.prod").unwrap();
        let dev = tree.by_path("root.dev").unwrap();

        tree.add_application(prod, SchedulingApplication::new(ApplicationId::from("app-1"), prod)).unwrap();
        tree.add_ask(prod, &ApplicationId::from("app-1"), AskKey::from("a1"), Resource::single("mem", 50), 1)
            .unwrap();
        tree.set_allocated(prod, Resource::single("mem", 50));
        tree.set_allocated(dev, Resource::single("mem", 150));

        assert!(preemption::needs_preemption(&tree));

        let policies: Vec<Box<dyn PreemptionPolicy>> = vec![Box::new(preemption::drf::Drf)];
        let snap = preemption::run_pass(&tree, &Resource::single("mem", 200), &policies).unwrap();
        assert_eq!(snap.get(dev).unwrap().calc.preemptable.get(&"mem".into()), 50);
        assert!(snap.get(prod).unwrap().calc.preemptable.is_zero());
    }

    #[test]
    fn cluster_context_wires_a_partition_end_to_end() {
        let mut ctx = ClusterSchedulingContext::new();
        let tree = QueueTree::new_root("root");
        ctx.add_partition(PartitionName::from("default"), tree);
        ctx.partition_mut(&PartitionName::from("default"))
            .unwrap()
            .set_total_capacity(Resource::single("mem", 1000));
        assert_eq!(
            ctx.partition(&PartitionName::from("default")).unwrap().total_capacity().get(&"mem".into()),
            1000
        );
    }
}
