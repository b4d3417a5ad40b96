//! The single scheduling thread's work queue (`spec.md` §5 "Concurrency &
//! Resource Model").
//!
//! All mutation of a partition's queue tree happens on one thread; external
//! collaborators (RPC handlers, node-status callbacks) post [`WorkItem`]s
//! into a bounded channel this thread drains one step at a time. A
//! preemption step and an allocation step never interleave because both
//! run from the same `drain_one` call on the same thread.

use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use tracing::warn;

use crate::context::ClusterSchedulingContext;
use crate::ids::{ApplicationId, AskKey, PartitionName, QueueId};
use crate::preemption::{self, PreemptionPolicy};
use crate::resource::Resource;

/// One unit of work posted to the scheduling thread. Carries an optional
/// deadline; entries whose deadline has passed before dequeue are dropped
/// with a logged warning instead of processed (`spec.md` §5
/// "Cancellation / timeout").
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub deadline: Option<Instant>,
    pub kind: WorkKind,
}

#[derive(Debug, Clone)]
pub enum WorkKind {
    AddAsk {
        partition: PartitionName,
        leaf: QueueId,
        app: ApplicationId,
        key: AskKey,
        resource: Resource,
        repeat: u32,
    },
    UpdateAskRepeat {
        partition: PartitionName,
        leaf: QueueId,
        app: ApplicationId,
        key: AskKey,
        delta: i64,
    },
    RemoveApplication {
        partition: PartitionName,
        leaf: QueueId,
        app: ApplicationId,
    },
    /// Run a preemption pass on one partition (§4.8).
    PreemptionTick { partition: PartitionName },
}

/// A handle callers use to enqueue work; cheap to clone, since it wraps a
/// crossbeam `Sender`.
#[derive(Clone)]
pub struct WorkQueueHandle {
    tx: Sender<WorkItem>,
}

impl WorkQueueHandle {
    pub fn submit(&self, item: WorkItem) -> Result<(), crossbeam::channel::SendError<WorkItem>> {
        self.tx.send(item)
    }
}

/// The scheduling thread's owned state: the shared cluster context handle,
/// its inbound queue, and the registered preemption policy chain.
pub struct SchedulerThread {
    context: Arc<RwLock<ClusterSchedulingContext>>,
    rx: Receiver<WorkItem>,
    policies: Vec<Box<dyn PreemptionPolicy>>,
}

/// Create a scheduler thread plus the handle other threads submit work
/// through. `capacity` bounds the work queue (`spec.md` §5).
pub fn spawn(
    context: Arc<RwLock<ClusterSchedulingContext>>,
    capacity: usize,
    policies: Vec<Box<dyn PreemptionPolicy>>,
) -> (SchedulerThread, WorkQueueHandle) {
    let (tx, rx) = crossbeam::channel::bounded(capacity);
    (SchedulerThread { context, rx, policies }, WorkQueueHandle { tx })
}

impl SchedulerThread {
    /// Drain and process exactly one work item, blocking until one is
    /// available. Returns `false` once the channel is closed (`spec.md`
    /// §5 "Suspension points": the thread may only suspend on an empty
    /// queue, or between single steps).
    pub fn drain_one_blocking(&mut self) -> bool {
        match self.rx.recv() {
            Ok(item) => {
                self.process(item);
                true
            }
            Err(_) => false,
        }
    }

    /// Non-blocking variant used by tests and by a caller that wants to
    /// drain whatever is queued without waiting.
    pub fn try_drain_one(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(item) => {
                self.process(item);
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    fn process(&mut self, item: WorkItem) {
        if let Some(deadline) = item.deadline {
            if Instant::now() > deadline {
                warn!(deadline = ?deadline, "dropping work item past its deadline");
                return;
            }
        }

        match item.kind {
            WorkKind::AddAsk { partition, leaf, app, key, resource, repeat } => {
                let mut ctx = self.context.write();
                if let Ok(p) = ctx.partition_mut(&partition) {
                    if let Err(e) = p.tree.add_ask(leaf, &app, key, resource, repeat) {
                        warn!(error = %e, "ask rejected");
                    }
                }
            }
            WorkKind::UpdateAskRepeat { partition, leaf, app, key, delta } => {
                let mut ctx = self.context.write();
                if let Ok(p) = ctx.partition_mut(&partition) {
                    if let Err(e) = p.tree.update_ask_repeat(leaf, &app, &key, delta) {
                        warn!(error = %e, "ask repeat update rejected");
                    }
                }
            }
            WorkKind::RemoveApplication { partition, leaf, app } => {
                let mut ctx = self.context.write();
                if let Ok(p) = ctx.partition_mut(&partition) {
                    if let Err(e) = p.tree.remove_application(leaf, &app) {
                        warn!(error = %e, "application removal rejected");
                    }
                }
            }
            WorkKind::PreemptionTick { partition } => {
                let mut ctx = self.context.write();
                if let Ok(p) = ctx.partition_mut(&partition) {
                    let _ = preemption::run_pass(&p.tree, p.total_capacity(), &self.policies);
                }
            }
        }
    }
}
