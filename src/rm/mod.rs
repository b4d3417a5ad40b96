//! Resource-manager protocol boundary (`spec.md` §6 "Resource-manager
//! protocol (inbound)").
//!
//! This module specifies only the interface the scheduling thread is fed
//! through — wire encoding, transport, and the actual RM process are out of
//! scope (`spec.md` §1). `mock` ships an in-memory driver so the rest of the
//! crate is exercisable without a real RM attached.

pub mod mock;

use crate::ids::{ApplicationId, AskKey, PartitionName};
use crate::resource::Resource;

/// Identity of a registered resource manager, assigned on register
/// (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmId {
    pub rm_id: String,
    pub policy_group: String,
    pub version: String,
}

/// One ask carried in an `UpdateRequest` (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskUpdate {
    pub allocation_key: AskKey,
    pub application_id: ApplicationId,
    pub resource_ask: Resource,
    pub max_allocations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub application_id: ApplicationId,
    pub partition: PartitionName,
    pub leaf_queue_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub application_id: ApplicationId,
    pub allocation_key: Option<AskKey>,
}

/// An inbound batch from a resource manager. Any subset of the four
/// fields may be empty (`spec.md` §6).
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub new_applications: Vec<NewApplication>,
    pub new_schedulable_nodes: Vec<String>,
    pub asks: Vec<AskUpdate>,
    pub releases: Vec<Release>,
}

/// Outbound callback surface a resource manager registers to receive
/// responses on (`spec.md` §6).
pub trait RmCallback: Send + Sync {
    fn accepted_applications(&mut self, ids: &[ApplicationId]);
    fn accepted_nodes(&mut self, node_ids: &[String]);
    fn new_allocations(&mut self, application_id: &ApplicationId, allocation_key: &AskKey, resource: &Resource);
    fn rejected_applications(&mut self, ids: &[ApplicationId], reason: &str);
    fn rejected_asks(&mut self, application_id: &ApplicationId, allocation_key: &AskKey, reason: &str);
}
