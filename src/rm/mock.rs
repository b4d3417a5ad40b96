//! An in-memory `RmCallback` recorder for tests, standing in for a real
//! resource-manager connection (`spec.md` §1 "mock drivers used by
//! tests").

use crate::ids::{ApplicationId, AskKey};
use crate::resource::Resource;

use super::RmCallback;

#[derive(Debug, Clone)]
pub enum RecordedEvent {
    AcceptedApplications(Vec<ApplicationId>),
    AcceptedNodes(Vec<String>),
    NewAllocation {
        application_id: ApplicationId,
        allocation_key: AskKey,
        resource: Resource,
    },
    RejectedApplications {
        ids: Vec<ApplicationId>,
        reason: String,
    },
    RejectedAsk {
        application_id: ApplicationId,
        allocation_key: AskKey,
        reason: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct MockRmCallback {
    pub events: Vec<RecordedEvent>,
}

impl RmCallback for MockRmCallback {
    fn accepted_applications(&mut self, ids: &[ApplicationId]) {
        self.events.push(RecordedEvent::AcceptedApplications(ids.to_vec()));
    }

    fn accepted_nodes(&mut self, node_ids: &[String]) {
        self.events.push(RecordedEvent::AcceptedNodes(node_ids.to_vec()));
    }

    fn new_allocations(&mut self, application_id: &ApplicationId, allocation_key: &AskKey, resource: &Resource) {
        self.events.push(RecordedEvent::NewAllocation {
            application_id: application_id.clone(),
            allocation_key: allocation_key.clone(),
            resource: resource.clone(),
        });
    }

    fn rejected_applications(&mut self, ids: &[ApplicationId], reason: &str) {
        self.events.push(RecordedEvent::RejectedApplications {
            ids: ids.to_vec(),
            reason: reason.to_string(),
        });
    }

    fn rejected_asks(&mut self, application_id: &ApplicationId, allocation_key: &AskKey, reason: &str) {
        self.events.push(RecordedEvent::RejectedAsk {
            application_id: application_id.clone(),
            allocation_key: allocation_key.clone(),
            reason: reason.to_string(),
        });
    }
}
