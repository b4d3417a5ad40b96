//! Per-application ask bookkeeping (`spec.md` §3 "Scheduling application",
//! §4.9).
//!
//! `SchedulingApplication` owns its outstanding asks and keeps its own
//! `pending` total in sync with them. It never touches the enclosing queue
//! chain directly — callers (the queue tree, §4.9) apply the returned delta
//! up the parent chain, since only the tree knows the chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AskKey, QueueId};
use crate::resource::{Resource, SignedResource};

/// A request for `remaining_repeat` identical allocations of `resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ask {
    pub key: AskKey,
    pub resource: Resource,
    pub remaining_repeat: u32,
}

impl Ask {
    /// `resource * remaining_repeat`, the ask's contribution to pending.
    pub fn total(&self) -> Resource {
        self.resource.scalar_mul(self.remaining_repeat as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingApplication {
    pub id: crate::ids::ApplicationId,
    pub leaf: QueueId,
    /// User-supplied priority/fairness key consumed by the application
    /// sorter (`spec.md` §4.6); opaque to this module.
    pub fairness_key: i64,
    asks: BTreeMap<AskKey, Ask>,
    pending: Resource,
}

impl SchedulingApplication {
    pub fn new(id: crate::ids::ApplicationId, leaf: QueueId) -> Self {
        Self {
            id,
            leaf,
            fairness_key: 0,
            asks: BTreeMap::new(),
            pending: Resource::new(),
        }
    }

    pub fn pending(&self) -> &Resource {
        &self.pending
    }

    pub fn asks(&self) -> impl Iterator<Item = &Ask> {
        self.asks.values()
    }

    pub fn ask(&self, key: &AskKey) -> Option<&Ask> {
        self.asks.get(key)
    }

    /// Add (or replace) an ask. Returns the delta to apply to this
    /// application's pending and propagate up the queue chain
    /// (`spec.md` §4.9):
    ///
    /// - new key: `delta = resource * repeat`
    /// - existing key: `delta = new.resource*new.repeat - old.resource*old.repeat`
    pub fn add_ask(&mut self, key: AskKey, resource: Resource, repeat: u32) -> SignedResource {
        let new_total = resource.scalar_mul(repeat as i64);
        let delta = match self.asks.get(&key) {
            Some(old) => new_total.sub_signed(&old.total()),
            None => new_total.clone().into_signed(),
        };
        self.asks.insert(
            key.clone(),
            Ask {
                key,
                resource,
                remaining_repeat: repeat,
            },
        );
        self.pending = self.pending.add_signed_clamped(&delta);
        delta
    }

    /// Update an ask's remaining repeat by a signed delta `d`. `new_repeat =
    /// max(0, old_repeat + d)`; the ask is removed once it reaches zero.
    /// Returns the signed resource delta to propagate up the chain.
    pub fn update_ask_repeat(&mut self, key: &AskKey, d: i64) -> Option<SignedResource> {
        let ask = self.asks.get_mut(key)?;
        let old_repeat = ask.remaining_repeat as i64;
        let new_repeat = (old_repeat + d).max(0);
        let delta = ask.resource.scalar_mul(new_repeat - old_repeat).into_signed();

        if new_repeat == 0 {
            self.asks.remove(key);
        } else {
            ask.remaining_repeat = new_repeat as u32;
        }
        self.pending = self.pending.add_signed_clamped(&delta);
        Some(delta)
    }
}
