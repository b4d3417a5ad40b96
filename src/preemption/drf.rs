//! Dominant Resource Fairness preemption policy (`spec.md` §4.8 step C).
//!
//! Ideal shares start each leaf at its guaranteed floor, then distribute
//! whatever capacity is left over via progressive, round-based water-filling:
//! leaves are visited in ascending order of their unmet demand's dominant
//! share (smallest share first, lexicographically smallest path breaking
//! ties — the same rule [`crate::queue::sorter::Fair`] uses for sibling
//! ordering), and each round's grant is capped at an equal division of
//! whatever slack remains among the leaves still waiting their turn. A leaf
//! whose demand is smaller than that equal share is fully satisfied and
//! drops out, shrinking the divisor for everyone still waiting — the
//! standard max-min water-filling construction, so two equally-guaranteed,
//! equally-pending leaves split the remainder evenly instead of the first
//! one visited draining it all.

use std::cmp::Reverse;

use priority_queue::PriorityQueue;

use crate::ids::QueueId;
use crate::resource::{OrderedShare, Resource};

use super::{PreemptionContext, PreemptionPolicy};

#[derive(Debug, Default)]
pub struct Drf;

impl PreemptionPolicy for Drf {
    fn name(&self) -> &'static str {
        "drf"
    }

    fn run(&self, snapshot: &mut PreemptionContext, total_capacity: &Resource) {
        // Step 3a: start every leaf at its guaranteed floor.
        let leaf_ids: Vec<QueueId> = snapshot.leaves().map(|l| l.queue).collect();
        for id in &leaf_ids {
            let ctx = snapshot.get_mut(*id).unwrap();
            ctx.calc.ideal = ctx.calc.guaranteed.clone();
        }

        // Slack is whatever capacity remains once every leaf's guaranteed
        // floor is reserved.
        let sum_guaranteed = leaf_ids
            .iter()
            .fold(Resource::new(), |acc, id| acc.add(&snapshot.get(*id).unwrap().calc.guaranteed));
        let mut slack = total_capacity.sub_clamped(&sum_guaranteed);

        // Step 3b: water-fill the slack. Leaves with live demand are queued
        // in ascending order of that demand's dominant share (smallest
        // share — i.e. smallest unmet ask relative to total capacity —
        // visited first); each pop recomputes the fair share as whatever
        // slack remains divided by however many leaves are still waiting,
        // so a leaf fully satisfied by less than its fair share leaves the
        // rest for its still-waiting siblings instead of monopolizing the
        // pool.
        let mut pq: PriorityQueue<QueueId, Reverse<(OrderedShare, String)>> = PriorityQueue::new();
        for id in &leaf_ids {
            let ctx = snapshot.get(*id).unwrap();
            if ctx.calc.pending.is_zero() {
                continue;
            }
            let share = ctx.calc.pending.dominant_share(total_capacity);
            pq.push(*id, Reverse((OrderedShare(share), ctx.path.clone())));
        }

        let mut still_waiting = pq.len() as i64;
        while let Some((id, _)) = pq.pop() {
            let fair_share = slack.div_floor(still_waiting);
            let ctx = snapshot.get_mut(id).unwrap();
            let grant = ctx.calc.pending.min(&fair_share);
            ctx.calc.ideal = ctx.calc.ideal.add(&grant);
            slack = slack.sub_clamped(&grant);
            still_waiting -= 1;
        }

        // Step 4: mark excess beyond ideal as preemptable.
        // Step 5: leaves at/below guaranteed with live demand are flagged as
        // reclamation beneficiaries, not preemption targets.
        for id in &leaf_ids {
            let ctx = snapshot.get_mut(*id).unwrap();
            ctx.calc.preemptable = ctx.calc.used.sub_clamped(&ctx.calc.ideal);
        }
    }
}

/// Leaves eligible to receive reclaimed resources: at or below guaranteed
/// with outstanding demand (`spec.md` §4.8 step 5).
pub fn reclaim_beneficiaries(snapshot: &PreemptionContext) -> Vec<QueueId> {
    snapshot
        .leaves()
        .filter(|l| l.calc.used.le(&l.calc.guaranteed) && !l.calc.pending.is_zero())
        .map(|l| l.queue)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preemption::snapshot;
    use crate::queue::{QueueKind, QueueRole, QueueTree};

    /// `spec.md` §8 scenario 6.
    #[test]
    fn drf_marks_over_served_leaf_preemptable() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let a = tree
            .add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 100)), None)
            .unwrap();
        let b = tree
            .add_queue(root, "b", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 100)), None)
            .unwrap();
        tree.set_allocated(a, Resource::single("mem", 50));
        tree.inc_pending(a, &Resource::single("mem", 50));
        tree.set_allocated(b, Resource::single("mem", 150));

        let mut snap = snapshot::build(&tree);
        let total = Resource::single("mem", 200);
        Drf.run(&mut snap, &total);

        assert!(snap.get(a).unwrap().calc.preemptable.is_zero());
        assert_eq!(snap.get(b).unwrap().calc.preemptable.get(&"mem".into()), 50);
    }

    #[test]
    fn preemptable_never_dips_below_guaranteed() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let a = tree
            .add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 100)), None)
            .unwrap();
        tree.set_allocated(a, Resource::single("mem", 100));

        let mut snap = snapshot::build(&tree);
        let total = Resource::single("mem", 100);
        Drf.run(&mut snap, &total);

        let ctx = snap.get(a).unwrap();
        assert!(ctx.calc.used.le(&ctx.calc.ideal) || ctx.calc.used == ctx.calc.ideal);
        assert!(ctx.calc.preemptable.is_zero());
    }

    #[test]
    fn slack_is_granted_in_ascending_dominant_share_order() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let a = tree
            .add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 20)), None)
            .unwrap();
        let b = tree
            .add_queue(root, "b", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 80)), None)
            .unwrap();
        tree.inc_pending(a, &Resource::single("mem", 5));
        tree.inc_pending(b, &Resource::single("mem", 200));

        let mut snap = snapshot::build(&tree);
        let total = Resource::single("mem", 200);
        Drf.run(&mut snap, &total);

        // a starts with the smaller dominant share (5/200 < 200/200), is
        // visited first: its fair share of the 100 slack (split two ways)
        // is 50, which already covers its full 5 demand, so it is fully
        // satisfied and drops out; b then gets whatever slack remains.
        assert_eq!(snap.get(a).unwrap().calc.ideal.get(&"mem".into()), 25);
        assert_eq!(snap.get(b).unwrap().calc.ideal.get(&"mem".into()), 175);
    }

    /// Regression test for winner-take-all water-filling: two leaves with
    /// identical guaranteed floors and identical pending demand must split
    /// the slack evenly, not have the first-visited leaf drain it all.
    #[test]
    fn equal_demand_leaves_split_slack_evenly() {
        let mut tree = QueueTree::new_root("root");
        let root = tree.root();
        let a = tree.add_queue(root, "a", QueueKind::Managed, QueueRole::Leaf, None, None).unwrap();
        let b = tree.add_queue(root, "b", QueueKind::Managed, QueueRole::Leaf, None, None).unwrap();
        tree.inc_pending(a, &Resource::single("mem", 10));
        tree.inc_pending(b, &Resource::single("mem", 10));

        let mut snap = snapshot::build(&tree);
        let total = Resource::single("mem", 12);
        Drf.run(&mut snap, &total);

        assert_eq!(snap.get(a).unwrap().calc.ideal.get(&"mem".into()), 6);
        assert_eq!(snap.get(b).unwrap().calc.ideal.get(&"mem".into()), 6);
    }
}
