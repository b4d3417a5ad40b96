//! Integration scenarios exercised end-to-end through the public API
//! (`spec.md` §8 properties 6-7 and concrete scenarios not already covered
//! by inline module tests).

use fairsched_core::ids::{ApplicationId, AskKey};
use fairsched_core::preemption::{drf::Drf, run_pass, PreemptionPolicy};
use fairsched_core::queue::sorter::Fair;
use fairsched_core::queue::{QueueEvent, QueueKind, QueueRole, QueueTree};
use fairsched_core::resource::Resource;
use fairsched_core::SchedulingApplication;

/// Property 6: from `Draining`, `Start` fails and the state is unchanged.
#[test]
fn draining_is_terminal() {
    let mut tree = QueueTree::new_root("root");
    let root = tree.root();
    let leaf = tree.add_queue(root, "leaf", QueueKind::Managed, QueueRole::Leaf, None, None).unwrap();
    tree.transition(leaf, QueueEvent::Remove).unwrap();
    assert!(tree.transition(leaf, QueueEvent::Start).is_err());
}

/// Property 7: `removeQueue` on a queue with a child or an application
/// returns false and changes nothing.
#[test]
fn removal_guard_blocks_non_empty_queues() {
    let mut tree = QueueTree::new_root("root");
    let root = tree.root();
    let leaf = tree.add_queue(root, "leaf", QueueKind::Managed, QueueRole::Leaf, None, None).unwrap();
    tree.add_application(leaf, SchedulingApplication::new(ApplicationId::from("app-1"), leaf)).unwrap();
    tree.transition(leaf, QueueEvent::Remove).unwrap();

    assert!(!tree.remove_queue(leaf));
    assert!(tree.application(leaf, &ApplicationId::from("app-1")).is_some());
}

/// A full config-loaded three-queue hierarchy, sorted end to end: two
/// eligible leaves under one parent, ordered by the `fair` policy after one
/// is driven more heavily allocated than the other.
#[test]
fn fair_sibling_sort_reflects_relative_allocation() {
    let yaml = r#"
partitions:
  - name: default
    queues:
      - name: team
        parent: true
        queues:
          - name: a
            resources:
              guaranteed:
                memory: "100"
          - name: b
            resources:
              guaranteed:
                memory: "100"
"#;
    let parsed = fairsched_core::config::parse_yaml(yaml).unwrap();
    let mut tree = fairsched_core::config::build_tree(&parsed.partitions[0]).unwrap();
    let team = tree.by_path("root.team").unwrap();
    let a = tree.by_path("root.team.a").unwrap();
    let b = tree.by_path("root.team.b").unwrap();

    tree.inc_pending(a, &Resource::single("memory", 10));
    tree.inc_pending(b, &Resource::single("memory", 10));
    tree.set_allocated(a, Resource::single("memory", 80));
    tree.set_allocated(b, Resource::single("memory", 20));

    let sorted = tree.sort_queues(team, &Fair);
    assert_eq!(sorted, vec![b, a]);
}

/// A three-leaf partition where preemption reclaims exactly the
/// over-served leaf's excess above its ideal share, leaving the
/// under-served leaf untouched.
#[test]
fn end_to_end_preemption_pass_through_public_api() {
    let mut tree = QueueTree::new_root("root");
    let root = tree.root();
    let starved = tree
        .add_queue(root, "starved", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 100)), None)
        .unwrap();
    let greedy = tree
        .add_queue(root, "greedy", QueueKind::Managed, QueueRole::Leaf, Some(Resource::single("mem", 100)), None)
        .unwrap();

    tree.add_application(starved, SchedulingApplication::new(ApplicationId::from("app-starved"), starved)).unwrap();
    tree.add_ask(starved, &ApplicationId::from("app-starved"), AskKey::from("a1"), Resource::single("mem", 50), 1).unwrap();
    tree.set_allocated(starved, Resource::single("mem", 50));
    tree.set_allocated(greedy, Resource::single("mem", 150));

    let policies: Vec<Box<dyn PreemptionPolicy>> = vec![Box::new(Drf)];
    let snap = run_pass(&tree, &Resource::single("mem", 200), &policies).expect("preemption should trigger");

    assert!(snap.get(starved).unwrap().calc.preemptable.is_zero());
    assert_eq!(snap.get(greedy).unwrap().calc.preemptable.get(&"mem".into()), 50);
}

/// Dynamic queue lifecycle: created on demand, removable without draining
/// once its only application leaves.
#[test]
fn dynamic_queue_created_and_swept_once_empty() {
    let mut tree = QueueTree::new_root("root");
    let root = tree.root();
    let leaf = tree.add_queue(root, "user-42", QueueKind::Dynamic, QueueRole::Leaf, None, None).unwrap();
    tree.add_application(leaf, SchedulingApplication::new(ApplicationId::from("app-1"), leaf)).unwrap();

    assert_eq!(tree.sweep_empty_dynamic_queues(), 0);

    tree.remove_application(leaf, &ApplicationId::from("app-1")).unwrap();
    assert_eq!(tree.sweep_empty_dynamic_queues(), 1);
    assert!(tree.by_path("root.user-42").is_none());
}
