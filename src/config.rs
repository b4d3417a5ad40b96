//! Configuration loading (`spec.md` §6 "Configuration").
//!
//! A YAML document rooted at `partitions`, each holding named queues
//! recursively. Loading hierarchy mirrors the teacher's
//! `knhk-config::config::load_config` ("env > file > defaults") but ported
//! from TOML to YAML, since `spec.md` specifies a YAML-ish document and
//! this core does not carry the no_std split `knhk-config` does.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SchedulerError, SchedulerResult};
use crate::ids::{PartitionName, QueueId};
use crate::queue::{QueueKind, QueueRole, QueueTree};
use crate::resource::Resource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionsConfig {
    pub partitions: Vec<PartitionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub name: String,
    pub queues: Vec<QueueConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    #[serde(default)]
    pub submitacl: Option<String>,
    /// Intermediate node marker; absence implies leaf (`spec.md` §6).
    #[serde(default)]
    pub parent: bool,
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub guaranteed: BTreeMap<String, String>,
    #[serde(default)]
    pub max: BTreeMap<String, String>,
}

/// Parse a YAML document into `PartitionsConfig`. Unparsable documents are
/// rejected with `ConfigError::Malformed` (`spec.md` §4.1, §7).
pub fn parse_yaml(document: &str) -> SchedulerResult<PartitionsConfig> {
    serde_yaml::from_str(document)
        .map_err(|e| SchedulerError::Config(ConfigError::Malformed(e.to_string())))
}

pub fn load_from_path(path: &Path) -> SchedulerResult<PartitionsConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SchedulerError::Config(ConfigError::Malformed(e.to_string())))?;
    parse_yaml(&content)
}

/// Build a `QueueTree` rooted at `root` from a single partition's queue
/// list. Fails the whole batch on the first error — configuration errors
/// install no partial state (`spec.md` §7).
pub fn build_tree(partition: &PartitionConfig) -> SchedulerResult<QueueTree> {
    let mut tree = QueueTree::new_root("root");
    let root = tree.root();
    for q in &partition.queues {
        add_queue_recursive(&mut tree, root, q)?;
    }
    Ok(tree)
}

fn add_queue_recursive(tree: &mut QueueTree, parent: QueueId, cfg: &QueueConfig) -> SchedulerResult<()> {
    let role = if cfg.parent || !cfg.queues.is_empty() {
        QueueRole::Parent
    } else {
        QueueRole::Leaf
    };
    let guaranteed = non_empty(Resource::parse(&cfg.resources.guaranteed)?);
    let max = non_empty(Resource::parse(&cfg.resources.max)?);

    let id = tree.add_queue(parent, cfg.name.clone(), QueueKind::Managed, role, guaranteed, max)?;

    for child in &cfg.queues {
        add_queue_recursive(tree, id, child)?;
    }
    Ok(())
}

/// An empty `resources.*` mapping means "not configured" (`None`,
/// unbounded/no-floor), not "configured as exactly zero everywhere".
fn non_empty(r: Resource) -> Option<Resource> {
    if r.keys().next().is_none() {
        None
    } else {
        Some(r)
    }
}

pub fn partition_names(config: &PartitionsConfig) -> Vec<PartitionName> {
    config.partitions.iter().map(|p| PartitionName(p.name.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
partitions:
  - name: default
    queues:
      - name: production
        parent: true
        resources:
          guaranteed:
            memory: "1000"
            vcore: "100"
          max:
            memory: "2000"
            vcore: "200"
        queues:
          - name: batch
            resources:
              guaranteed:
                memory: "500"
      - name: sandbox
"#;

    #[test]
    fn parses_nested_queue_hierarchy() {
        let cfg = parse_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.partitions.len(), 1);
        let partition = &cfg.partitions[0];
        assert_eq!(partition.name, "default");
        assert_eq!(partition.queues.len(), 2);
        assert!(partition.queues[0].parent);
        assert_eq!(partition.queues[0].queues.len(), 1);
    }

    #[test]
    fn builds_queue_tree_with_correct_roles_and_resources() {
        let cfg = parse_yaml(SAMPLE).unwrap();
        let tree = build_tree(&cfg.partitions[0]).unwrap();
        let production = tree.by_path("root.production").unwrap();
        assert_eq!(tree.node(production).cache.role, QueueRole::Parent);
        assert_eq!(
            tree.node(production).cache.guaranteed.as_ref().unwrap().get(&"memory".into()),
            1000
        );

        let batch = tree.by_path("root.production.batch").unwrap();
        assert_eq!(tree.node(batch).cache.role, QueueRole::Leaf);

        let sandbox = tree.by_path("root.sandbox").unwrap();
        assert_eq!(tree.node(sandbox).cache.role, QueueRole::Leaf);
        assert!(tree.node(sandbox).cache.max.is_none());
    }

    #[test]
    fn rejects_negative_resource_values() {
        let bad = r#"
partitions:
  - name: default
    queues:
      - name: production
        resources:
          guaranteed:
            memory: "-5"
"#;
        let cfg = parse_yaml(bad).unwrap();
        assert!(build_tree(&cfg.partitions[0]).is_err());
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(parse_yaml("not: [valid yaml").is_err());
    }
}
