//! In-memory backend that records every call.
//!
//! It enforces the same consistency rules a real emulator would (nodes must
//! exist before they are linked, interface names are unique per node) so
//! that a recorded plan can be replayed against a real environment.

use super::{Backend, BackendError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Kind of a registered node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Router,
    Switch,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BackendOp {
    AddRouter { name: String },
    AddSwitch { name: String },
    AddLink {
        local: String,
        remote: String,
        local_if: String,
        remote_if: String,
    },
    LoadConfig { router: String },
    RunCommand { router: String, command: String },
}

/// Backend that keeps everything in memory
#[derive(Debug, Default)]
pub struct RecordingBackend {
    nodes: BTreeMap<String, NodeKind>,
    interfaces: BTreeMap<String, BTreeSet<String>>,
    ops: Vec<BackendOp>,
    configs: BTreeMap<String, String>,
    commands: BTreeMap<String, Vec<String>>,
    failing_loads: HashSet<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `load_config` fail for `router`
    pub fn with_failing_load(mut self, router: &str) -> Self {
        self.failing_loads.insert(router.to_string());
        self
    }

    pub fn ops(&self) -> &[BackendOp] {
        &self.ops
    }

    pub fn node_kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).copied()
    }

    /// Interfaces created on `node` through `add_link`
    pub fn interfaces(&self, node: &str) -> Vec<&str> {
        self.interfaces
            .get(node)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Configurations loaded so far, by router
    pub fn configs(&self) -> &BTreeMap<String, String> {
        &self.configs
    }

    /// Commands run so far, by router
    pub fn commands(&self) -> &BTreeMap<String, Vec<String>> {
        &self.commands
    }

    pub fn link_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BackendOp::AddLink { .. }))
            .count()
    }

    fn add_node(&mut self, name: &str, kind: NodeKind) -> Result<(), BackendError> {
        if self.nodes.contains_key(name) {
            return Err(BackendError::DuplicateNode(name.to_string()));
        }
        self.nodes.insert(name.to_string(), kind);
        Ok(())
    }

    fn require_node(&self, name: &str) -> Result<NodeKind, BackendError> {
        self.node_kind(name)
            .ok_or_else(|| BackendError::UnknownNode(name.to_string()))
    }

    fn require_router(&self, name: &str) -> Result<(), BackendError> {
        match self.require_node(name)? {
            NodeKind::Router => Ok(()),
            NodeKind::Switch => Err(BackendError::Rejected(format!("{} is a switch", name))),
        }
    }

    fn claim_interface(&mut self, node: &str, interface: &str) -> Result<(), BackendError> {
        let fresh = self
            .interfaces
            .entry(node.to_string())
            .or_default()
            .insert(interface.to_string());
        if fresh {
            Ok(())
        } else {
            Err(BackendError::DuplicateInterface {
                node: node.to_string(),
                interface: interface.to_string(),
            })
        }
    }
}

impl Backend for RecordingBackend {
    fn add_router(&mut self, name: &str) -> Result<(), BackendError> {
        self.add_node(name, NodeKind::Router)?;
        self.ops.push(BackendOp::AddRouter { name: name.to_string() });
        Ok(())
    }

    fn add_switch(&mut self, name: &str) -> Result<(), BackendError> {
        self.add_node(name, NodeKind::Switch)?;
        self.ops.push(BackendOp::AddSwitch { name: name.to_string() });
        Ok(())
    }

    fn add_link(
        &mut self,
        local: &str,
        remote: &str,
        local_if: &str,
        remote_if: &str,
    ) -> Result<(), BackendError> {
        self.require_node(local)?;
        self.require_node(remote)?;
        self.claim_interface(local, local_if)?;
        self.claim_interface(remote, remote_if)?;

        self.ops.push(BackendOp::AddLink {
            local: local.to_string(),
            remote: remote.to_string(),
            local_if: local_if.to_string(),
            remote_if: remote_if.to_string(),
        });
        Ok(())
    }

    fn load_config(&mut self, router: &str, config: &str) -> Result<(), BackendError> {
        self.require_router(router)?;
        if self.failing_loads.contains(router) {
            return Err(BackendError::Rejected(format!("{} refused the configuration", router)));
        }

        self.configs.insert(router.to_string(), config.to_string());
        self.ops.push(BackendOp::LoadConfig { router: router.to_string() });
        Ok(())
    }

    fn run_command(&mut self, router: &str, command: &str) -> Result<String, BackendError> {
        self.require_router(router)?;

        self.commands
            .entry(router.to_string())
            .or_default()
            .push(command.to_string());
        self.ops.push(BackendOp::RunCommand {
            router: router.to_string(),
            command: command.to_string(),
        });
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_operations() {
        let mut backend = RecordingBackend::new();
        backend.add_router("r1").unwrap();
        backend.add_router("r2").unwrap();
        backend.add_switch("s1").unwrap();
        backend.add_link("r1", "r2", "r1-r2-eth0", "r2-r1-eth0").unwrap();

        assert_eq!(backend.ops().len(), 4);
        assert_eq!(backend.link_count(), 1);
        assert_eq!(backend.node_kind("s1"), Some(NodeKind::Switch));
        assert_eq!(backend.interfaces("r1"), vec!["r1-r2-eth0"]);
    }

    #[test]
    fn test_rejects_inconsistent_calls() {
        let mut backend = RecordingBackend::new();
        backend.add_router("r1").unwrap();

        assert!(matches!(backend.add_router("r1"), Err(BackendError::DuplicateNode(_))));
        assert!(matches!(
            backend.add_link("r1", "r9", "a", "b"),
            Err(BackendError::UnknownNode(name)) if name == "r9"
        ));

        backend.add_router("r2").unwrap();
        backend.add_link("r1", "r2", "r1-r2-eth0", "r2-r1-eth0").unwrap();
        assert!(matches!(
            backend.add_link("r1", "r2", "r1-r2-eth0", "r2-r1-eth1"),
            Err(BackendError::DuplicateInterface { .. })
        ));
    }

    #[test]
    fn test_load_config_and_commands() {
        let mut backend = RecordingBackend::new().with_failing_load("r2");
        backend.add_router("r1").unwrap();
        backend.add_router("r2").unwrap();
        backend.add_switch("s1").unwrap();

        backend.load_config("r1", "hostname r1\n").unwrap();
        assert_eq!(backend.configs()["r1"], "hostname r1\n");
        assert!(backend.load_config("r2", "").is_err());
        assert!(backend.load_config("s1", "").is_err());

        backend.run_command("r1", "ip link").unwrap();
        assert_eq!(backend.commands()["r1"], vec!["ip link".to_string()]);
    }

    #[test]
    fn test_ops_serialize_as_tagged_json() {
        let op = BackendOp::AddRouter { name: "r1".to_string() };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], "add_router");
        assert_eq!(value["name"], "r1");
    }
}
