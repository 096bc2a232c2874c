//! Interface naming.
//!
//! Interface names have the form `<local>-<remote>-eth<seq>`, where `seq` is
//! a per-router counter starting at 0. Each router's counter only moves
//! forward, so the names issued for one router never repeat.

use crate::error::TopologyError;
use std::collections::{HashMap, HashSet};

fn interface_name(local: &str, remote: &str, seq: usize) -> String {
    format!("{}-{}-eth{}", local, remote, seq)
}

/// Hands out interface names for one resolution pass
#[derive(Debug, Default)]
pub struct InterfaceNamer {
    next_index: HashMap<String, usize>,
    issued: HashMap<String, HashSet<String>>,
}

impl InterfaceNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next interface of `router` will get
    pub fn next_if_index(&self, router: &str) -> usize {
        self.next_index.get(router).copied().unwrap_or(0)
    }

    fn record(&mut self, node: &str, interface: &str) -> Result<(), TopologyError> {
        let fresh = self
            .issued
            .entry(node.to_string())
            .or_default()
            .insert(interface.to_string());
        if fresh {
            Ok(())
        } else {
            Err(TopologyError::DuplicateInterface {
                node: node.to_string(),
                interface: interface.to_string(),
            })
        }
    }

    /// Name the next interface of `local` towards `remote`
    pub fn next_interface_name(&mut self, local: &str, remote: &str) -> Result<String, TopologyError> {
        let counter = self.next_index.entry(local.to_string()).or_insert(0);
        let name = interface_name(local, remote, *counter);
        *counter += 1;

        self.record(local, &name)?;
        Ok(name)
    }

    /// Names for a router attached to a switch: `(router side, switch side)`.
    ///
    /// Both sides take their sequence number from the router's counter.
    pub fn switch_interface_names(
        &mut self,
        router: &str,
        switch: &str,
    ) -> Result<(String, String), TopologyError> {
        let seq = self.next_if_index(router);
        let router_side = self.next_interface_name(router, switch)?;
        let switch_side = interface_name(switch, router, seq);

        self.record(switch, &switch_side)?;
        Ok((router_side, switch_side))
    }

    /// All names issued for `node` so far
    pub fn issued(&self, node: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .issued
            .get(node)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
