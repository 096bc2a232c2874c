//! Kernel interface addressing.
//!
//! Besides the routing daemon configuration, each router gets its link
//! addresses configured on the Linux interfaces directly.

use crate::backend::Backend;
use crate::config::{AddressSpec, TopologyDocument};
use crate::error::TopologyError;
use crate::topology::ResolvedTopology;
use log::{info, warn};
use std::collections::BTreeMap;

/// `ip addr add` commands per router.
///
/// The `lo` link (or any loopback link) is configured on `lo`; every other
/// link on its resolved interface. Links without an interface name are
/// skipped.
pub fn linux_interface_commands(doc: &TopologyDocument) -> BTreeMap<String, Vec<String>> {
    let mut commands = BTreeMap::new();

    for (name, router) in &doc.routers {
        let mut router_commands = Vec::new();

        for (key, link) in &router.links {
            let device = if key == "lo" || link.is_loopback() {
                "lo"
            } else if let Some(interface) = link.interface.as_deref() {
                interface
            } else {
                warn!("{}: link '{}' has no interface, skipping", name, key);
                continue;
            };

            if let AddressSpec::Literal(addr) = &link.ipv4 {
                router_commands.push(format!("ip addr add {} dev {}", addr, device));
            }
            if let AddressSpec::Literal(addr) = &link.ipv6 {
                router_commands.push(format!("ip -6 addr add {} dev {}", addr, device));
            }
        }

        commands.insert(name.clone(), router_commands);
    }

    commands
}

/// Run the interface commands inside each router. Returns the number of
/// commands run.
pub fn apply_linux_interfaces<B: Backend + ?Sized>(
    topo: &ResolvedTopology,
    backend: &mut B,
) -> Result<usize, TopologyError> {
    let mut count = 0;

    for (router, commands) in linux_interface_commands(topo) {
        for command in commands {
            backend
                .run_command(&router, &command)
                .map_err(|source| TopologyError::BackendBinding {
                    what: format!("command '{}' on {}", command, router),
                    source,
                })?;
            count += 1;
        }
    }

    info!("Configured {} interface addresses", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::topology::resolve_topology;

    const TOPO: &str = r#"{
        "ipv4base": "10.0.0.0",
        "ipv6base": "fd00::",
        "link_ip_start": {"ipv4": "10.0.0.0", "v4mask": 24, "ipv6": "fd00::", "v6mask": 64},
        "lo_prefix": {"ipv4": "1.0.", "v4mask": 32},
        "routers": {
            "r1": {"links": {"lo": {"type": "loopback", "ipv4": "auto"}, "r2": {"ipv4": "auto", "ipv6": "auto"}}},
            "r2": {"links": {"r1": {"ipv4": "auto", "ipv6": "auto"}}}
        }
    }"#;

    #[test]
    fn test_linux_interface_commands() {
        let mut backend = RecordingBackend::new();
        let topo = resolve_topology(serde_json::from_str(TOPO).unwrap(), &mut backend).unwrap();
        let commands = linux_interface_commands(&topo);

        assert_eq!(
            commands["r1"],
            vec![
                "ip addr add 1.0.1.17/32 dev lo",
                "ip addr add 10.0.0.1/24 dev r1-r2-eth0",
                "ip -6 addr add fd00::1/64 dev r1-r2-eth0",
            ]
        );
        assert_eq!(commands["r2"].len(), 2);
    }

    #[test]
    fn test_apply_linux_interfaces() {
        let mut backend = RecordingBackend::new();
        let topo = resolve_topology(serde_json::from_str(TOPO).unwrap(), &mut backend).unwrap();

        assert_eq!(apply_linux_interfaces(&topo, &mut backend).unwrap(), 5);
        assert_eq!(backend.commands()["r2"][0], "ip addr add 10.0.0.2/24 dev r2-r1-eth0");
    }

    #[test]
    fn test_unresolved_links_are_skipped() {
        let doc: TopologyDocument =
            serde_json::from_str(r#"{"routers": {"r1": {"links": {"r2": {"ipv4": "10.0.0.1/24"}}}}}"#).unwrap();
        assert!(linux_interface_commands(&doc)["r1"].is_empty());
    }
}
