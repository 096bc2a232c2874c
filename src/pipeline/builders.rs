//! Built-in configuration stages: VRFs, interfaces and static routes.

use super::{RouterConfigs, StageError, StageKind};
use crate::config::{AddressSpec, LinkSpec};
use crate::topology::ResolvedTopology;
use ipnet::IpNet;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

/// Entry of a router's `vrfs` list
#[derive(Debug, Clone, Deserialize)]
struct VrfEntry {
    name: String,
    #[serde(default)]
    vni: Option<u32>,
}

/// One network or a list of networks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Networks {
    One(String),
    Many(Vec<String>),
}

impl Networks {
    fn into_vec(self) -> Vec<String> {
        match self {
            Networks::One(network) => vec![network],
            Networks::Many(networks) => networks,
        }
    }
}

/// Entry of a router's `static_routes` list
#[derive(Debug, Clone, Deserialize)]
struct StaticRouteEntry {
    network: Networks,
    next_hop: String,
    #[serde(default)]
    admin_distance: Option<u8>,
    #[serde(default)]
    tag: Option<u32>,
    #[serde(default)]
    vrf: Option<String>,
}

/// Deserialize a router section, reporting the router and section on error
fn section<T: for<'de> Deserialize<'de>>(router: &str, key: &str, value: &Value) -> Result<T, StageError> {
    serde_json::from_value(value.clone()).map_err(|e| StageError::InvalidSection {
        router: router.to_string(),
        section: key.to_string(),
        reason: e.to_string(),
    })
}

/// `vrf <name>` blocks from each router's `vrfs` list
pub fn build_vrfs(topo: &ResolvedTopology, configs: &mut RouterConfigs) -> Result<(), StageError> {
    let key = StageKind::Vrfs.key();

    for (name, router) in &topo.routers {
        let Some(value) = router.extra.get(key) else {
            continue;
        };
        let vrfs: Vec<VrfEntry> = section(name, key, value)?;
        let config = configs.router_mut(name);

        for vrf in vrfs {
            config.push(StageKind::Vrfs, format!("vrf {}", vrf.name));
            if let Some(vni) = vrf.vni {
                config.push(StageKind::Vrfs, format!(" vni {}", vni));
            }
            config.push(StageKind::Vrfs, " exit-vrf");
            config.push(StageKind::Vrfs, "!");
        }
    }

    Ok(())
}

/// Interface name a link is configured on
fn link_interface<'a>(router: &str, key: &str, link: &'a LinkSpec) -> Result<&'a str, StageError> {
    if key == "lo" || link.is_loopback() {
        return Ok("lo");
    }
    link.interface.as_deref().ok_or_else(|| StageError::UnresolvedLink {
        router: router.to_string(),
        link: key.to_string(),
    })
}

/// One `interface` block per link, with its addresses
pub fn build_interfaces(topo: &ResolvedTopology, configs: &mut RouterConfigs) -> Result<(), StageError> {
    for (name, router) in &topo.routers {
        let config = configs.router_mut(name);

        for (key, link) in &router.links {
            let interface = link_interface(name, key, link)?;

            match link.extra.get("vrf").and_then(Value::as_str) {
                Some(vrf) => config.push(StageKind::Links, format!("interface {} vrf {}", interface, vrf)),
                None => config.push(StageKind::Links, format!("interface {}", interface)),
            }
            if let Some(description) = link.extra.get("description").and_then(Value::as_str) {
                config.push(StageKind::Links, format!(" description {}", description));
            }
            if let AddressSpec::Literal(addr) = &link.ipv4 {
                config.push(StageKind::Links, format!(" ip address {}", addr));
            }
            if let AddressSpec::Literal(addr) = &link.ipv6 {
                config.push(StageKind::Links, format!(" ipv6 address {}", addr));
            }
            config.push(StageKind::Links, "!");
        }
    }

    Ok(())
}

/// `ip route` / `ipv6 route` lines from each router's `static_routes` list
pub fn build_static_routes(topo: &ResolvedTopology, configs: &mut RouterConfigs) -> Result<(), StageError> {
    let key = StageKind::StaticRoutes.key();

    for (name, router) in &topo.routers {
        let Some(value) = router.extra.get(key) else {
            continue;
        };
        let routes: Vec<StaticRouteEntry> = section(name, key, value)?;
        let config = configs.router_mut(name);

        for route in routes {
            for network in route.network.into_vec() {
                let prefix: IpNet = network.parse().map_err(|_| StageError::InvalidSection {
                    router: name.clone(),
                    section: key.to_string(),
                    reason: format!("invalid network '{}'", network),
                })?;

                let mut line = match prefix {
                    IpNet::V4(_) => format!("ip route {} {}", prefix, route.next_hop),
                    IpNet::V6(_) => format!("ipv6 route {} {}", prefix, route.next_hop),
                };
                if let Some(tag) = route.tag {
                    line.push_str(&format!(" tag {}", tag));
                }
                if let Some(distance) = route.admin_distance {
                    line.push_str(&format!(" {}", distance));
                }
                if let Some(vrf) = &route.vrf {
                    line.push_str(&format!(" vrf {}", vrf));
                }

                debug!("{}: {}", name, line);
                config.push(StageKind::StaticRoutes, line);
            }
        }
    }

    Ok(())
}
